//! End-to-end runs of the engine against fixture directories on disk

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tape_core::{
    ConfigLoader, ErrorExpectation, Executor, Failure, FailureDetail, FixtureOverrides,
    FixturePaths, FnHook, FnPlugin, Matcher, OptionLayer, Plugin, RecordingReporter, ReportEvent,
    SchedulingPolicy, Suite, TestCase, TestTable, resolve_config, split_option_args,
};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn identity() -> Arc<dyn Plugin> {
    Arc::new(FnPlugin::new("identity", |_, doc| Ok(doc.to_string())))
}

fn suite(fixtures: &Path, plugin: Arc<dyn Plugin>) -> (Suite, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::new());
    let executor = Executor::new(fixtures, reporter.clone());
    (Suite::new(executor, plugin), reporter)
}

#[tokio::test]
async fn identity_plugin_matches_its_expectation() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "id.html", "<div>same</div>\n");
    write(temp_dir.path(), "basic.expect.html", "<div>same</div>\n");

    let mut table = TestTable::new();
    table.add("basic", "basic", TestCase::new("identity").with_source("id.html"));

    let (suite, reporter) = suite(temp_dir.path(), identity());
    let outcome = suite.run(&table).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.exit_status(), 0);
    assert_eq!(reporter.passed(), vec![("basic".to_string(), "basic".to_string())]);
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("basic.result.html")).unwrap(),
        "<div>same</div>\n"
    );
}

#[tokio::test]
async fn first_run_bootstraps_an_empty_expectation() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "fresh.html", "<p>new</p>");

    let mut table = TestTable::new();
    table.add("authoring", "fresh", TestCase::new("new case"));

    let (suite, reporter) = suite(temp_dir.path(), identity());
    let outcome = suite.run(&table).await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.exit_status(), 1);
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("fresh.expect.html")).unwrap(),
        ""
    );
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("fresh.result.html")).unwrap(),
        "<p>new</p>"
    );
    assert_eq!(
        reporter.detail("authoring", "fresh"),
        Some(FailureDetail::Mismatch {
            expected: String::new(),
            rendered: "<p>new</p>".into(),
        })
    );

    // Promoting the result makes the next run pass.
    fs::copy(
        temp_dir.path().join("fresh.result.html"),
        temp_dir.path().join("fresh.expect.html"),
    )
    .unwrap();
    assert!(suite.run(&table).await.is_success());
}

#[tokio::test]
async fn expected_errors_decide_failing_transforms() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "include.html", "<include src=\"missing.html\">");

    let expectation =
        ErrorExpectation::new().with("message", Matcher::pattern("not found").unwrap());

    let mut table = TestTable::new();
    table.add(
        "errors",
        "include:missing",
        TestCase::new("missing partial")
            .with_plugin(FnPlugin::new("include", |_, _| Err(Failure::message("file not found"))))
            .with_error(expectation.clone()),
    );
    table.add(
        "errors",
        "include:syntax",
        TestCase::new("syntax error")
            .with_plugin(FnPlugin::new("include", |_, _| Err(Failure::message("syntax error"))))
            .with_error(expectation),
    );

    let (suite, reporter) = suite(temp_dir.path(), identity());
    let outcome = suite.run(&table).await;

    assert_eq!(
        reporter.passed(),
        vec![("errors".to_string(), "include:missing".to_string())]
    );
    assert_eq!(
        reporter.failed(),
        vec![("errors".to_string(), "include:syntax".to_string())]
    );
    assert_eq!(
        reporter.detail("errors", "include:syntax"),
        Some(FailureDetail::Error("syntax error".into()))
    );
    assert_eq!(outcome.sections[0].failures, vec!["include:syntax"]);
}

#[test]
fn fixtures_override_moves_every_derived_path() {
    let cwd = Path::new("/work/plugin");
    let (args, rest) = split_option_args(["reshape-tape", r#"--fixtures="./custom""#], &[]);
    assert_eq!(rest, vec![OsString::from("reshape-tape")]);

    let config = resolve_config(cwd, OptionLayer::defaults(cwd), None, args).unwrap();
    let paths = FixturePaths::derive(&config.fixtures, "layout:min", FixtureOverrides::default());

    assert_eq!(config.fixtures, PathBuf::from("/work/plugin/custom"));
    assert_eq!(paths.source, PathBuf::from("/work/plugin/custom/layout.html"));
    assert_eq!(paths.expect, PathBuf::from("/work/plugin/custom/layout.min.expect.html"));
    assert_eq!(paths.result, PathBuf::from("/work/plugin/custom/layout.min.result.html"));
}

#[tokio::test]
async fn variants_share_a_source_but_not_their_expectations() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "page.html", "<p> a </p>");
    write(temp_dir.path(), "page.raw.expect.html", "<p> a </p>");
    write(temp_dir.path(), "page.min.expect.html", "<p>a</p>");

    let plugin: Arc<dyn Plugin> = Arc::new(FnPlugin::new("min", |options, doc| {
        let minify = options
            .and_then(|options| options.get("minify"))
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        Ok(if minify { doc.replace(' ', "") } else { doc.to_string() })
    }));

    let mut table = TestTable::new();
    table.add("layout", "page:raw", TestCase::new("untouched"));
    table.add(
        "layout",
        "page:min",
        TestCase::new("minified").with_options(serde_json::json!({ "minify": true })),
    );

    let (suite, _) = suite(temp_dir.path(), plugin);
    assert!(suite.run(&table).await.is_success());
    assert!(temp_dir.path().join("page.raw.result.html").exists());
    assert!(temp_dir.path().join("page.min.result.html").exists());
}

#[tokio::test]
async fn sequential_runs_every_case_in_table_order() {
    let temp_dir = TempDir::new().unwrap();
    for name in ["a", "b", "c"] {
        write(temp_dir.path(), &format!("{name}.html"), name);
    }
    write(temp_dir.path(), "a.expect.html", "a");
    write(temp_dir.path(), "b.expect.html", "wrong");
    write(temp_dir.path(), "c.expect.html", "c");

    let order = Arc::new(Mutex::new(Vec::new()));
    let mut table = TestTable::new();
    for name in ["a", "b", "c"] {
        let order = Arc::clone(&order);
        table.add(
            "order",
            name,
            TestCase::new(name).with_before(FnHook::new(move || {
                order.lock().unwrap().push(name);
                Ok(())
            })),
        );
    }

    let (suite, reporter) = suite(temp_dir.path(), identity());
    let outcome = suite.run(&table).await;

    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(outcome.sections[0].passed, 2);
    assert_eq!(outcome.sections[0].failed, 1);
    assert!(!outcome.is_success());

    let cases: Vec<_> = reporter
        .events()
        .into_iter()
        .filter_map(|event| match event {
            ReportEvent::Pass { case, .. } | ReportEvent::Fail { case, .. } => Some(case),
            _ => None,
        })
        .collect();
    assert_eq!(cases, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn parallel_attributes_outcomes_to_the_right_cases() {
    let temp_dir = TempDir::new().unwrap();
    let mut table = TestTable::new();

    for section in ["one", "two"] {
        for (i, name) in ["slow", "fast", "broken"].iter().enumerate() {
            let case_name = format!("{section}-{name}");
            write(temp_dir.path(), &format!("{case_name}.html"), &case_name);
            if *name != "broken" {
                write(temp_dir.path(), &format!("{case_name}.expect.html"), &case_name);
            } else {
                write(temp_dir.path(), &format!("{case_name}.expect.html"), "nope");
            }
            table.add(section, case_name, TestCase::new(format!("case {i}")));
        }
    }

    // Earlier cases take longer, so completion order is the reverse of table order.
    let plugin: Arc<dyn Plugin> = Arc::new(DelayPlugin);
    let reporter = Arc::new(RecordingReporter::new());
    let executor = Executor::new(temp_dir.path(), reporter.clone());
    let suite = Suite::new(executor, plugin).with_policy(SchedulingPolicy::Parallel);

    let outcome = suite.run(&table).await;

    assert!(!outcome.is_success());
    for section in &outcome.sections {
        assert_eq!(section.passed, 2);
        assert_eq!(section.failures, vec![format!("{}-broken", section.name)]);
    }

    let mut failed = reporter.failed();
    failed.sort();
    assert_eq!(
        failed,
        vec![
            ("one".to_string(), "one-broken".to_string()),
            ("two".to_string(), "two-broken".to_string()),
        ]
    );
}

struct DelayPlugin;

#[async_trait::async_trait]
impl Plugin for DelayPlugin {
    async fn instantiate(
        &self,
        _options: Option<&serde_json::Value>,
    ) -> Result<Arc<dyn tape_core::PluginInstance>, Failure> {
        Ok(Arc::new(DelayInstance))
    }

    fn name(&self) -> &str {
        "delay"
    }
}

struct DelayInstance;

#[async_trait::async_trait]
impl tape_core::PluginInstance for DelayInstance {
    async fn apply(
        &self,
        document: String,
        _context: &tape_core::TransformContext,
    ) -> Result<String, Failure> {
        let delay = if document.ends_with("slow") { 40 } else { 5 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(document)
    }
}

#[tokio::test]
async fn after_hook_runs_exactly_once_per_case() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "ok.html", "x");
    write(temp_dir.path(), "ok.expect.html", "x");

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = |calls: &Arc<AtomicUsize>| {
        let calls = Arc::clone(calls);
        FnHook::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    };

    let mut table = TestTable::new();
    table.add("hooks", "ok", TestCase::new("passes").with_after(counter(&calls)));
    table.add("hooks", "absent", TestCase::new("no source").with_after(counter(&calls)));
    table.add(
        "hooks",
        "ok:throws",
        TestCase::new("plugin throws")
            .with_source("ok.html")
            .with_plugin(FnPlugin::new("throw", |_, _| Err(Failure::reason("boom"))))
            .with_after(counter(&calls)),
    );

    for policy in [SchedulingPolicy::Sequential, SchedulingPolicy::Parallel] {
        calls.store(0, Ordering::SeqCst);
        let (suite, _) = suite(temp_dir.path(), identity());
        suite.with_policy(policy).run(&table).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3, "policy {policy}");
    }
}

#[tokio::test]
async fn empty_table_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let (suite, reporter) = suite(temp_dir.path(), identity());

    let outcome = suite.run(&TestTable::new()).await;

    assert!(outcome.is_success());
    assert_eq!(reporter.events(), vec![ReportEvent::Summary { passed: 0, failed: 0 }]);
}

#[tokio::test]
async fn transform_timeout_fails_the_case() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "stall-slow.html", "stall-slow");

    let mut table = TestTable::new();
    table.add("limits", "stall-slow", TestCase::new("hangs"));

    let reporter = Arc::new(RecordingReporter::new());
    let executor = Executor::new(temp_dir.path(), reporter.clone())
        .with_timeout(Some(Duration::from_millis(5)));
    let outcome = Suite::new(executor, Arc::new(DelayPlugin)).run(&table).await;

    assert!(!outcome.is_success());
    assert_eq!(
        reporter.detail("limits", "stall-slow"),
        Some(FailureDetail::Error("timeout".into()))
    );
}

#[cfg(unix)]
mod on_disk {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tape_core::{FsModuleLoader, run_suite};

    fn executable(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = write(dir, name, &format!("#!/bin/sh\n{body}\n"));
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn runs_a_project_from_its_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(
            root,
            "Cargo.toml",
            "[package]\nname = \"upper\"\n\n\
             [package.metadata.reshape-tape]\nplugin = \"bin\"\nfixtures = \"fixtures\"\n",
        );
        executable(root, "bin/reshape-plugin", "tr a-z A-Z");
        executable(
            root,
            "bin/strict",
            r#"echo '{"reason":"unclosed tag","line":1}' >&2; exit 2"#,
        );
        write(
            root,
            ".tape.toml",
            r#"
[upper.basic]
message = "uppercases"

[upper."basic:cleanup"]
message = "cleans up after itself"
after = ["rm", "-f", "fixtures/basic.cleanup.result.html"]

[strict.broken]
message = "rejects unclosed tags"
plugin = "bin/strict"
source = "basic.html"
error = { reason = { pattern = "^unclosed" }, line = 1 }
"#,
        );
        write(root, "fixtures/basic.html", "<p>hi</p>\n");
        write(root, "fixtures/basic.expect.html", "<P>HI</P>\n");
        write(root, "fixtures/basic.cleanup.expect.html", "<P>HI</P>\n");

        let config = ConfigLoader::resolve(root, OptionLayer::new()).unwrap();
        let reporter = Arc::new(RecordingReporter::new());
        let outcome = run_suite(&config, &FsModuleLoader, reporter.clone())
            .await
            .unwrap();

        assert!(outcome.is_success(), "{:?}", reporter.events());
        assert_eq!(outcome.passed(), 3);
        assert!(root.join("fixtures/basic.result.html").exists());
        assert!(!root.join("fixtures/basic.cleanup.result.html").exists());
    }

    #[tokio::test]
    async fn missing_plugin_is_a_startup_error() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "package.json", r#"{ "reshapeConfig": { "plugin": "nowhere" } }"#);
        write(root, ".tape.toml", "");

        let config = ConfigLoader::resolve(root, OptionLayer::new()).unwrap();
        let err = run_suite(&config, &FsModuleLoader, Arc::new(RecordingReporter::new()))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), tape_core::ErrorKind::PluginLoad);
        assert!(err.to_string().contains("nowhere failed to load"));
    }
}
