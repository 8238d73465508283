//! External executables as plugins and hooks
//!
//! A plugin module on disk is an executable speaking a small stdio protocol:
//!
//! - the source document is written to its stdin;
//! - `RESHAPE_TAPE_FILENAME` holds the source path;
//! - `RESHAPE_TAPE_OPTIONS` holds the case options as JSON, and is unset
//!   when the case declares no options;
//! - on success it exits with status 0 and prints the output document;
//! - on failure it exits non-zero. A JSON object on stderr becomes the
//!   failure object; any other stderr text becomes its `message`. The exit
//!   code is recorded under `status` unless the plugin set one itself.

use crate::failure::{Failure, MESSAGE};
use crate::plugin::{Hook, Plugin, PluginInstance, TransformContext};
use async_trait::async_trait;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tracing::{debug, trace};

pub const FILENAME_ENV: &str = "RESHAPE_TAPE_FILENAME";
pub const OPTIONS_ENV: &str = "RESHAPE_TAPE_OPTIONS";
const SPAWN_ATTEMPTS: u64 = 5;

/// Plugin implemented by an external executable
#[derive(Debug, Clone)]
pub struct CommandPlugin {
    program: PathBuf,
    name: String,
}

impl CommandPlugin {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());
        Self { program, name }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl Plugin for CommandPlugin {
    async fn instantiate(
        &self,
        options: Option<&Value>,
    ) -> Result<Arc<dyn PluginInstance>, Failure> {
        let options = options
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| Failure::message(format!("options are not serializable: {e}")))?;

        Ok(Arc::new(CommandInstance {
            program: self.program.clone(),
            options,
        }))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct CommandInstance {
    program: PathBuf,
    options: Option<String>,
}

#[async_trait]
impl PluginInstance for CommandInstance {
    async fn apply(&self, document: String, context: &TransformContext) -> Result<String, Failure> {
        let mut command = Command::new(&self.program);
        command
            .env(FILENAME_ENV, &context.filename)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        match &self.options {
            Some(options) => command.env(OPTIONS_ENV, options),
            None => command.env_remove(OPTIONS_ENV),
        };

        debug!("Spawning plugin {}", self.program.display());
        let mut child = spawn(&mut command)
            .await
            .map_err(|e| Failure::from_io(&self.program, &e))?;

        // Feed stdin concurrently so a chatty plugin cannot block on a full stdout pipe.
        let stdin = child.stdin.take();
        let writer = tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                // A plugin may exit without reading its input.
                let _ = stdin.write_all(document.as_bytes()).await;
            }
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Failure::from_io(&self.program, &e))?;
        let _ = writer.await;

        trace!(
            "Plugin {} exited with {} ({} bytes out)",
            self.program.display(),
            output.status,
            output.stdout.len()
        );

        if !output.status.success() {
            return Err(failure_from_stderr(&output.stderr, output.status));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| Failure::message("plugin produced output that is not valid UTF-8"))
    }
}

/// Spawn, retrying while the executable is still held open for writing
///
/// A plugin built or written just before the run can briefly report
/// `ExecutableFileBusy` when another thread forks at the same time.
async fn spawn(command: &mut Command) -> io::Result<Child> {
    let mut attempts = 0;
    loop {
        match command.spawn() {
            Err(e)
                if e.kind() == io::ErrorKind::ExecutableFileBusy && attempts < SPAWN_ATTEMPTS =>
            {
                attempts += 1;
                tokio::time::sleep(Duration::from_millis(10 * attempts)).await;
            }
            result => return result,
        }
    }
}

fn failure_from_stderr(stderr: &[u8], status: ExitStatus) -> Failure {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();

    let failure = match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Object(_)) => Failure::from_value(value),
        _ if text.is_empty() => Failure::message(format!("process exited with {status}")),
        _ => Failure::message(text),
    };

    match status.code() {
        Some(code) if failure.field("status").is_none() => failure.with_field("status", code),
        _ => failure,
    }
}

/// Hook implemented by an external command
#[derive(Debug, Clone)]
pub struct CommandHook {
    argv: Vec<String>,
    dir: PathBuf,
}

impl CommandHook {
    /// `argv[0]` is the program; it runs with `dir` as working directory
    pub fn new(argv: Vec<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            dir: dir.into(),
        }
    }
}

#[async_trait]
impl Hook for CommandHook {
    async fn call(&self) -> Result<(), Failure> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(Failure::message("hook command is empty"));
        };

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Failure::from_io(Path::new(program), &e))?;

        if output.status.success() {
            return Ok(());
        }

        let failure = failure_from_stderr(&output.stderr, output.status);
        let message = failure
            .field(MESSAGE)
            .and_then(Value::as_str)
            .map(|message| format!("hook `{}` failed: {message}", self.argv.join(" ")))
            .unwrap_or_else(|| format!("hook `{}` failed", self.argv.join(" ")));
        Err(failure.with_field(MESSAGE, message))
    }
}
