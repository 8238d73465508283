//! Loading plugin modules and test tables
//!
//! Both are resolved through [`ModuleLoader`], so embedders can supply
//! plugins and tables from anywhere. [`FsModuleLoader`] reads them from disk:
//! a plugin is an executable (a directory stands for its `reshape-plugin`
//! executable), a table is a TOML, JSON or YAML file.
//!
//! ```toml
//! [layout.basic]
//! message = "keeps markup untouched"
//!
//! [layout."basic:min"]
//! message = "minifies"
//! options = { minify = true }
//!
//! [errors.missing]
//! message = "reports missing partials"
//! plugin = "plugins/strict"
//! error = { message = { pattern = "not found" }, status = 1 }
//! before = ["touch", "partial.html"]
//! after = ["rm", "-f", "partial.html"]
//! ```

use crate::command::{CommandHook, CommandPlugin};
use crate::error::TapeError;
use crate::plugin::{Hook, Plugin};
use crate::result::Result;
use crate::table::{CaseSpec, TableSpec, TestCase, TestTable};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Executable a plugin directory resolves to
pub const PLUGIN_EXECUTABLE: &str = "reshape-plugin";

/// Capability to load the modules a run depends on
///
/// Every failure is reported as a load error naming the resource, whatever
/// its cause.
pub trait ModuleLoader: Send + Sync {
    fn load_plugin(&self, path: &Path) -> Result<Arc<dyn Plugin>>;

    fn load_table(&self, path: &Path) -> Result<TestTable>;
}

/// Loads plugins and tables from the file system
#[derive(Debug, Clone, Copy, Default)]
pub struct FsModuleLoader;

impl FsModuleLoader {
    pub fn new() -> Self {
        Self
    }

    /// Locate the executable behind a plugin path
    pub fn resolve_plugin(path: &Path) -> Result<PathBuf> {
        let program = if path.is_dir() {
            path.join(PLUGIN_EXECUTABLE)
        } else {
            path.to_path_buf()
        };

        let metadata = fs::metadata(&program)
            .map_err(|e| TapeError::plugin_load(path, format!("{}: {e}", program.display())))?;
        if !metadata.is_file() {
            return Err(TapeError::plugin_load(
                path,
                format!("{} is not a file", program.display()),
            ));
        }
        if !is_executable(&metadata) {
            return Err(TapeError::plugin_load(
                path,
                format!("{} is not executable", program.display()),
            ));
        }

        Ok(program)
    }

    /// Parse table file contents, picking the format from the extension
    pub fn parse_table(path: &Path, content: &str) -> Result<TableSpec> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let parsed = match extension.as_deref() {
            Some("toml") => toml::from_str(content).map_err(|e| e.to_string()),
            Some("json") => serde_json::from_str(content).map_err(|e| e.to_string()),
            Some("yaml" | "yml") => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            _ => Err("unsupported table format, expected .toml, .json, .yaml or .yml".to_string()),
        };

        parsed.map_err(|message| TapeError::table_load(path, message))
    }

    fn build_case(&self, table_path: &Path, base_dir: &Path, spec: CaseSpec) -> Result<TestCase> {
        let plugin = match spec.plugin_path(base_dir) {
            Some(path) => Some(self.load_plugin(&path)?),
            None => None,
        };
        let before = spec
            .before
            .map(|argv| hook(table_path, base_dir, "before", argv))
            .transpose()?;
        let after = spec
            .after
            .map(|argv| hook(table_path, base_dir, "after", argv))
            .transpose()?;

        Ok(TestCase {
            message: spec.message,
            options: spec.options,
            plugin,
            source: spec.source,
            expect: spec.expect,
            result: spec.result,
            error: spec.error,
            before,
            after,
        })
    }
}

impl ModuleLoader for FsModuleLoader {
    fn load_plugin(&self, path: &Path) -> Result<Arc<dyn Plugin>> {
        let program = Self::resolve_plugin(path)?;
        debug!("Loaded plugin {}", program.display());
        Ok(Arc::new(CommandPlugin::new(program)))
    }

    fn load_table(&self, path: &Path) -> Result<TestTable> {
        let content =
            fs::read_to_string(path).map_err(|e| TapeError::table_load(path, e.to_string()))?;
        let spec = Self::parse_table(path, &content)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let mut table = TestTable::new();
        for (section, cases) in spec {
            for (name, case) in cases {
                table.add(section.clone(), name, self.build_case(path, base_dir, case)?);
            }
        }

        debug!("Loaded {} cases from {}", table.len(), path.display());
        Ok(table)
    }
}

fn hook(
    table_path: &Path,
    base_dir: &Path,
    which: &str,
    argv: Vec<String>,
) -> Result<Arc<dyn Hook>> {
    if argv.first().is_none_or(|program| program.is_empty()) {
        return Err(TapeError::table_load(
            table_path,
            format!("`{which}` must name a command"),
        ));
    }
    Ok(Arc::new(CommandHook::new(argv, base_dir)))
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    true
}
