//! Project manifest discovery and option loading

use super::merge::{OptionLayer, resolve_config};
use super::Configuration;
use crate::error::TapeError;
use crate::result::Result;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Rust project manifest
pub const CARGO_MANIFEST: &str = "Cargo.toml";
/// Node project manifest
pub const PACKAGE_MANIFEST: &str = "package.json";
/// Metadata table read from `Cargo.toml`
pub const MANIFEST_SECTION: &str = "reshape-tape";
/// Key read from `package.json`
pub const PACKAGE_SECTION: &str = "reshapeConfig";

/// Loader for the manifest layer of the configuration
pub struct ConfigLoader;

impl ConfigLoader {
    /// Find the project manifest in `cwd`
    ///
    /// `Cargo.toml` is preferred over `package.json`. A project without
    /// either is an error: the runner never guesses where a project starts.
    pub fn discover_manifest(cwd: &Path) -> Result<PathBuf> {
        for filename in [CARGO_MANIFEST, PACKAGE_MANIFEST] {
            let path = cwd.join(filename);
            if path.is_file() {
                tracing::debug!("Found manifest: {}", path.display());
                return Ok(path);
            }
        }

        Err(TapeError::manifest_load(
            cwd.join(PACKAGE_MANIFEST),
            format!("no {CARGO_MANIFEST} or {PACKAGE_MANIFEST} in {}", cwd.display()),
        ))
    }

    /// Read the runner section of a manifest, if it declares one
    pub fn load_manifest(path: &Path) -> Result<Option<OptionLayer>> {
        let content = fs::read_to_string(path)
            .map_err(|e| TapeError::manifest_load(path, e.to_string()))?;

        let section = if path.file_name().is_some_and(|name| name == CARGO_MANIFEST) {
            Self::cargo_section(path, &content)?
        } else {
            Self::package_section(path, &content)?
        };

        match section {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(OptionLayer::from_map(map))),
            Some(other) => Err(TapeError::manifest_load(
                path,
                format!("runner section must be a table, found {other}"),
            )),
        }
    }

    /// Discover the manifest and resolve the full configuration
    pub fn resolve(cwd: &Path, args: OptionLayer) -> Result<Configuration> {
        let manifest_path = Self::discover_manifest(cwd)?;
        let manifest = Self::load_manifest(&manifest_path)?;
        resolve_config(cwd, OptionLayer::defaults(cwd), manifest, args)
    }

    fn cargo_section(path: &Path, content: &str) -> Result<Option<Value>> {
        let manifest: toml::Table =
            toml::from_str(content).map_err(|e| TapeError::manifest_load(path, e.to_string()))?;

        let section = ["package", "workspace"].into_iter().find_map(|parent| {
            manifest
                .get(parent)?
                .get("metadata")?
                .get(MANIFEST_SECTION)
                .cloned()
        });

        section
            .map(|table| {
                serde_json::to_value(table)
                    .map_err(|e| TapeError::manifest_load(path, e.to_string()))
            })
            .transpose()
    }

    fn package_section(path: &Path, content: &str) -> Result<Option<Value>> {
        let mut manifest: Value = serde_json::from_str(content)
            .map_err(|e| TapeError::manifest_load(path, e.to_string()))?;

        Ok(manifest
            .as_object_mut()
            .and_then(|object| object.remove(PACKAGE_SECTION)))
    }
}
