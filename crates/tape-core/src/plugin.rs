//! Plugin, transformer and hook seams
//!
//! The runner treats the transform engine and the plugin under test as
//! opaque collaborators:
//!
//! - a [`Plugin`] is prepared once per case, with the case options, and
//!   yields a [`PluginInstance`];
//! - a [`Transformer`] runs a source document through a list of instances
//!   and produces output text or a [`Failure`];
//! - a [`Hook`] runs before or after a case.
//!
//! [`FnPlugin`] and [`FnHook`] adapt closures, which is how plugins written
//! in Rust plug into the runner. External executables are adapted in
//! [`crate::command`].

use crate::failure::Failure;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A plugin module: prepares transform-ready instances
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Prepare an instance; `options` is `None` when the case declares none
    async fn instantiate(
        &self,
        options: Option<&Value>,
    ) -> Result<Arc<dyn PluginInstance>, Failure>;

    /// Name used in logs
    fn name(&self) -> &str;
}

/// A prepared plugin, ready to be handed to a [`Transformer`]
#[async_trait]
pub trait PluginInstance: Send + Sync {
    async fn apply(&self, document: String, context: &TransformContext) -> Result<String, Failure>;
}

/// Per-document information handed to plugin instances
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformContext {
    /// Path of the source document
    pub filename: PathBuf,
}

/// Everything a transformer needs besides the source text
#[derive(Clone)]
pub struct ProcessOptions {
    pub filename: PathBuf,
    pub plugins: Vec<Arc<dyn PluginInstance>>,
}

impl fmt::Debug for ProcessOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessOptions")
            .field("filename", &self.filename)
            .field("plugins", &self.plugins.len())
            .finish()
    }
}

/// The document-transformation engine
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn process(&self, source: &str, options: &ProcessOptions) -> Result<String, Failure>;
}

/// Default engine: threads the document through each instance in order
#[derive(Debug, Clone, Copy, Default)]
pub struct Pipeline;

#[async_trait]
impl Transformer for Pipeline {
    async fn process(&self, source: &str, options: &ProcessOptions) -> Result<String, Failure> {
        let context = TransformContext {
            filename: options.filename.clone(),
        };

        let mut document = source.to_string();
        for plugin in &options.plugins {
            document = plugin.apply(document, &context).await?;
        }
        Ok(document)
    }
}

/// A hook run around a case
#[async_trait]
pub trait Hook: Send + Sync {
    async fn call(&self) -> Result<(), Failure>;
}

type TransformFn = dyn Fn(Option<&Value>, &str) -> Result<String, Failure> + Send + Sync;

/// Plugin backed by a closure over `(options, document)`
///
/// ```
/// use tape_core::{FnPlugin, Failure};
///
/// let upper = FnPlugin::new("upper", |_options, document| Ok(document.to_uppercase()));
/// let strict = FnPlugin::new("strict", |_options, document| {
///     if document.contains("<script") {
///         return Err(Failure::message("scripts are not allowed"));
///     }
///     Ok(document.to_string())
/// });
/// # let _ = (upper, strict);
/// ```
pub struct FnPlugin {
    name: String,
    transform: Arc<TransformFn>,
}

impl FnPlugin {
    pub fn new<F>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(Option<&Value>, &str) -> Result<String, Failure> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            transform: Arc::new(transform),
        }
    }
}

#[async_trait]
impl Plugin for FnPlugin {
    async fn instantiate(
        &self,
        options: Option<&Value>,
    ) -> Result<Arc<dyn PluginInstance>, Failure> {
        Ok(Arc::new(FnInstance {
            transform: Arc::clone(&self.transform),
            options: options.cloned(),
        }))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct FnInstance {
    transform: Arc<TransformFn>,
    options: Option<Value>,
}

#[async_trait]
impl PluginInstance for FnInstance {
    async fn apply(
        &self,
        document: String,
        _context: &TransformContext,
    ) -> Result<String, Failure> {
        (self.transform)(self.options.as_ref(), &document)
    }
}

/// Hook backed by a closure
pub struct FnHook<F>(F);

impl<F> FnHook<F>
where
    F: Fn() -> Result<(), Failure> + Send + Sync,
{
    pub fn new(hook: F) -> Self {
        Self(hook)
    }
}

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: Fn() -> Result<(), Failure> + Send + Sync,
{
    async fn call(&self) -> Result<(), Failure> {
        (self.0)()
    }
}
