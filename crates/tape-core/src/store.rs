//! Fixture file access

use async_trait::async_trait;
use std::io;
use std::path::Path;

/// Read/write capability over fixture files
#[async_trait]
pub trait FixtureStore: Send + Sync {
    async fn read_text(&self, path: &Path) -> io::Result<String>;

    async fn write_text(&self, path: &Path, contents: &str) -> io::Result<()>;
}

/// Fixture store on the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskStore;

#[async_trait]
impl FixtureStore for DiskStore {
    async fn read_text(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn write_text(&self, path: &Path, contents: &str) -> io::Result<()> {
        tokio::fs::write(path, contents).await
    }
}
