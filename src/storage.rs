use std::{io, path::PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

/// Blob storage for food images. Errors keep their `io::ErrorKind` so callers
/// can tell "already absent" from real failures.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes) -> io::Result<()>;
    async fn get_object(&self, key: &str) -> io::Result<Bytes>;
    async fn delete_object(&self, key: &str) -> io::Result<()>;
}

/// Flat directory of objects on the local filesystem.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub async fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-');
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid object key {key:?}"),
            ));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes) -> io::Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::write(&path, &body).await?;
        debug!(key, bytes = body.len(), "object stored");
        Ok(())
    }

    async fn get_object(&self, key: &str) -> io::Result<Bytes> {
        let path = self.path_for(key)?;
        Ok(Bytes::from(tokio::fs::read(&path).await?))
    }

    async fn delete_object(&self, key: &str) -> io::Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::remove_file(&path).await?;
        debug!(key, "object deleted");
        Ok(())
    }
}
