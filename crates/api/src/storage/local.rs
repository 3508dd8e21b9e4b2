//! Filesystem storage rooted at a directory, one subdirectory per bucket.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use super::{validate_key, Bucket, StorageBackend, StorageError};

pub struct LocalStorage {
    root: PathBuf,
    public_url: String,
}

impl LocalStorage {
    pub fn new(root: PathBuf, public_url: String) -> Self {
        Self {
            root,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    fn path(&self, bucket: Bucket, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(bucket.as_str()).join(key))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn put(
        &self,
        bucket: Bucket,
        key: &str,
        _content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StorageError> {
        let path = self.path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let size = bytes.len();
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(bucket = %bucket, key, size, "Stored object on local filesystem");
        Ok(())
    }

    async fn get(&self, bucket: Bucket, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> String {
        format!("{}/{bucket}/{key}", self.public_url)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
