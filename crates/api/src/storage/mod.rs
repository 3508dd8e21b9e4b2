//! Object storage for signed PDFs and diagram images.
//!
//! [`StorageBackend`] is implemented by [`LocalStorage`] (filesystem, served
//! by `GET /files/{bucket}/{*key}`) and [`SupabaseStorage`] (Supabase
//! Storage REST API).

pub mod local;
pub mod supabase;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::StorageConfig;

pub use local::LocalStorage;
pub use supabase::SupabaseStorage;

// ---------------------------------------------------------------------------
// Bucket
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Signed inspection PDFs.
    Pdfs,
    /// Cart diagram background images.
    Diagrams,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdfs => "pdfs",
            Self::Diagrams => "diagrams",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "pdfs" => Some(Self::Pdfs),
            "diagrams" => Some(Self::Diagrams),
            _ => None,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid object key '{0}'")]
    InvalidKey(String),

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Storage returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },
}

/// Reject keys that could escape the bucket.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if invalid {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Store `bytes` under `key`, replacing any existing object.
    async fn put(
        &self,
        bucket: Bucket,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StorageError>;

    /// Fetch an object. `Ok(None)` when it does not exist.
    async fn get(&self, bucket: Bucket, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Publicly reachable URL of an object.
    fn public_url(&self, bucket: Bucket, key: &str) -> String;

    fn name(&self) -> &'static str;
}

/// Build the backend selected by configuration.
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>, StorageError> {
    Ok(match config {
        StorageConfig::Local { root, public_url } => {
            Arc::new(LocalStorage::new(root.clone(), public_url.clone()))
        }
        StorageConfig::Supabase { url, service_key } => {
            Arc::new(SupabaseStorage::new(url.clone(), service_key.clone())?)
        }
    })
}
