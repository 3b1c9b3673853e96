//! Where the serialized matrix is stored.
//!
//! The pipeline writes one object per run under a fixed key, replacing the
//! previous one. Readers get the bytes back with whatever timestamps the
//! backend tracks; a key that was never written reads as `None`.

mod blob;
mod file;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::auth::{ChainedCredential, CredentialError, TokenCredential};
use crate::http::{AsyncHttpClient, HttpError, ReqwestClient};

pub use blob::{AzureBlobStore, BLOB_API_VERSION};
pub use file::FileStore;

/// Default object key for the capacity matrix.
pub const DEFAULT_BLOB_NAME: &str = "ptu_data.csv";

/// A stored object and its timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub created: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl StoredBlob {
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("blob request failed: {0}")]
    Http(#[from] HttpError),

    #[error("storage authentication failed: {0}")]
    Credential(#[from] CredentialError),

    #[error("{url} returned HTTP {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("invalid storage configuration: {0}")]
    Config(String),
}

/// Overwrite-semantics object storage for the matrix.
pub trait CapacityStore: Send + Sync {
    /// Stores `bytes` under `key`, replacing any previous object.
    fn put(&self, key: &str, bytes: Vec<u8>) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// Reads the object under `key`, or `None` if it was never written.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<StoredBlob>, SinkError>> + Send;

    /// Human-readable location of `key`, for logs and summaries.
    fn describe(&self, key: &str) -> String;
}

/// A store selected at runtime from configuration.
pub enum StoreBackend<C: AsyncHttpClient = ReqwestClient, T: TokenCredential = Arc<ChainedCredential>> {
    Blob(AzureBlobStore<C, T>),
    File(FileStore),
}

impl<C: AsyncHttpClient, T: TokenCredential> CapacityStore for StoreBackend<C, T> {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), SinkError> {
        match self {
            Self::Blob(store) => store.put(key, bytes).await,
            Self::File(store) => store.put(key, bytes).await,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, SinkError> {
        match self {
            Self::Blob(store) => store.get(key).await,
            Self::File(store) => store.get(key).await,
        }
    }

    fn describe(&self, key: &str) -> String {
        match self {
            Self::Blob(store) => store.describe(key),
            Self::File(store) => store.describe(key),
        }
    }
}
