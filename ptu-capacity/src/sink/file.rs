//! Local directory backend.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use super::{CapacityStore, SinkError, StoredBlob};

/// Stores each key as a file in one directory.
///
/// Writes go to a temporary file that is renamed into place, so readers
/// never observe a partially written matrix.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

fn io_error(path: &Path, source: std::io::Error) -> SinkError {
    SinkError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl CapacityStore for FileStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), SinkError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        let path = self.path_for(key);
        let temp = self.dir.join(format!(".{}.tmp", key));
        let size = bytes.len();

        tokio::fs::write(&temp, bytes)
            .await
            .map_err(|e| io_error(&temp, e))?;
        tokio::fs::rename(&temp, &path)
            .await
            .map_err(|e| io_error(&path, e))?;

        info!(path = %path.display(), bytes = size, "Wrote capacity file");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, SinkError> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| io_error(&path, e))?;

        Ok(Some(StoredBlob {
            bytes,
            created: metadata.created().ok().map(DateTime::<Utc>::from),
            last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        }))
    }

    fn describe(&self, key: &str) -> String {
        self.path_for(key).display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert_eq!(store.get("ptu_data.csv").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_overwrites_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        store.put("ptu_data.csv", b"first\n".to_vec()).await.unwrap();
        store.put("ptu_data.csv", b"second\n".to_vec()).await.unwrap();

        let blob = store.get("ptu_data.csv").await.unwrap().unwrap();
        assert_eq!(blob.bytes, b"second\n");
        assert!(blob.last_modified.is_some());

        let entries: Vec<_> = std::fs::read_dir(store.dir()).unwrap().collect();
        assert_eq!(entries.len(), 1, "temporary file left behind");
    }

    #[test]
    fn test_describe_is_file_path() {
        let store = FileStore::new("/var/lib/ptu");
        assert_eq!(store.describe("ptu_data.csv"), Path::new("/var/lib/ptu").join("ptu_data.csv").display().to_string());
    }
}
