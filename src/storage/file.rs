//! File-backed storage: one JSON file per key in a data directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::DurableStorage;
use crate::error::{ResilienceError, Result};

/// Stores each record as `<dir>/<encoded key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (and creates if needed) the storage directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|err| {
            ResilienceError::Storage(format!("Failed to create {}: {}", dir.display(), err))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

/// Keeps ASCII alphanumerics and `-`; every other byte, `_` included, becomes
/// `_XX`. Distinct keys always get distinct file names.
fn encode_key(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("_{:02X}", byte));
        }
    }
    name
}

#[async_trait]
impl DurableStorage for FileStorage {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.record_path(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ResilienceError::Storage(format!(
                "Failed to read record {}: {}",
                key, err
            ))),
        }
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        let path = self.record_path(key);
        // write then rename, readers never see a partial record
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("Persisted record {} ({} bytes)", key, value.len());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.record_path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
