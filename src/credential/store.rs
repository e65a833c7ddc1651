//! Keyed persistence for token records
//!
//! One record per cache partition. The file store keeps each partition in its
//! own JSON file and always rewrites it whole.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;

use super::record::TokenRecord;
use crate::error::{Error, Result};

/// Load/save access to cached token records
pub trait CredentialStore: Send + Sync {
    /// Read the record for `partition`, `Ok(None)` when nothing is stored
    fn load(&self, partition: &str) -> Result<Option<TokenRecord>>;

    /// Replace the record for `partition`
    fn save(&self, partition: &str, record: &TokenRecord) -> Result<()>;

    /// Human-readable location of the partition, for status output
    fn describe(&self, partition: &str) -> String;
}

/// JSON files under a cache directory, `token-<partition>.json`
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the cache file for a partition
    pub fn path_for(&self, partition: &str) -> PathBuf {
        self.dir.join(format!("token-{}.json", partition))
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, partition: &str) -> Result<Option<TokenRecord>> {
        let path = self.path_for(partition);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)?;
        let record: TokenRecord = serde_json::from_str(&contents)?;
        Ok(Some(record))
    }

    fn save(&self, partition: &str, record: &TokenRecord) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.path_for(partition);
        let contents = serde_json::to_string_pretty(record)?;

        // Rename over the target so a concurrent reader never sees a partial
        // file. The temp file is removed on drop if any step fails.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(contents.as_bytes())?;
        restrict_permissions(tmp.path())?;
        tmp.persist(&path).map_err(|e| e.error)?;

        Ok(())
    }

    fn describe(&self, partition: &str) -> String {
        self.path_for(partition).display().to_string()
    }
}

/// Set file permissions to 600 on Unix systems
fn restrict_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        std::fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Process-local store, nothing touches disk
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    records: Mutex<HashMap<String, TokenRecord>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self, partition: &str) -> Result<Option<TokenRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|e| Error::Other(format!("credential store poisoned: {}", e)))?;
        Ok(records.get(partition).cloned())
    }

    fn save(&self, partition: &str, record: &TokenRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| Error::Other(format!("credential store poisoned: {}", e)))?;
        records.insert(partition.to_string(), record.clone());
        Ok(())
    }

    fn describe(&self, partition: &str) -> String {
        format!("memory:{}", partition)
    }
}
