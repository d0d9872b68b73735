//! Persistence adapters for session state
//!
//! The session context only talks to [`StateStore`]; the CLI uses
//! [`FileStore`], tests use [`MemoryStore`].

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

/// Keys written to persistent storage.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const USER_INFO: &str = "user_info";
    pub const CURRENT_HOSPITAL_ID: &str = "currentHospitalId";
    pub const CURRENT_HOSPITAL: &str = "currentHospital";
}

/// String key-value storage that survives restarts.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> ApiResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ApiResult<()>;
    fn remove(&self, key: &str) -> ApiResult<()>;
    /// Remove every key.
    fn clear(&self) -> ApiResult<()>;
}

/// In-memory store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> ApiResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ApiResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ApiResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> ApiResult<()> {
        self.entries.lock().clear();
        Ok(())
    }
}

/// JSON file in the state directory holding all keys.
///
/// Every mutation rewrites the file through a temp file + rename so a crash
/// never leaves a half-written state behind.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    pub const FILE_NAME: &'static str = "state.json";

    /// Open (or create) the store inside `dir`.
    pub fn open(dir: &Path) -> ApiResult<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| ApiError::Storage(format!("cannot create {}: {}", dir.display(), e)))?;
        let path = dir.join(Self::FILE_NAME);

        let entries = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Ignoring corrupt state file {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(ApiError::Storage(format!("cannot read {}: {}", path.display(), e)))
            }
        };
        debug!("Opened state file {} ({} keys)", path.display(), entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> ApiResult<()> {
        let data = serde_json::to_vec_pretty(entries)
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data)
            .map_err(|e| ApiError::Storage(format!("cannot write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| ApiError::Storage(format!("cannot replace {}: {}", self.path.display(), e)))
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> ApiResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ApiResult<()> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> ApiResult<()> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn clear(&self) -> ApiResult<()> {
        let mut entries = self.entries.lock();
        entries.clear();
        self.persist(&entries)
    }
}
