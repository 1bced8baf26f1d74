//! Key-value persistence for client-side state.
//!
//! `read` and `write` never fail from the caller's point of view: a missing,
//! unreadable or corrupt value reads as the caller's default, and a failed
//! write is logged and dropped.

use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::{fmt, fs, io};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, error, warn};

#[derive(Debug)]
pub enum KvError {
    Io(PathBuf, io::Error),
    Unavailable(String),
}

impl fmt::Display for KvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvError::Io(path, err) => write!(f, "storage I/O error at '{}': {}", path.display(), err),
            KvError::Unavailable(reason) => write!(f, "storage unavailable: {reason}"),
        }
    }
}

impl std::error::Error for KvError {}

/// A string-valued key-value backing.
pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, KvError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), KvError>;
}

/// Stores each key as `<dir>/<key>.json`.
///
/// File access is synchronous. Inside a multi-thread tokio runtime it runs
/// under `block_in_place`, so the worker's other tasks move elsewhere while
/// the draft is read or written.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, KvError> {
        let path = self.path(key);
        match run_blocking(|| fs::read_to_string(&path)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(KvError::Io(path, err)),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), KvError> {
        run_blocking(|| {
            fs::create_dir_all(&self.dir).map_err(|err| KvError::Io(self.dir.clone(), err))?;
            let path = self.path(key);
            fs::write(&path, value).map_err(|err| KvError::Io(path, err))
        })
    }
}

fn run_blocking<T>(io: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) => {
            tokio::task::block_in_place(io)
        }
        _ => io(),
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, KvError> {
        let items = self
            .items
            .lock()
            .map_err(|_| KvError::Unavailable("memory storage poisoned".to_string()))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| KvError::Unavailable("memory storage poisoned".to_string()))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Returns the stored value for `key`, or `default` if it is absent or unusable.
pub fn read<T: DeserializeOwned>(storage: &dyn Storage, key: &str, default: T) -> T {
    match storage.get_item(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!("discarding unparsable value for '{key}': {err}");
                default
            }
        },
        Ok(None) => {
            debug!("no stored value for '{key}'");
            default
        }
        Err(err) => {
            error!("failed to read '{key}': {err}");
            default
        }
    }
}

pub fn write<T: Serialize>(storage: &dyn Storage, key: &str, value: &T) {
    let payload = match serde_json::to_string(value) {
        Ok(payload) => payload,
        Err(err) => {
            error!("failed to serialize '{key}': {err}");
            return;
        }
    };

    if let Err(err) = storage.set_item(key, &payload) {
        error!("failed to write '{key}': {err}");
    }
}
