//! Durable key/value storage behind the session store.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Result;

/// Key holding the bearer token.
pub const CREDENTIAL_KEY: &str = "huggingFaceToken";
/// Key holding the chat transcript.
pub const TRANSCRIPT_KEY: &str = "chatHistory";

/// Small key/value persistence interface.
///
/// Keys are independent: writing one never touches another.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// All keys kept in one JSON object on disk.
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&content)? {
            Value::Object(map) => Ok(map),
            _ => {
                tracing::warn!(path = %self.path.display(), "storage file is not a JSON object, starting fresh");
                Ok(Map::new())
            }
        }
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut all = self.read_all()?;
        all.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write beside the target and rename so a crash never leaves half a file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&Value::Object(all))?)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(key, path = %self.path.display(), "persisted storage key");
        Ok(())
    }
}

/// In-process storage, used by tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value);
        Ok(())
    }
}
