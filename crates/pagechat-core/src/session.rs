//! Session store: the transcript and credential, mirrored to durable storage.

use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;
use crate::state::{ChatTurn, Transcript};
use crate::storage::{Storage, CREDENTIAL_KEY, TRANSCRIPT_KEY};

/// Every mutation is written to storage before the in-memory copy changes,
/// so a failed write leaves both sides as they were.
pub struct SessionStore {
    storage: Arc<dyn Storage>,
    transcript: Transcript,
    credential: Option<String>,
}

impl SessionStore {
    /// Open a session over `storage`, loading any prior state.
    pub fn open(storage: Arc<dyn Storage>) -> Result<Self> {
        let mut store = Self {
            storage,
            transcript: Transcript::new(),
            credential: None,
        };
        store.load()?;
        Ok(store)
    }

    /// Repopulate in-memory state from storage.
    pub fn load(&mut self) -> Result<&Transcript> {
        self.transcript = match self.storage.get(TRANSCRIPT_KEY)? {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "stored transcript is unreadable, starting empty");
                Transcript::new()
            }),
            None => Transcript::new(),
        };
        self.credential = match self.storage.get(CREDENTIAL_KEY)? {
            Some(Value::String(token)) if !token.is_empty() => Some(token),
            _ => None,
        };
        tracing::debug!(
            turns = self.transcript.len(),
            has_credential = self.credential.is_some(),
            "loaded session"
        );
        Ok(&self.transcript)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn append(&mut self, turn: ChatTurn) -> Result<()> {
        let mut next = self.transcript.clone();
        next.push(turn);
        self.storage.set(TRANSCRIPT_KEY, serde_json::to_value(&next)?)?;
        self.transcript = next;
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.storage
            .set(TRANSCRIPT_KEY, serde_json::to_value(Transcript::new())?)?;
        self.transcript = Transcript::new();
        tracing::info!("cleared chat history");
        Ok(())
    }

    pub fn save_credential(&mut self, token: &str) -> Result<()> {
        self.storage
            .set(CREDENTIAL_KEY, Value::String(token.to_string()))?;
        self.credential = Some(token.to_string());
        tracing::info!("saved API token");
        Ok(())
    }

    pub fn load_credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use crate::state::ChatRole;
    use crate::storage::{FileStorage, MemoryStorage};
    use serde_json::json;

    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<Value>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: Value) -> Result<()> {
            Err(ChatError::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn test_fresh_session_is_empty() {
        let store = SessionStore::open(Arc::new(MemoryStorage::new())).unwrap();
        assert!(store.transcript().is_empty());
        assert!(store.load_credential().is_none());
    }

    #[test]
    fn test_append_then_load_returns_turn_last() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut store = SessionStore::open(storage.clone()).unwrap();
        store.append(ChatTurn::user("one")).unwrap();
        store.append(ChatTurn::assistant("two")).unwrap();

        let transcript = store.load().unwrap();
        assert_eq!(transcript.last(), Some(&ChatTurn::assistant("two")));
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn test_clear_then_reopen_is_empty() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut store = SessionStore::open(storage.clone()).unwrap();
        store.append(ChatTurn::system("ctx")).unwrap();
        store.save_credential("tok").unwrap();
        store.clear().unwrap();

        let reopened = SessionStore::open(storage).unwrap();
        assert!(reopened.transcript().is_empty());
        // Clearing the transcript leaves the credential alone.
        assert_eq!(reopened.load_credential(), Some("tok"));
    }

    #[test]
    fn test_credential_overwrite_keeps_transcript() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut store = SessionStore::open(storage.clone()).unwrap();
        store.append(ChatTurn::user("q")).unwrap();
        store.save_credential("old").unwrap();
        store.save_credential("new").unwrap();

        let reopened = SessionStore::open(storage).unwrap();
        assert_eq!(reopened.load_credential(), Some("new"));
        assert_eq!(reopened.transcript().len(), 1);
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let mut store = SessionStore::open(Arc::new(BrokenStorage)).unwrap();
        assert!(store.append(ChatTurn::user("lost")).is_err());
        assert!(store.transcript().is_empty());
        assert!(store.save_credential("tok").is_err());
        assert!(store.load_credential().is_none());
    }

    #[test]
    fn test_unreadable_transcript_starts_empty() {
        let storage = MemoryStorage::new();
        storage.set(TRANSCRIPT_KEY, json!({"not": "a list"})).unwrap();
        let store = SessionStore::open(Arc::new(storage)).unwrap();
        assert!(store.transcript().is_empty());
    }

    #[test]
    fn test_loads_transcript_written_by_extension_format() {
        let storage = MemoryStorage::new();
        storage
            .set(
                TRANSCRIPT_KEY,
                json!([
                    {"role": "System", "content": "Page Context - Title: t"},
                    {"role": "You", "content": "what is this?"},
                    {"role": "AI", "content": "a page"}
                ]),
            )
            .unwrap();
        let store = SessionStore::open(Arc::new(storage)).unwrap();
        let roles: Vec<ChatRole> = store.transcript().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![ChatRole::System, ChatRole::User, ChatRole::Assistant]);
    }

    #[test]
    fn test_file_backed_session_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        {
            let mut store = SessionStore::open(Arc::new(FileStorage::new(&path))).unwrap();
            store.append(ChatTurn::user("persist me")).unwrap();
            store.save_credential("hf_x").unwrap();
        }
        let store = SessionStore::open(Arc::new(FileStorage::new(&path))).unwrap();
        assert_eq!(store.transcript().last(), Some(&ChatTurn::user("persist me")));
        assert_eq!(store.load_credential(), Some("hf_x"));
    }
}
