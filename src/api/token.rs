//! Purpose: Read the session token from client-side persisted storage.
//! Exports: `TokenStore`, `MemoryTokenStore`, `FileTokenStore`.
//! Role: Leaf collaborator of the dispatcher; this crate never persists tokens.
//! Invariants: Tokens are re-read on every call; nothing is cached here.
//! Invariants: A missing store (absent file, unknown key) means "no token", not an error.
#![allow(clippy::result_large_err)]

use super::config::default_token_file;
use crate::core::error::{ApiResult, Error, ErrorKind};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait TokenStore: Send + Sync {
    fn token(&self, key: &str) -> ApiResult<Option<String>>;
}

/// In-process store for embedding applications and tests.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, key: impl Into<String>, token: impl Into<String>) -> Self {
        self.set(key, token);
        self
    }

    pub fn set(&self, key: impl Into<String>, token: impl Into<String>) {
        let mut values = self
            .values
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        values.insert(key.into(), token.into());
    }

    pub fn clear(&self, key: &str) {
        let mut values = self
            .values
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        values.remove(key);
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self, key: &str) -> ApiResult<Option<String>> {
        let values = self
            .values
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        Ok(values.get(key).cloned())
    }
}

/// JSON object file mapping keys to token strings, written by the login flow.
#[derive(Clone, Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `~/.fsgate/session.json`.
    pub fn default_location() -> Self {
        Self::new(default_token_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn token(&self, key: &str) -> ApiResult<Option<String>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(Error::new(ErrorKind::Io)
                    .with_message(format!(
                        "failed to read token file {}",
                        self.path.display()
                    ))
                    .with_source(err));
            }
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let entries: Map<String, Value> = serde_json::from_str(&raw).map_err(|err| {
            Error::new(ErrorKind::Parse)
                .with_message(format!(
                    "token file {} is not a json object",
                    self.path.display()
                ))
                .with_source(err)
        })?;
        match entries.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(token)) => Ok(Some(token.clone())),
            Some(_) => Err(Error::new(ErrorKind::Parse)
                .with_message(format!("token entry {key:?} must be a string"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FileTokenStore, MemoryTokenStore, TokenStore};
    use crate::core::error::ErrorKind;

    #[test]
    fn memory_store_set_and_clear() {
        let store = MemoryTokenStore::new().with_token("fstoken", "abc");
        assert_eq!(store.token("fstoken").expect("token"), Some("abc".to_string()));
        store.clear("fstoken");
        assert_eq!(store.token("fstoken").expect("token"), None);
    }

    #[test]
    fn file_store_default_location_uses_fsgate_dir() {
        let store = FileTokenStore::default_location();
        assert!(store.path().ends_with(".fsgate/session.json"));
    }

    #[test]
    fn file_store_missing_file_means_no_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path().join("absent.json"));
        assert_eq!(store.token("fstoken").expect("token"), None);
    }

    #[test]
    fn file_store_rereads_on_every_call() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        let store = FileTokenStore::new(&path);

        std::fs::write(&path, r#"{"fstoken":"first"}"#).expect("write");
        assert_eq!(store.token("fstoken").expect("token"), Some("first".to_string()));

        std::fs::write(&path, r#"{"fstoken":"second","other":"x"}"#).expect("write");
        assert_eq!(store.token("fstoken").expect("token"), Some("second".to_string()));
        assert_eq!(store.token("missing").expect("token"), None);
    }

    #[test]
    fn file_store_rejects_malformed_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").expect("write");
        let err = FileTokenStore::new(&path).token("fstoken").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Parse);

        std::fs::write(&path, r#"{"fstoken":42}"#).expect("write");
        let err = FileTokenStore::new(&path).token("fstoken").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
