//! Credential storage for the access/refresh token pair.
//!
//! The gateway and the auth client only see the `CredentialStore` trait. Two
//! backends exist: an in-memory store (tests, short-lived processes) and a
//! file-backed store that survives restarts and is visible to every process
//! sharing the same file.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A complete access/refresh token pair as issued by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Holder of the current token pair.
///
/// Implementations never fail: when no storage is available reads return
/// `None` and writes are no-ops.
pub trait CredentialStore: Send + Sync {
    fn access_token(&self) -> Option<String>;

    fn refresh_token(&self) -> Option<String>;

    fn set_access_token(&self, token: &str);

    fn set_refresh_token(&self, token: &str);

    /// Replaces both tokens in a single write.
    fn set_tokens(&self, pair: &CredentialPair);

    fn clear_tokens(&self);

    fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }
}

/// On-disk / in-memory layout. Either field may be missing when another
/// writer left the store half-cleared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl From<&CredentialPair> for StoredTokens {
    fn from(pair: &CredentialPair) -> Self {
        StoredTokens {
            access_token: Some(pair.access_token.clone()),
            refresh_token: Some(pair.refresh_token.clone()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tokens: Mutex<StoredTokens>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(pair: &CredentialPair) -> Self {
        Self {
            tokens: Mutex::new(StoredTokens::from(pair)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoredTokens> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn access_token(&self) -> Option<String> {
        self.lock().access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.lock().refresh_token.clone()
    }

    fn set_access_token(&self, token: &str) {
        self.lock().access_token = Some(token.to_string());
    }

    fn set_refresh_token(&self, token: &str) {
        self.lock().refresh_token = Some(token.to_string());
    }

    fn set_tokens(&self, pair: &CredentialPair) {
        *self.lock() = StoredTokens::from(pair);
    }

    fn clear_tokens(&self) {
        *self.lock() = StoredTokens::default();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// File-backed store
// ────────────────────────────────────────────────────────────────────────────

/// Token pair persisted as JSON at a fixed path.
///
/// The file is re-read on every access so a pair written or cleared by
/// another process is picked up immediately. Writes go to a sibling temp
/// file and are renamed into place so readers never see a torn file.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            write_lock: Mutex::new(()),
        }
    }

    /// A store with no backing storage: every read is `None`, every write a no-op.
    pub fn unavailable() -> Self {
        Self {
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_optional_path(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => Self::new(path),
            None => Self::unavailable(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn load(&self) -> StoredTokens {
        let Some(path) = &self.path else {
            return StoredTokens::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!("Ignoring unreadable credentials file {}: {e}", path.display());
                StoredTokens::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoredTokens::default(),
            Err(e) => {
                warn!("Failed to read credentials file {}: {e}", path.display());
                StoredTokens::default()
            }
        }
    }

    fn update(&self, apply: impl FnOnce(&mut StoredTokens)) {
        let Some(path) = &self.path else {
            debug!("No credential storage available; skipping write");
            return;
        };

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut tokens = self.load();
        apply(&mut tokens);

        let result = if tokens.access_token.is_none() && tokens.refresh_token.is_none() {
            remove_if_present(path)
        } else {
            write_tokens(path, &tokens)
        };

        if let Err(e) = result {
            warn!("Failed to update credentials file {}: {e}", path.display());
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn access_token(&self) -> Option<String> {
        self.load().access_token
    }

    fn refresh_token(&self) -> Option<String> {
        self.load().refresh_token
    }

    fn set_access_token(&self, token: &str) {
        self.update(|tokens| tokens.access_token = Some(token.to_string()));
    }

    fn set_refresh_token(&self, token: &str) {
        self.update(|tokens| tokens.refresh_token = Some(token.to_string()));
    }

    fn set_tokens(&self, pair: &CredentialPair) {
        self.update(|tokens| *tokens = StoredTokens::from(pair));
    }

    fn clear_tokens(&self) {
        self.update(|tokens| *tokens = StoredTokens::default());
    }
}

fn write_tokens(path: &Path, tokens: &StoredTokens) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = serde_json::to_string_pretty(tokens).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents)?;

    // Owner read/write only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp, path)
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(access: &str, refresh: &str) -> CredentialPair {
        CredentialPair {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        }
    }

    #[test]
    fn test_memory_store_set_and_clear() {
        let store = MemoryCredentialStore::new();
        assert!(!store.is_authenticated());

        store.set_tokens(&pair("a1", "r1"));
        assert_eq!(store.access_token().as_deref(), Some("a1"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));
        assert!(store.is_authenticated());

        store.clear_tokens();
        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
    }

    #[test]
    fn test_is_authenticated_tracks_access_token_only() {
        let store = MemoryCredentialStore::new();
        store.set_refresh_token("r1");
        assert!(!store.is_authenticated());
        store.set_access_token("a1");
        assert!(store.is_authenticated());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        FileCredentialStore::new(&path).set_tokens(&pair("a1", "r1"));

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.access_token().as_deref(), Some("a1"));
        assert_eq!(reopened.refresh_token().as_deref(), Some("r1"));
    }

    #[test]
    fn test_file_store_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileCredentialStore::new(&path);

        store.set_tokens(&pair("a1", "r1"));
        assert!(path.exists());

        store.clear_tokens();
        assert!(!path.exists());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_file_store_sees_writes_from_other_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let first = FileCredentialStore::new(&path);
        let second = FileCredentialStore::new(&path);

        first.set_tokens(&pair("a1", "r1"));
        second.set_access_token("a2");

        assert_eq!(first.access_token().as_deref(), Some("a2"));
        assert_eq!(first.refresh_token().as_deref(), Some("r1"));
    }

    #[test]
    fn test_file_store_ignores_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileCredentialStore::new(&path);
        assert!(store.access_token().is_none());

        store.set_tokens(&pair("a1", "r1"));
        assert_eq!(store.access_token().as_deref(), Some("a1"));
    }

    #[test]
    fn test_unavailable_store_is_a_no_op() {
        let store = FileCredentialStore::unavailable();
        store.set_tokens(&pair("a1", "r1"));
        store.set_access_token("a2");
        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
        store.clear_tokens();
        assert!(store.path().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        FileCredentialStore::new(&path).set_tokens(&pair("a1", "r1"));

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
