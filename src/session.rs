//! # session
//!
//! The explicit login session: the bearer token, the header derived from it,
//! and the small key/value file it is persisted in.
//!
//! ## Lifecycle
//!
//! ```text
//! init (load persisted "token")
//!   │  none stored ──▶ Anonymous ──login──▶ Active
//!   │  token stored ─────────────────────▶ Active ──logout──▶ Cleared
//! ```
//!
//! Every component that talks to the API gets the same [`SharedSession`]
//! instead of reaching for ambient global state.

use std::collections::BTreeMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::AdminError;

/// Storage key the token lives under.
pub const TOKEN_KEY: &str = "token";

// ─── TokenStore ───────────────────────────────────────────────────────────────

/// A JSON object on disk used like browser local storage: string keys,
/// string values.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, AdminError> {
        Ok(self.read_all()?.remove(key))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), AdminError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    pub fn remove(&self, key: &str) -> Result<(), AdminError> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, AdminError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                AdminError::Internal(anyhow!(
                    "corrupt storage file {}: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), AdminError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(entries)
            .map_err(|e| AdminError::Internal(anyhow!("storage serialization failed: {e}")))?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

// ─── Session ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing persisted; every API call except login is refused.
    Anonymous,
    /// A token is loaded and attached to requests.
    Active,
    /// The operator logged out during this run.
    Cleared,
}

pub struct Session {
    store: TokenStore,
    token: Option<String>,
    state: SessionState,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("state", &self.state)
            .finish()
    }
}

impl Session {
    /// Loads whatever token was persisted by a previous login.
    pub fn init(store: TokenStore) -> Result<Self, AdminError> {
        let token = store.get(TOKEN_KEY)?.filter(|t| !t.trim().is_empty());
        let state = if token.is_some() {
            SessionState::Active
        } else {
            SessionState::Anonymous
        };
        debug!(path = %store.path().display(), ?state, "session initialised");
        Ok(Self { store, token, state })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// `Authorization` header value, `Bearer <token>`.
    pub fn authorization(&self) -> Result<String, AdminError> {
        match (&self.state, &self.token) {
            (SessionState::Active, Some(token)) => Ok(format!("Bearer {token}")),
            _ => Err(AdminError::Auth("no login token stored".into())),
        }
    }

    /// Stores a freshly issued token and makes the session active.
    pub fn activate(&mut self, token: impl Into<String>) -> Result<(), AdminError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(AdminError::Auth("login returned an empty token".into()));
        }
        self.store.set(TOKEN_KEY, &token)?;
        self.token = Some(token);
        self.state = SessionState::Active;
        info!("🔑 Session active");
        Ok(())
    }

    /// Logout: forget the token in memory and on disk.
    pub fn clear(&mut self) -> Result<(), AdminError> {
        self.store.remove(TOKEN_KEY)?;
        self.token = None;
        self.state = SessionState::Cleared;
        info!("🔒 Session cleared");
        Ok(())
    }
}

/// Session handle shared by every API-facing component.
pub type SharedSession = Arc<RwLock<Session>>;

pub fn shared(session: Session) -> SharedSession {
    Arc::new(RwLock::new(session))
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_means_anonymous() {
        let dir = tempdir().unwrap();
        let session = Session::init(TokenStore::new(dir.path().join("storage.json"))).unwrap();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(session.authorization().unwrap_err().is_auth());
    }

    #[test]
    fn test_login_persists_and_logout_clears() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let mut session = Session::init(TokenStore::new(&path)).unwrap();
        session.activate("abc.def.ghi").unwrap();
        assert_eq!(session.authorization().unwrap(), "Bearer abc.def.ghi");

        let reloaded = Session::init(TokenStore::new(&path)).unwrap();
        assert_eq!(reloaded.state(), SessionState::Active);
        assert_eq!(reloaded.token(), Some("abc.def.ghi"));

        let mut reloaded = reloaded;
        reloaded.clear().unwrap();
        assert_eq!(reloaded.state(), SessionState::Cleared);
        assert!(reloaded.authorization().is_err());
        assert_eq!(TokenStore::new(&path).get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_other_keys_survive_logout() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("storage.json"));
        store.set("theme", "dark").unwrap();

        let mut session = Session::init(store.clone()).unwrap();
        session.activate("t0k3n").unwrap();
        session.clear().unwrap();

        assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let dir = tempdir().unwrap();
        let mut session = Session::init(TokenStore::new(dir.path().join("s.json"))).unwrap();
        session.activate("super-secret").unwrap();
        assert!(!format!("{session:?}").contains("super-secret"));
    }
}
