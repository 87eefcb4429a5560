//! Client-side session state
//!
//! The [`SessionStore`] is the single authority for "who is the current
//! user, and are they authenticated". It keeps the bearer token and the
//! user identity in memory, mirrors both into persistent storage so a
//! session survives restarts, and derives the authentication status from
//! what it currently holds.
//!
//! The token and the identity are always written and removed together;
//! no reader ever observes one without the other.

use log::{info, warn};
use std::sync::RwLock;

use crate::storage::SessionStorage;
use crate::UserInfo;

/// Default storage slot for the bearer token
pub const DEFAULT_TOKEN_KEY: &str = "todo.auth.token";

/// Default storage slot for the serialized user identity
pub const DEFAULT_USER_KEY: &str = "todo.auth.user";

/// Authentication status derived from the session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// The initial restoration from storage has not completed yet
    Loading,
    /// No credential is held
    Anonymous,
    /// Both a credential and an identity are held
    Authenticated,
}

struct SessionState {
    token: Option<String>,
    user: Option<UserInfo>,
    loading: bool,
}

/// Holder of the current credential and identity
///
/// Created empty in the `Loading` state; [`SessionStore::restore`] moves it
/// to `Anonymous` or `Authenticated` exactly once, after which only
/// [`SessionStore::establish`] and [`SessionStore::clear`] change the state.
pub struct SessionStore {
    storage: Box<dyn SessionStorage>,
    token_key: String,
    user_key: String,
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Create a session store over the given storage, using the default
    /// slot names
    pub fn new(storage: Box<dyn SessionStorage>) -> Self {
        Self::with_keys(storage, DEFAULT_TOKEN_KEY, DEFAULT_USER_KEY)
    }

    /// Create a session store with custom storage slot names
    pub fn with_keys(storage: Box<dyn SessionStorage>, token_key: &str, user_key: &str) -> Self {
        Self {
            storage,
            token_key: token_key.to_string(),
            user_key: user_key.to_string(),
            state: RwLock::new(SessionState {
                token: None,
                user: None,
                loading: true,
            }),
        }
    }

    /// Adopt a previously persisted session, if one exists and is well-formed
    ///
    /// Malformed or partial persisted data is discarded and both slots are
    /// wiped; the session stays anonymous and no error reaches the caller.
    /// Completes the `Loading` state exactly once; later calls are no-ops.
    pub fn restore(&self) {
        let mut state = self.state.write().unwrap();
        if !state.loading {
            return;
        }

        let token = self.storage.get(&self.token_key);
        let raw_user = self.storage.get(&self.user_key);

        match (token, raw_user) {
            (Some(token), Some(raw_user)) => match serde_json::from_str::<UserInfo>(&raw_user) {
                Ok(user) => {
                    info!("session restored for user_id: {}", user.id);
                    state.token = Some(token);
                    state.user = Some(user);
                }
                Err(err) => {
                    warn!("discarding malformed persisted session: {}", err);
                    self.storage.remove(&self.token_key);
                    self.storage.remove(&self.user_key);
                }
            },
            (None, None) => {}
            _ => {
                // One slot without the other means a past write was torn;
                // treat the whole session as unusable.
                warn!("discarding partial persisted session");
                self.storage.remove(&self.token_key);
                self.storage.remove(&self.user_key);
            }
        }

        state.loading = false;
    }

    /// Adopt a freshly issued credential and identity
    ///
    /// Persists both slots first, then updates the in-memory state. Any
    /// prior session is overwritten. Inputs are taken as already validated
    /// by the login flow.
    pub fn establish(&self, token: &str, user: UserInfo) {
        if let Ok(raw_user) = serde_json::to_string(&user) {
            self.storage.set(&self.token_key, token);
            self.storage.set(&self.user_key, &raw_user);
        }

        info!("session established for user_id: {}", user.id);

        let mut state = self.state.write().unwrap();
        state.token = Some(token.to_string());
        state.user = Some(user);
        state.loading = false;
    }

    /// Drop the session, both persisted and in-memory
    ///
    /// Called on explicit logout and when the server rejects the current
    /// credential. Idempotent: clearing an already-clear session does
    /// nothing.
    pub fn clear(&self) {
        self.storage.remove(&self.token_key);
        self.storage.remove(&self.user_key);

        let mut state = self.state.write().unwrap();
        if state.token.is_some() {
            info!("session cleared");
        }
        state.token = None;
        state.user = None;
        state.loading = false;
    }

    /// Derive the current authentication status
    pub fn status(&self) -> SessionStatus {
        let state = self.state.read().unwrap();
        if state.loading {
            SessionStatus::Loading
        } else if state.token.is_some() && state.user.is_some() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Anonymous
        }
    }

    /// Whether a credential and identity are currently held
    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    /// The current bearer token, if authenticated
    pub fn token(&self) -> Option<String> {
        let state = self.state.read().unwrap();
        state.token.clone()
    }

    /// The current user identity, if authenticated
    pub fn current_user(&self) -> Option<UserInfo> {
        let state = self.state.read().unwrap();
        state.user.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn store_with(entries: &[(&str, &str)]) -> SessionStore {
        let storage = MemoryStorage::new();
        for (key, value) in entries {
            storage.set(key, value);
        }
        SessionStore::new(Box::new(storage))
    }

    #[test]
    fn starts_loading_until_restore_completes() {
        let store = store_with(&[]);
        assert_eq!(store.status(), SessionStatus::Loading);

        store.restore();
        assert_eq!(store.status(), SessionStatus::Anonymous);
    }

    #[test]
    fn restore_adopts_persisted_session() {
        let store = store_with(&[
            (DEFAULT_TOKEN_KEY, "t1"),
            (DEFAULT_USER_KEY, "{\"id\":1,\"username\":\"alice\"}"),
        ]);

        store.restore();

        assert_eq!(store.status(), SessionStatus::Authenticated);
        assert_eq!(store.token(), Some("t1".to_string()));
        assert_eq!(store.current_user().unwrap().username, "alice");
    }

    #[test]
    fn restore_discards_malformed_identity_and_wipes_storage() {
        let storage = std::sync::Arc::new(MemoryStorage::new());
        storage.set(DEFAULT_TOKEN_KEY, "t1");
        storage.set(DEFAULT_USER_KEY, "not json");
        let store = SessionStore::new(Box::new(storage.clone()));

        store.restore();

        assert_eq!(store.status(), SessionStatus::Anonymous);
        // Both slots must be gone, not just the bad one.
        assert_eq!(storage.get(DEFAULT_TOKEN_KEY), None);
        assert_eq!(storage.get(DEFAULT_USER_KEY), None);
    }

    #[test]
    fn restore_discards_partial_session() {
        let store = store_with(&[(DEFAULT_TOKEN_KEY, "t1")]);

        store.restore();

        assert_eq!(store.status(), SessionStatus::Anonymous);
        assert_eq!(store.token(), None);
    }

    #[test]
    fn restore_runs_only_once() {
        let store = store_with(&[]);
        store.restore();

        store.establish(
            "t1",
            UserInfo {
                id: 1,
                username: "alice".to_string(),
            },
        );

        // A stray second restore must not undo the established session.
        store.restore();
        assert_eq!(store.status(), SessionStatus::Authenticated);
    }

    #[test]
    fn establish_is_immediately_authenticated() {
        let store = store_with(&[]);

        store.establish(
            "t1",
            UserInfo {
                id: 1,
                username: "alice".to_string(),
            },
        );

        assert_eq!(store.status(), SessionStatus::Authenticated);
        assert_eq!(store.token(), Some("t1".to_string()));
    }

    #[test]
    fn establish_replaces_existing_session() {
        let store = store_with(&[]);
        store.restore();

        store.establish(
            "t1",
            UserInfo {
                id: 1,
                username: "alice".to_string(),
            },
        );
        store.establish(
            "t2",
            UserInfo {
                id: 2,
                username: "bob".to_string(),
            },
        );

        assert_eq!(store.token(), Some("t2".to_string()));
        assert_eq!(store.current_user().unwrap().id, 2);
    }

    #[test]
    fn clear_is_idempotent() {
        let store = store_with(&[]);
        store.restore();

        store.establish(
            "t1",
            UserInfo {
                id: 1,
                username: "alice".to_string(),
            },
        );
        store.clear();
        assert_eq!(store.status(), SessionStatus::Anonymous);
        assert_eq!(store.token(), None);
        assert_eq!(store.current_user(), None);

        store.clear();
        assert_eq!(store.status(), SessionStatus::Anonymous);
    }

    #[test]
    fn establish_persists_and_clear_removes_slots() {
        let storage = std::sync::Arc::new(MemoryStorage::new());
        let store = SessionStore::new(Box::new(storage.clone()));
        store.restore();

        store.establish(
            "t1",
            UserInfo {
                id: 1,
                username: "alice".to_string(),
            },
        );

        assert_eq!(storage.get(DEFAULT_TOKEN_KEY), Some("t1".to_string()));
        let raw_user = storage.get(DEFAULT_USER_KEY).unwrap();
        let user: UserInfo = serde_json::from_str(&raw_user).unwrap();
        assert_eq!(user.id, 1);

        store.clear();
        assert_eq!(storage.get(DEFAULT_TOKEN_KEY), None);
        assert_eq!(storage.get(DEFAULT_USER_KEY), None);
    }
}
