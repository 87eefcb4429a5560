//! Configuration options for the todo client

use std::path::PathBuf;
use std::time::Duration;

use todo_rust_auth::{DEFAULT_TOKEN_KEY, DEFAULT_USER_KEY};

/// Configuration options for the todo client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Whether to persist the session across restarts
    pub persist_session: bool,

    /// Where to persist the session; in-memory storage is used when unset
    /// (or when `persist_session` is off)
    pub storage_path: Option<PathBuf>,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Storage slot for the bearer token
    pub token_key: String,

    /// Storage slot for the serialized user identity
    pub user_key: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            persist_session: true,
            storage_path: None,
            request_timeout: Some(Duration::from_secs(30)),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            user_key: DEFAULT_USER_KEY.to_string(),
        }
    }
}

impl ClientOptions {
    /// Set whether to persist the session
    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    /// Set the session storage file path
    pub fn with_storage_path(mut self, value: PathBuf) -> Self {
        self.storage_path = Some(value);
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the storage slot names for the token and the identity
    pub fn with_storage_keys(mut self, token_key: &str, user_key: &str) -> Self {
        self.token_key = token_key.to_string();
        self.user_key = user_key.to_string();
        self
    }
}
