//! Rust client library for the todo web service
//!
//! Provides registration, login, and logout against the todo backend,
//! a session store that persists the credential across restarts, and an
//! optimistically reconciled view of the user's to-do items.

pub mod config;
pub mod error;

use reqwest::Client;
use std::sync::Arc;

use crate::config::ClientOptions;
use crate::error::Error;

pub use todo_rust_auth::{
    AuthClient, AuthError, FileStorage, LoginResponse, MemoryStorage, RegisteredUser,
    SessionStatus, SessionStorage, SessionStore, UserInfo,
};
pub use todo_rust_todos::{MutationOutcome, TodoError, TodoItem, TodoList, TodosClient};

/// The main entry point for the todo client
pub struct TodoClient {
    /// The base URL of the todo service
    pub url: String,
    /// HTTP client used for requests
    pub http_client: Client,
    /// Client options
    pub options: ClientOptions,
    session: Arc<SessionStore>,
    auth: AuthClient,
    todos: TodoList,
}

impl TodoClient {
    /// Create a new todo client
    ///
    /// # Example
    ///
    /// ```
    /// use todo_rust::TodoClient;
    ///
    /// let client = TodoClient::new("http://localhost:8000");
    /// ```
    pub fn new(url: &str) -> Self {
        Self::new_with_options(url, ClientOptions::default())
    }

    /// Create a new todo client with custom options
    ///
    /// # Example
    ///
    /// ```
    /// use todo_rust::{config::ClientOptions, TodoClient};
    ///
    /// let options = ClientOptions::default()
    ///     .with_storage_path("/tmp/todo-session.json".into());
    /// let client = TodoClient::new_with_options("http://localhost:8000", options);
    /// ```
    pub fn new_with_options(url: &str, options: ClientOptions) -> Self {
        let storage: Box<dyn SessionStorage> = match (&options.persist_session, &options.storage_path)
        {
            (true, Some(path)) => Box::new(FileStorage::new(path)),
            _ => Box::new(MemoryStorage::new()),
        };
        Self::new_with_storage(url, options, storage)
    }

    /// Create a new todo client over an injected session storage backend
    pub fn new_with_storage(
        url: &str,
        options: ClientOptions,
        storage: Box<dyn SessionStorage>,
    ) -> Self {
        let url = url.trim_end_matches('/').to_string();

        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().unwrap_or_default();

        let session = Arc::new(SessionStore::with_keys(
            storage,
            &options.token_key,
            &options.user_key,
        ));
        let auth = AuthClient::new(&url, http_client.clone());
        let todos = TodoList::new(TodosClient::new(&url, http_client.clone(), session.clone()));

        Self {
            url,
            http_client,
            options,
            session,
            auth,
            todos,
        }
    }

    /// The auth client for registration and login
    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    /// The session store holding the current credential and identity
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// The reconciled view of the current user's to-do items
    pub fn todos(&self) -> &TodoList {
        &self.todos
    }

    /// Register a new user account
    pub async fn sign_up(&self, username: &str, password: &str) -> Result<RegisteredUser, Error> {
        let user = self.auth.register(username, password).await?;
        Ok(user)
    }

    /// Log in and establish the session
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<UserInfo, Error> {
        let login = self.auth.login(username, password).await?;
        self.session.establish(&login.access_token, login.user.clone());
        Ok(login.user)
    }

    /// Register a new user and immediately log them in
    pub async fn register_and_sign_in(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserInfo, Error> {
        self.auth.register(username, password).await?;
        self.sign_in(username, password).await
    }

    /// Log out, dropping the session and the local collection view
    ///
    /// The backend holds no session state; logging out is a client-side
    /// operation.
    pub fn sign_out(&self) {
        self.session.clear();
        self.todos.clear();
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::ClientOptions;
    pub use crate::error::Error;
    pub use crate::{MutationOutcome, SessionStatus, TodoClient};
}
