//! To-do items client for the todo service
//!
//! [`TodosClient`] speaks the server's CRUD API with the session's bearer
//! token; [`TodoList`] layers the optimistic list reconciler on top of it.

mod reconciler;

pub use reconciler::{MutationOutcome, TodoList, MAX_TEXT_LEN};

use chrono::{DateTime, Utc};
use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use todo_rust_auth::SessionStore;

/// Error type
#[derive(Error, Debug)]
pub enum TodoError {
    /// Input rejected locally, no request was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// No session is held, so no authenticated request can be made
    #[error("Missing session")]
    MissingSession,

    /// The server rejected the current credential; the session has been
    /// cleared
    #[error("Authentication rejected")]
    AuthRejected,

    /// The server no longer has (or never had) the targeted item
    #[error("Todo item not found")]
    NotFound,

    /// The server reports the resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other non-success response; includes transient server failures
    #[error("API error: {message} (Status: {status})")]
    Api {
        status: StatusCode,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single to-do item as returned by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Server-assigned identifier, stable for the item's lifetime
    pub id: i64,
    /// Owner of the item; carried but never interpreted by the client
    pub user_id: i64,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Client for the to-do items API
///
/// Every request carries the bearer token from the shared [`SessionStore`].
/// A 401 from any endpoint means the credential was rejected; the session
/// is cleared before the error is surfaced.
pub struct TodosClient {
    url: String,
    http_client: Client,
    session: Arc<SessionStore>,
}

impl TodosClient {
    /// Create a new todos client for the service at `url`
    pub fn new(url: &str, http_client: Client, session: Arc<SessionStore>) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            http_client,
            session,
        }
    }

    /// The session store this client authenticates against
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Fetch all items for the current user, newest first
    pub async fn list(&self) -> Result<Vec<TodoItem>, TodoError> {
        let token = self.bearer_token()?;
        let url = format!("{}/api/todos/", self.url);

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response).await);
        }

        let items: Vec<TodoItem> = response.json().await?;
        info!("fetched {} todos", items.len());
        Ok(items)
    }

    /// Create a new item; the server assigns its id and timestamp
    pub async fn create(&self, text: &str) -> Result<TodoItem, TodoError> {
        let token = self.bearer_token()?;
        let url = format!("{}/api/todos/", self.url);
        let payload = serde_json::json!({ "text": text });

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response).await);
        }

        let item: TodoItem = response.json().await?;
        info!("todo created: id={}", item.id);
        Ok(item)
    }

    /// Set the completion flag of an existing item
    pub async fn set_completion(&self, id: i64, completed: bool) -> Result<TodoItem, TodoError> {
        let token = self.bearer_token()?;
        let url = format!("{}/api/todos/{}", self.url, id);
        let payload = serde_json::json!({ "completed": completed });

        let response = self
            .http_client
            .patch(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response).await);
        }

        let item: TodoItem = response.json().await?;
        info!("todo updated: id={}, completed={}", item.id, item.completed);
        Ok(item)
    }

    /// Delete an item permanently
    pub async fn remove(&self, id: i64) -> Result<(), TodoError> {
        let token = self.bearer_token()?;
        let url = format!("{}/api/todos/{}", self.url, id);

        let response = self
            .http_client
            .delete(&url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response).await);
        }

        info!("todo deleted: id={}", id);
        Ok(())
    }

    fn bearer_token(&self) -> Result<String, TodoError> {
        self.session.token().ok_or(TodoError::MissingSession)
    }

    async fn error_from_response(&self, response: reqwest::Response) -> TodoError {
        let status = response.status();
        let message = error_detail(&response.text().await.unwrap_or_default());

        match status {
            StatusCode::UNAUTHORIZED => {
                // The credential is no longer accepted; drop the session so
                // the application falls back to its anonymous entry point.
                warn!("credential rejected by server, clearing session");
                self.session.clear();
                TodoError::AuthRejected
            }
            // 403 means the item belongs to someone else; from this
            // client's point of view it does not exist.
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => TodoError::NotFound,
            StatusCode::CONFLICT => TodoError::Conflict(message),
            StatusCode::UNPROCESSABLE_ENTITY => TodoError::Validation(message),
            _ => {
                warn!("todos request failed: {} {}", status, message);
                TodoError::Api { status, message }
            }
        }
    }
}

/// Pull the human-readable `detail` field out of an error body, falling
/// back to the raw body
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value.get("detail").map(|detail| match detail {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        })
        .unwrap_or_else(|| body.to_string())
}
