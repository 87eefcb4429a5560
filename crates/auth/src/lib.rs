//! Authentication client for the todo service
//!
//! This crate provides user registration and login against the todo
//! backend, and the client-side [`SessionStore`] that keeps the bearer
//! token and user identity across restarts.

mod session;
mod storage;

pub use session::{SessionStatus, SessionStore, DEFAULT_TOKEN_KEY, DEFAULT_USER_KEY};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};

use chrono::{DateTime, Utc};
use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type
#[derive(Error, Debug)]
pub enum AuthError {
    /// Input rejected locally, no request was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// The server did not accept the username/password pair
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The server reports the resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other non-success response
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

/// User identity held by the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
}

/// A freshly registered user, as returned by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Successful login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserInfo,
}

/// Auth client
pub struct AuthClient {
    url: String,
    http_client: Client,
}

impl AuthClient {
    /// Create a new auth client for the service at `url`
    pub fn new(url: &str, http_client: Client) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            http_client,
        }
    }

    /// Register a new user
    ///
    /// The username is checked locally against the server's contract
    /// (3-50 characters, letters/digits/underscore) and sent lowercased;
    /// the password must be at least 8 characters. Violations return
    /// [`AuthError::Validation`] without a request.
    pub async fn register(&self, username: &str, password: &str) -> Result<RegisteredUser, AuthError> {
        let username = validate_username(username)?;
        validate_password(password)?;

        info!("registration attempt for username: {}", username);

        let url = format!("{}/api/auth/register", self.url);
        let payload = serde_json::json!({
            "username": username,
            "password": password,
        });

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = error_detail(&response.text().await.unwrap_or_default());
            warn!("registration failed for username {}: {}", username, status);
            return Err(match status {
                StatusCode::CONFLICT => AuthError::Conflict(message),
                StatusCode::UNPROCESSABLE_ENTITY => AuthError::Validation(message),
                _ => AuthError::Api { status, message },
            });
        }

        let user: RegisteredUser = response.json().await?;
        info!("user registered: {} (id: {})", user.username, user.id);
        Ok(user)
    }

    /// Authenticate a user and obtain a bearer token
    ///
    /// The server treats usernames case-insensitively and answers wrong
    /// username and wrong password identically, so both surface as
    /// [`AuthError::InvalidCredentials`].
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AuthError> {
        info!("login attempt for username: {}", username);

        let url = format!("{}/api/auth/login", self.url);
        let payload = serde_json::json!({
            "username": username,
            "password": password,
        });

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = error_detail(&response.text().await.unwrap_or_default());
            warn!("login failed for username {}: {}", username, status);
            return Err(match status {
                StatusCode::UNAUTHORIZED => AuthError::InvalidCredentials,
                StatusCode::UNPROCESSABLE_ENTITY => AuthError::Validation(message),
                _ => AuthError::Api { status, message },
            });
        }

        let login: LoginResponse = response.json().await?;
        info!("login successful for user_id: {}", login.user.id);
        Ok(login)
    }
}

/// Check the username against the server's registration contract and
/// return it lowercased, the form the server stores
fn validate_username(username: &str) -> Result<String, AuthError> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(AuthError::Validation(
            "username must be 3-50 characters".to_string(),
        ));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AuthError::Validation(
            "username must contain only letters, numbers, and underscores".to_string(),
        ));
    }
    Ok(username.to_lowercase())
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < 8 {
        return Err(AuthError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn login_establishes_token_and_identity() {
        tokio_test::block_on(async {
            let mock_server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/api/auth/login"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "access_token": "test_access_token",
                    "token_type": "bearer",
                    "user": { "id": 1, "username": "alice" }
                })))
                .mount(&mock_server)
                .await;

            let auth = AuthClient::new(&mock_server.uri(), Client::new());

            let result = auth.login("alice", "password123").await;

            assert!(result.is_ok());
            let login = result.unwrap();
            assert_eq!(login.access_token, "test_access_token");
            assert_eq!(login.user.username, "alice");
        });
    }

    #[test]
    fn username_validation() {
        assert!(validate_username("alice").is_ok());
        assert_eq!(validate_username("Alice_99").unwrap(), "alice_99");

        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"x".repeat(51)).is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("dash-ed").is_err());
    }

    #[test]
    fn password_validation() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("1234567").is_err());
    }

    #[test]
    fn error_detail_parsing() {
        assert_eq!(
            error_detail("{\"detail\":\"Username already exists\"}"),
            "Username already exists"
        );
        assert_eq!(error_detail("plain text"), "plain text");
    }
}
