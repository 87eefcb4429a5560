//! Error handling for the todo client

use thiserror::Error;

use todo_rust_auth::AuthError;
use todo_rust_todos::TodoError;

/// Unified error type for the todo client
#[derive(Error, Debug)]
pub enum Error {
    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// To-do item errors
    #[error("Todo error: {0}")]
    Todo(#[from] TodoError),
}
