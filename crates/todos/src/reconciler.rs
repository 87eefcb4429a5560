//! Optimistic list reconciler
//!
//! [`TodoList`] keeps the user's items in memory and applies completion
//! toggles and deletions locally before the server confirms them, so the
//! caller sees the change immediately. If the request then fails, the
//! change is rolled back to the exact state captured when it was applied,
//! and the outcome reports which path was taken.
//!
//! Creation is deliberately not optimistic: a new item needs its
//! server-assigned id before it can enter the collection.
//!
//! Concurrent mutations on the same item are not linearized. Each request
//! rolls back to the value captured immediately before that request was
//! issued, and the last local write wins visually. This mirrors what a
//! user double-clicking faster than the network can produce, and is a
//! documented limitation rather than a guarantee.

use log::{info, warn};
use std::sync::RwLock;

use crate::{TodoError, TodoItem, TodosClient};

/// Maximum length of a to-do item's text, in characters
pub const MAX_TEXT_LEN: usize = 500;

/// How a mutation against the local collection resolved
#[derive(Debug)]
pub enum MutationOutcome {
    /// The optimistic change stands, confirmed by the server
    Applied,
    /// The server failed to apply the change; the local collection was
    /// restored to its pre-mutation state
    RolledBack(TodoError),
    /// The targeted item is not in the collection; nothing was sent
    Noop,
}

impl MutationOutcome {
    /// Whether the mutation was applied and confirmed
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied)
    }
}

/// The current user's to-do items, reconciled against the server
pub struct TodoList {
    api: TodosClient,
    items: RwLock<Vec<TodoItem>>,
}

impl TodoList {
    /// Create an empty list over the given API client
    pub fn new(api: TodosClient) -> Self {
        Self {
            api,
            items: RwLock::new(Vec::new()),
        }
    }

    /// A copy of the current collection, newest first, for rendering
    pub fn snapshot(&self) -> Vec<TodoItem> {
        let items = self.items.read().unwrap();
        items.clone()
    }

    /// Number of items currently held
    pub fn len(&self) -> usize {
        let items = self.items.read().unwrap();
        items.len()
    }

    /// Whether the collection is currently empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the local collection without touching the server
    ///
    /// Called when the owning session ends; the items belong to that
    /// session's user and must not outlive it.
    pub fn clear(&self) {
        let mut items = self.items.write().unwrap();
        items.clear();
    }

    /// Replace the whole collection with the server's current list
    ///
    /// On failure the collection keeps its previous contents; there is no
    /// partial or merged state.
    pub async fn load(&self) -> Result<(), TodoError> {
        let fetched = self.api.list().await?;
        let mut items = self.items.write().unwrap();
        *items = fetched;
        Ok(())
    }

    /// Create a new item and insert it at the front once the server
    /// confirms it
    ///
    /// The text is trimmed first; empty or over-long text is rejected
    /// locally without a request. Not optimistic: the collection changes
    /// only after the server assigns the item its id.
    pub async fn create(&self, text: &str) -> Result<TodoItem, TodoError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TodoError::Validation(
                "to-do text must not be empty".to_string(),
            ));
        }
        if text.chars().count() > MAX_TEXT_LEN {
            return Err(TodoError::Validation(format!(
                "to-do text must be at most {} characters",
                MAX_TEXT_LEN
            )));
        }

        let item = self.api.create(text).await?;

        let mut items = self.items.write().unwrap();
        items.insert(0, item.clone());
        Ok(item)
    }

    /// Flip the completion flag of the item with the given id
    ///
    /// The flip is applied locally before the request is sent. On success
    /// the local state already matches what was requested, so the server's
    /// echo is not consulted. On failure the flag is restored to its
    /// pre-flip value. An id not in the collection is a no-op.
    pub async fn toggle_completion(&self, id: i64) -> MutationOutcome {
        // Capture the pre-flip value under the lock; this is the value the
        // rollback restores, regardless of what happens in between.
        let previous = {
            let mut items = self.items.write().unwrap();
            match items.iter_mut().find(|item| item.id == id) {
                Some(item) => {
                    let previous = item.completed;
                    item.completed = !previous;
                    previous
                }
                None => return MutationOutcome::Noop,
            }
        };

        match self.api.set_completion(id, !previous).await {
            Ok(_) => MutationOutcome::Applied,
            Err(err) => {
                warn!("toggle of todo {} failed, rolling back: {}", id, err);
                let mut items = self.items.write().unwrap();
                if let Some(item) = items.iter_mut().find(|item| item.id == id) {
                    item.completed = previous;
                }
                MutationOutcome::RolledBack(err)
            }
        }
    }

    /// Remove the item with the given id
    ///
    /// The item is removed locally before the request is sent, recording
    /// its value and position. On failure it is reinserted at its original
    /// index so the ordering is preserved. An id not in the collection is
    /// a no-op.
    pub async fn delete(&self, id: i64) -> MutationOutcome {
        let (index, removed) = {
            let mut items = self.items.write().unwrap();
            match items.iter().position(|item| item.id == id) {
                Some(index) => (index, items.remove(index)),
                None => return MutationOutcome::Noop,
            }
        };

        match self.api.remove(id).await {
            Ok(()) => {
                info!("todo {} removed from collection", id);
                MutationOutcome::Applied
            }
            Err(err) => {
                warn!("delete of todo {} failed, rolling back: {}", id, err);
                let mut items = self.items.write().unwrap();
                // The collection may have shrunk while the request was in
                // flight; clamp so the reinsertion cannot panic.
                let index = index.min(items.len());
                items.insert(index, removed);
                MutationOutcome::RolledBack(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;
    use std::sync::Arc;
    use todo_rust_auth::{MemoryStorage, SessionStore};

    #[test]
    fn outcome_predicates() {
        assert!(MutationOutcome::Applied.is_applied());
        assert!(!MutationOutcome::Noop.is_applied());
        assert!(!MutationOutcome::RolledBack(TodoError::NotFound).is_applied());
    }

    #[test]
    fn mutations_on_empty_collection_are_noops() {
        tokio_test::block_on(async {
            // Unknown ids resolve locally; no server is needed at all.
            let session = Arc::new(SessionStore::new(Box::new(MemoryStorage::new())));
            session.restore();
            let list = TodoList::new(TodosClient::new(
                "http://localhost:0",
                Client::new(),
                session,
            ));

            assert!(matches!(
                list.toggle_completion(42).await,
                MutationOutcome::Noop
            ));
            assert!(matches!(list.delete(42).await, MutationOutcome::Noop));
            assert!(list.is_empty());
        });
    }
}
