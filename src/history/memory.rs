use async_trait::async_trait;
use log::debug;
use std::collections::{ BTreeMap, HashMap };
use tokio::sync::RwLock;

use crate::history::{ HistoryStore, StorageError, StorageOp };
use crate::models::chat::ChatMessage;

/// Process-local history. Records are lost when the process exits.
#[derive(Default)]
pub struct MemoryHistoryStore {
    users: RwLock<HashMap<String, BTreeMap<i64, ChatMessage>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, message: &ChatMessage) -> Result<(), StorageError> {
        let mut users = self.users.write().await;
        let records = users.entry(message.user_id.clone()).or_default();
        if records.contains_key(&message.created_at) {
            return Err(
                StorageError::new(
                    StorageOp::Append,
                    &message.user_id,
                    Some(message.created_at),
                    "a record with this key already exists"
                )
            );
        }
        records.insert(message.created_at, message.clone());
        Ok(())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<ChatMessage>, StorageError> {
        let users = self.users.read().await;
        Ok(
            users
                .get(user_id)
                .map(|records| records.values().cloned().collect())
                .unwrap_or_default()
        )
    }

    async fn delete_by_key(&self, user_id: &str, created_at: i64) -> Result<(), StorageError> {
        let mut users = self.users.write().await;
        let removed = users
            .get_mut(user_id)
            .and_then(|records| records.remove(&created_at))
            .is_some();
        if !removed {
            debug!("No history record for user '{}' at {}; nothing to delete", user_id, created_at);
        }
        if users.get(user_id).is_some_and(|records| records.is_empty()) {
            users.remove(user_id);
        }
        Ok(())
    }
}
