use chrono::Utc;
use log::info;
use std::sync::atomic::{ AtomicI64, Ordering };
use std::sync::Arc;

use crate::history::{ HistoryStore, StorageError };
use crate::llm::adapter::InferenceAdapter;
use crate::models::chat::ChatMessage;

/// Unix-millisecond timestamps, strictly increasing within this process.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: AtomicI64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_millis(&self) -> i64 {
        let wall = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = wall.max(prev + 1);
            match self.last.compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Ties the inference adapter to the history store for one authenticated user at a time.
pub struct ConversationService {
    adapter: InferenceAdapter,
    store: Arc<dyn HistoryStore>,
    clock: MonotonicClock,
}

impl ConversationService {
    pub fn new(adapter: InferenceAdapter, store: Arc<dyn HistoryStore>) -> Self {
        Self {
            adapter,
            store,
            clock: MonotonicClock::new(),
        }
    }

    /// Obtains a completion and records it, fallback text included, before returning it.
    pub async fn answer(&self, user_id: &str, prompt: &str) -> Result<String, StorageError> {
        let response = self.adapter.complete(prompt).await;
        let message = ChatMessage::new(user_id, self.clock.now_millis(), prompt, response);
        self.store.append(&message).await?;
        info!("Recorded answer for user '{}' at {}", user_id, message.created_at);
        Ok(message.response)
    }

    pub async fn history(&self, user_id: &str) -> Result<Vec<ChatMessage>, StorageError> {
        self.store.list_by_user(user_id).await
    }

    pub async fn delete_entry(&self, user_id: &str, created_at: i64) -> Result<(), StorageError> {
        self.store.delete_by_key(user_id, created_at).await?;
        info!("Deleted history entry for user '{}' at {}", user_id, created_at);
        Ok(())
    }
}
