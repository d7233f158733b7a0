mod memory;
mod redis;
use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use crate::cli::Args;
use crate::models::chat::ChatMessage;

pub use self::memory::MemoryHistoryStore;
pub use self::redis::RedisHistoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    Append,
    List,
    Delete,
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageOp::Append => write!(f, "append"),
            StorageOp::List => write!(f, "list"),
            StorageOp::Delete => write!(f, "delete"),
        }
    }
}

/// A history read, write or delete that could not be completed.
#[derive(Debug, thiserror::Error)]
#[error("history {operation} failed for {key}: {source}")]
pub struct StorageError {
    pub operation: StorageOp,
    pub key: String,
    #[source]
    source: Box<dyn Error + Send + Sync>,
}

impl StorageError {
    pub fn new(
        operation: StorageOp,
        user_id: &str,
        created_at: Option<i64>,
        source: impl Into<Box<dyn Error + Send + Sync>>
    ) -> Self {
        let key = match created_at {
            Some(ts) => format!("user '{}' at {}", user_id, ts),
            None => format!("user '{}'", user_id),
        };
        Self { operation, key, source: source.into() }
    }
}

/// Append-only per-user log of prompt/response records.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, message: &ChatMessage) -> Result<(), StorageError>;

    /// All records owned by `user_id`, ascending by `created_at`. Unknown users yield an empty list.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<ChatMessage>, StorageError>;

    /// Removes the record at `(user_id, created_at)`. Absent keys are not an error.
    async fn delete_by_key(&self, user_id: &str, created_at: i64) -> Result<(), StorageError>;
}

pub fn create_history_store(
    args: &Args
) -> Result<Arc<dyn HistoryStore>, Box<dyn Error + Send + Sync>> {
    match args.history_type.to_lowercase().as_str() {
        "redis" => {
            let store = RedisHistoryStore::new(&args.history_host, &args.history_redis_prefix)?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(MemoryHistoryStore::new())),
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported history store type: {}", args.history_type)
                    )
                )
            ),
    }
}

pub fn initialize_history_store(
    args: &Args
) -> Result<Arc<dyn HistoryStore>, Box<dyn Error + Send + Sync>> {
    if args.history_type.eq_ignore_ascii_case("memory") {
        info!("Chat history will be kept in process memory and lost on restart");
    } else {
        info!("Chat history will be stored in: {} at {}", args.history_type, args.history_host);
    }
    create_history_store(args)
}
