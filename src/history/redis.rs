use async_trait::async_trait;
use crate::models::chat::ChatMessage;
use crate::history::{ HistoryStore, StorageError, StorageOp };
use log::debug;
use redis::{ Client, AsyncCommands, Script };
use serde::{ Serialize, Deserialize };

/// Sorted-set member. `created_at` is kept in the member so that two identical
/// prompt/response pairs stay distinct entries.
#[derive(Serialize, Deserialize)]
struct StoredMessage {
    created_at: i64,
    prompt: String,
    response: String,
}

impl StoredMessage {
    fn into_message(self, user_id: &str) -> ChatMessage {
        ChatMessage {
            user_id: user_id.to_string(),
            created_at: self.created_at,
            prompt: self.prompt,
            response: self.response,
        }
    }
}

/// Adds ARGV[2] at score ARGV[1] unless that score is already taken. Returns 1 if added.
const APPEND_IF_ABSENT: &str = r"
if redis.call('ZCOUNT', KEYS[1], ARGV[1], ARGV[1]) > 0 then
    return 0
end
redis.call('ZADD', KEYS[1], ARGV[1], ARGV[2])
return 1
";

/// One sorted set per user at `{prefix}{user_id}`, scored by `created_at`.
pub struct RedisHistoryStore {
    client: Client,
    key_prefix: String,
    append_script: Script,
}

impl RedisHistoryStore {
    pub fn new(url: &str, key_prefix: &str) -> Result<Self, redis::RedisError> {
        Ok(Self {
            client: Client::open(url)?,
            key_prefix: key_prefix.to_string(),
            append_script: Script::new(APPEND_IF_ABSENT),
        })
    }

    fn user_key(&self, user_id: &str) -> String {
        format!("{}{}", self.key_prefix, user_id)
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }
}

fn encode_member(message: &ChatMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(
        &(StoredMessage {
            created_at: message.created_at,
            prompt: message.prompt.clone(),
            response: message.response.clone(),
        })
    )
}

fn decode_members(user_id: &str, entries: &[String]) -> Result<Vec<ChatMessage>, serde_json::Error> {
    entries
        .iter()
        .map(|entry| serde_json::from_str::<StoredMessage>(entry).map(|m| m.into_message(user_id)))
        .collect()
}

#[async_trait]
impl HistoryStore for RedisHistoryStore {
    async fn append(&self, message: &ChatMessage) -> Result<(), StorageError> {
        let user_id = message.user_id.as_str();
        let ts = message.created_at;
        let fail = |e: Box<dyn std::error::Error + Send + Sync>|
            StorageError::new(StorageOp::Append, user_id, Some(ts), e);

        let member = encode_member(message).map_err(|e| fail(e.into()))?;
        let mut conn = self.get_connection().await.map_err(|e| fail(e.into()))?;
        let key = self.user_key(user_id);

        let added: i64 = self.append_script
            .key(&key)
            .arg(ts)
            .arg(&member)
            .invoke_async(&mut conn).await
            .map_err(|e| fail(e.into()))?;
        if added == 0 {
            return Err(fail("a record with this key already exists".into()));
        }
        Ok(())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<ChatMessage>, StorageError> {
        let fail = |e: Box<dyn std::error::Error + Send + Sync>|
            StorageError::new(StorageOp::List, user_id, None, e);

        let mut conn = self.get_connection().await.map_err(|e| fail(e.into()))?;
        let key = self.user_key(user_id);
        let entries: Vec<String> = conn
            .zrangebyscore(&key, "-inf", "+inf").await
            .map_err(|e| fail(e.into()))?;

        decode_members(user_id, &entries).map_err(|e| fail(e.into()))
    }

    async fn delete_by_key(&self, user_id: &str, created_at: i64) -> Result<(), StorageError> {
        let fail = |e: redis::RedisError|
            StorageError::new(StorageOp::Delete, user_id, Some(created_at), e);

        let mut conn = self.get_connection().await.map_err(fail)?;
        let key = self.user_key(user_id);
        let removed: i64 = conn.zrembyscore(&key, created_at, created_at).await.map_err(fail)?;
        if removed == 0 {
            debug!("No history record for user '{}' at {}; nothing to delete", user_id, created_at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_prefixed_per_user() {
        let store = RedisHistoryStore::new("redis://127.0.0.1:6379", "history:").unwrap();
        assert_eq!(store.user_key("u1"), "history:u1");
    }

    #[test]
    fn rejects_malformed_url() {
        assert!(RedisHistoryStore::new("not a url", "history:").is_err());
    }

    #[test]
    fn members_restore_owner_from_key() {
        let original = ChatMessage::new("u1", 1234, "Hello", "Hi");
        let member = encode_member(&original).unwrap();
        assert!(!member.contains("u1"));

        let restored = decode_members("u1", &[member]).unwrap();
        assert_eq!(restored, vec![original]);
    }

    #[test]
    fn identical_pairs_encode_to_distinct_members() {
        let a = encode_member(&ChatMessage::new("u1", 1, "same", "same")).unwrap();
        let b = encode_member(&ChatMessage::new("u1", 2, "same", "same")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn undecodable_member_is_an_error_not_a_skip() {
        let entries = vec![
            encode_member(&ChatMessage::new("u1", 1, "a", "b")).unwrap(),
            "{\"legacy\":true}".to_string()
        ];
        assert!(decode_members("u1", &entries).is_err());
    }

    // The tests below need a running server: `REDIS_URL=redis://127.0.0.1:6379 cargo test -- --ignored`
    fn live_store() -> RedisHistoryStore {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let prefix = format!("history-test:{}:", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());
        RedisHistoryStore::new(&url, &prefix).unwrap()
    }

    #[tokio::test]
    #[ignore]
    async fn live_append_then_list_is_ascending_and_scoped() {
        let store = live_store();
        store.append(&ChatMessage::new("u1", 30, "c", "3")).await.unwrap();
        store.append(&ChatMessage::new("u2", 20, "b", "2")).await.unwrap();
        store.append(&ChatMessage::new("u1", 10, "a", "1")).await.unwrap();

        let u1 = store.list_by_user("u1").await.unwrap();
        assert_eq!(u1, vec![ChatMessage::new("u1", 10, "a", "1"), ChatMessage::new("u1", 30, "c", "3")]);
        assert_eq!(store.list_by_user("u2").await.unwrap(), vec![ChatMessage::new("u2", 20, "b", "2")]);
        assert!(store.list_by_user("nobody").await.unwrap().is_empty());

        store.delete_by_key("u1", 10).await.unwrap();
        store.delete_by_key("u1", 30).await.unwrap();
        store.delete_by_key("u2", 20).await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn live_duplicate_key_is_rejected_and_original_kept() {
        let store = live_store();
        store.append(&ChatMessage::new("u1", 10, "first", "1")).await.unwrap();

        let err = store.append(&ChatMessage::new("u1", 10, "second", "2")).await.unwrap_err();
        assert_eq!(err.operation, StorageOp::Append);

        let u1 = store.list_by_user("u1").await.unwrap();
        assert_eq!(u1, vec![ChatMessage::new("u1", 10, "first", "1")]);

        store.delete_by_key("u1", 10).await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn live_delete_is_keyed_and_idempotent() {
        let store = live_store();
        store.append(&ChatMessage::new("u1", 10, "a", "1")).await.unwrap();
        store.append(&ChatMessage::new("u1", 11, "b", "2")).await.unwrap();
        store.append(&ChatMessage::new("u2", 10, "c", "3")).await.unwrap();

        store.delete_by_key("u1", 10).await.unwrap();
        store.delete_by_key("u1", 10).await.unwrap();

        assert_eq!(store.list_by_user("u1").await.unwrap(), vec![ChatMessage::new("u1", 11, "b", "2")]);
        assert_eq!(store.list_by_user("u2").await.unwrap().len(), 1);

        store.delete_by_key("u1", 11).await.unwrap();
        store.delete_by_key("u2", 10).await.unwrap();
    }
}
