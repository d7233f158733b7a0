use serde::{ Serialize, Deserialize };

/// One persisted prompt/response pair. `(user_id, created_at)` is the composite key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub user_id: String,
    pub created_at: i64,
    pub prompt: String,
    pub response: String,
}

impl ChatMessage {
    pub fn new(
        user_id: impl Into<String>,
        created_at: i64,
        prompt: impl Into<String>,
        response: impl Into<String>
    ) -> Self {
        Self {
            user_id: user_id.into(),
            created_at,
            prompt: prompt.into(),
            response: response.into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PromptRequest {
    /// Absent and `null` both read as the empty prompt.
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptResponse {
    pub response: String,
}
