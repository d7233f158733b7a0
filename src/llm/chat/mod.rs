pub mod bedrock;
pub mod ollama;

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use super::{ LlmConfig, LlmError, LlmType };
use self::bedrock::BedrockChatClient;
use self::ollama::OllamaChatClient;

/// Upper bound on generated tokens for every provider request.
pub const MAX_OUTPUT_TOKENS: u32 = 1024;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub response: String,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends a single user-role message and returns the first text block of the reply.
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse, LlmError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> String;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, LlmError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Bedrock => {
            let specific_client = BedrockChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Ollama => {
            let specific_client = OllamaChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}

/// Reads a response body, turning a non-success status into `LlmError::Status`
/// with the body kept for diagnostics.
pub(crate) async fn read_success_body(resp: reqwest::Response) -> Result<String, LlmError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(LlmError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::Router;
    use tokio::net::TcpListener;

    /// Serves `app` on an ephemeral local port and returns its base URL.
    pub async fn spawn_stub(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_builds_requested_provider() {
        let bedrock = new_client(
            &(LlmConfig {
                api_key: Some("key".into()),
                ..LlmConfig::default()
            })
        ).unwrap();
        assert_eq!(bedrock.get_model(), bedrock::DEFAULT_MODEL_ID);

        let ollama = new_client(
            &(LlmConfig {
                llm_type: LlmType::Ollama,
                completion_model: Some("llama3".into()),
                ..LlmConfig::default()
            })
        ).unwrap();
        assert_eq!(ollama.get_model(), "llama3");
        assert_eq!(ollama.get_base_url(), "http://localhost:11434");
    }
}
