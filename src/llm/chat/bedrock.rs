use async_trait::async_trait;
use log::{ debug, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE } };
use serde::{ Deserialize, Serialize };

use super::{ read_success_body, ChatClient, CompletionResponse, MAX_OUTPUT_TOKENS };
use crate::llm::{ LlmConfig, LlmError, LlmType };

pub const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-sonnet-20240229-v1:0";
pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const DEFAULT_REGION: &str = "us-east-1";

/// Calls the Bedrock runtime `InvokeModel` endpoint with an Anthropic Messages payload.
pub struct BedrockChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct BedrockRequest<'a> {
    anthropic_version: &'static str,
    max_tokens: u32,
    messages: Vec<BedrockMessage<'a>>,
}

#[derive(Serialize)]
struct BedrockMessage<'a> {
    role: &'static str,
    content: Vec<RequestBlock<'a>>,
}

#[derive(Serialize)]
struct RequestBlock<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Deserialize)]
struct BedrockResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    text: Option<String>,
}

fn build_request(prompt: &str) -> BedrockRequest<'_> {
    BedrockRequest {
        anthropic_version: ANTHROPIC_VERSION,
        max_tokens: MAX_OUTPUT_TOKENS,
        messages: vec![BedrockMessage {
            role: "user",
            content: vec![RequestBlock { kind: "text", text: prompt }],
        }],
    }
}

/// Extracts the text of the first content block.
fn parse_completion(body: &str) -> Result<String, LlmError> {
    let resp: BedrockResponse = serde_json::from_str(body)?;
    resp.content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .ok_or(LlmError::MissingContent)
}

impl BedrockChatClient {
    pub fn new(
        api_key: Option<String>,
        model: Option<String>,
        base_url: Option<String>,
        region: Option<String>
    ) -> Result<Self, LlmError> {
        let model = model.unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());
        let base_url = base_url.unwrap_or_else(|| {
            let region = region.as_deref().unwrap_or(DEFAULT_REGION);
            format!("https://bedrock-runtime.{}.amazonaws.com", region)
        });

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key)).map_err(|e|
                    LlmError::Config(format!("Invalid API key format: {}", e))
                )?
            );
        } else {
            warn!("No Bedrock API key set; requests to {} are unsigned and need a signing proxy", base_url);
        }

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self { http, model, base_url })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        if config.llm_type != LlmType::Bedrock {
            return Err(LlmError::Config("Invalid config type for BedrockChatClient".into()));
        }

        Self::new(
            config.api_key.clone(),
            config.completion_model.clone(),
            config.base_url.clone(),
            config.region.clone()
        )
    }

    fn invoke_url(&self) -> String {
        format!("{}/model/{}/invoke", self.base_url.trim_end_matches('/'), self.model)
    }
}

#[async_trait]
impl ChatClient for BedrockChatClient {
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse, LlmError> {
        let url = self.invoke_url();
        debug!("Invoking Bedrock model {} ({} prompt chars)", self.model, prompt.len());

        let resp = self.http.post(&url).json(&build_request(prompt)).send().await?;
        let body = read_success_body(resp).await?;
        let response = parse_completion(&body)?;

        Ok(CompletionResponse { response })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> String {
        self.base_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::chat::test_support::spawn_stub;
    use axum::{ extract::Path, http::{ HeaderMap, StatusCode }, routing::post, Json, Router };
    use serde_json::{ json, Value };

    #[test]
    fn request_carries_version_token_bound_and_single_user_message() {
        let value = serde_json::to_value(build_request("Test prompt")).unwrap();
        assert_eq!(
            value,
            json!({
                "anthropic_version": "bedrock-2023-05-31",
                "max_tokens": 1024,
                "messages": [
                    { "role": "user", "content": [{ "type": "text", "text": "Test prompt" }] }
                ]
            })
        );
    }

    #[test]
    fn empty_prompt_is_forwarded_as_is() {
        let value = serde_json::to_value(build_request("")).unwrap();
        assert_eq!(value["messages"][0]["content"][0]["text"], "");
    }

    #[test]
    fn parses_first_content_block_text() {
        let body = r#"{"content":[{"type":"text","text":"This is a test response."},{"type":"text","text":"second"}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "This is a test response.");
    }

    #[test]
    fn missing_or_empty_content_is_an_error() {
        assert!(matches!(parse_completion("{}"), Err(LlmError::MissingContent)));
        assert!(matches!(parse_completion(r#"{"content":[]}"#), Err(LlmError::MissingContent)));
        assert!(
            matches!(parse_completion(r#"{"content":[{"type":"tool_use"}]}"#), Err(LlmError::MissingContent))
        );
    }

    #[test]
    fn non_json_body_is_a_decode_error() {
        assert!(matches!(parse_completion("<html>"), Err(LlmError::Decode(_))));
    }

    #[test]
    fn default_endpoint_follows_region() {
        let client = BedrockChatClient::new(None, None, None, Some("eu-west-1".into())).unwrap();
        assert_eq!(
            client.invoke_url(),
            "https://bedrock-runtime.eu-west-1.amazonaws.com/model/anthropic.claude-3-sonnet-20240229-v1:0/invoke"
        );
    }

    async fn echo_invoke(
        Path(model): Path<String>,
        headers: HeaderMap,
        Json(body): Json<Value>
    ) -> Result<Json<Value>, StatusCode> {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer test-key") {
            return Err(StatusCode::FORBIDDEN);
        }
        if body["anthropic_version"] != ANTHROPIC_VERSION || body["max_tokens"] != 1024 {
            return Err(StatusCode::BAD_REQUEST);
        }
        let text = body["messages"][0]["content"][0]["text"].as_str().unwrap_or_default();
        Ok(Json(json!({ "content": [{ "type": "text", "text": format!("{}: {}", model, text) }] })))
    }

    #[tokio::test]
    async fn completes_against_invoke_endpoint() {
        let base = spawn_stub(Router::new().route("/model/{model}/invoke", post(echo_invoke))).await;
        let client = BedrockChatClient::new(
            Some("test-key".into()),
            Some("stub-model".into()),
            Some(base),
            None
        ).unwrap();

        let resp = client.complete("Hello").await.unwrap();
        assert_eq!(resp.response, "stub-model: Hello");
    }

    #[tokio::test]
    async fn error_status_is_reported_with_body() {
        let base = spawn_stub(Router::new().route("/model/{model}/invoke", post(echo_invoke))).await;
        let client = BedrockChatClient::new(None, None, Some(base), None).unwrap();

        match client.complete("Hello").await {
            Err(LlmError::Status { status, .. }) => assert_eq!(status, 403),
            other => panic!("expected status error, got {:?}", other.map(|r| r.response)),
        }
    }
}
