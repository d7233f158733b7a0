use log::error;
use std::sync::Arc;
use std::time::Duration;

use super::chat::ChatClient;

/// Shown to (and stored for) the user whenever a completion cannot be obtained.
pub const FALLBACK_RESPONSE: &str = "Error: Could not get a response from Bedrock.";

/// Turns a prompt into displayable text. Provider failures and timeouts never
/// escape; they are logged and replaced by [`FALLBACK_RESPONSE`].
#[derive(Clone)]
pub struct InferenceAdapter {
    client: Arc<dyn ChatClient>,
    timeout: Option<Duration>,
}

impl InferenceAdapter {
    pub fn new(client: Arc<dyn ChatClient>, timeout: Option<Duration>) -> Self {
        Self { client, timeout }
    }

    pub async fn complete(&self, prompt: &str) -> String {
        let call = self.client.complete(prompt);
        let result = match self.timeout {
            Some(limit) =>
                match tokio::time::timeout(limit, call).await {
                    Ok(result) => result,
                    Err(_) => {
                        error!(
                            "Inference call to model {} timed out after {:?}",
                            self.client.get_model(),
                            limit
                        );
                        return FALLBACK_RESPONSE.to_string();
                    }
                }
            None => call.await,
        };

        match result {
            Ok(completion) => completion.response,
            Err(e) => {
                error!("Inference call to model {} failed: {}", self.client.get_model(), e);
                FALLBACK_RESPONSE.to_string()
            }
        }
    }
}
