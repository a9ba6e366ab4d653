//! Client for a chat-completions compatible LLM endpoint.

use relay_config::AiConfig;
use relay_core::prompts::Prompt;
use relay_core::responses::AssistDraft;
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct AssistClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl AssistClient {
    /// `None` unless an API key is configured.
    #[must_use]
    pub fn from_config(config: &AiConfig) -> Option<Self> {
        config.is_configured().then(|| Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn request_body(&self, prompt: &Prompt) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
        })
    }

    /// Send `prompt` and return the first choice.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Upstream` if the call fails, returns non-2xx, or
    /// comes back without text.
    pub async fn draft(&self, prompt: &Prompt) -> Result<AssistDraft, ApiError> {
        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("assistant: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!("assistant: HTTP {status}: {body}")));
        }
        let completion: Completion = resp
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("assistant response: {e}")))?;
        let draft = extract_draft(completion)
            .ok_or_else(|| ApiError::Upstream("assistant returned no text".into()))?;
        Ok(AssistDraft {
            draft,
            model: self.model.clone(),
        })
    }
}

fn extract_draft(completion: Completion) -> Option<String> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
