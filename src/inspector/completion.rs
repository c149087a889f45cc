use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::info;

use crate::inspector::InspectionError;

/// Turns an inspection prompt into prose.
#[async_trait]
pub trait Summarizer {
    async fn summarize(&self, prompt: &str) -> Result<String, InspectionError>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiSummarizer {
    pub fn new(api_base: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self, InspectionError> {
        if api_key.trim().is_empty() {
            return Err(InspectionError::Completion("API key is empty".to_string()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
        })
    }

    fn chat_completions_url(&self) -> String {
        if self.api_base.ends_with("/chat/completions") {
            return self.api_base.clone();
        }
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String, InspectionError> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });
        let res = self
            .client
            .post(self.chat_completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(InspectionError::Completion(format!("HTTP {} - {}", status.as_u16(), text)));
        }

        let parsed: CompletionResponse = res.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| InspectionError::Completion("response contained no message content".to_string()))?;
        info!("Successfully generated AI summary");
        Ok(content)
    }
}
