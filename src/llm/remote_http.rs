// Remote OpenAI-compatible client
// Reached only through the trust-tier router's remote path; by the time a
// prompt lands here it has already been through the anonymizer.

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::llm::{CompletionClient, CompletionOptions};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct RemoteHttpClient {
    client: Client,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl RemoteHttpClient {
    pub fn new(base_url: Option<&str>, api_key: &str, default_model: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120)) // 2 minutes for LLM responses
            .connect_timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");

        let base_url = base_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        RemoteHttpClient {
            client,
            base_url,
            api_key: api_key.to_string(),
            default_model: default_model.to_string(),
        }
    }

    pub async fn validate(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .context("Failed to reach remote provider")?;
        Ok(response.status().is_success())
    }
}

#[async_trait::async_trait]
impl CompletionClient for RemoteHttpClient {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String> {
        let model = options.model.as_deref().unwrap_or(&self.default_model);

        let mut body = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": options.temperature,
        });
        if let Some(max_tokens) = options.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send completion request")?;

        let status = response.status();
        if !status.is_success() {
            // Provider error bodies can echo the prompt; report status only
            anyhow::bail!("Remote provider error: {}", status);
        }

        let body: Value = response.json().await?;
        let text = body["choices"]
            .as_array()
            .and_then(|c| c.first())
            .and_then(|choice| choice["message"]["content"].as_str())
            .ok_or_else(|| anyhow::anyhow!("No content in response"))?;

        Ok(text.to_string())
    }
}
