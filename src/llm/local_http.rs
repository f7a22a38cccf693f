// Local HTTP client (Ollama, LM Studio, etc.)
// On-device model endpoint; the only collaborator allowed to see raw
// decrypted content.

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::llm::{CompletionClient, CompletionOptions};

pub struct LocalHttpClient {
    client: Client,
    base_url: String,
    default_model: String,
}

impl LocalHttpClient {
    pub fn new(base_url: &str, default_model: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300)) // Longer timeout for local models
            .build()
            .expect("Failed to create HTTP client");

        LocalHttpClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_model: default_model.to_string(),
        }
    }

    /// Probe the server. Ollama answers /api/tags, LM Studio and other
    /// OpenAI-compatible servers answer /v1/models.
    pub async fn available(&self) -> bool {
        let endpoints = [
            format!("{}/api/tags", self.base_url),
            format!("{}/v1/models", self.base_url),
        ];
        for endpoint in endpoints {
            if let Ok(response) = self.client.get(&endpoint).send().await {
                if response.status().is_success() {
                    return true;
                }
            }
        }
        false
    }

    pub async fn list_models(&self) -> Result<Vec<String>> {
        // Ollama format first
        let ollama_url = format!("{}/api/tags", self.base_url);
        if let Ok(response) = self.client.get(&ollama_url).send().await {
            if response.status().is_success() {
                if let Ok(body) = response.json::<Value>().await {
                    if let Some(models) = body.get("models").and_then(|m| m.as_array()) {
                        return Ok(models
                            .iter()
                            .filter_map(|m| m.get("name").and_then(|n| n.as_str()))
                            .map(|s| s.to_string())
                            .collect());
                    }
                }
            }
        }

        // OpenAI-compatible fallback
        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .send()
            .await
            .context("Failed to fetch models")?;
        if !response.status().is_success() {
            anyhow::bail!("Failed to list models: {}", response.status());
        }
        let body: Value = response.json().await?;
        let models = body["data"]
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("Invalid models response"))?
            .iter()
            .filter_map(|m| m["id"].as_str().map(|s| s.to_string()))
            .collect();
        Ok(models)
    }
}

#[async_trait::async_trait]
impl CompletionClient for LocalHttpClient {
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
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send completion request")?;

        if !response.status().is_success() {
            anyhow::bail!("Local model error: {}", response.status());
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
