// LLM collaborator interfaces

pub mod local_http;
pub mod remote_http;

pub use local_http::LocalHttpClient;
pub use remote_http::RemoteHttpClient;

use anyhow::Result;

/// Knobs for one completion call.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub model: Option<String>,
    pub temperature: f64,
    pub max_tokens: Option<u64>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.2,
            max_tokens: Some(1024),
        }
    }
}

/// One LLM collaborator. The returned text carries no guarantee of being
/// well-formed JSON even when the prompt asked for JSON; callers parse it
/// defensively through `model_output`.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String>;
}
