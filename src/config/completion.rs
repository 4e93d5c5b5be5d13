//! Text-completion (decision procedure) configuration

use serde::{Deserialize, Serialize};

/// Configuration for the chat-completion capability backing tool selection
/// and fusion synthesis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// API endpoint (e.g., "https://api.openai.com/v1/chat/completions")
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key (optional, can also use OPENAI_API_KEY env var)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model name
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature for synthesis
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum output tokens for synthesis
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> usize {
    1200
}

fn default_timeout() -> u64 {
    60
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
        }
    }
}
