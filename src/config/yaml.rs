use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Environment
/// variables override any values specified here.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3000
///
/// openai:
///   api_key: "sk-..."
///   base_url: "https://api.openai.com/v1"
///   realtime_url: "wss://api.openai.com/v1/realtime"
///   webrtc_url: "https://api.openai.com/v1/realtime"
///   max_concurrent_requests: 16
///
/// realtime:
///   model: "gpt-4o-realtime-preview"
///   transcription_model: "whisper-1"
///   voice: "alloy"
///   create_responses: false
///
/// reply:
///   chat_model: "gpt-4o"
///   system_prompt: "You are a helpful assistant. Keep answers short."
///   max_tokens: 150
///   tts_model: "tts-1"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub openai: Option<OpenAIYaml>,
    pub realtime: Option<RealtimeYaml>,
    pub reply: Option<ReplyYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// OpenAI credential and endpoint overrides from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OpenAIYaml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub realtime_url: Option<String>,
    pub webrtc_url: Option<String>,
    pub max_concurrent_requests: Option<usize>,
}

/// Realtime session settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    pub model: Option<String>,
    pub transcription_model: Option<String>,
    pub voice: Option<String>,
    pub create_responses: Option<bool>,
}

/// Reply pipeline settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ReplyYaml {
    pub chat_model: Option<String>,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub tts_model: Option<String>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
