//! Configuration module for the voice relay server
//!
//! Configuration is read from environment variables and, optionally, a YAML
//! file. Environment variables always override YAML values, and YAML values
//! override the built-in defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use voice_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

pub use utils::parse_bool;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";
pub const DEFAULT_WEBRTC_URL: &str = "https://api.openai.com/v1/realtime";
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
pub const DEFAULT_VOICE: &str = "alloy";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "あなたは親切なAIアシスタントです。短く簡潔に応答してください。";
pub const DEFAULT_MAX_TOKENS: u32 = 150;
pub const DEFAULT_TTS_MODEL: &str = "tts-1";
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 16;

/// Server configuration
///
/// Contains everything needed to run the relay:
/// - Server settings (host, port)
/// - OpenAI credential and endpoint overrides
/// - Realtime session settings (model, voice, transcription model)
/// - Reply pipeline settings (chat model, system prompt, token budget, TTS model)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // OpenAI credential and endpoints
    pub openai_api_key: String,
    pub api_base_url: String,
    pub realtime_url: String,
    pub webrtc_url: String,
    pub max_concurrent_requests: usize,

    // Realtime session
    pub realtime_model: String,
    pub transcription_model: String,
    pub voice: String,
    /// Let the realtime model answer on its own in addition to the reply pipeline
    pub create_responses: bool,

    // Reply pipeline
    pub chat_model: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub tts_model: String,
}

impl ServerConfig {
    /// Build a configuration with default settings around the given API key.
    ///
    /// Nothing is read from the environment.
    pub fn with_api_key(openai_api_key: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            openai_api_key: openai_api_key.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            realtime_url: DEFAULT_REALTIME_URL.to_string(),
            webrtc_url: DEFAULT_WEBRTC_URL.to_string(),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            realtime_model: DEFAULT_REALTIME_MODEL.to_string(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            create_responses: false,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            tts_model: DEFAULT_TTS_MODEL.to_string(),
        }
    }

    /// Load configuration from a YAML file with environment variable overrides
    ///
    /// Priority order (highest to lowest):
    /// 1. Environment variables
    /// 2. YAML file values
    /// 3. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // The .env file is not consulted here: the YAML file is the source of
        // truth and only real environment variables override it.
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the server address as a string in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        validation::validate_api_key(&self.openai_api_key)?;
        validation::validate_url("OPENAI_BASE_URL", &self.api_base_url, &["http", "https"])?;
        validation::validate_url("OPENAI_WEBRTC_URL", &self.webrtc_url, &["http", "https"])?;
        validation::validate_url("OPENAI_REALTIME_URL", &self.realtime_url, &["ws", "wss"])?;
        validation::validate_positive("REPLY_MAX_TOKENS", self.max_tokens as u64)?;
        validation::validate_positive(
            "OPENAI_MAX_CONCURRENT_REQUESTS",
            self.max_concurrent_requests as u64,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    // Helper to clean up environment variables
    pub(super) fn cleanup_env_vars() {
        unsafe {
            env::remove_var("HOST");
            env::remove_var("PORT");
            env::remove_var("OPENAI_API_KEY");
            env::remove_var("OPENAI_BASE_URL");
            env::remove_var("OPENAI_REALTIME_URL");
            env::remove_var("OPENAI_WEBRTC_URL");
            env::remove_var("OPENAI_REALTIME_MODEL");
            env::remove_var("OPENAI_TRANSCRIPTION_MODEL");
            env::remove_var("OPENAI_VOICE");
            env::remove_var("OPENAI_CHAT_MODEL");
            env::remove_var("OPENAI_TTS_MODEL");
            env::remove_var("OPENAI_MAX_CONCURRENT_REQUESTS");
            env::remove_var("REPLY_SYSTEM_PROMPT");
            env::remove_var("REPLY_MAX_TOKENS");
            env::remove_var("REALTIME_CREATE_RESPONSES");
        }
    }

    #[test]
    fn test_with_api_key_defaults() {
        let config = ServerConfig::with_api_key("sk-test");
        assert_eq!(config.openai_api_key, "sk-test");
        assert_eq!(config.port, 3000);
        assert_eq!(config.voice, "alloy");
        assert_eq!(config.chat_model, "gpt-4o");
        assert_eq!(config.tts_model, "tts-1");
        assert_eq!(config.max_tokens, 150);
        assert!(!config.create_responses);
    }

    #[test]
    fn test_address() {
        let mut config = ServerConfig::with_api_key("sk-test");
        config.host = "127.0.0.1".to_string();
        config.port = 8080;
        assert_eq!(config.address(), "127.0.0.1:8080");
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_only() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 8080

openai:
  api_key: "yaml-key"
  base_url: "http://localhost:9000/v1"

realtime:
  voice: "verse"

reply:
  max_tokens: 64
"#;

        fs::write(&config_path, yaml_content).unwrap();

        let config = ServerConfig::from_file(&config_path).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.openai_api_key, "yaml-key");
        assert_eq!(config.api_base_url, "http://localhost:9000/v1");
        assert_eq!(config.voice, "verse");
        assert_eq!(config.max_tokens, 64);
        // Untouched values keep their defaults
        assert_eq!(config.realtime_url, DEFAULT_REALTIME_URL);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_env_overrides_yaml() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 8080

openai:
  api_key: "yaml-key"
"#;

        fs::write(&config_path, yaml_content).unwrap();

        unsafe {
            env::set_var("HOST", "0.0.0.0");
            env::set_var("OPENAI_API_KEY", "env-key");
        }

        let config = ServerConfig::from_file(&config_path).unwrap();

        // ENV overrides YAML
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.openai_api_key, "env-key");
        // YAML value used when no ENV
        assert_eq!(config.port, 8080);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let config_path = PathBuf::from("/nonexistent/config.yaml");
        let result = ServerConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_invalid_yaml() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");

        fs::write(&config_path, "invalid: yaml: [content").unwrap();

        let result = ServerConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to parse YAML"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_without_api_key_fails() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "server:\n  port: 9000\n").unwrap();

        let result = ServerConfig::from_file(&config_path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("OPENAI_API_KEY"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_rejects_wrong_realtime_scheme() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        let yaml_content = r#"
openai:
  api_key: "yaml-key"
  realtime_url: "https://api.openai.com/v1/realtime"
"#;
        fs::write(&config_path, yaml_content).unwrap();

        let result = ServerConfig::from_file(&config_path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("OPENAI_REALTIME_URL"));

        cleanup_env_vars();
    }
}
