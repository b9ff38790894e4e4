use std::env;
use std::str::FromStr;

use super::utils::parse_bool;
use super::yaml::YamlConfig;
use super::{
    DEFAULT_API_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_HOST, DEFAULT_MAX_CONCURRENT_REQUESTS,
    DEFAULT_MAX_TOKENS, DEFAULT_PORT, DEFAULT_REALTIME_MODEL, DEFAULT_REALTIME_URL,
    DEFAULT_SYSTEM_PROMPT, DEFAULT_TRANSCRIPTION_MODEL, DEFAULT_TTS_MODEL, DEFAULT_VOICE,
    DEFAULT_WEBRTC_URL, ServerConfig,
};

/// Read and parse a numeric environment variable, falling back to the YAML value.
fn numeric<T>(env_var: &str, yaml_value: Option<T>) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(env_var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid {env_var} environment variable: {e}")),
        Err(_) => Ok(yaml_value),
    }
}

/// Merge YAML configuration with environment variables
///
/// Priority order (highest to lowest):
/// 1. Environment variables
/// 2. YAML configuration values
/// 3. Default values
///
/// # Arguments
/// * `yaml_config` - Optional YAML configuration providing base values
pub fn merge_config(
    yaml_config: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml_config.unwrap_or_default();
    let server = yaml.server.unwrap_or_default();
    let openai = yaml.openai.unwrap_or_default();
    let realtime = yaml.realtime.unwrap_or_default();
    let reply = yaml.reply.unwrap_or_default();

    // Helper macro to get value with priority: ENV > YAML > Default
    macro_rules! get_value {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            env::var($env_var)
                .ok()
                .or($yaml_value)
                .unwrap_or_else(|| $default.to_string())
        };
    }

    // Server configuration
    let host = get_value!("HOST", server.host, DEFAULT_HOST);
    let port = numeric("PORT", server.port)?.unwrap_or(DEFAULT_PORT);

    // OpenAI credential and endpoints
    let openai_api_key = get_value!("OPENAI_API_KEY", openai.api_key, "");
    let api_base_url = get_value!("OPENAI_BASE_URL", openai.base_url, DEFAULT_API_BASE_URL);
    let realtime_url = get_value!(
        "OPENAI_REALTIME_URL",
        openai.realtime_url,
        DEFAULT_REALTIME_URL
    );
    let webrtc_url = get_value!("OPENAI_WEBRTC_URL", openai.webrtc_url, DEFAULT_WEBRTC_URL);
    let max_concurrent_requests = numeric(
        "OPENAI_MAX_CONCURRENT_REQUESTS",
        openai.max_concurrent_requests,
    )?
    .unwrap_or(DEFAULT_MAX_CONCURRENT_REQUESTS);

    // Realtime session
    let realtime_model = get_value!(
        "OPENAI_REALTIME_MODEL",
        realtime.model,
        DEFAULT_REALTIME_MODEL
    );
    let transcription_model = get_value!(
        "OPENAI_TRANSCRIPTION_MODEL",
        realtime.transcription_model,
        DEFAULT_TRANSCRIPTION_MODEL
    );
    let voice = get_value!("OPENAI_VOICE", realtime.voice, DEFAULT_VOICE);
    let create_responses = env::var("REALTIME_CREATE_RESPONSES")
        .ok()
        .and_then(|v| parse_bool(&v))
        .or(realtime.create_responses)
        .unwrap_or(false);

    // Reply pipeline
    let chat_model = get_value!("OPENAI_CHAT_MODEL", reply.chat_model, DEFAULT_CHAT_MODEL);
    let system_prompt = get_value!(
        "REPLY_SYSTEM_PROMPT",
        reply.system_prompt,
        DEFAULT_SYSTEM_PROMPT
    );
    let max_tokens = numeric("REPLY_MAX_TOKENS", reply.max_tokens)?.unwrap_or(DEFAULT_MAX_TOKENS);
    let tts_model = get_value!("OPENAI_TTS_MODEL", reply.tts_model, DEFAULT_TTS_MODEL);

    Ok(ServerConfig {
        host,
        port,
        openai_api_key,
        api_base_url,
        realtime_url,
        webrtc_url,
        max_concurrent_requests,
        realtime_model,
        transcription_model,
        voice,
        create_responses,
        chat_model,
        system_prompt,
        max_tokens,
        tts_model,
    })
}
