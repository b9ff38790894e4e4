use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, error};
use url::Url;

use super::messages::{
    ApiErrorEnvelope, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, SpeechRequest,
};
use crate::config::ServerConfig;
use crate::utils::req_manager::ReqManager;

/// Maximum number of bytes of an upstream error body kept in error messages
const MAX_ERROR_BODY_LEN: usize = 512;

/// Errors returned by the OpenAI REST client
#[derive(Debug, Clone, thiserror::Error)]
pub enum OpenAIError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("OpenAI API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for OpenAIError {
    fn from(err: reqwest::Error) -> Self {
        OpenAIError::Request(err.to_string())
    }
}

/// Settings the REST client needs, split out of [`ServerConfig`]
#[derive(Debug, Clone)]
pub struct OpenAISettings {
    pub api_key: String,
    pub base_url: String,
    pub webrtc_url: String,
    pub realtime_model: String,
    pub chat_model: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub tts_model: String,
    pub voice: String,
    pub max_concurrent_requests: usize,
}

impl From<&ServerConfig> for OpenAISettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            api_key: config.openai_api_key.clone(),
            base_url: config.api_base_url.clone(),
            webrtc_url: config.webrtc_url.clone(),
            realtime_model: config.realtime_model.clone(),
            chat_model: config.chat_model.clone(),
            system_prompt: config.system_prompt.clone(),
            max_tokens: config.max_tokens,
            tts_model: config.tts_model.clone(),
            voice: config.voice.clone(),
            max_concurrent_requests: config.max_concurrent_requests,
        }
    }
}

/// Client for the OpenAI chat, speech and WebRTC negotiation endpoints
pub struct OpenAIClient {
    settings: OpenAISettings,
    req_manager: ReqManager,
}

impl OpenAIClient {
    pub fn new(settings: OpenAISettings) -> Result<Self, OpenAIError> {
        let req_manager = ReqManager::new(settings.max_concurrent_requests)
            .map_err(|e| OpenAIError::InvalidConfiguration(e.to_string()))?;
        Ok(Self {
            settings,
            req_manager,
        })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, OpenAIError> {
        Self::new(OpenAISettings::from(config))
    }

    pub fn req_manager(&self) -> &ReqManager {
        &self.req_manager
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.settings.api_key)
    }

    /// Send a user utterance with the configured system instruction and
    /// return the first choice's text.
    pub async fn chat_completion(&self, user_text: &str) -> Result<String, OpenAIError> {
        let body = ChatCompletionRequest {
            model: &self.settings.chat_model,
            messages: vec![
                ChatMessage::system(self.settings.system_prompt.as_str()),
                ChatMessage::user(user_text),
            ],
            max_tokens: self.settings.max_tokens,
        };

        let guard = self
            .req_manager
            .acquire()
            .await
            .map_err(|e| OpenAIError::Request(e.to_string()))?;
        let request = guard
            .client()
            .post(self.endpoint("chat/completions"))
            .header(AUTHORIZATION, self.bearer())
            .json(&body);
        let response = check_status(guard.send(request).await?).await?;

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| OpenAIError::InvalidResponse(format!("chat completion body: {e}")))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OpenAIError::InvalidResponse("completion has no choices".to_string()))?
            .message
            .content
            .ok_or_else(|| {
                OpenAIError::InvalidResponse("first choice has no text content".to_string())
            })?;

        debug!("Chat completion returned {} chars", content.chars().count());
        Ok(content)
    }

    /// Synthesize speech for `input` and return the raw audio bytes
    pub async fn synthesize_speech(&self, input: &str) -> Result<Bytes, OpenAIError> {
        let body = SpeechRequest {
            model: &self.settings.tts_model,
            voice: &self.settings.voice,
            input,
        };

        let guard = self
            .req_manager
            .acquire()
            .await
            .map_err(|e| OpenAIError::Request(e.to_string()))?;
        let request = guard
            .client()
            .post(self.endpoint("audio/speech"))
            .header(AUTHORIZATION, self.bearer())
            .json(&body);
        let response = check_status(guard.send(request).await?).await?;

        let audio = response.bytes().await?;
        debug!("Speech synthesis returned {} bytes", audio.len());
        Ok(audio)
    }

    /// Forward an SDP offer to the WebRTC negotiation endpoint and return the answer SDP
    pub async fn negotiate_sdp(&self, offer_sdp: &str) -> Result<String, OpenAIError> {
        let mut url = Url::parse(&self.settings.webrtc_url).map_err(|e| {
            OpenAIError::InvalidConfiguration(format!("Invalid WebRTC URL: {e}"))
        })?;
        url.query_pairs_mut()
            .append_pair("model", &self.settings.realtime_model);

        let guard = self
            .req_manager
            .acquire()
            .await
            .map_err(|e| OpenAIError::Request(e.to_string()))?;
        let request = guard
            .client()
            .post(url)
            .header(AUTHORIZATION, self.bearer())
            .header(CONTENT_TYPE, "application/sdp")
            .body(offer_sdp.to_string());
        let response = check_status(guard.send(request).await?).await?;

        let answer = response.text().await?;
        if answer.trim().is_empty() {
            return Err(OpenAIError::InvalidResponse(
                "empty SDP answer".to_string(),
            ));
        }
        Ok(answer)
    }
}

/// Turn a non-2xx response into [`OpenAIError::Api`]
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, OpenAIError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorEnvelope>(&body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.len() > MAX_ERROR_BODY_LEN => {
            let mut end = MAX_ERROR_BODY_LEN;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated)", &body[..end])
        }
        Err(_) => body,
    };

    error!("OpenAI request failed with {}: {}", status, message);
    Err(OpenAIError::Api {
        status: status.as_u16(),
        message,
    })
}
