use std::sync::Arc;

use bytes::Bytes;
use tracing::info;

use super::openai::{OpenAIClient, OpenAIError};

/// Speaking rate used to estimate reply duration
const CHARS_PER_MINUTE: f64 = 350.0;
/// Shortest duration ever reported
const MIN_SPEAKING_SECS: f64 = 2.0;

/// Estimated time to speak `text` aloud, in seconds.
///
/// Counts UTF-16 code units at 350 characters per minute, with a two
/// second floor, so characters outside the BMP count twice as browsers
/// report them. This is not the length of the synthesized audio.
pub fn speaking_duration_secs(text: &str) -> f64 {
    let chars = text.encode_utf16().count() as f64;
    (chars / (CHARS_PER_MINUTE / 60.0)).max(MIN_SPEAKING_SECS)
}

#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("Chat completion failed: {0}")]
    Completion(#[source] OpenAIError),
    #[error("Speech synthesis failed: {0}")]
    Speech(#[source] OpenAIError),
}

/// A generated reply ready to be delivered to the client
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub audio: Bytes,
    pub duration_ms: f64,
}

/// Turns a transcript into a spoken reply: chat completion then speech synthesis
#[derive(Clone)]
pub struct ReplyPipeline {
    openai: Arc<OpenAIClient>,
}

impl ReplyPipeline {
    pub fn new(openai: Arc<OpenAIClient>) -> Self {
        Self { openai }
    }

    /// Produce a reply for `transcript`.
    ///
    /// Empty or whitespace-only input yields `Ok(None)` without any upstream call.
    pub async fn respond(&self, transcript: &str) -> Result<Option<Reply>, ReplyError> {
        if transcript.trim().is_empty() {
            return Ok(None);
        }

        let text = self
            .openai
            .chat_completion(transcript)
            .await
            .map_err(ReplyError::Completion)?;
        info!("AI response: {}", text);

        let audio = self
            .openai
            .synthesize_speech(&text)
            .await
            .map_err(ReplyError::Speech)?;

        let duration_ms = speaking_duration_secs(&text) * 1000.0;
        Ok(Some(Reply {
            text,
            audio,
            duration_ms,
        }))
    }
}
