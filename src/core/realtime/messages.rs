//! Wire messages for the OpenAI realtime WebSocket API.
//!
//! Only the events the relay sends or reacts to are modelled; every other
//! server event is parsed into [`ServerEvent`] with just its type.

use serde::{Deserialize, Serialize};

use super::base::RealtimeEvent;

/// Events sent from the relay to the provider
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionSettings },
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded PCM16 audio
        audio: String,
    },
}

#[derive(Debug, Serialize)]
pub struct SessionSettings {
    pub voice: String,
    pub input_audio_format: &'static str,
    pub input_audio_transcription: TranscriptionSettings,
    pub turn_detection: TurnDetection,
}

#[derive(Debug, Serialize)]
pub struct TranscriptionSettings {
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub detection_type: &'static str,
    pub create_response: bool,
}

impl SessionSettings {
    pub fn new(voice: &str, transcription_model: &str, create_response: bool) -> Self {
        Self {
            voice: voice.to_string(),
            input_audio_format: "pcm16",
            input_audio_transcription: TranscriptionSettings {
                model: transcription_model.to_string(),
            },
            turn_detection: TurnDetection {
                detection_type: "server_vad",
                create_response,
            },
        }
    }
}

/// Any event received from the provider
#[derive(Debug, Deserialize)]
pub struct ServerEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub error: Option<ServerError>,
}

#[derive(Debug, Deserialize)]
pub struct ServerError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}

impl ServerEvent {
    /// Map a provider event onto the relay's event model.
    ///
    /// Returns `None` for events the relay does not forward.
    pub fn into_realtime_event(self) -> Option<RealtimeEvent> {
        match self.event_type.as_str() {
            "conversation.item.input_audio_transcription.completed" => {
                Some(RealtimeEvent::Transcript(self.transcript.unwrap_or_default()))
            }
            "error" => {
                let message = self
                    .error
                    .and_then(|e| e.message.or(e.error_type))
                    .unwrap_or_else(|| "Unknown realtime error".to_string());
                Some(RealtimeEvent::Error(message))
            }
            t if t.starts_with("session.") || t.starts_with("input_audio_buffer.") => {
                Some(RealtimeEvent::Status(self.event_type))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(raw: serde_json::Value) -> Option<RealtimeEvent> {
        serde_json::from_value::<ServerEvent>(raw)
            .unwrap()
            .into_realtime_event()
    }

    #[test]
    fn test_session_update_shape() {
        let event = ClientEvent::SessionUpdate {
            session: SessionSettings::new("alloy", "whisper-1", false),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "session.update",
                "session": {
                    "voice": "alloy",
                    "input_audio_format": "pcm16",
                    "input_audio_transcription": {"model": "whisper-1"},
                    "turn_detection": {"type": "server_vad", "create_response": false}
                }
            })
        );
    }

    #[test]
    fn test_audio_append_shape() {
        let event = ClientEvent::InputAudioBufferAppend {
            audio: "AAEC".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "input_audio_buffer.append", "audio": "AAEC"})
        );
    }

    #[test]
    fn test_transcript_event() {
        let event = parse(json!({
            "type": "conversation.item.input_audio_transcription.completed",
            "item_id": "item_1",
            "content_index": 0,
            "transcript": "今日の天気は？"
        }));
        assert_eq!(
            event,
            Some(RealtimeEvent::Transcript("今日の天気は？".to_string()))
        );
    }

    #[test]
    fn test_status_events() {
        assert_eq!(
            parse(json!({"type": "session.created", "session": {}})),
            Some(RealtimeEvent::Status("session.created".to_string()))
        );
        assert_eq!(
            parse(json!({"type": "input_audio_buffer.speech_started", "audio_start_ms": 10})),
            Some(RealtimeEvent::Status(
                "input_audio_buffer.speech_started".to_string()
            ))
        );
    }

    #[test]
    fn test_error_event() {
        assert_eq!(
            parse(json!({"type": "error", "error": {"type": "invalid_request_error", "message": "bad audio"}})),
            Some(RealtimeEvent::Error("bad audio".to_string()))
        );
        assert_eq!(
            parse(json!({"type": "error", "error": {"type": "server_error"}})),
            Some(RealtimeEvent::Error("server_error".to_string()))
        );
        assert_eq!(
            parse(json!({"type": "error"})),
            Some(RealtimeEvent::Error("Unknown realtime error".to_string()))
        );
    }

    #[test]
    fn test_unhandled_events_are_ignored() {
        assert_eq!(parse(json!({"type": "response.audio.delta", "delta": "AA=="})), None);
        assert_eq!(parse(json!({"type": "rate_limits.updated"})), None);
    }
}
