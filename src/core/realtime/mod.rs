//! Realtime voice sessions against the provider's streaming API.
//!
//! A connector opens a stream and hands back a [`StreamHandle`] plus an
//! ordered receiver of [`RealtimeEvent`]s. Callers consume events in order
//! instead of registering callbacks.

mod base;
pub mod messages;
mod openai;

pub use base::{
    PlaybackSink, RealtimeConfig, RealtimeConnector, RealtimeError, RealtimeEvent,
    RealtimeSession, SharedStream, StreamHandle,
};
pub use openai::{OpenAIRealtime, OpenAIRealtimeStream};
