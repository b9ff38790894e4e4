//! OpenAI REST client used by the signaling relay and the reply pipeline.

mod client;
pub mod messages;

pub use client::{OpenAIClient, OpenAIError, OpenAISettings};
