//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `signal` - Stateless HTTP signaling endpoints
//! - `ws` - Persistent conversation channel

pub mod api;
pub mod signal;
pub mod ws;

pub use ws::ws_conversation_handler;
