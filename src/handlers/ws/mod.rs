//! # WebSocket Conversation Handler Module
//!
//! Persistent channel between a browser client and the relay.
//!
//! ## Envelope
//!
//! Text frames are JSON `{"event": <name>, "data": <payload>}`; `data` may be
//! omitted for events without a payload.
//!
//! **Client → server:**
//! - `signal` with an SDP offer (a string or `{"type":"offer","sdp":...}`)
//! - `startConversation` opens a realtime stream for this connection
//! - `stopConversation` closes it
//! - **Binary frames** carry PCM16 microphone audio for the active stream
//!
//! **Server → client:**
//! - `connected {id}` once after the upgrade
//! - `signal {type:"answer", sdp}`
//! - `conversationStarted`, `conversationStopped`
//! - `streamStatus {status}`, `streamClosed`
//! - `aiResponse {type:"transcript", text, duration}` (duration in ms)
//! - `error {message}`
//! - **Binary frames** carry synthesized reply audio
//!
//! ## JavaScript Client Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:3000/ws');
//! ws.binaryType = 'arraybuffer';
//!
//! ws.onopen = () => ws.send(JSON.stringify({ event: 'startConversation' }));
//! ws.onmessage = (msg) => {
//!   if (typeof msg.data !== 'string') {
//!     playAudio(msg.data);
//!     return;
//!   }
//!   const { event, data } = JSON.parse(msg.data);
//!   if (event === 'aiResponse') console.log(data.text, data.duration);
//! };
//! ```

mod conversation;
mod error;
mod gateway;
mod handler;
mod messages;
mod processor;


pub use error::{WebSocketError, WebSocketResult};
pub use gateway::Gateway;
pub use handler::ws_conversation_handler;
pub use messages::{IncomingMessage, MessageRoute, OutgoingMessage};
