use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

use super::messages::{MessageRoute, OutgoingMessage};

/// Routes server-initiated events to connected clients by connection id.
///
/// Emitting to an id that is no longer connected is a silent no-op.
#[derive(Default)]
pub struct Gateway {
    connections: RwLock<HashMap<String, mpsc::Sender<MessageRoute>>>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: &str, sender: mpsc::Sender<MessageRoute>) {
        self.connections.write().insert(id.to_string(), sender);
    }

    pub fn unregister(&self, id: &str) {
        self.connections.write().remove(id);
    }

    pub fn is_connected(&self, id: &str) -> bool {
        self.connections.read().contains_key(id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Queue an event for one client. Returns whether it was queued.
    pub async fn emit(&self, id: &str, message: OutgoingMessage) -> bool {
        self.route(id, MessageRoute::Outgoing(message)).await
    }

    /// Queue a binary audio frame for one client. Returns whether it was queued.
    pub async fn send_binary(&self, id: &str, data: Bytes) -> bool {
        self.route(id, MessageRoute::Binary(data)).await
    }

    async fn route(&self, id: &str, route: MessageRoute) -> bool {
        let sender = self.connections.read().get(id).cloned();
        match sender {
            Some(sender) => sender.send(route).await.is_ok(),
            None => {
                debug!("Dropping message for disconnected client {}", id);
                false
            }
        }
    }
}
