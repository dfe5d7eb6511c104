//! Message types and delivery plumbing between chat channels and the
//! assistant.
//!
//! Channels are outside this workspace; they connect through the
//! serializable message types here and a clonable [`MessageBus`] handle.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A message arriving from a chat channel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// The channel this message arrived on.
    pub channel: String,
    /// The channel-scoped sender identifier.
    pub sender_id: String,
    /// The conversation the message belongs to.
    pub chat_id: String,
    /// The message text.
    pub content: String,
    /// Paths of media attached to the message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<String>,
    /// The key under which conversation state is kept.
    pub session_key: String,
    /// Channel-specific extras.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// A message to be delivered to a chat channel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// The channel to deliver on.
    pub channel: String,
    /// The conversation to deliver to.
    pub chat_id: String,
    /// The message text.
    pub content: String,
    /// Path of a file to deliver, when the channel supports it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_path: String,
    /// Display name for the delivered file.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_name: String,
}

/// A clonable handle for publishing outbound messages.
///
/// Publishing is fire-and-forget: the queue is unbounded and a message
/// published after the consuming end is gone is silently dropped. Tools
/// hold a clone of this handle and never learn about delivery.
#[derive(Clone)]
pub struct MessageBus {
    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl MessageBus {
    /// Creates a bus and the receiving end its consumer drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        (Self { outbound_tx }, outbound_rx)
    }

    /// Publishes an outbound message.
    pub fn publish_outbound(&self, msg: OutboundMessage) {
        if self.outbound_tx.send(msg).is_err() {
            debug!("outbound consumer is gone, message dropped");
        }
    }
}
