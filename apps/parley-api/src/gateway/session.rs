//! Per-connection gateway session state.

use axum::extract::ws::{Message, Utf8Bytes};
use parley_common::id::{prefix, prefixed_ulid};
use tokio::sync::mpsc;

use crate::auth::identity::ResolvedIdentity;

/// Queue feeding a connection's writer task.
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

/// One live client connection.
///
/// Identity is fixed at admission and never changes.
#[derive(Debug)]
pub struct Session {
    /// Unique session identifier (`ses_` prefixed ULID).
    pub id: String,
    pub identity: ResolvedIdentity,
    outbound: ConnectionSender,
}

impl Session {
    pub fn new(identity: ResolvedIdentity, outbound: ConnectionSender) -> Self {
        Self {
            id: prefixed_ulid(prefix::SESSION),
            identity,
            outbound,
        }
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.authenticated
    }

    /// Queue a pre-serialized text frame. Returns `false` once the writer is gone.
    pub fn send_text(&self, text: Utf8Bytes) -> bool {
        self.send(Message::Text(text))
    }

    pub fn send(&self, message: Message) -> bool {
        self.outbound.send(message).is_ok()
    }
}
