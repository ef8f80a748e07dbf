//! Gateway wire format.
//!
//! Every frame in either direction is a JSON text frame of the shape
//! `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};

use crate::models::message::ChatMessage;

/// Frames a client may send after admission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    ChatMessage(ChatPayload),
    /// Carries the name the client wants shown in the indicator.
    Typing(Option<String>),
    StopTyping(Option<String>),
}

impl ClientEvent {
    /// Parse a text frame. Unknown events and malformed JSON yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatPayload {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Frames the server sends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    Ready(ReadyPayload),
    ChatMessage(ChatBroadcast),
    Typing(TypingNotice),
    StopTyping(TypingNotice),
}

impl ServerEvent {
    pub fn system(text: &str) -> Self {
        Self::ChatMessage(ChatBroadcast::System(SystemNotice {
            system: true,
            text: text.to_string(),
        }))
    }

    pub fn message(message: ChatMessage) -> Self {
        Self::ChatMessage(ChatBroadcast::Message(message))
    }

    pub fn typing(user: &str) -> Self {
        Self::Typing(TypingNotice {
            user: user.to_string(),
        })
    }

    pub fn stop_typing(user: &str) -> Self {
        Self::StopTyping(TypingNotice {
            user: user.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyPayload {
    pub session_id: String,
    pub user: String,
    pub authenticated: bool,
}

/// A `chatMessage` payload: either a persisted message or an ephemeral notice.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChatBroadcast {
    Message(ChatMessage),
    System(SystemNotice),
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemNotice {
    pub system: bool,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypingNotice {
    pub user: String,
}
