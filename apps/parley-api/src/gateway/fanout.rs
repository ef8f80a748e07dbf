//! Fanout of chat, typing and system events to live sessions.
//!
//! Every event is serialized once and queued on each target session's writer.
//! Delivery is fire-and-forget per destination: a closed session is skipped
//! and never blocks the others.

use std::sync::{Arc, Weak};
use std::time::Duration;

use axum::extract::ws::Utf8Bytes;
use parley_common::SnowflakeGenerator;
use tokio::task::JoinHandle;
use tokio::time;

use crate::clock::Clock;
use crate::db::message_store::MessageStore;
use crate::error::ApiError;
use crate::models::message::ChatMessage;

use super::events::{ChatPayload, ServerEvent};
use super::presence::PresenceRegistry;
use super::reply_queue::ReplyQueue;
use super::responder::{self, BOT_NAME};
use super::session::Session;

pub const JOIN_NOTICE: &str = "🔵 A user joined the chat";
pub const LEAVE_NOTICE: &str = "🔴 A user left the chat";

pub struct BroadcastRouter {
    presence: Arc<PresenceRegistry>,
    store: Arc<dyn MessageStore>,
    clock: Arc<dyn Clock>,
    ids: SnowflakeGenerator,
    replies: ReplyQueue,
}

impl BroadcastRouter {
    pub fn new(
        presence: Arc<PresenceRegistry>,
        store: Arc<dyn MessageStore>,
        clock: Arc<dyn Clock>,
        ids: SnowflakeGenerator,
        replies: ReplyQueue,
    ) -> Self {
        Self {
            presence,
            store,
            clock,
            ids,
            replies,
        }
    }

    pub fn presence(&self) -> &Arc<PresenceRegistry> {
        &self.presence
    }

    /// Handle a `chatMessage` frame.
    ///
    /// A persistence failure drops the message: it is logged and nothing is
    /// broadcast.
    pub async fn on_chat(&self, session: &Session, payload: ChatPayload) -> Option<ChatMessage> {
        let sender = effective_sender(session, payload.user.as_deref());
        let text = payload.text.unwrap_or_default();

        match self.submit(sender, text).await {
            Ok(message) => Some(message),
            Err(err) => {
                tracing::warn!(session_id = %session.id, %err, "chat message dropped");
                None
            }
        }
    }

    /// Persist a message, broadcast it to every session (sender included)
    /// and schedule a bot reply when one applies.
    pub async fn submit(&self, sender: String, text: String) -> Result<ChatMessage, ApiError> {
        let stored = self.persist(sender, text).await?;

        self.broadcast(&self.presence.all(), &ServerEvent::message(stored.clone()));

        if stored.user != BOT_NAME {
            if let Some(reply) = responder::respond(&stored.text, &stored.user, stored.created_at) {
                self.replies.schedule(reply);
            }
        }

        Ok(stored)
    }

    /// Persist and broadcast a bot reply. Failures are logged and swallowed.
    pub async fn deliver_reply(&self, text: String) {
        match self.persist(BOT_NAME.to_string(), text).await {
            Ok(stored) => self.broadcast(&self.presence.all(), &ServerEvent::message(stored)),
            Err(err) => tracing::warn!(%err, "bot reply dropped"),
        }
    }

    /// Handle a `typing` frame. Only the first start signal of a burst is
    /// relayed.
    pub fn on_typing(&self, session: &Session, declared: Option<&str>) {
        let name = typing_name(session, declared);
        if self.presence.start_typing(&session.id, name) {
            self.broadcast(&self.presence.all_except(&session.id), &ServerEvent::typing(name));
        }
    }

    /// Handle a `stopTyping` frame. Always relayed.
    pub fn on_stop_typing(&self, session: &Session, declared: Option<&str>) {
        let name = typing_name(session, declared);
        self.presence.stop_typing(&session.id);
        self.broadcast(&self.presence.all_except(&session.id), &ServerEvent::stop_typing(name));
    }

    /// Announce a newly registered session to everyone else.
    pub fn on_connect(&self, session: &Session) {
        self.broadcast(&self.presence.all_except(&session.id), &ServerEvent::system(JOIN_NOTICE));
    }

    /// Remove a session and announce its departure to the sessions that remain.
    ///
    /// A typing flag still set is cleared for the others first.
    /// Returns `false` (and emits nothing) if the session was already gone.
    pub fn on_disconnect(&self, session: &Session) -> bool {
        let Some(departed) = self.presence.unregister(&session.id) else {
            return false;
        };
        let remaining = self.presence.all();
        if let Some(name) = departed.typing_as {
            self.broadcast(&remaining, &ServerEvent::stop_typing(&name));
        }
        self.broadcast(&remaining, &ServerEvent::system(LEAVE_NOTICE));
        true
    }

    /// Clear typing flags idle longer than `idle` and tell the other sessions.
    pub fn expire_typing(&self, idle: Duration) {
        for expired in self.presence.sweep_typing(idle) {
            tracing::debug!(session_id = %expired.session_id, "typing indicator expired");
            self.broadcast(
                &self.presence.all_except(&expired.session_id),
                &ServerEvent::stop_typing(&expired.display_name),
            );
        }
    }

    async fn persist(&self, sender: String, text: String) -> Result<ChatMessage, ApiError> {
        let message = ChatMessage {
            id: self.ids.generate(),
            user: sender,
            text,
            created_at: self.clock.now(),
        };
        self.store.append(message).await
    }

    fn broadcast(&self, targets: &[Arc<Session>], event: &ServerEvent) {
        let frame: Utf8Bytes = match serde_json::to_string(event) {
            Ok(json) => json.into(),
            Err(err) => {
                tracing::error!(%err, "failed to serialize gateway event");
                return;
            }
        };

        for session in targets {
            if !session.send_text(frame.clone()) {
                tracing::debug!(session_id = %session.id, "skipping closed session");
            }
        }
    }
}

/// Authenticated sessions always post under their verified name. Anonymous
/// ones may name themselves per message.
fn effective_sender(session: &Session, declared: Option<&str>) -> String {
    if session.is_authenticated() {
        return session.name().to_string();
    }
    declared
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(session.name())
        .to_string()
}

/// Typing hints carry the client's declared name, even when authenticated.
fn typing_name<'a>(session: &'a Session, declared: Option<&'a str>) -> &'a str {
    declared
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(session.name())
}

/// Periodically expire stale typing flags. Stops once the router is dropped.
pub fn spawn_typing_sweeper(router: Weak<BroadcastRouter>, idle: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval((idle / 2).max(Duration::from_millis(1)));
        loop {
            ticker.tick().await;
            let Some(router) = router.upgrade() else {
                break;
            };
            router.expire_typing(idle);
        }
    })
}
