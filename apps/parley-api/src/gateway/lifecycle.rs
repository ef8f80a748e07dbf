//! Per-connection state machine.
//!
//! `Connecting -> IdentityResolved -> Active -> Disconnected`. Admission
//! finishes (registration plus join notice) before the first inbound frame
//! is dispatched, and leaving happens exactly once, either explicitly or
//! when the lifecycle is dropped.

use std::sync::Arc;

use crate::auth::identity::IdentityResolver;

use super::events::{ClientEvent, ReadyPayload, ServerEvent};
use super::fanout::BroadcastRouter;
use super::session::{ConnectionSender, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    IdentityResolved,
    Active,
    Disconnected,
}

pub struct ConnectionLifecycle {
    state: ConnectionState,
    session: Option<Arc<Session>>,
    router: Arc<BroadcastRouter>,
    resolver: IdentityResolver,
}

impl ConnectionLifecycle {
    pub fn new(router: Arc<BroadcastRouter>, resolver: IdentityResolver) -> Self {
        Self {
            state: ConnectionState::Connecting,
            session: None,
            router,
            resolver,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    /// Resolve identity, register the session and announce it.
    ///
    /// The `ready` frame is queued before the session becomes visible to
    /// fanout, so it is always the first frame the client sees.
    ///
    /// Calling this on an already admitted connection returns the existing
    /// session unchanged.
    pub async fn admit(
        &mut self,
        credential: Option<&str>,
        declared: Option<&str>,
        outbound: ConnectionSender,
    ) -> Arc<Session> {
        if let Some(session) = &self.session {
            return session.clone();
        }

        let identity = self.resolver.resolve(credential, declared).await;
        self.state = ConnectionState::IdentityResolved;

        let session = Arc::new(Session::new(identity, outbound));
        send_ready(&session);
        self.router.presence().register(session.clone());
        self.router.on_connect(&session);
        self.session = Some(session.clone());
        self.state = ConnectionState::Active;

        tracing::info!(
            session_id = %session.id,
            user = %session.name(),
            authenticated = session.is_authenticated(),
            "gateway session admitted"
        );
        session
    }

    /// Route one inbound event. Ignored unless the connection is active.
    pub async fn dispatch(&self, event: ClientEvent) {
        let (ConnectionState::Active, Some(session)) = (self.state, &self.session) else {
            return;
        };

        match event {
            ClientEvent::ChatMessage(payload) => {
                self.router.on_chat(session, payload).await;
            }
            ClientEvent::Typing(name) => self.router.on_typing(session, name.as_deref()),
            ClientEvent::StopTyping(name) => self.router.on_stop_typing(session, name.as_deref()),
        }
    }

    /// Leave the chat. Only the first call has any effect.
    pub fn disconnect(&mut self) -> bool {
        if self.state == ConnectionState::Disconnected {
            return false;
        }
        self.state = ConnectionState::Disconnected;

        let Some(session) = self.session.take() else {
            return false;
        };
        let left = self.router.on_disconnect(&session);
        if left {
            tracing::info!(session_id = %session.id, user = %session.name(), "gateway session ended");
        }
        left
    }
}

fn send_ready(session: &Session) {
    let ready = ServerEvent::Ready(ReadyPayload {
        session_id: session.id.clone(),
        user: session.name().to_string(),
        authenticated: session.is_authenticated(),
    });
    match serde_json::to_string(&ready) {
        Ok(json) => {
            session.send_text(json.into());
        }
        Err(err) => tracing::error!(%err, "failed to serialize ready event"),
    }
}

impl Drop for ConnectionLifecycle {
    fn drop(&mut self) {
        self.disconnect();
    }
}
