//! In-memory registry of live sessions and their typing state.
//!
//! Entries are keyed by session id. Typing flags are scoped to a session and
//! vanish with it; a flag left set without fresh activity is expired by
//! [`PresenceRegistry::sweep_typing`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use super::session::Session;

struct Presence {
    session: Arc<Session>,
    /// Registration order, used to keep fanout order stable.
    joined_seq: u64,
    typing: Option<TypingState>,
}

struct TypingState {
    /// Name the client asked to be shown under.
    display_name: String,
    last_activity: Instant,
}

/// What a removed session left behind.
pub struct Departed {
    /// Display name of a typing flag that was still set when it left.
    pub typing_as: Option<String>,
}

/// A typing flag cleared by the sweeper.
pub struct ExpiredTyping {
    pub session_id: String,
    pub display_name: String,
}

/// Thread-safe, DashMap-backed session registry.
#[derive(Default)]
pub struct PresenceRegistry {
    inner: DashMap<String, Presence>,
    next_seq: AtomicU64,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session. Registering an already-present session is a no-op.
    ///
    /// Returns `true` if the session was newly added.
    pub fn register(&self, session: Arc<Session>) -> bool {
        let mut added = false;
        self.inner.entry(session.id.clone()).or_insert_with(|| {
            added = true;
            Presence {
                session,
                joined_seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                typing: None,
            }
        });
        added
    }

    /// Remove a session together with its typing state.
    ///
    /// Returns `Some` only for the call that actually removed it.
    pub fn unregister(&self, session_id: &str) -> Option<Departed> {
        let (_, presence) = self.inner.remove(session_id)?;
        Some(Departed {
            typing_as: presence.typing.map(|t| t.display_name),
        })
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.inner.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Start or refresh a session's typing flag.
    ///
    /// Returns `true` on the idle to typing transition. Repeated starts only
    /// refresh the activity timestamp.
    pub fn start_typing(&self, session_id: &str, display_name: &str) -> bool {
        let Some(mut entry) = self.inner.get_mut(session_id) else {
            return false;
        };
        let was_typing = entry.typing.is_some();
        entry.typing = Some(TypingState {
            display_name: display_name.to_string(),
            last_activity: Instant::now(),
        });
        !was_typing
    }

    /// Clear a session's typing flag. Returns `true` if it was set.
    pub fn stop_typing(&self, session_id: &str) -> bool {
        self.inner
            .get_mut(session_id)
            .and_then(|mut entry| entry.typing.take())
            .is_some()
    }

    pub fn is_typing(&self, session_id: &str) -> bool {
        self.inner
            .get(session_id)
            .is_some_and(|entry| entry.typing.is_some())
    }

    /// Every registered session, in registration order.
    pub fn all(&self) -> Vec<Arc<Session>> {
        self.collect(|_| true)
    }

    /// Every registered session except `session_id`, in registration order.
    pub fn all_except(&self, session_id: &str) -> Vec<Arc<Session>> {
        self.collect(|id| id != session_id)
    }

    /// Clear typing flags idle for longer than `idle`.
    pub fn sweep_typing(&self, idle: Duration) -> Vec<ExpiredTyping> {
        let now = Instant::now();
        let mut expired = Vec::new();

        for mut entry in self.inner.iter_mut() {
            let stale = entry
                .typing
                .as_ref()
                .is_some_and(|t| now.duration_since(t.last_activity) > idle);
            if stale {
                if let Some(typing) = entry.typing.take() {
                    expired.push(ExpiredTyping {
                        session_id: entry.key().clone(),
                        display_name: typing.display_name,
                    });
                }
            }
        }

        expired
    }

    fn collect(&self, keep: impl Fn(&str) -> bool) -> Vec<Arc<Session>> {
        let mut sessions: Vec<(u64, Arc<Session>)> = self
            .inner
            .iter()
            .filter(|entry| keep(entry.key()))
            .map(|entry| (entry.joined_seq, entry.session.clone()))
            .collect();
        sessions.sort_by_key(|(seq, _)| *seq);
        sessions.into_iter().map(|(_, session)| session).collect()
    }
}
