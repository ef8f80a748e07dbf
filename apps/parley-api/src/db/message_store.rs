//! Durable message storage: append and bounded history reads.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use parking_lot::Mutex;

use crate::db::pool::DbPool;
use crate::db::schema::messages;
use crate::error::ApiError;
use crate::models::message::ChatMessage;

/// Append-only message log consumed by the broadcast router and the history
/// endpoint.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message and return the stored copy.
    async fn append(&self, message: ChatMessage) -> Result<ChatMessage, ApiError>;

    /// The most recent `limit` messages, oldest first.
    async fn recent(&self, limit: i64) -> Result<Vec<ChatMessage>, ApiError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

pub struct PgMessageStore {
    db: DbPool,
}

impl PgMessageStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn append(&self, message: ChatMessage) -> Result<ChatMessage, ApiError> {
        let mut conn = self.db.get().await?;

        let stored = diesel::insert_into(messages::table)
            .values(&message)
            .returning(ChatMessage::as_returning())
            .get_result(&mut conn)
            .await?;

        Ok(stored)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<ChatMessage>, ApiError> {
        let mut conn = self.db.get().await?;

        let mut rows: Vec<ChatMessage> = messages::table
            .order(messages::id.desc())
            .limit(limit)
            .select(ChatMessage::as_select())
            .load(&mut conn)
            .await?;

        rows.reverse();
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// In-memory (no DATABASE_URL, tests)
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryMessageStore {
    rows: Mutex<Vec<ChatMessage>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn append(&self, message: ChatMessage) -> Result<ChatMessage, ApiError> {
        let mut rows = self.rows.lock();
        // Ids come from one snowflake generator, but keep the log sorted even
        // if a caller hands us an older id.
        let at = rows.partition_point(|m| m.id < message.id);
        rows.insert(at, message.clone());
        Ok(message)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<ChatMessage>, ApiError> {
        let rows = self.rows.lock();
        let take = usize::try_from(limit.max(0)).unwrap_or(usize::MAX).min(rows.len());
        Ok(rows[rows.len() - take..].to_vec())
    }
}
