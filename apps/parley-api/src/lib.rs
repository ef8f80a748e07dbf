pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod routes;

use std::sync::Arc;

use auth::identity::IdentityResolver;
use auth::service::{AuthService, JwtAuthService};
use clock::{Clock, SystemClock};
use config::Config;
use db::account_store::{AccountStore, MemoryAccountStore, PgAccountStore};
use db::message_store::{MemoryMessageStore, MessageStore, PgMessageStore};
use db::pool::DbPool;
use gateway::fanout::{spawn_typing_sweeper, BroadcastRouter};
use gateway::presence::PresenceRegistry;
use gateway::reply_queue::ReplyQueue;
use parley_common::SnowflakeGenerator;

/// Node id baked into message snowflakes. Parley runs as a single process.
const SNOWFLAKE_NODE_ID: u16 = 0;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub messages: Arc<dyn MessageStore>,
    pub auth: Arc<dyn AuthService>,
    pub identity: IdentityResolver,
    pub router: Arc<BroadcastRouter>,
}

impl AppState {
    /// Wire services together and start the background workers (bot reply
    /// delivery and the typing sweeper). Must be called inside a Tokio runtime.
    pub fn new(
        config: Config,
        messages: Arc<dyn MessageStore>,
        accounts: Arc<dyn AccountStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let auth: Arc<dyn AuthService> = Arc::new(JwtAuthService::new(
            accounts,
            &config.jwt_secret,
            config.token_ttl_secs,
        ));

        let (replies, reply_worker) = ReplyQueue::new(config.bot_reply_delay);
        let router = Arc::new(BroadcastRouter::new(
            Arc::new(PresenceRegistry::new()),
            messages.clone(),
            clock,
            SnowflakeGenerator::new(SNOWFLAKE_NODE_ID),
            replies,
        ));

        reply_worker.spawn(Arc::downgrade(&router));
        spawn_typing_sweeper(Arc::downgrade(&router), config.typing_timeout);

        Self {
            config: Arc::new(config),
            messages,
            identity: IdentityResolver::new(auth.clone()),
            auth,
            router,
        }
    }

    /// State backed by PostgreSQL.
    pub fn with_database(config: Config, db: DbPool) -> Self {
        Self::new(
            config,
            Arc::new(PgMessageStore::new(db.clone())),
            Arc::new(PgAccountStore::new(db)),
            Arc::new(SystemClock::new()),
        )
    }

    /// State backed by process-local stores. Nothing survives a restart.
    pub fn in_memory(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(MemoryMessageStore::new()),
            Arc::new(MemoryAccountStore::new()),
            Arc::new(SystemClock::new()),
        )
    }
}
