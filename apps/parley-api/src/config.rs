use std::time::Duration;

/// Parley server configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP/WebSocket server binds to.
    pub port: u16,
    /// PostgreSQL connection string. `None` runs on in-memory stores.
    pub database_url: Option<String>,
    /// HS256 secret used to sign identity tokens.
    pub jwt_secret: String,
    /// Identity token lifetime in seconds.
    pub token_ttl_secs: u64,
    /// Pacing delay before the auto-responder's reply is broadcast.
    pub bot_reply_delay: Duration,
    /// A typing flag with no renewed activity for this long is cleared.
    pub typing_timeout: Duration,
    /// Interval between server pings on each gateway connection.
    pub heartbeat_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self {
            port: parsed_var("PORT").unwrap_or(4000),
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            jwt_secret: required_var("JWT_SECRET"),
            token_ttl_secs: parsed_var("TOKEN_TTL_SECS").unwrap_or(7 * 24 * 3600),
            bot_reply_delay: Duration::from_millis(parsed_var("BOT_REPLY_DELAY_MS").unwrap_or(700)),
            typing_timeout: interval_var("TYPING_TIMEOUT_MS", 5000),
            heartbeat_interval: interval_var("HEARTBEAT_INTERVAL_MS", 30_000),
        }
    }

    /// In-memory configuration with the stock timings. Used by tests and local tooling.
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            port: 0,
            database_url: None,
            jwt_secret: jwt_secret.into(),
            token_ttl_secs: 3600,
            bot_reply_delay: Duration::from_millis(700),
            typing_timeout: Duration::from_millis(5000),
            heartbeat_interval: Duration::from_millis(30_000),
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| panic!("{name} env var is required"))
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// A non-zero millisecond interval. Zero or garbage falls back to `default_ms`.
fn interval_var(name: &str, default_ms: u64) -> Duration {
    let ms = parsed_var(name).filter(|ms: &u64| *ms > 0).unwrap_or(default_ms);
    Duration::from_millis(ms)
}
