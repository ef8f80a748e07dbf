use std::net::SocketAddr;
use std::path::Path;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parley_api::config::Config;
use parley_api::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (silently skipped if missing, env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let state = match config.database_url.clone() {
        Some(database_url) => {
            let url = database_url.clone();
            let applied = tokio::task::spawn_blocking(move || parley_api::db::run_migrations(&url))
                .await
                .expect("migration task panicked")
                .expect("failed to run migrations");
            for migration in &applied {
                tracing::info!(%migration, "applied migration");
            }

            let db = parley_api::db::pool::connect(&database_url).expect("failed to build database pool");
            AppState::with_database(config, db)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, messages and accounts are kept in memory");
            AppState::in_memory(config)
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(parley_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "parley-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("parley-api stopped");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for ctrl+c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
