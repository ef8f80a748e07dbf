pub mod auth;
pub mod health;
pub mod messages;

use axum::Router;
use utoipa::OpenApi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::gateway::server::router())
        .nest("/api", auth::router().merge(messages::router()))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Auth
        auth::signup,
        auth::login,
        // Messages
        messages::list_messages,
        messages::send_message,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            // Models
            crate::models::message::ChatMessage,
            // Route request/response types
            health::HealthResponse,
            auth::CredentialsRequest,
            auth::TokenResponse,
            messages::SendMessageRequest,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Auth", description = "Account signup and login"),
        (name = "Messages", description = "Chat history and submission"),
    )
)]
pub struct ApiDoc;
