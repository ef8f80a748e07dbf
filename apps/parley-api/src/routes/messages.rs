//! Message history and REST submission.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::models::message::ChatMessage;
use crate::AppState;

pub const DEFAULT_HISTORY_LIMIT: i64 = 100;
pub const MAX_HISTORY_LIMIT: i64 = 1000;

pub fn router() -> Router<AppState> {
    Router::new().route("/messages", get(list_messages).post(send_message))
}

// ---------------------------------------------------------------------------
// GET /api/messages
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListMessagesParams {
    /// Number of most recent messages to return (1 to 1000, default 100).
    #[param(value_type = Option<i64>)]
    pub limit: Option<String>,
}

/// Clamp a requested history size into the accepted range.
pub fn history_limit(raw: Option<&str>) -> Result<i64, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_HISTORY_LIMIT);
    };
    let requested: i64 = raw
        .parse()
        .map_err(|_| ApiError::validation(vec![FieldError::new("limit", "limit must be an integer")]))?;
    Ok(requested.clamp(1, MAX_HISTORY_LIMIT))
}

#[utoipa::path(
    get,
    path = "/api/messages",
    tag = "Messages",
    params(ListMessagesParams),
    responses(
        (status = 200, description = "Most recent messages, oldest first", body = Vec<ChatMessage>),
        (status = 400, description = "Invalid limit", body = ApiErrorBody),
    ),
)]
pub async fn list_messages(
    State(state): State<AppState>,
    Query(params): Query<ListMessagesParams>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let limit = history_limit(params.limit.as_deref())?;
    let messages = state.messages.recent(limit).await?;
    Ok(Json(messages))
}

// ---------------------------------------------------------------------------
// POST /api/messages
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub user: Option<String>,
    pub text: Option<String>,
}

/// Persist a message and broadcast it to every live gateway session, exactly
/// as if it had arrived over the socket.
#[utoipa::path(
    post,
    path = "/api/messages",
    tag = "Messages",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message stored and broadcast", body = ChatMessage),
        (status = 400, description = "Missing user or text", body = ApiErrorBody),
    ),
)]
pub async fn send_message(
    State(state): State<AppState>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    let user = body.user.as_deref().map(str::trim).filter(|u| !u.is_empty());

    let mut errors = Vec::new();
    if user.is_none() {
        errors.push(FieldError::new("user", "user is required"));
    }
    if body.text.is_none() {
        errors.push(FieldError::new("text", "text is required"));
    }
    let (Some(user), Some(text)) = (user, body.text) else {
        return Err(ApiError::validation(errors));
    };

    let message = state.router.submit(user.to_string(), text).await?;
    Ok((StatusCode::CREATED, Json(message)))
}
