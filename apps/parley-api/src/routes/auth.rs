//! Auth routes: account signup and login.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::service::AuthToken;
use crate::error::{ApiError, ApiErrorBody};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    pub username: String,
}

impl From<AuthToken> for TokenResponse {
    fn from(token: AuthToken) -> Self {
        Self {
            token: token.token,
            username: token.username,
        }
    }
}

// ---------------------------------------------------------------------------
// POST /api/signup
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/signup",
    tag = "Auth",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Account created", body = TokenResponse),
        (status = 400, description = "Missing or invalid fields", body = ApiErrorBody),
        (status = 409, description = "Username already taken", body = ApiErrorBody),
    ),
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let token = state.auth.signup(&body.username, &body.password).await?;
    Ok((StatusCode::CREATED, Json(token.into())))
}

// ---------------------------------------------------------------------------
// POST /api/login
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/login",
    tag = "Auth",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid username or password", body = ApiErrorBody),
    ),
)]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.auth.login(&body.username, &body.password).await?;
    Ok(Json(token.into()))
}
