//! Account signup/login and identity-token issuance.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::password::{hash_password, verify_password};
use crate::db::account_store::AccountStore;
use crate::error::{ApiError, FieldError};
use crate::models::account::Account;

/// Longest accepted username, in characters.
pub const MAX_USERNAME_LEN: usize = 32;

/// A freshly issued identity token and the account name it is bound to.
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub token: String,
    pub username: String,
}

/// Credential verification and token issuance.
///
/// The gateway only ever calls [`AuthService::verify`]; signup and login are
/// reached through the REST routes.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account and issue a token. 409 if the username is taken.
    async fn signup(&self, username: &str, password: &str) -> Result<AuthToken, ApiError>;

    /// Check credentials and issue a token. 401 on any mismatch.
    async fn login(&self, username: &str, password: &str) -> Result<AuthToken, ApiError>;

    /// Resolve a token to the username it was issued for.
    async fn verify(&self, token: &str) -> Result<String, ApiError>;
}

/// Claims embedded in identity tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Account id.
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// [`AuthService`] backed by an [`AccountStore`], Argon2id hashes and HS256 JWTs.
pub struct JwtAuthService {
    accounts: Arc<dyn AccountStore>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl_secs: i64,
}

impl JwtAuthService {
    pub fn new(accounts: Arc<dyn AccountStore>, secret: &str, token_ttl_secs: u64) -> Self {
        Self {
            accounts,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl_secs: i64::try_from(token_ttl_secs).unwrap_or(i64::MAX),
        }
    }

    fn issue(&self, account: &Account) -> Result<AuthToken, ApiError> {
        let now = Utc::now();
        let claims = IdentityClaims {
            sub: account.id.clone(),
            username: account.username.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.token_ttl_secs)).timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| {
                tracing::error!(?e, "token signing failed");
                ApiError::internal("Failed to issue token")
            })?;

        Ok(AuthToken {
            token,
            username: account.username.clone(),
        })
    }
}

fn validate_credentials(username: &str, password: &str) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if username.is_empty() {
        errors.push(FieldError::new("username", "Username is required"));
    } else if username.chars().count() > MAX_USERNAME_LEN {
        errors.push(FieldError::new(
            "username",
            format!("Username must be {MAX_USERNAME_LEN} characters or fewer"),
        ));
    }
    if password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(errors))
    }
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("Invalid username or password")
}

#[async_trait]
impl AuthService for JwtAuthService {
    async fn signup(&self, username: &str, password: &str) -> Result<AuthToken, ApiError> {
        let username = username.trim();
        validate_credentials(username, password)?;

        let account = Account {
            id: parley_common::id::prefixed_ulid(parley_common::id::prefix::ACCOUNT),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            password_hash: hash_password(password)?,
            created_at: Utc::now(),
        };

        let account = self.accounts.create(account).await?;
        tracing::info!(account_id = %account.id, username = %account.username, "account registered");

        self.issue(&account)
    }

    async fn login(&self, username: &str, password: &str) -> Result<AuthToken, ApiError> {
        let username = username.trim();
        validate_credentials(username, password)?;

        let account = self
            .accounts
            .find_by_username(username)
            .await?
            .ok_or_else(invalid_credentials)?;

        if !verify_password(password, &account.password_hash)? {
            return Err(invalid_credentials());
        }

        tracing::info!(account_id = %account.id, username = %account.username, "account logged in");

        self.issue(&account)
    }

    async fn verify(&self, token: &str) -> Result<String, ApiError> {
        let data = jsonwebtoken::decode::<IdentityClaims>(
            token,
            &self.decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| {
            tracing::debug!(?e, "identity token rejected");
            ApiError::unauthorized("Invalid or expired token")
        })?;

        Ok(data.claims.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::account_store::MemoryAccountStore;
    use axum::http::StatusCode;

    fn service() -> JwtAuthService {
        JwtAuthService::new(Arc::new(MemoryAccountStore::new()), "test-secret", 3600)
    }

    #[tokio::test]
    async fn signup_issues_a_verifiable_token() {
        let auth = service();
        let issued = auth.signup("  Alice ", "hunter22").await.unwrap();
        assert_eq!(issued.username, "Alice");
        assert_eq!(auth.verify(&issued.token).await.unwrap(), "Alice");
    }

    #[tokio::test]
    async fn signup_rejects_taken_username() {
        let auth = service();
        auth.signup("alice", "pw1").await.unwrap();
        let err = auth.signup("ALICE", "pw2").await.unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn signup_requires_both_fields() {
        let auth = service();
        let err = auth.signup("   ", "").await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.details.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn login_checks_password() {
        let auth = service();
        auth.signup("bob", "right").await.unwrap();

        let issued = auth.login("Bob", "right").await.unwrap();
        assert_eq!(issued.username, "bob");

        let err = auth.login("bob", "wrong").await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let err = auth.login("nobody", "right").await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn verify_rejects_foreign_and_expired_tokens() {
        let auth = service();
        let other = JwtAuthService::new(Arc::new(MemoryAccountStore::new()), "other-secret", 3600);
        let foreign = other.signup("carol", "pw").await.unwrap();
        assert!(auth.verify(&foreign.token).await.is_err());

        // Expired beyond the default validation leeway.
        let claims = IdentityClaims {
            sub: "acc_test".to_string(),
            username: "dave".to_string(),
            iat: Utc::now().timestamp() - 600,
            exp: Utc::now().timestamp() - 300,
        };
        let expired =
            jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &auth.encoding).unwrap();
        assert!(auth.verify(&expired).await.is_err());

        assert!(auth.verify("garbage").await.is_err());
    }
}
