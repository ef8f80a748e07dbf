//! Account records backing signup and login.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use parking_lot::Mutex;

use crate::db::pool::DbPool;
use crate::db::schema::accounts;
use crate::error::ApiError;
use crate::models::account::Account;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account. Fails with 409 when the username is taken
    /// (case-insensitive).
    async fn create(&self, account: Account) -> Result<Account, ApiError>;

    /// Look up an account by username (case-insensitive).
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, ApiError>;
}

fn username_taken() -> ApiError {
    ApiError::conflict("Username is already taken")
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

pub struct PgAccountStore {
    db: DbPool,
}

impl PgAccountStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn create(&self, account: Account) -> Result<Account, ApiError> {
        let mut conn = self.db.get().await?;

        diesel::insert_into(accounts::table)
            .values(&account)
            .returning(Account::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => username_taken(),
                other => ApiError::from(other),
            })
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, ApiError> {
        let mut conn = self.db.get().await?;

        let account = accounts::table
            .filter(accounts::username_lower.eq(username.to_lowercase()))
            .select(Account::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(account)
    }
}

// ---------------------------------------------------------------------------
// In-memory (no DATABASE_URL, tests)
// ---------------------------------------------------------------------------

/// Accounts keyed by lowercased username.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<String, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn create(&self, account: Account) -> Result<Account, ApiError> {
        let mut accounts = self.accounts.lock();
        if accounts.contains_key(&account.username_lower) {
            return Err(username_taken());
        }
        accounts.insert(account.username_lower.clone(), account.clone());
        Ok(account)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, ApiError> {
        Ok(self.accounts.lock().get(&username.to_lowercase()).cloned())
    }
}
