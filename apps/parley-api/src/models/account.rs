use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db::schema::accounts;

/// A registered account. Only the auth service reads `password_hash`.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Account {
    pub id: String,
    pub username: String,
    pub username_lower: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
