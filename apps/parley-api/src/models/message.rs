use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::schema::messages;

/// A persisted chat message. Immutable once stored.
///
/// Serialises as `{ id, user, text, createdAt }`. The snowflake `id` is sent
/// as a string so JavaScript clients keep full precision.
#[derive(
    Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable, Serialize, Deserialize, ToSchema,
)]
#[diesel(table_name = messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(with = "snowflake_string")]
    #[schema(value_type = String)]
    pub id: i64,
    #[diesel(column_name = sender)]
    pub user: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

mod snowflake_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}
