use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;

/// Raw `messages` row. `content` is decoded into a typed payload by the ledger.
#[derive(Debug, Clone, FromRow)]
pub struct MessageRow {
    pub id: i64,
    pub user_id: i64,
    pub role: String,
    pub content: Value,
    pub created_at: DateTime<Utc>,
}
