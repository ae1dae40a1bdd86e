use async_trait::async_trait;
use sqlx::PgPool;

use crate::chat::payload::{ContentPayload, ConversationTurn, Role};
use crate::db::StoreError;
use crate::models::message::MessageRow;

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 50;

/// One newest-first page of a user's conversation.
#[derive(Debug, Clone)]
pub struct LedgerPage {
    pub turns: Vec<ConversationTurn>,
    pub has_more: bool,
    /// Id to pass as `before_id` for the next page.
    pub next_cursor: Option<i64>,
}

/// Append-only store of conversation turns. Every call is scoped by owner.
#[async_trait]
pub trait MessageLedger: Send + Sync {
    async fn append(
        &self,
        user_id: i64,
        role: Role,
        content: &ContentPayload,
    ) -> Result<ConversationTurn, StoreError>;

    async fn list_page(
        &self,
        user_id: i64,
        limit: i64,
        before_id: Option<i64>,
    ) -> Result<LedgerPage, StoreError>;

    /// Returns `false` when no turn with that id belongs to the user.
    async fn delete_one(&self, user_id: i64, id: i64) -> Result<bool, StoreError>;

    async fn delete_all(&self, user_id: i64) -> Result<u64, StoreError>;
}

/// Caps the requested page size; non-positive requests get the default.
pub fn clamp_limit(limit: i64) -> i64 {
    if limit <= 0 {
        DEFAULT_PAGE_LIMIT
    } else {
        limit.min(MAX_PAGE_LIMIT)
    }
}

/// Builds a page from up to `limit + 1` rows fetched newest first.
pub fn page_from_rows(mut turns: Vec<ConversationTurn>, limit: i64) -> LedgerPage {
    let limit = usize::try_from(limit).unwrap_or(0);
    let has_more = turns.len() > limit;
    turns.truncate(limit);
    let next_cursor = if has_more {
        turns.last().map(|t| t.id)
    } else {
        None
    };
    LedgerPage {
        turns,
        has_more,
        next_cursor,
    }
}

impl TryFrom<MessageRow> for ConversationTurn {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e: String| StoreError::Corrupt(format!("message {}: {e}", row.id)))?;
        let content: ContentPayload = serde_json::from_value(row.content)
            .map_err(|e| StoreError::Corrupt(format!("message {}: {e}", row.id)))?;
        Ok(ConversationTurn {
            id: row.id,
            user_id: row.user_id,
            role,
            content,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgMessageLedger {
    db: PgPool,
}

impl PgMessageLedger {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageLedger for PgMessageLedger {
    async fn append(
        &self,
        user_id: i64,
        role: Role,
        content: &ContentPayload,
    ) -> Result<ConversationTurn, StoreError> {
        let content = serde_json::to_value(content)
            .map_err(|e| StoreError::Corrupt(format!("unencodable payload: {e}")))?;

        let row: MessageRow = sqlx::query_as(
            r#"
            INSERT INTO messages (user_id, role, content)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, role, content, created_at
            "#,
        )
        .bind(user_id)
        .bind(role.as_str())
        .bind(content)
        .fetch_one(&self.db)
        .await?;

        row.try_into()
    }

    async fn list_page(
        &self,
        user_id: i64,
        limit: i64,
        before_id: Option<i64>,
    ) -> Result<LedgerPage, StoreError> {
        let limit = clamp_limit(limit);

        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, role, content, created_at
            FROM messages
            WHERE user_id = $1 AND ($2::BIGINT IS NULL OR id < $2)
            ORDER BY id DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(before_id)
        .bind(limit + 1)
        .fetch_all(&self.db)
        .await?;

        let turns = rows
            .into_iter()
            .map(ConversationTurn::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(page_from_rows(turns, limit))
    }

    async fn delete_one(&self, user_id: i64, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, user_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM messages WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}
