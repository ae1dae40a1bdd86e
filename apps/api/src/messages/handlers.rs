use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::AuthUser;
use crate::chat::payload::{ChatExchange, ConversationTurn};
use crate::errors::AppError;
use crate::messages::ledger::DEFAULT_PAGE_LIMIT;
use crate::routes::{success, Success};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub before_id: Option<i64>,
}

#[derive(Serialize)]
pub struct Pagination {
    pub next_cursor: Option<i64>,
    pub has_more: bool,
}

#[derive(Serialize)]
pub struct MessagePage {
    pub messages: Vec<ConversationTurn>,
    pub pagination: Pagination,
}

/// GET /api/v1/user/message
pub async fn handle_list_messages(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<PageQuery>,
) -> Result<Json<Success<MessagePage>>, AppError> {
    let page = state
        .ledger
        .list_page(
            user_id,
            params.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            params.before_id,
        )
        .await?;

    Ok(success(MessagePage {
        messages: page.turns,
        pagination: Pagination {
            next_cursor: page.next_cursor,
            has_more: page.has_more,
        },
    }))
}

#[derive(Deserialize)]
pub struct PostMessageRequest {
    pub role: String,
    #[serde(default = "default_data_type")]
    pub data_type: String,
    #[serde(default)]
    pub content: String,
}

fn default_data_type() -> String {
    "text".to_string()
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum PostedMessage {
    Exchange(ChatExchange),
    Echo(ConversationTurn),
}

#[derive(Serialize)]
pub struct PostMessageResponse {
    pub response: PostedMessage,
}

/// POST /api/v1/user/message
pub async fn handle_post_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<PostMessageRequest>,
) -> Result<Json<Success<PostMessageResponse>>, AppError> {
    if req.data_type != "text" {
        return Err(AppError::Validation(
            "data_type must be 'text'; upload images to /message/image".to_string(),
        ));
    }
    let content = req.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("Empty message".to_string()));
    }

    let response = match req.role.as_str() {
        "user" => {
            PostedMessage::Exchange(state.chat.handle_text_message(user_id, content).await?)
        }
        "assistant" => {
            PostedMessage::Echo(state.chat.handle_assistant_echo(user_id, content).await?)
        }
        _ => return Err(AppError::Validation("Invalid role".to_string())),
    };

    Ok(success(PostMessageResponse { response }))
}

#[derive(Serialize)]
pub struct ImageMessageResponse {
    pub response: ChatExchange,
}

/// POST /api/v1/user/message/image
/// Multipart body with the photo in the `file` field.
pub async fn handle_post_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<Success<ImageMessageResponse>>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        info!(user_id, size = bytes.len(), "Received image message");

        let exchange = state.chat.handle_image_message(user_id, bytes).await?;
        return Ok(success(ImageMessageResponse { response: exchange }));
    }

    Err(AppError::Validation("No file uploaded".to_string()))
}

#[derive(Serialize)]
pub struct DeletedMessage {
    pub deleted_id: i64,
}

/// DELETE /api/v1/user/message/:id
pub async fn handle_delete_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Success<DeletedMessage>>, AppError> {
    state.chat.delete_turn(user_id, id).await?;
    Ok(success(DeletedMessage { deleted_id: id }))
}

#[derive(Serialize)]
pub struct DeleteCount {
    pub delete_count: u64,
}

/// DELETE /api/v1/user/message
pub async fn handle_delete_all_messages(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Success<DeleteCount>>, AppError> {
    let delete_count = state.ledger.delete_all(user_id).await?;
    info!(user_id, delete_count, "Cleared conversation");
    Ok(success(DeleteCount { delete_count }))
}
