use bytes::Bytes;
use tracing::{info, warn};

use super::error::ChatError;
use super::image::NormalizedImage;
use super::payload::{ChatExchange, ContentPayload, ConversationTurn, Role};
use super::resolution::{stage_insert, IMAGE_REJECTED};
use super::ChatService;
use crate::extraction::types::{ImageExtraction, IntentClassification};

impl ChatService {
    /// Records the user's text, classifies it and records the assistant's reply.
    ///
    /// The user turn is written before any gateway call and stays even when a later
    /// step fails. No assistant turn is written on failure.
    pub async fn handle_text_message(
        &self,
        user_id: i64,
        text: &str,
    ) -> Result<ChatExchange, ChatError> {
        let user_message = self
            .append(user_id, Role::User, ContentPayload::message(text))
            .await?;

        let intent = self.extract(self.gateway.classify(text)).await?;
        info!(user_id, ?intent, "Classified message");

        let reply = self.route(user_id, intent, text).await?;
        let assistant_message = self.append(user_id, Role::Assistant, reply).await?;

        Ok(ChatExchange {
            user_message,
            assistant_message,
        })
    }

    async fn route(
        &self,
        user_id: i64,
        intent: IntentClassification,
        text: &str,
    ) -> Result<ContentPayload, ChatError> {
        match intent {
            IntentClassification::Insert => self.resolve_insert(text).await,
            IntentClassification::Query => self.resolve_query(text).await,
            IntentClassification::Update => self.resolve_update(user_id, text).await,
            IntentClassification::Delete => self.resolve_delete(user_id, text).await,
            IntentClassification::Other => self.resolve_other(text).await,
        }
    }

    /// Stores a receipt photo, records it as the user turn and stages what it shows.
    ///
    /// Unsupported formats fail before storage or extraction is attempted.
    pub async fn handle_image_message(
        &self,
        user_id: i64,
        upload: Bytes,
    ) -> Result<ChatExchange, ChatError> {
        let image = NormalizedImage::from_bytes(upload)?;

        let url = self
            .images
            .store(user_id, &image)
            .await
            .map_err(|e| ChatError::ImageStorage(e.to_string()))?;

        let user_message = self
            .append(user_id, Role::User, ContentPayload::ImageReference { url })
            .await?;

        let extraction = self
            .extract(
                self.gateway
                    .extract_insert_from_image(&image.bytes, image.format.mime_type()),
            )
            .await?;

        let reply = match extraction {
            ImageExtraction::Rejected => {
                warn!(user_id, "Image is not a receipt or transfer record");
                ContentPayload::message(IMAGE_REJECTED)
            }
            ImageExtraction::Candidates(candidates) => {
                info!(
                    user_id,
                    candidates = candidates.expenses.len(),
                    "Staged insert confirmation from image"
                );
                stage_insert(self.image_policy.apply(candidates))
            }
        };

        let assistant_message = self.append(user_id, Role::Assistant, reply).await?;
        Ok(ChatExchange {
            user_message,
            assistant_message,
        })
    }

    /// Records a reply the client produced itself (for example a search summary).
    pub async fn handle_assistant_echo(
        &self,
        user_id: i64,
        text: &str,
    ) -> Result<ConversationTurn, ChatError> {
        self.append(user_id, Role::Assistant, ContentPayload::message(text))
            .await
    }

    /// Removes one of the caller's turns. Another user's turn counts as absent.
    pub async fn delete_turn(&self, user_id: i64, id: i64) -> Result<(), ChatError> {
        if self.store(self.ledger.delete_one(user_id, id)).await? {
            Ok(())
        } else {
            Err(ChatError::NotFound(format!("Message {id} not found")))
        }
    }
}
