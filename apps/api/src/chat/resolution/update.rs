use tracing::info;

use super::{UPDATE_MISSING_ID, UPDATE_NOT_FOUND, UPDATE_PROMPT};
use crate::chat::error::ChatError;
use crate::chat::payload::{ContentPayload, StagedAction, UpdateProposal};
use crate::chat::ChatService;

impl ChatService {
    /// Confirms the target exists for this user before staging the change.
    pub(crate) async fn resolve_update(
        &self,
        user_id: i64,
        text: &str,
    ) -> Result<ContentPayload, ChatError> {
        let changes = self.extract(self.gateway.extract_update(text)).await?;

        let Some(id) = changes.id else {
            return Ok(ContentPayload::message(UPDATE_MISSING_ID));
        };

        let Some(original) = self.store(self.expenses.find(user_id, id)).await? else {
            info!(user_id, expense_id = id, "Update target not found");
            return Ok(ContentPayload::message(UPDATE_NOT_FOUND));
        };

        info!(user_id, expense_id = id, "Staged update confirmation");
        Ok(ContentPayload::confirmation(
            UPDATE_PROMPT,
            StagedAction::Update(UpdateProposal {
                original: (&original).into(),
                changes,
            }),
        ))
    }
}
