use tracing::info;

use super::QUERY_PROMPT;
use crate::chat::error::ChatError;
use crate::chat::payload::{ContentPayload, StagedAction};
use crate::chat::ChatService;

impl ChatService {
    /// Stages the extracted search criteria. The search itself runs through the list endpoint.
    pub(crate) async fn resolve_query(&self, text: &str) -> Result<ContentPayload, ChatError> {
        let criteria = self.extract(self.gateway.extract_query(text)).await?;
        info!(
            keywords = criteria.key_words.len(),
            "Staged query confirmation"
        );
        Ok(ContentPayload::confirmation(
            QUERY_PROMPT,
            StagedAction::Query(criteria),
        ))
    }
}
