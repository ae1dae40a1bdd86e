use tracing::info;

use super::{delete_prompt, DELETE_MISSING_CRITERIA, DELETE_NO_MATCH};
use crate::chat::error::ChatError;
use crate::chat::payload::{ContentPayload, StagedAction};
use crate::chat::ChatService;
use crate::expenses::repository::{ExpenseFilter, SortField, SortOrder};
use crate::extraction::types::DeleteCriteria;
use crate::models::expense::ExpenseSummary;

/// Explicit ids win over a date range. `None` when neither was given.
fn delete_filter(criteria: &DeleteCriteria) -> Option<ExpenseFilter> {
    let filter = if !criteria.delete_ids.is_empty() {
        ExpenseFilter::by_ids(&criteria.delete_ids)
    } else if criteria.start_date.is_some() || criteria.end_date.is_some() {
        ExpenseFilter::by_dates(criteria.start_date, criteria.end_date)
    } else {
        return None;
    };
    Some(filter.sorted(SortField::Id, SortOrder::Asc))
}

impl ChatService {
    /// Lists every matching record for confirmation. Read-only.
    pub(crate) async fn resolve_delete(
        &self,
        user_id: i64,
        text: &str,
    ) -> Result<ContentPayload, ChatError> {
        let criteria = self.extract(self.gateway.extract_delete(text)).await?;

        let Some(filter) = delete_filter(&criteria) else {
            return Ok(ContentPayload::message(DELETE_MISSING_CRITERIA));
        };

        let matches = self.store(self.expenses.filter(user_id, &filter)).await?;
        if matches.is_empty() {
            return Ok(ContentPayload::message(DELETE_NO_MATCH));
        }

        info!(user_id, matches = matches.len(), "Staged delete confirmation");
        let staged: Vec<ExpenseSummary> = matches.iter().map(ExpenseSummary::from).collect();
        Ok(ContentPayload::confirmation(
            delete_prompt(staged.len()),
            StagedAction::Delete(staged),
        ))
    }
}
