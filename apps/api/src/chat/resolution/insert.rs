use tracing::info;

use super::INSERT_PROMPT;
use crate::chat::error::ChatError;
use crate::chat::payload::{ContentPayload, StagedAction};
use crate::chat::ChatService;
use crate::extraction::types::InsertCandidates;

/// Packages candidates as they came from the extractor. No repository access.
pub(crate) fn stage_insert(candidates: InsertCandidates) -> ContentPayload {
    ContentPayload::confirmation(INSERT_PROMPT, StagedAction::Insert(candidates))
}

impl ChatService {
    pub(crate) async fn resolve_insert(&self, text: &str) -> Result<ContentPayload, ChatError> {
        let candidates = self.extract(self.gateway.extract_insert(text)).await?;
        info!(
            candidates = candidates.expenses.len(),
            "Staged insert confirmation"
        );
        Ok(stage_insert(candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::types::ExpenseCandidate;
    use crate::test_support::{Harness, StubGateway};

    fn candidate(description: Option<&str>, amount: Option<i64>) -> ExpenseCandidate {
        ExpenseCandidate {
            description: description.map(str::to_string),
            amount,
            expense_date: None,
        }
    }

    #[tokio::test]
    async fn test_insert_stages_every_candidate_unchanged() {
        let extracted = InsertCandidates {
            expenses: vec![
                candidate(Some("ăn sáng"), Some(-25000)),
                candidate(None, Some(15_000_000)),
                candidate(Some("gửi xe"), None),
            ],
        };
        let harness = Harness::new(StubGateway::default().with_insert(extracted.clone()));

        let payload = harness.service.resolve_insert("...").await.unwrap();

        match payload {
            ContentPayload::ConfirmationRequest(c) => {
                assert_eq!(c.prompt, INSERT_PROMPT);
                assert_eq!(c.action, StagedAction::Insert(extracted));
            }
            other => panic!("expected confirmation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_insert_never_writes_expenses() {
        let harness = Harness::new(
            StubGateway::default().with_insert(InsertCandidates {
                expenses: vec![candidate(Some("cà phê"), Some(-30000))],
            }),
        );

        harness.service.resolve_insert("cà phê 30k").await.unwrap();

        assert!(harness.expenses.all_rows().is_empty());
    }

    #[tokio::test]
    async fn test_insert_with_no_candidates_still_confirms() {
        let harness = Harness::new(StubGateway::default());

        let payload = harness.service.resolve_insert("hmm").await.unwrap();

        assert_eq!(payload, stage_insert(InsertCandidates::default()));
    }
}
