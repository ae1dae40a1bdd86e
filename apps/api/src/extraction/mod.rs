//! Extraction gateway: turns free text or a receipt photo into structured parameters.
//!
//! `ExtractionGateway` is the seam the chat core depends on. `LlmExtractionGateway`
//! is the production backend; tests substitute a scripted stub.

use async_trait::async_trait;
use base64::Engine;
use thiserror::Error;
use tracing::debug;

use crate::llm_client::prompts::{
    with_shared_rules, JSON_ONLY_RULE, NO_FABRICATION_RULE, SIGN_CONVENTION_RULE,
};
use crate::llm_client::{LlmClient, LlmError, UserContent};
use crate::models::today;

pub mod prompts;
pub mod types;

use prompts::{
    with_today, CLASSIFY_SYSTEM, DELETE_SYSTEM, FREE_TEXT_SYSTEM, IMAGE_SYSTEM, IMAGE_USER_PROMPT,
    INSERT_SYSTEM, QUERY_SYSTEM, UPDATE_SYSTEM,
};
use types::{
    ClassifierReply, DeleteCriteria, FreeTextReply, ImageExtraction, ImageReply, InsertCandidates,
    InsertReply, IntentClassification, QueryCriteria, UpdateCandidate,
};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The classifier named a category outside the closed intent set.
    #[error("Unknown request type '{0}'")]
    UnknownIntent(String),
}

/// The natural-language extraction capability the chat core relies on.
///
/// Implementations must return absent fields rather than invented values when the
/// input does not contain the information.
#[async_trait]
pub trait ExtractionGateway: Send + Sync {
    async fn classify(&self, text: &str) -> Result<IntentClassification, ExtractionError>;

    async fn extract_insert(&self, text: &str) -> Result<InsertCandidates, ExtractionError>;

    async fn extract_query(&self, text: &str) -> Result<QueryCriteria, ExtractionError>;

    async fn extract_update(&self, text: &str) -> Result<UpdateCandidate, ExtractionError>;

    async fn extract_delete(&self, text: &str) -> Result<DeleteCriteria, ExtractionError>;

    async fn extract_insert_from_image(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<ImageExtraction, ExtractionError>;

    async fn free_text_reply(&self, text: &str) -> Result<String, ExtractionError>;
}

/// Gateway backed by the OpenAI-compatible model server.
#[derive(Clone)]
pub struct LlmExtractionGateway {
    llm: LlmClient,
}

impl LlmExtractionGateway {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    fn extraction_system(body: &str) -> String {
        with_shared_rules(
            body,
            &[SIGN_CONVENTION_RULE, NO_FABRICATION_RULE, JSON_ONLY_RULE],
        )
    }
}

#[async_trait]
impl ExtractionGateway for LlmExtractionGateway {
    async fn classify(&self, text: &str) -> Result<IntentClassification, ExtractionError> {
        let system = with_shared_rules(CLASSIFY_SYSTEM, &[JSON_ONLY_RULE]);
        let reply: ClassifierReply = self
            .llm
            .call_json(&system, UserContent::Text(text), 0.0)
            .await?;
        debug!("Classifier returned '{}'", reply.request_type);
        reply.request_type.parse()
    }

    async fn extract_insert(&self, text: &str) -> Result<InsertCandidates, ExtractionError> {
        let prompt = with_today(text, today());
        let reply: InsertReply = self
            .llm
            .call_json(
                &Self::extraction_system(INSERT_SYSTEM),
                UserContent::Text(&prompt),
                0.0,
            )
            .await?;
        Ok(reply.into())
    }

    async fn extract_query(&self, text: &str) -> Result<QueryCriteria, ExtractionError> {
        let prompt = with_today(text, today());
        Ok(self
            .llm
            .call_json(
                &Self::extraction_system(QUERY_SYSTEM),
                UserContent::Text(&prompt),
                0.0,
            )
            .await?)
    }

    async fn extract_update(&self, text: &str) -> Result<UpdateCandidate, ExtractionError> {
        let prompt = with_today(text, today());
        Ok(self
            .llm
            .call_json(
                &Self::extraction_system(UPDATE_SYSTEM),
                UserContent::Text(&prompt),
                0.0,
            )
            .await?)
    }

    async fn extract_delete(&self, text: &str) -> Result<DeleteCriteria, ExtractionError> {
        let prompt = with_today(text, today());
        Ok(self
            .llm
            .call_json(
                &Self::extraction_system(DELETE_SYSTEM),
                UserContent::Text(&prompt),
                0.0,
            )
            .await?)
    }

    async fn extract_insert_from_image(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<ImageExtraction, ExtractionError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let image_url = format!("data:{mime_type};base64,{encoded}");
        let prompt = IMAGE_USER_PROMPT.replace(
            "{today}",
            &today().format("%Y-%m-%d").to_string(),
        );

        let reply: ImageReply = self
            .llm
            .call_json(
                &Self::extraction_system(IMAGE_SYSTEM),
                UserContent::TextWithImage {
                    text: &prompt,
                    image_url: &image_url,
                },
                0.0,
            )
            .await?;
        Ok(reply.into())
    }

    async fn free_text_reply(&self, text: &str) -> Result<String, ExtractionError> {
        let prompt = with_today(text, today());
        let system = with_shared_rules(
            FREE_TEXT_SYSTEM,
            &["Respond as JSON: {\"response\": \"your answer\"}", JSON_ONLY_RULE],
        );
        let reply: FreeTextReply = self
            .llm
            .call_json(&system, UserContent::Text(&prompt), 0.5)
            .await?;
        reply
            .response
            .filter(|r| !r.trim().is_empty())
            .ok_or(ExtractionError::Llm(LlmError::EmptyContent))
    }
}
