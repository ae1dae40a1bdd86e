//! Conversational core: classifies each inbound message, resolves it into a staged
//! confirmation or a plain reply, and records both turns in the ledger.
//!
//! Nothing here mutates stored expenses. Applying a confirmation is a separate call.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::db::StoreError;
use crate::expenses::repository::ExpenseRepository;
use crate::extraction::{ExtractionError, ExtractionGateway};
use crate::messages::ledger::MessageLedger;

pub mod error;
pub mod image;
pub mod payload;
pub mod resolution;
mod router;

use error::ChatError;
use image::{ImageAmountPolicy, ImageStore};
use payload::{ContentPayload, ConversationTurn, Role};

/// Upper bounds on a single collaborator call.
#[derive(Debug, Clone, Copy)]
pub struct Deadlines {
    pub gateway: Duration,
    pub repository: Duration,
}

#[derive(Clone)]
pub struct ChatService {
    gateway: Arc<dyn ExtractionGateway>,
    expenses: Arc<dyn ExpenseRepository>,
    ledger: Arc<dyn MessageLedger>,
    images: Arc<dyn ImageStore>,
    deadlines: Deadlines,
    image_policy: ImageAmountPolicy,
}

impl ChatService {
    pub fn new(
        gateway: Arc<dyn ExtractionGateway>,
        expenses: Arc<dyn ExpenseRepository>,
        ledger: Arc<dyn MessageLedger>,
        images: Arc<dyn ImageStore>,
        deadlines: Deadlines,
    ) -> Self {
        Self {
            gateway,
            expenses,
            ledger,
            images,
            deadlines,
            image_policy: ImageAmountPolicy::default(),
        }
    }

    pub fn with_image_policy(mut self, policy: ImageAmountPolicy) -> Self {
        self.image_policy = policy;
        self
    }

    /// Runs one gateway call under the gateway deadline.
    async fn extract<T, F>(&self, call: F) -> Result<T, ChatError>
    where
        F: Future<Output = Result<T, ExtractionError>>,
    {
        match timeout(self.deadlines.gateway, call).await {
            Ok(result) => result.map_err(ChatError::from),
            Err(_) => Err(ChatError::ServiceTimeout(self.deadlines.gateway)),
        }
    }

    /// Runs one repository or ledger call under the repository deadline.
    async fn store<T, F>(&self, call: F) -> Result<T, ChatError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match timeout(self.deadlines.repository, call).await {
            Ok(result) => result.map_err(ChatError::from),
            Err(_) => Err(ChatError::RepositoryTimeout(self.deadlines.repository)),
        }
    }

    async fn append(
        &self,
        user_id: i64,
        role: Role,
        content: ContentPayload,
    ) -> Result<ConversationTurn, ChatError> {
        self.store(self.ledger.append(user_id, role, &content)).await
    }
}
