use std::sync::Arc;

use crate::auth::JwtVerifier;
use crate::chat::ChatService;
use crate::expenses::repository::ExpenseRepository;
use crate::messages::ledger::MessageLedger;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
    /// Used directly by the apply, list and statistics endpoints.
    pub expenses: Arc<dyn ExpenseRepository>,
    pub ledger: Arc<dyn MessageLedger>,
    pub jwt: JwtVerifier,
}
