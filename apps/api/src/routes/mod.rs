pub mod health;

use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;

use crate::expenses::handlers as expenses;
use crate::messages::handlers as messages;
use crate::state::AppState;

/// Success envelope expected by the mobile client: `{"msg": "Success", ...body}`.
#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub msg: &'static str,
    #[serde(flatten)]
    pub body: T,
}

pub fn success<T>(body: T) -> Json<Success<T>> {
    Json(Success {
        msg: "Success",
        body,
    })
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Conversation
        .route(
            "/api/v1/user/message",
            get(messages::handle_list_messages)
                .post(messages::handle_post_message)
                .delete(messages::handle_delete_all_messages),
        )
        .route(
            "/api/v1/user/message/image",
            post(messages::handle_post_image),
        )
        .route(
            "/api/v1/user/message/:id",
            delete(messages::handle_delete_message),
        )
        // Expenses: confirmation apply and browsing
        .route(
            "/api/v1/user/expenses",
            get(expenses::handle_list_expenses)
                .post(expenses::handle_add_expenses)
                .put(expenses::handle_bulk_delete),
        )
        .route(
            "/api/v1/user/expenses/:id",
            get(expenses::handle_get_expense)
                .put(expenses::handle_update_expense)
                .delete(expenses::handle_delete_expense),
        )
        // Statistics
        .route(
            "/api/v1/user/statistics/summary",
            get(expenses::handle_statistics_summary),
        )
        .route(
            "/api/v1/user/statistics/chart",
            get(expenses::handle_statistics_chart),
        )
        .with_state(state)
}
