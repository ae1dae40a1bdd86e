use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::expenses::repository::{ExpenseFilter, SortField, SortOrder};
use crate::expenses::statistics::{self, ChartData, StatisticsSummary, StatsRange, DEFAULT_TOP};
use crate::models::expense::{ExpensePatch, ExpenseRow, NewExpense};
use crate::models::today;
use crate::routes::{success, Success};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 50;

/// Raw list parameters. Every value arrives as text so empty strings from the
/// client can be treated as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub keyword: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_amount: Option<String>,
    pub max_amount: Option<String>,
    pub sort_field: Option<String>,
    pub sort_order: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_param<T: FromStr>(value: &Option<String>, name: &str) -> Result<Option<T>, AppError> {
    present(value)
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| AppError::Validation(format!("Invalid {name}: '{v}'")))
        })
        .transpose()
}

#[derive(Debug, PartialEq)]
struct ListRequest {
    page: i64,
    page_size: i64,
    offset: i64,
    filter: ExpenseFilter,
}

impl TryFrom<&ListParams> for ListRequest {
    type Error = AppError;

    fn try_from(params: &ListParams) -> Result<Self, AppError> {
        let page = parse_param::<i64>(&params.page, "page")?
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        let page_size = parse_param::<i64>(&params.page_size, "pageSize")?
            .filter(|s| (1..=MAX_PAGE_SIZE).contains(s))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let offset = (page - 1)
            .checked_mul(page_size)
            .ok_or_else(|| AppError::Validation(format!("page {page} is out of range")))?;

        let filter = ExpenseFilter {
            start_date: parse_param::<NaiveDate>(&params.start_date, "startDate")?,
            end_date: parse_param::<NaiveDate>(&params.end_date, "endDate")?,
            min_amount: parse_param::<i64>(&params.min_amount, "minAmount")?,
            max_amount: parse_param::<i64>(&params.max_amount, "maxAmount")?,
            keywords: present(&params.keyword)
                .map(|k| vec![k.to_string()])
                .unwrap_or_default(),
            ..ExpenseFilter::default()
        }
        .sorted(
            SortField::parse_or_default(present(&params.sort_field)),
            SortOrder::parse_or_default(present(&params.sort_order)),
        );

        Ok(Self {
            page,
            page_size,
            offset,
            filter,
        })
    }
}

#[derive(Serialize)]
pub struct ExpensePage {
    pub expenses: Vec<ExpenseRow>,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub total_records: i64,
}

/// GET /api/v1/user/expenses
pub async fn handle_list_expenses(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Success<ExpensePage>>, AppError> {
    let req = ListRequest::try_from(&params)?;

    let total_records = state.expenses.count(user_id, &req.filter).await?;
    let expenses = state
        .expenses
        .filter(user_id, &req.filter.paged(req.page_size, req.offset))
        .await?;

    Ok(success(ExpensePage {
        expenses,
        page: req.page,
        page_size: req.page_size,
        total_pages: (total_records + req.page_size - 1) / req.page_size,
        total_records,
    }))
}

#[derive(Serialize)]
pub struct ExpenseBody {
    pub expense: ExpenseRow,
}

/// GET /api/v1/user/expenses/:id
pub async fn handle_get_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Success<ExpenseBody>>, AppError> {
    let expense = state
        .expenses
        .find(user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Expense {id} not found")))?;
    Ok(success(ExpenseBody { expense }))
}

#[derive(Deserialize)]
pub struct AddExpensesRequest {
    pub expenses: Vec<NewExpense>,
}

#[derive(Serialize)]
pub struct AddedExpenses {
    pub added_expenses: Vec<ExpenseRow>,
}

/// POST /api/v1/user/expenses
/// Applies an accepted insert confirmation. All rows land or none do.
pub async fn handle_add_expenses(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<AddExpensesRequest>,
) -> Result<Json<Success<AddedExpenses>>, AppError> {
    if req.expenses.is_empty() {
        return Err(AppError::Validation("No expenses to add".to_string()));
    }
    if let Some(blank) = req.expenses.iter().find(|e| e.description.trim().is_empty()) {
        return Err(AppError::Validation(format!(
            "Expense dated {} has no description",
            blank.expense_date
        )));
    }

    let added_expenses = state.expenses.insert_many(user_id, &req.expenses).await?;
    info!(user_id, count = added_expenses.len(), "Added expenses");
    Ok(success(AddedExpenses { added_expenses }))
}

#[derive(Serialize)]
pub struct UpdatedExpense {
    pub updated_expense: ExpenseRow,
}

/// PUT /api/v1/user/expenses/:id
pub async fn handle_update_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Json(patch): Json<ExpensePatch>,
) -> Result<Json<Success<UpdatedExpense>>, AppError> {
    if patch.is_empty() {
        return Err(AppError::Validation("Nothing to update".to_string()));
    }
    let updated_expense = state
        .expenses
        .update(user_id, id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Expense {id} not found")))?;
    Ok(success(UpdatedExpense { updated_expense }))
}

#[derive(Serialize)]
pub struct DeletedExpense {
    pub deleted_expense: ExpenseRow,
}

/// DELETE /api/v1/user/expenses/:id
pub async fn handle_delete_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Success<DeletedExpense>>, AppError> {
    let not_found = || AppError::NotFound(format!("Expense {id} not found"));
    let deleted_expense = state
        .expenses
        .find(user_id, id)
        .await?
        .ok_or_else(not_found)?;
    if !state.expenses.delete(user_id, id).await? {
        return Err(not_found());
    }
    Ok(success(DeletedExpense { deleted_expense }))
}

#[derive(Deserialize)]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub delete_ids: Vec<i64>,
}

#[derive(Serialize)]
pub struct BulkDeleteResponse {
    pub msg: &'static str,
    pub deleted_count: u64,
}

/// PUT /api/v1/user/expenses
/// Applies an accepted delete confirmation. Ids owned by someone else are skipped.
pub async fn handle_bulk_delete(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    if req.delete_ids.is_empty() {
        return Ok(Json(BulkDeleteResponse {
            msg: "Không có ID nào được chọn",
            deleted_count: 0,
        }));
    }
    let deleted_count = state.expenses.delete_many(user_id, &req.delete_ids).await?;
    info!(user_id, deleted_count, "Bulk deleted expenses");
    Ok(Json(BulkDeleteResponse {
        msg: "Success",
        deleted_count,
    }))
}

#[derive(Deserialize)]
pub struct SummaryParams {
    pub range: Option<String>,
    pub top: Option<i64>,
}

/// GET /api/v1/user/statistics/summary
pub async fn handle_statistics_summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<SummaryParams>,
) -> Result<Json<Success<StatisticsSummary>>, AppError> {
    let range = StatsRange::parse_or(params.range.as_deref(), StatsRange::Today);
    let window = range.window(today());
    let top = params.top.unwrap_or(DEFAULT_TOP);

    let summary = statistics::summary(state.expenses.as_ref(), user_id, window, top).await?;
    Ok(success(summary))
}

#[derive(Deserialize)]
pub struct ChartParams {
    pub range: Option<String>,
}

/// GET /api/v1/user/statistics/chart
pub async fn handle_statistics_chart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<ChartParams>,
) -> Result<Json<Success<ChartData>>, AppError> {
    let range = StatsRange::parse_or(params.range.as_deref(), StatsRange::SevenDays);
    let window = range.window(today());

    let buckets = state
        .expenses
        .aggregate(user_id, window, range.group_by())
        .await?;
    Ok(success(statistics::build_chart(range, window, &buckets)))
}
