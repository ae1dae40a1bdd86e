use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::db::StoreError;
use crate::models::expense::{ExpensePatch, ExpenseRow, NewExpense};

const EXPENSE_COLUMNS: &str =
    "id, user_id, amount, description, expense_date, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    ExpenseDate,
    Amount,
    Id,
}

impl SortField {
    fn column(self) -> &'static str {
        match self {
            SortField::ExpenseDate => "expense_date",
            SortField::Amount => "amount",
            SortField::Id => "id",
        }
    }

    /// Unknown names fall back to `expense_date`.
    pub fn parse_or_default(name: Option<&str>) -> Self {
        match name {
            Some("amount") => SortField::Amount,
            _ => SortField::ExpenseDate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn parse_or_default(name: Option<&str>) -> Self {
        match name.map(str::to_ascii_lowercase).as_deref() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

/// Owner-independent selection criteria. Every bound is inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    /// `Some` restricts to these ids; an empty set matches nothing.
    pub ids: Option<Vec<i64>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub min_amount: Option<i64>,
    pub max_amount: Option<i64>,
    /// Case-insensitive substrings of the description; any one must match.
    pub keywords: Vec<String>,
    pub sort: Option<(SortField, SortOrder)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ExpenseFilter {
    pub fn by_ids(ids: &[i64]) -> Self {
        Self {
            ids: Some(ids.to_vec()),
            ..Self::default()
        }
    }

    pub fn by_dates(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        Self {
            start_date,
            end_date,
            ..Self::default()
        }
    }

    pub fn sorted(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort = Some((field, order));
        self
    }

    pub fn paged(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Day,
    Month,
}

impl GroupBy {
    fn trunc_unit(self) -> &'static str {
        match self {
            GroupBy::Day => "day",
            GroupBy::Month => "month",
        }
    }
}

/// Income and expense sums for one day or month. `period` is the first day of the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct AggregateBucket {
    pub period: NaiveDate,
    pub income: i64,
    /// Sum of negative amounts, so never positive.
    pub expense: i64,
}

/// Owner-scoped access to stored expenses.
#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    async fn find(&self, user_id: i64, id: i64) -> Result<Option<ExpenseRow>, StoreError>;

    async fn filter(
        &self,
        user_id: i64,
        filter: &ExpenseFilter,
    ) -> Result<Vec<ExpenseRow>, StoreError>;

    /// Number of rows matching `filter`, ignoring its sort and paging.
    async fn count(&self, user_id: i64, filter: &ExpenseFilter) -> Result<i64, StoreError>;

    /// Inserts all rows or none.
    async fn insert_many(
        &self,
        user_id: i64,
        expenses: &[NewExpense],
    ) -> Result<Vec<ExpenseRow>, StoreError>;

    async fn update(
        &self,
        user_id: i64,
        id: i64,
        patch: &ExpensePatch,
    ) -> Result<Option<ExpenseRow>, StoreError>;

    async fn delete(&self, user_id: i64, id: i64) -> Result<bool, StoreError>;

    async fn delete_many(&self, user_id: i64, ids: &[i64]) -> Result<u64, StoreError>;

    /// Per-bucket sums over `range`, ascending. Empty buckets are omitted.
    async fn aggregate(
        &self,
        user_id: i64,
        range: DateRange,
        group_by: GroupBy,
    ) -> Result<Vec<AggregateBucket>, StoreError>;
}

/// Escapes LIKE metacharacters so keywords match literally.
fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_conditions(qb: &mut QueryBuilder<'_, Postgres>, user_id: i64, filter: &ExpenseFilter) {
    qb.push(" WHERE user_id = ").push_bind(user_id);

    if let Some(ids) = &filter.ids {
        qb.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND expense_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND expense_date <= ").push_bind(end);
    }
    if let Some(min) = filter.min_amount {
        qb.push(" AND amount >= ").push_bind(min);
    }
    if let Some(max) = filter.max_amount {
        qb.push(" AND amount <= ").push_bind(max);
    }

    let keywords: Vec<&str> = filter
        .keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();
    if !keywords.is_empty() {
        qb.push(" AND (");
        for (i, keyword) in keywords.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push("description ILIKE ").push_bind(like_pattern(keyword));
        }
        qb.push(")");
    }
}

fn select_query(user_id: i64, filter: &ExpenseFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {EXPENSE_COLUMNS} FROM expenses"));
    push_conditions(&mut qb, user_id, filter);

    let (field, order) = filter.sort.unwrap_or_default();
    qb.push(format!(
        " ORDER BY {} {}, id {}",
        field.column(),
        order.keyword(),
        order.keyword()
    ));

    if let Some(limit) = filter.limit {
        qb.push(" LIMIT ").push_bind(limit);
    }
    if let Some(offset) = filter.offset {
        qb.push(" OFFSET ").push_bind(offset);
    }
    qb
}

#[derive(Clone)]
pub struct PgExpenseRepository {
    db: PgPool,
}

impl PgExpenseRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ExpenseRepository for PgExpenseRepository {
    async fn find(&self, user_id: i64, id: i64) -> Result<Option<ExpenseRow>, StoreError> {
        Ok(sqlx::query_as::<_, ExpenseRow>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?)
    }

    async fn filter(
        &self,
        user_id: i64,
        filter: &ExpenseFilter,
    ) -> Result<Vec<ExpenseRow>, StoreError> {
        let mut qb = select_query(user_id, filter);
        Ok(qb.build_query_as::<ExpenseRow>().fetch_all(&self.db).await?)
    }

    async fn count(&self, user_id: i64, filter: &ExpenseFilter) -> Result<i64, StoreError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM expenses");
        push_conditions(&mut qb, user_id, filter);
        Ok(qb.build_query_scalar::<i64>().fetch_one(&self.db).await?)
    }

    async fn insert_many(
        &self,
        user_id: i64,
        expenses: &[NewExpense],
    ) -> Result<Vec<ExpenseRow>, StoreError> {
        let mut tx = self.db.begin().await?;
        let mut inserted = Vec::with_capacity(expenses.len());

        for expense in expenses {
            let row: ExpenseRow = sqlx::query_as(&format!(
                r#"
                INSERT INTO expenses (user_id, amount, description, expense_date)
                VALUES ($1, $2, $3, $4)
                RETURNING {EXPENSE_COLUMNS}
                "#
            ))
            .bind(user_id)
            .bind(expense.amount)
            .bind(&expense.description)
            .bind(expense.expense_date)
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(row);
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn update(
        &self,
        user_id: i64,
        id: i64,
        patch: &ExpensePatch,
    ) -> Result<Option<ExpenseRow>, StoreError> {
        Ok(sqlx::query_as::<_, ExpenseRow>(&format!(
            r#"
            UPDATE expenses
            SET amount = COALESCE($1, amount),
                description = COALESCE($2, description),
                expense_date = COALESCE($3, expense_date),
                updated_at = NOW()
            WHERE id = $4 AND user_id = $5
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
        .bind(patch.amount)
        .bind(patch.description.as_deref())
        .bind(patch.expense_date)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?)
    }

    async fn delete(&self, user_id: i64, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&self, user_id: i64, ids: &[i64]) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM expenses WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id)
            .bind(ids)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }

    async fn aggregate(
        &self,
        user_id: i64,
        range: DateRange,
        group_by: GroupBy,
    ) -> Result<Vec<AggregateBucket>, StoreError> {
        Ok(sqlx::query_as::<_, AggregateBucket>(
            r#"
            SELECT date_trunc($1, expense_date::timestamp)::date AS period,
                   COALESCE(SUM(amount) FILTER (WHERE amount > 0), 0)::BIGINT AS income,
                   COALESCE(SUM(amount) FILTER (WHERE amount < 0), 0)::BIGINT AS expense
            FROM expenses
            WHERE user_id = $2 AND expense_date BETWEEN $3 AND $4
            GROUP BY period
            ORDER BY period
            "#,
        )
        .bind(group_by.trunc_unit())
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?)
    }
}
