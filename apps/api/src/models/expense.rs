use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored income (positive amount) or expense (negative amount).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ExpenseRow {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub amount: i64,
    pub description: String,
    pub expense_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields a confirmation lists for each affected record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseSummary {
    pub id: i64,
    pub description: String,
    pub amount: i64,
    pub expense_date: NaiveDate,
}

impl From<&ExpenseRow> for ExpenseSummary {
    fn from(row: &ExpenseRow) -> Self {
        Self {
            id: row.id,
            description: row.description.clone(),
            amount: row.amount,
            expense_date: row.expense_date,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewExpense {
    pub amount: i64,
    pub description: String,
    pub expense_date: NaiveDate,
}

/// Partial update; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpensePatch {
    pub amount: Option<i64>,
    pub description: Option<String>,
    pub expense_date: Option<NaiveDate>,
}

impl ExpensePatch {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.description.is_none() && self.expense_date.is_none()
    }
}
