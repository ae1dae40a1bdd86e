//! Dashboard aggregation: totals, top entries and a gap-filled income/expense series.

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::db::StoreError;
use crate::expenses::repository::{
    AggregateBucket, DateRange, ExpenseFilter, ExpenseRepository, GroupBy, SortField, SortOrder,
};
use crate::models::expense::ExpenseRow;

pub const DEFAULT_TOP: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsRange {
    Today,
    SevenDays,
    ThirtyDays,
    OneYear,
}

impl StatsRange {
    /// Parses `today`, `7d`, `30d` or `1y`; anything else yields `fallback`.
    pub fn parse_or(value: Option<&str>, fallback: StatsRange) -> Self {
        match value {
            Some("today") => StatsRange::Today,
            Some("7d") => StatsRange::SevenDays,
            Some("30d") => StatsRange::ThirtyDays,
            Some("1y") => StatsRange::OneYear,
            _ => fallback,
        }
    }

    /// Inclusive window ending on `today`.
    pub fn window(self, today: NaiveDate) -> DateRange {
        let start = match self {
            StatsRange::Today => Some(today),
            StatsRange::SevenDays => today.checked_sub_days(chrono::Days::new(6)),
            StatsRange::ThirtyDays => today.checked_sub_days(chrono::Days::new(29)),
            StatsRange::OneYear => today
                .checked_sub_months(Months::new(12))
                .and_then(|d| d.succ_opt()),
        };
        DateRange {
            start: start.unwrap_or(today),
            end: today,
        }
    }

    pub fn group_by(self) -> GroupBy {
        match self {
            StatsRange::OneYear => GroupBy::Month,
            _ => GroupBy::Day,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatisticsSummary {
    pub total_income: i64,
    pub total_expense: i64,
    pub top_incomes: Vec<ExpenseRow>,
    pub top_expenses: Vec<ExpenseRow>,
}

pub async fn summary(
    repo: &dyn ExpenseRepository,
    user_id: i64,
    window: DateRange,
    top: i64,
) -> Result<StatisticsSummary, StoreError> {
    let top = if top <= 0 { DEFAULT_TOP } else { top };
    let buckets = repo.aggregate(user_id, window, GroupBy::Month).await?;

    let in_window = ExpenseFilter::by_dates(Some(window.start), Some(window.end));
    let incomes = ExpenseFilter {
        min_amount: Some(1),
        limit: Some(top),
        ..in_window.clone()
    }
    .sorted(SortField::Amount, SortOrder::Desc);
    let expenses = ExpenseFilter {
        max_amount: Some(-1),
        limit: Some(top),
        ..in_window
    }
    .sorted(SortField::Amount, SortOrder::Asc);

    Ok(StatisticsSummary {
        total_income: buckets.iter().map(|b| b.income).sum(),
        total_expense: buckets.iter().map(|b| b.expense).sum(),
        top_incomes: repo.filter(user_id, &incomes).await?,
        top_expenses: repo.filter(user_id, &expenses).await?,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub data: Vec<f64>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    #[serde(rename = "lineData")]
    pub line_data: LineData,
    /// Unscaled.
    pub total_income: i64,
    /// Unscaled absolute value.
    pub total_expense: i64,
    pub unit: &'static str,
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Every bucket start in the window, ascending.
fn periods(window: DateRange, group_by: GroupBy) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let mut current = match group_by {
        GroupBy::Day => window.start,
        GroupBy::Month => first_of_month(window.start),
    };
    while current <= window.end {
        out.push(current);
        let next = match group_by {
            GroupBy::Day => current.succ_opt(),
            GroupBy::Month => current.checked_add_months(Months::new(1)),
        };
        match next {
            Some(next) => current = next,
            None => break,
        }
    }
    out
}

fn labels(range: StatsRange, periods: &[NaiveDate]) -> Vec<String> {
    let last = periods.len().saturating_sub(1);
    periods
        .iter()
        .enumerate()
        .map(|(i, p)| match range {
            StatsRange::Today | StatsRange::SevenDays => p.format("%d/%m").to_string(),
            StatsRange::ThirtyDays if p.day() == 1 || p.day() % 5 == 0 => {
                p.format("%d/%m").to_string()
            }
            StatsRange::OneYear if i % 6 == 0 || i == last => p.format("%m/%Y").to_string(),
            _ => String::new(),
        })
        .collect()
}

/// Fills every bucket in the window, including empty ones, and scales for display.
pub fn build_chart(range: StatsRange, window: DateRange, buckets: &[AggregateBucket]) -> ChartData {
    let group_by = range.group_by();
    let (unit, divider) = match group_by {
        GroupBy::Day => ("k", 1_000.0),
        GroupBy::Month => ("tr", 1_000_000.0),
    };

    let periods = periods(window, group_by);
    let mut income = Vec::with_capacity(periods.len());
    let mut expense = Vec::with_capacity(periods.len());
    for period in &periods {
        let bucket = buckets.iter().find(|b| b.period == *period);
        income.push(bucket.map_or(0.0, |b| b.income as f64 / divider));
        expense.push(bucket.map_or(0.0, |b| b.expense.abs() as f64 / divider));
    }

    let in_window = |b: &&AggregateBucket| periods.contains(&b.period);
    ChartData {
        line_data: LineData {
            labels: labels(range, &periods),
            datasets: vec![
                Dataset {
                    data: income,
                    kind: "income",
                },
                Dataset {
                    data: expense,
                    kind: "expense",
                },
            ],
        },
        total_income: buckets.iter().filter(in_window).map(|b| b.income).sum(),
        total_expense: buckets
            .iter()
            .filter(in_window)
            .map(|b| b.expense.abs())
            .sum(),
        unit,
    }
}
