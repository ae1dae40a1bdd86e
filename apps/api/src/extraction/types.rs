//! Structured results returned by the extraction gateway.
//!
//! Every field the model may be unable to determine is optional. Callers must not
//! assume completeness: absent information stays `None` (or an empty list).

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::extraction::ExtractionError;

/// The closed set of intents a user message can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentClassification {
    #[serde(rename = "insert_expenses")]
    Insert,
    #[serde(rename = "query_expenses")]
    Query,
    #[serde(rename = "update_expenses")]
    Update,
    #[serde(rename = "delete_expenses")]
    Delete,
    #[serde(rename = "other")]
    Other,
}

impl FromStr for IntentClassification {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "insert_expenses" => Ok(Self::Insert),
            "query_expenses" => Ok(Self::Query),
            "update_expenses" => Ok(Self::Update),
            "delete_expenses" => Ok(Self::Delete),
            "other" => Ok(Self::Other),
            unknown => Err(ExtractionError::UnknownIntent(unknown.to_string())),
        }
    }
}

/// Raw classifier reply. Kept as a string so an out-of-set category surfaces as
/// `UnknownIntent` instead of a parse failure.
#[derive(Debug, Deserialize)]
pub struct ClassifierReply {
    pub request_type: String,
}

/// One expense the user described; each field independently nullable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseCandidate {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default, alias = "date")]
    pub expense_date: Option<NaiveDate>,
}

/// Ordered candidates produced by the insert extractors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertCandidates {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub expenses: Vec<ExpenseCandidate>,
}

/// Accepts either `{"expenses": [...]}` or a bare array from the model.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum InsertReply {
    Wrapped(InsertCandidates),
    Bare(Vec<ExpenseCandidate>),
}

impl From<InsertReply> for InsertCandidates {
    fn from(reply: InsertReply) -> Self {
        match reply {
            InsertReply::Wrapped(candidates) => candidates,
            InsertReply::Bare(expenses) => InsertCandidates { expenses },
        }
    }
}

/// Filters for a staged expense search.
///
/// Sign semantics: income bounds are non-negative and expense bounds non-positive.
/// "spent under X" is `[-X, 0]`, "spent over X" is `(-inf, -X]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCriteria {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub min_amount: Option<i64>,
    #[serde(default)]
    pub max_amount: Option<i64>,
    #[serde(default, alias = "keywords", deserialize_with = "null_as_empty")]
    pub key_words: Vec<String>,
}

/// Target and new values for a single-record edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCandidate {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub updated_description: Option<String>,
    #[serde(default)]
    pub updated_amount: Option<i64>,
    #[serde(default)]
    pub updated_date: Option<NaiveDate>,
}

/// Either an explicit id list or a date range selecting expenses to remove.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCriteria {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub delete_ids: Vec<i64>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Outcome of reading a receipt or transfer screenshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageExtraction {
    Candidates(InsertCandidates),
    /// The image is not a receipt or transfer record.
    Rejected,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageReply {
    #[serde(default)]
    pub expenses: Option<Vec<ExpenseCandidate>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl From<ImageReply> for ImageExtraction {
    fn from(reply: ImageReply) -> Self {
        match (reply.expenses, reply.error) {
            (Some(expenses), _) if !expenses.is_empty() => {
                ImageExtraction::Candidates(InsertCandidates { expenses })
            }
            (_, Some(_)) => ImageExtraction::Rejected,
            (expenses, None) => ImageExtraction::Candidates(InsertCandidates {
                expenses: expenses.unwrap_or_default(),
            }),
        }
    }
}

/// Free-text answer for messages outside the expense domain.
#[derive(Debug, Deserialize)]
pub(crate) struct FreeTextReply {
    #[serde(default)]
    pub response: Option<String>,
}

/// Models frequently emit `null` where a list is expected.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
