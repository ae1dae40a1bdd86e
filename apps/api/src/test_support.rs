//! In-memory collaborators for unit and router tests.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};

use crate::chat::image::{ImageStore, NormalizedImage};
use crate::chat::payload::{ContentPayload, ConversationTurn, Role};
use crate::chat::{ChatService, Deadlines};
use crate::db::StoreError;
use crate::expenses::repository::{
    AggregateBucket, DateRange, ExpenseFilter, ExpenseRepository, GroupBy, SortField, SortOrder,
};
use crate::extraction::types::{
    DeleteCriteria, ImageExtraction, InsertCandidates, IntentClassification, QueryCriteria,
    UpdateCandidate,
};
use crate::extraction::{ExtractionError, ExtractionGateway};
use crate::llm_client::LlmError;
use crate::messages::ledger::{clamp_limit, page_from_rows, LedgerPage, MessageLedger};
use crate::models::expense::{ExpensePatch, ExpenseRow, NewExpense};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

enum Classification {
    Known(IntentClassification),
    Unknown(String),
}

/// Scripted gateway. Every call counts, sleeps for the configured delay, then
/// either fails or returns the scripted value.
pub struct StubGateway {
    classification: Classification,
    insert: Mutex<InsertCandidates>,
    query: Mutex<QueryCriteria>,
    update: Mutex<UpdateCandidate>,
    delete: Mutex<DeleteCriteria>,
    image: Mutex<ImageExtraction>,
    reply: String,
    failing: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_image_mime: Mutex<Option<String>>,
}

impl Default for StubGateway {
    fn default() -> Self {
        Self {
            classification: Classification::Known(IntentClassification::Other),
            insert: Mutex::new(InsertCandidates::default()),
            query: Mutex::new(QueryCriteria::default()),
            update: Mutex::new(UpdateCandidate::default()),
            delete: Mutex::new(DeleteCriteria::default()),
            image: Mutex::new(ImageExtraction::Candidates(InsertCandidates::default())),
            reply: "Xin chào!".to_string(),
            failing: false,
            delay: None,
            calls: AtomicUsize::new(0),
            last_image_mime: Mutex::new(None),
        }
    }
}

impl StubGateway {
    pub fn classifying(intent: IntentClassification) -> Self {
        Self {
            classification: Classification::Known(intent),
            ..Self::default()
        }
    }

    pub fn unknown_intent(mut self, category: &str) -> Self {
        self.classification = Classification::Unknown(category.to_string());
        self
    }

    pub fn with_insert(self, candidates: InsertCandidates) -> Self {
        *lock(&self.insert) = candidates;
        self
    }

    pub fn with_query(self, criteria: QueryCriteria) -> Self {
        *lock(&self.query) = criteria;
        self
    }

    pub fn with_update(self, candidate: UpdateCandidate) -> Self {
        self.set_update(candidate);
        self
    }

    pub fn with_delete(self, criteria: DeleteCriteria) -> Self {
        self.set_delete(criteria);
        self
    }

    pub fn with_image(self, extraction: ImageExtraction) -> Self {
        *lock(&self.image) = extraction;
        self
    }

    pub fn with_reply(mut self, reply: &str) -> Self {
        self.reply = reply.to_string();
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_update(&self, candidate: UpdateCandidate) {
        *lock(&self.update) = candidate;
    }

    pub fn set_delete(&self, criteria: DeleteCriteria) {
        *lock(&self.delete) = criteria;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_image_mime(&self) -> Option<String> {
        lock(&self.last_image_mime).clone()
    }

    async fn begin(&self) -> Result<(), ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(ExtractionError::Llm(LlmError::Api {
                status: 503,
                message: "model server unavailable".to_string(),
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl ExtractionGateway for StubGateway {
    async fn classify(&self, _text: &str) -> Result<IntentClassification, ExtractionError> {
        self.begin().await?;
        match &self.classification {
            Classification::Known(intent) => Ok(*intent),
            Classification::Unknown(category) => {
                Err(ExtractionError::UnknownIntent(category.clone()))
            }
        }
    }

    async fn extract_insert(&self, _text: &str) -> Result<InsertCandidates, ExtractionError> {
        self.begin().await?;
        Ok(lock(&self.insert).clone())
    }

    async fn extract_query(&self, _text: &str) -> Result<QueryCriteria, ExtractionError> {
        self.begin().await?;
        Ok(lock(&self.query).clone())
    }

    async fn extract_update(&self, _text: &str) -> Result<UpdateCandidate, ExtractionError> {
        self.begin().await?;
        Ok(lock(&self.update).clone())
    }

    async fn extract_delete(&self, _text: &str) -> Result<DeleteCriteria, ExtractionError> {
        self.begin().await?;
        Ok(lock(&self.delete).clone())
    }

    async fn extract_insert_from_image(
        &self,
        _image: &[u8],
        mime_type: &str,
    ) -> Result<ImageExtraction, ExtractionError> {
        *lock(&self.last_image_mime) = Some(mime_type.to_string());
        self.begin().await?;
        Ok(lock(&self.image).clone())
    }

    async fn free_text_reply(&self, _text: &str) -> Result<String, ExtractionError> {
        self.begin().await?;
        Ok(self.reply.clone())
    }
}

#[derive(Default)]
pub struct MemoryExpenses {
    rows: Mutex<Vec<ExpenseRow>>,
    next_id: AtomicI64,
    delay: Mutex<Option<Duration>>,
    find_calls: AtomicUsize,
    filter_calls: AtomicUsize,
}

impl MemoryExpenses {
    /// Adds a row directly, bypassing the trait. `date` is `YYYY-MM-DD`.
    pub fn seed(&self, user_id: i64, amount: i64, description: &str, date: &str) -> ExpenseRow {
        let expense_date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        self.push(
            user_id,
            &NewExpense {
                amount,
                description: description.to_string(),
                expense_date,
            },
        )
    }

    pub fn all_rows(&self) -> Vec<ExpenseRow> {
        lock(&self.rows).clone()
    }

    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = Some(delay);
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn filter_calls(&self) -> usize {
        self.filter_calls.load(Ordering::SeqCst)
    }

    fn push(&self, user_id: i64, expense: &NewExpense) -> ExpenseRow {
        let now = Utc::now();
        let row = ExpenseRow {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id,
            amount: expense.amount,
            description: expense.description.clone(),
            expense_date: expense.expense_date,
            created_at: now,
            updated_at: now,
        };
        lock(&self.rows).push(row.clone());
        row
    }

    async fn pause(&self) {
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn matches(row: &ExpenseRow, user_id: i64, filter: &ExpenseFilter) -> bool {
    if row.user_id != user_id {
        return false;
    }
    if let Some(ids) = &filter.ids {
        if !ids.contains(&row.id) {
            return false;
        }
    }
    let in_dates = filter.start_date.map_or(true, |d| row.expense_date >= d)
        && filter.end_date.map_or(true, |d| row.expense_date <= d);
    let in_amounts = filter.min_amount.map_or(true, |a| row.amount >= a)
        && filter.max_amount.map_or(true, |a| row.amount <= a);
    let keywords: Vec<String> = filter
        .keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    let description = row.description.to_lowercase();
    let keyword_hit = keywords.is_empty() || keywords.iter().any(|k| description.contains(k));
    in_dates && in_amounts && keyword_hit
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day0(0).unwrap_or(date)
}


#[async_trait]
impl ExpenseRepository for MemoryExpenses {
    async fn find(&self, user_id: i64, id: i64) -> Result<Option<ExpenseRow>, StoreError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(lock(&self.rows)
            .iter()
            .find(|r| r.id == id && r.user_id == user_id)
            .cloned())
    }

    async fn filter(
        &self,
        user_id: i64,
        filter: &ExpenseFilter,
    ) -> Result<Vec<ExpenseRow>, StoreError> {
        self.filter_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        let mut rows: Vec<ExpenseRow> = lock(&self.rows)
            .iter()
            .filter(|r| matches(r, user_id, filter))
            .cloned()
            .collect();

        let (field, order) = filter.sort.unwrap_or_default();
        rows.sort_by(|a, b| {
            let ord = match field {
                SortField::ExpenseDate => a.expense_date.cmp(&b.expense_date),
                SortField::Amount => a.amount.cmp(&b.amount),
                SortField::Id => std::cmp::Ordering::Equal,
            }
            .then(a.id.cmp(&b.id));
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let limit = filter.limit.map_or(usize::MAX, |l| l.max(0) as usize);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, user_id: i64, filter: &ExpenseFilter) -> Result<i64, StoreError> {
        self.pause().await;
        Ok(lock(&self.rows)
            .iter()
            .filter(|r| matches(r, user_id, filter))
            .count() as i64)
    }

    async fn insert_many(
        &self,
        user_id: i64,
        expenses: &[NewExpense],
    ) -> Result<Vec<ExpenseRow>, StoreError> {
        self.pause().await;
        Ok(expenses.iter().map(|e| self.push(user_id, e)).collect())
    }

    async fn update(
        &self,
        user_id: i64,
        id: i64,
        patch: &ExpensePatch,
    ) -> Result<Option<ExpenseRow>, StoreError> {
        self.pause().await;
        let mut rows = lock(&self.rows);
        let Some(row) = rows.iter_mut().find(|r| r.id == id && r.user_id == user_id) else {
            return Ok(None);
        };
        if let Some(amount) = patch.amount {
            row.amount = amount;
        }
        if let Some(description) = &patch.description {
            row.description = description.clone();
        }
        if let Some(date) = patch.expense_date {
            row.expense_date = date;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, user_id: i64, id: i64) -> Result<bool, StoreError> {
        Ok(self.delete_many(user_id, &[id]).await? > 0)
    }

    async fn delete_many(&self, user_id: i64, ids: &[i64]) -> Result<u64, StoreError> {
        self.pause().await;
        let mut rows = lock(&self.rows);
        let before = rows.len();
        rows.retain(|r| !(r.user_id == user_id && ids.contains(&r.id)));
        Ok((before - rows.len()) as u64)
    }

    async fn aggregate(
        &self,
        user_id: i64,
        range: DateRange,
        group_by: GroupBy,
    ) -> Result<Vec<AggregateBucket>, StoreError> {
        self.pause().await;
        let mut buckets: Vec<AggregateBucket> = Vec::new();
        let mut rows: Vec<ExpenseRow> = lock(&self.rows)
            .iter()
            .filter(|r| {
                r.user_id == user_id && r.expense_date >= range.start && r.expense_date <= range.end
            })
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.expense_date);

        for row in rows {
            let period = match group_by {
                GroupBy::Day => row.expense_date,
                GroupBy::Month => first_of_month(row.expense_date),
            };
            if buckets.last().map(|b| b.period) != Some(period) {
                buckets.push(AggregateBucket {
                    period,
                    income: 0,
                    expense: 0,
                });
            }
            if let Some(bucket) = buckets.last_mut() {
                if row.amount > 0 {
                    bucket.income += row.amount;
                } else {
                    bucket.expense += row.amount;
                }
            }
        }
        Ok(buckets)
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    turns: Mutex<Vec<ConversationTurn>>,
    next_id: AtomicI64,
}

impl MemoryLedger {
    /// Turns owned by `user_id`, oldest first.
    pub fn turns_for(&self, user_id: i64) -> Vec<ConversationTurn> {
        lock(&self.turns)
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MessageLedger for MemoryLedger {
    async fn append(
        &self,
        user_id: i64,
        role: Role,
        content: &ContentPayload,
    ) -> Result<ConversationTurn, StoreError> {
        let turn = ConversationTurn {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id,
            role,
            content: content.clone(),
            created_at: Utc::now(),
        };
        lock(&self.turns).push(turn.clone());
        Ok(turn)
    }

    async fn list_page(
        &self,
        user_id: i64,
        limit: i64,
        before_id: Option<i64>,
    ) -> Result<LedgerPage, StoreError> {
        let limit = clamp_limit(limit);
        let mut turns: Vec<ConversationTurn> = self
            .turns_for(user_id)
            .into_iter()
            .filter(|t| before_id.map_or(true, |b| t.id < b))
            .collect();
        turns.sort_by(|a, b| b.id.cmp(&a.id));
        turns.truncate(limit as usize + 1);
        Ok(page_from_rows(turns, limit))
    }

    async fn delete_one(&self, user_id: i64, id: i64) -> Result<bool, StoreError> {
        let mut turns = lock(&self.turns);
        let before = turns.len();
        turns.retain(|t| !(t.user_id == user_id && t.id == id));
        Ok(turns.len() < before)
    }

    async fn delete_all(&self, user_id: i64) -> Result<u64, StoreError> {
        let mut turns = lock(&self.turns);
        let before = turns.len();
        turns.retain(|t| t.user_id != user_id);
        Ok((before - turns.len()) as u64)
    }
}

#[derive(Default)]
pub struct MemoryImages {
    stored: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryImages {
    pub fn stored_count(&self) -> usize {
        self.stored.load(Ordering::SeqCst)
    }

    /// Makes every later `store` call fail.
    pub fn set_failing(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageStore for MemoryImages {
    async fn store(&self, user_id: i64, image: &NormalizedImage) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("bucket unavailable");
        }
        let n = self.stored.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!(
            "https://img.test/receipts/{user_id}/{n}.{}",
            image.format.extension()
        ))
    }
}

pub const TEST_DEADLINES: Deadlines = Deadlines {
    gateway: Duration::from_secs(90),
    repository: Duration::from_secs(10),
};

/// A `ChatService` wired to in-memory collaborators, with handles to inspect them.
pub struct Harness {
    pub service: ChatService,
    pub gateway: Arc<StubGateway>,
    pub expenses: Arc<MemoryExpenses>,
    pub ledger: Arc<MemoryLedger>,
    pub images: Arc<MemoryImages>,
}

impl Harness {
    pub fn new(gateway: StubGateway) -> Self {
        Self::with_deadlines(gateway, TEST_DEADLINES)
    }

    pub fn with_deadlines(gateway: StubGateway, deadlines: Deadlines) -> Self {
        let gateway = Arc::new(gateway);
        let expenses = Arc::new(MemoryExpenses::default());
        let ledger = Arc::new(MemoryLedger::default());
        let images = Arc::new(MemoryImages::default());
        let service = ChatService::new(
            gateway.clone(),
            expenses.clone(),
            ledger.clone(),
            images.clone(),
            deadlines,
        );
        Self {
            service,
            gateway,
            expenses,
            ledger,
            images,
        }
    }
}

/// A session token valid for one hour.
pub fn token_for(secret: &str, user_id: i64) -> String {
    let exp = Utc::now().timestamp() + 3600;
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &serde_json::json!({"user_id": user_id, "exp": exp}),
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
