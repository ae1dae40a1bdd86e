pub mod expense;
pub mod message;

use chrono::{NaiveDate, Utc};

/// The calendar date every relative phrase and statistics window is resolved against (UTC).
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
