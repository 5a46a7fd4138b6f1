use chrono::NaiveDate;
use thiserror::Error;

/// Why a single raw row could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct MalformedRow {
    pub reason: String,
}

impl MalformedRow {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Failures of the ingestion and aggregation core. Any of these aborts the
/// run before a series is built.
#[derive(Debug, Error)]
pub enum DataError {
    /// `row` is the 1-based position in input order.
    #[error("malformed row {row}: {source}")]
    MalformedRow {
        row: usize,
        #[source]
        source: MalformedRow,
    },

    #[error("row {row}: country code `{code}` collides with a synthetic aggregate key")]
    ReservedKey { row: usize, code: String },

    /// A count that no longer fits in `u64` once added to the worldwide
    /// slot or the grand total.
    #[error("row {row}: {field} overflow the aggregate")]
    Overflow { row: usize, field: &'static str },

    #[error("running {field} for `{code}` overflow on {date}")]
    CumulativeOverflow {
        code: String,
        date: NaiveDate,
        field: &'static str,
    },

    #[error("unsupported dataset layout: {0}")]
    Layout(String),

    #[error("failed to read spreadsheet rows")]
    Csv(#[from] csv::Error),

    #[error("failed to parse JSON dataset")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
