use thiserror::Error;

// ---------------------------------------------------------------------------
// Dataset errors (fatal at startup)
// ---------------------------------------------------------------------------

/// Problems with the shape of the input dataset.
///
/// These are raised while loading and refuse startup; row-level noise never
/// ends up here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataError {
    #[error("missing columns in dataset: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),
}

// ---------------------------------------------------------------------------
// Filter criteria validation
// ---------------------------------------------------------------------------

/// A caller supplied an inconsistent filter range.
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("start date {start} is after end date {end}")]
    InvertedDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("minimum duration {min}s is greater than maximum {max}s")]
    InvertedDurationRange { min: f64, max: f64 },

    #[error("duration bounds must be finite numbers")]
    NonFiniteDuration,
}

// ---------------------------------------------------------------------------
// Filter history persistence
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("history migration failed: {0:#}")]
    Migration(anyhow::Error),

    #[error("could not encode filter field: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("saved filter {id} has malformed '{field}': {value:?}")]
    Decode {
        id: i64,
        field: &'static str,
        value: String,
    },

    #[error("saved filter {id} is not a valid filter: {source}")]
    Invalid {
        id: i64,
        #[source]
        source: FilterError,
    },

    #[error("history store lock poisoned")]
    Poisoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_lists_every_name() {
        let err = DataError::MissingColumns(vec!["Date".into(), "Resolved".into()]);
        assert_eq!(err.to_string(), "missing columns in dataset: Date, Resolved");
    }
}
