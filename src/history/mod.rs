//! Saved filter history backed by SQLite.
//!
//! Each save appends one row to `past_filters`. Identifiers come from
//! `AUTOINCREMENT`, so they keep increasing across [`FilterHistoryStore::clear_all`].

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::Serialize;

mod migrations;

use crate::data::filter::FilterCriteria;
use crate::data::model::{DateRange, DurationRange, Resolved, Sentiment};
use crate::error::HistoryError;
use migrations::run_migrations;

const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// SavedFilter – one persisted snapshot
// ---------------------------------------------------------------------------

/// A filter snapshot as stored: every criteria field encoded as plain text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedFilter {
    pub id: i64,
    /// JSON array of sentiment names; `[]` means no sentiment filter.
    pub sentiment: String,
    pub start_date: String,
    pub end_date: String,
    /// `Y`, `N`, or empty for no resolution filter.
    pub resolved: String,
    /// JSON array `[min, max]` in seconds.
    pub duration_range: String,
    /// Absent for rows written before the column existed.
    pub saved_at: Option<DateTime<Utc>>,
}

impl SavedFilter {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let text = |idx: usize| -> rusqlite::Result<String> {
            Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
        };
        let saved_at = row
            .get::<_, Option<String>>(6)?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(Self {
            id: row.get(0)?,
            sentiment: text(1)?,
            start_date: text(2)?,
            end_date: text(3)?,
            resolved: text(4)?,
            duration_range: text(5)?,
            saved_at,
        })
    }

    /// Decode the stored strings back into criteria that can be re-applied.
    ///
    /// Also accepts the Python-style encodings of older rows
    /// (`['Positive']`, `None`, `2024-01-01T00:00:00`).
    pub fn criteria(&self) -> Result<FilterCriteria, HistoryError> {
        let sentiments = self.decode_sentiments()?;
        let start = self.decode_date("start_date", &self.start_date)?;
        let end = self.decode_date("end_date", &self.end_date)?;
        let resolved = self.decode_resolved()?;
        let (min, max) = self.decode_duration()?;

        let invalid = |source| HistoryError::Invalid {
            id: self.id,
            source,
        };
        Ok(FilterCriteria::new(
            sentiments,
            DateRange::new(start, end).map_err(invalid)?,
            resolved,
            DurationRange::new(min, max).map_err(invalid)?,
        ))
    }

    fn malformed(&self, field: &'static str, value: &str) -> HistoryError {
        HistoryError::Decode {
            id: self.id,
            field,
            value: value.to_string(),
        }
    }

    fn decode_sentiments(&self) -> Result<BTreeSet<Sentiment>, HistoryError> {
        let raw = self.sentiment.trim();
        if raw.is_empty() || raw == "None" || raw == "null" {
            return Ok(BTreeSet::new());
        }
        let names: Vec<String> = serde_json::from_str(&raw.replace('\'', "\""))
            .map_err(|_| self.malformed("sentiment", raw))?;
        names
            .iter()
            .map(|n| n.parse::<Sentiment>())
            .collect::<Result<_, _>>()
            .map_err(|_| self.malformed("sentiment", raw))
    }

    fn decode_date(&self, field: &'static str, raw: &str) -> Result<NaiveDate, HistoryError> {
        let raw = raw.trim();
        NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .or_else(|_| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date())
            })
            .map_err(|_| self.malformed(field, raw))
    }

    fn decode_resolved(&self) -> Result<Option<Resolved>, HistoryError> {
        let raw = self.resolved.trim();
        if raw.is_empty() || raw == "None" {
            return Ok(None);
        }
        raw.parse()
            .map(Some)
            .map_err(|_| self.malformed("resolved", raw))
    }

    fn decode_duration(&self) -> Result<(f64, f64), HistoryError> {
        let raw = self.duration_range.trim();
        let bounds: Vec<f64> =
            serde_json::from_str(raw).map_err(|_| self.malformed("duration_range", raw))?;
        match bounds.as_slice() {
            [min, max] => Ok((*min, *max)),
            _ => Err(self.malformed("duration_range", raw)),
        }
    }
}

fn encode_sentiments(sentiments: &BTreeSet<Sentiment>) -> Result<String, HistoryError> {
    let names: Vec<&str> = sentiments.iter().map(|s| s.as_str()).collect();
    Ok(serde_json::to_string(&names)?)
}

fn encode_duration(range: DurationRange) -> Result<String, HistoryError> {
    Ok(serde_json::to_string(&[range.min(), range.max()])?)
}

// ---------------------------------------------------------------------------
// FilterHistoryStore
// ---------------------------------------------------------------------------

/// Append-only log of saved filters.
///
/// One connection behind a mutex: saves, clears and listings are serialized,
/// and writes run in a transaction so readers never see half a write.
pub struct FilterHistoryStore {
    conn: Mutex<Connection>,
}

impl FilterHistoryStore {
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        let conn = Connection::open(path)?;
        let store = Self::init(conn)?;
        log::info!("Filter history opened at {}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, HistoryError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self, HistoryError> {
        run_migrations(&mut conn).map_err(HistoryError::Migration)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, HistoryError> {
        self.conn.lock().map_err(|_| HistoryError::Poisoned)
    }

    /// Append a snapshot of `criteria` and return it with its new identifier.
    pub fn save(&self, criteria: &FilterCriteria) -> Result<SavedFilter, HistoryError> {
        let date_range = criteria.date_range();
        let mut saved = SavedFilter {
            id: 0,
            sentiment: encode_sentiments(criteria.sentiments())?,
            start_date: date_range.start().format(DATE_FORMAT).to_string(),
            end_date: date_range.end().format(DATE_FORMAT).to_string(),
            resolved: criteria
                .resolved()
                .map(|r| r.as_str().to_string())
                .unwrap_or_default(),
            duration_range: encode_duration(criteria.duration_range())?,
            saved_at: Some(Utc::now()),
        };

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO past_filters (sentiment, start_date, end_date, resolved, duration_range, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                saved.sentiment,
                saved.start_date,
                saved.end_date,
                saved.resolved,
                saved.duration_range,
                saved.saved_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        saved.id = tx.last_insert_rowid();
        tx.commit()?;

        log::info!("Saved filter #{}", saved.id);
        Ok(saved)
    }

    /// Every saved filter in ascending identifier order.
    pub fn list_all(&self) -> Result<Vec<SavedFilter>, HistoryError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, sentiment, start_date, end_date, resolved, duration_range, saved_at
             FROM past_filters ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map([], SavedFilter::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Remove every saved filter and return how many were removed.
    ///
    /// The identifier sequence is not reset.
    pub fn clear_all(&self) -> Result<usize, HistoryError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM past_filters", [])?;
        tx.commit()?;

        log::info!("Cleared {removed} saved filters");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn january(sentiments: &[Sentiment], resolved: Option<Resolved>) -> FilterCriteria {
        FilterCriteria::from_parts(
            sentiments.iter().copied(),
            day(2024, 1, 1),
            day(2024, 1, 31),
            resolved,
            0.0,
            400.0,
        )
        .unwrap()
    }

    #[test]
    fn first_save_gets_id_one_and_plain_string_fields() {
        let store = FilterHistoryStore::open_in_memory().unwrap();
        let saved = store
            .save(&january(&[Sentiment::Negative, Sentiment::Positive], Some(Resolved::No)))
            .unwrap();

        assert_eq!(saved.id, 1);
        assert_eq!(saved.sentiment, r#"["Positive","Negative"]"#);
        assert_eq!(saved.start_date, "2024-01-01");
        assert_eq!(saved.end_date, "2024-01-31");
        assert_eq!(saved.resolved, "N");
        assert_eq!(saved.duration_range, "[0.0,400.0]");
        assert!(saved.saved_at.is_some());
    }

    #[test]
    fn absent_fields_encode_as_empty() {
        let store = FilterHistoryStore::open_in_memory().unwrap();
        let saved = store.save(&january(&[], None)).unwrap();
        assert_eq!(saved.sentiment, "[]");
        assert_eq!(saved.resolved, "");
    }

    #[test]
    fn list_returns_saved_records_in_id_order() {
        let store = FilterHistoryStore::open_in_memory().unwrap();
        let a = store.save(&january(&[], None)).unwrap();
        let b = store.save(&january(&[Sentiment::Neutral], None)).unwrap();
        let c = store.save(&january(&[], Some(Resolved::Yes))).unwrap();

        assert!(a.id < b.id && b.id < c.id);
        assert_eq!(store.list_all().unwrap(), vec![a, b, c]);
    }

    #[test]
    fn clear_empties_the_log_without_reusing_ids() {
        let store = FilterHistoryStore::open_in_memory().unwrap();
        store.save(&january(&[], None)).unwrap();
        let last = store.save(&january(&[], None)).unwrap();

        assert_eq!(store.clear_all().unwrap(), 2);
        assert!(store.list_all().unwrap().is_empty());
        assert_eq!(store.clear_all().unwrap(), 0);

        let next = store.save(&january(&[], None)).unwrap();
        assert!(next.id > last.id);
        assert_eq!(next.id, 3);
    }

    #[test]
    fn ids_survive_reopening_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");

        {
            let store = FilterHistoryStore::open(&path).unwrap();
            store.save(&january(&[], None)).unwrap();
            store.clear_all().unwrap();
        }

        let store = FilterHistoryStore::open(&path).unwrap();
        assert!(store.list_all().unwrap().is_empty());
        assert_eq!(store.save(&january(&[], None)).unwrap().id, 2);
    }

    #[test]
    fn saved_criteria_round_trip() {
        let store = FilterHistoryStore::open_in_memory().unwrap();
        let original = january(&[Sentiment::Neutral], Some(Resolved::Yes));
        let saved = store.save(&original).unwrap();
        assert_eq!(saved.criteria().unwrap(), original);
    }

    #[test]
    fn legacy_python_encodings_decode() {
        let legacy = SavedFilter {
            id: 7,
            sentiment: "['Positive', 'Neutral']".into(),
            start_date: "2024-01-01T00:00:00".into(),
            end_date: "2024-02-15".into(),
            resolved: String::new(),
            duration_range: "[12.5, 300]".into(),
            saved_at: None,
        };
        let criteria = legacy.criteria().unwrap();
        assert_eq!(criteria.sentiments().len(), 2);
        assert_eq!(criteria.date_range().start(), day(2024, 1, 1));
        assert_eq!(criteria.resolved(), None);
        assert_eq!(criteria.duration_range().min(), 12.5);

        let none = SavedFilter {
            sentiment: "None".into(),
            ..legacy
        };
        assert!(none.criteria().unwrap().sentiments().is_empty());
    }

    #[test]
    fn malformed_rows_report_the_field() {
        let row = SavedFilter {
            id: 3,
            sentiment: "[]".into(),
            start_date: "2024-01-01".into(),
            end_date: "2024-01-31".into(),
            resolved: "maybe".into(),
            duration_range: "[0, 1]".into(),
            saved_at: None,
        };
        assert!(matches!(
            row.criteria(),
            Err(HistoryError::Decode { id: 3, field: "resolved", .. })
        ));

        let inverted = SavedFilter {
            resolved: String::new(),
            duration_range: "[5, 1]".into(),
            ..row
        };
        assert!(matches!(inverted.criteria(), Err(HistoryError::Invalid { id: 3, .. })));
    }

    #[test]
    fn concurrent_saves_get_distinct_increasing_ids() {
        let store = Arc::new(FilterHistoryStore::open_in_memory().unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..5)
                        .map(|_| store.save(&january(&[], None)).unwrap().id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for h in handles {
            let ids = h.join().unwrap();
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
        }

        let ids: Vec<i64> = store.list_all().unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
    }
}
