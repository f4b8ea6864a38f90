use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::FilterError;

// ---------------------------------------------------------------------------
// CellValue – a single raw cell before normalization
// ---------------------------------------------------------------------------

/// A dynamically-typed cell as read from CSV, JSON, Parquet or a workbook.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{d}"),
            CellValue::DateTime(dt) => write!(f, "{dt}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

static NULL_CELL: CellValue = CellValue::Null;

/// The loaded table before any coercion: header names plus rows of cells in
/// header order. Rows shorter than the header are padded with `Null`.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&NULL_CELL)
    }
}

// ---------------------------------------------------------------------------
// Sentiment / Resolved
// ---------------------------------------------------------------------------

/// Three-valued classification of a satisfaction rating.
///
/// Variant order is the display order used by every chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    /// `>= 4` is positive, `3` is neutral, anything else is negative.
    pub fn classify(rating: i64) -> Self {
        if rating >= 4 {
            Sentiment::Positive
        } else if rating == 3 {
            Sentiment::Neutral
        } else {
            Sentiment::Negative
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Positive" => Ok(Sentiment::Positive),
            "Neutral" => Ok(Sentiment::Neutral),
            "Negative" => Ok(Sentiment::Negative),
            other => Err(format!("unknown sentiment '{other}'")),
        }
    }
}

/// Whether the call was resolved. Serialized as `Y` / `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Resolved {
    #[serde(rename = "N")]
    No,
    #[serde(rename = "Y")]
    Yes,
}

impl Resolved {
    pub const ALL: [Resolved; 2] = [Resolved::No, Resolved::Yes];

    pub fn as_str(self) -> &'static str {
        match self {
            Resolved::Yes => "Y",
            Resolved::No => "N",
        }
    }
}

impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolved {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "Y" | "YES" => Ok(Resolved::Yes),
            "N" | "NO" => Ok(Resolved::No),
            _ => Err(format!("unknown resolution flag '{s}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Ranges
// ---------------------------------------------------------------------------

/// Inclusive calendar-day range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FilterError> {
        if start > end {
            return Err(FilterError::InvertedDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Compares calendar days, so a call late on the end day still matches
    /// (a midnight cutoff on `end` would exclude it).
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Inclusive range of talk durations in seconds with `min <= max`.
/// The default is the degenerate range `[0, 0]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DurationRange {
    min: f64,
    max: f64,
}

impl DurationRange {
    pub fn new(min: f64, max: f64) -> Result<Self, FilterError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(FilterError::NonFiniteDuration);
        }
        if min > max {
            return Err(FilterError::InvertedDurationRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, secs: f64) -> bool {
        self.min <= secs && secs <= self.max
    }
}

// ---------------------------------------------------------------------------
// CallRecord – one normalized interaction
// ---------------------------------------------------------------------------

/// A normalized call. Every field is present; sentiment follows the rating.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    satisfaction_rating: i64,
    timestamp: NaiveDateTime,
    avg_talk_duration_secs: f64,
    resolved: Resolved,
}

impl CallRecord {
    /// Returns `None` when the duration is negative or not finite.
    pub fn new(
        satisfaction_rating: i64,
        timestamp: NaiveDateTime,
        avg_talk_duration_secs: f64,
        resolved: Resolved,
    ) -> Option<Self> {
        if !avg_talk_duration_secs.is_finite() || avg_talk_duration_secs < 0.0 {
            return None;
        }
        Some(Self {
            satisfaction_rating,
            timestamp,
            avg_talk_duration_secs,
            resolved,
        })
    }

    pub fn satisfaction_rating(&self) -> i64 {
        self.satisfaction_rating
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn day(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn avg_talk_duration_secs(&self) -> f64 {
        self.avg_talk_duration_secs
    }

    pub fn resolved(&self) -> Resolved {
        self.resolved
    }

    pub fn sentiment(&self) -> Sentiment {
        Sentiment::classify(self.satisfaction_rating)
    }

    pub fn year_month(&self) -> YearMonth {
        YearMonth {
            year: self.timestamp.year(),
            month: self.timestamp.month(),
        }
    }
}

/// Calendar month used by the trend view; displays as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// CallDataset – the complete normalized dataset
// ---------------------------------------------------------------------------

/// Row accounting from normalization, kept for logging and the status bar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub bad_rating: usize,
    pub bad_date: usize,
    pub bad_duration: usize,
    pub bad_resolved: usize,
}

impl NormalizeReport {
    pub fn rows_dropped(&self) -> usize {
        self.rows_read - self.rows_kept
    }
}

/// The immutable dataset built once at startup, with pre-computed bounds.
#[derive(Debug, Clone)]
pub struct CallDataset {
    records: Vec<CallRecord>,
    duration_bounds: Option<DurationRange>,
    date_bounds: Option<DateRange>,
    report: NormalizeReport,
}

impl CallDataset {
    pub fn from_records(records: Vec<CallRecord>, report: NormalizeReport) -> Self {
        let duration_bounds = records
            .iter()
            .map(CallRecord::avg_talk_duration_secs)
            .fold(None, |acc: Option<(f64, f64)>, d| match acc {
                None => Some((d, d)),
                Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
            })
            .and_then(|(lo, hi)| DurationRange::new(lo, hi).ok());

        let date_bounds = records
            .iter()
            .map(CallRecord::day)
            .fold(None, |acc: Option<(NaiveDate, NaiveDate)>, d| match acc {
                None => Some((d, d)),
                Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
            })
            .and_then(|(lo, hi)| DateRange::new(lo, hi).ok());

        CallDataset {
            records,
            duration_bounds,
            date_bounds,
            report,
        }
    }

    pub fn records(&self) -> &[CallRecord] {
        &self.records
    }

    /// Global min/max talk duration; `None` when nothing survived loading.
    pub fn duration_bounds(&self) -> Option<DurationRange> {
        self.duration_bounds
    }

    pub fn date_bounds(&self) -> Option<DateRange> {
        self.date_bounds
    }

    pub fn report(&self) -> &NormalizeReport {
        &self.report
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
