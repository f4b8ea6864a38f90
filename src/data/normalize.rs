use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use super::model::{CallDataset, CallRecord, CellValue, NormalizeReport, RawTable, Resolved};
use crate::error::DataError;

pub const RATING_COLUMN: &str = "Satisfaction rating";
pub const DATE_COLUMN: &str = "Date";
pub const RESOLVED_COLUMN: &str = "Resolved";
pub const DURATION_COLUMN: &str = "AvgTalkDuration";

pub const REQUIRED_COLUMNS: [&str; 4] =
    [RATING_COLUMN, DATE_COLUMN, RESOLVED_COLUMN, DURATION_COLUMN];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Column positions of the required fields within a [`RawTable`].
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    rating: usize,
    date: usize,
    resolved: usize,
    duration: usize,
}

fn locate_columns(table: &RawTable) -> Result<ColumnIndex, DataError> {
    let mut missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| table.column_index(c).is_none())
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(DataError::MissingColumns(missing));
    }

    let idx = |name: &str| table.column_index(name).unwrap_or_default();
    Ok(ColumnIndex {
        rating: idx(RATING_COLUMN),
        date: idx(DATE_COLUMN),
        resolved: idx(RESOLVED_COLUMN),
        duration: idx(DURATION_COLUMN),
    })
}

/// Turn a raw table into the immutable dataset.
///
/// Missing required columns fail the whole load. Rows whose rating, date,
/// duration or resolution flag cannot be coerced are dropped and counted.
pub fn normalize(table: &RawTable) -> Result<CallDataset, DataError> {
    let cols = locate_columns(table)?;

    let mut report = NormalizeReport {
        rows_read: table.rows.len(),
        ..NormalizeReport::default()
    };
    let mut records = Vec::with_capacity(table.rows.len());

    for row in 0..table.rows.len() {
        let rating = parse_rating(table.cell(row, cols.rating));
        let timestamp = parse_timestamp(table.cell(row, cols.date));
        let duration = parse_duration(table.cell(row, cols.duration));
        let resolved = parse_resolved(table.cell(row, cols.resolved));

        report.bad_rating += usize::from(rating.is_none());
        report.bad_date += usize::from(timestamp.is_none());
        report.bad_duration += usize::from(duration.is_none());
        report.bad_resolved += usize::from(resolved.is_none());

        let record = match (rating, timestamp, duration, resolved) {
            (Some(r), Some(t), Some(d), Some(res)) => CallRecord::new(r, t, d, res),
            _ => None,
        };
        match record {
            Some(rec) => records.push(rec),
            None => log::debug!("Dropping row {row}: unusable rating, date, duration or resolution"),
        }
    }

    report.rows_kept = records.len();
    if report.rows_dropped() > 0 {
        log::info!(
            "Dropped {} rows (rating: {}, date: {}, duration: {}, resolved: {})",
            report.rows_dropped(),
            report.bad_rating,
            report.bad_date,
            report.bad_duration,
            report.bad_resolved
        );
    }

    Ok(CallDataset::from_records(records, report))
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

/// Integral ratings only; `4.0` and `"4"` are accepted, `3.5` is not.
pub fn parse_rating(cell: &CellValue) -> Option<i64> {
    match cell {
        CellValue::Integer(i) => Some(*i),
        CellValue::Float(f) => integral(*f),
        CellValue::Text(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

pub fn parse_timestamp(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Date(d) => Some(d.and_time(NaiveTime::MIN)),
        CellValue::Text(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Talk duration in seconds.
///
/// Text is read as an elapsed time `[D day[s][,] ]H:MM:SS[.f]`; numeric cells
/// are already seconds. Negative values are rejected.
pub fn parse_duration(cell: &CellValue) -> Option<f64> {
    let secs = match cell {
        CellValue::Integer(i) => *i as f64,
        CellValue::Float(f) => *f,
        CellValue::Text(s) => parse_elapsed(s.trim())?,
        _ => return None,
    };
    (secs.is_finite() && secs >= 0.0).then_some(secs)
}

fn parse_elapsed(s: &str) -> Option<f64> {
    let (days, clock) = match s.split_once("day") {
        Some((d, rest)) => {
            let days: u64 = d.trim().parse().ok()?;
            let rest = rest.strip_prefix('s').unwrap_or(rest);
            let rest = rest.trim_start().strip_prefix(',').unwrap_or(rest);
            (days, rest.trim())
        }
        None => (0, s),
    };

    let mut parts = clock.split(':');
    let (h, m, sec) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(h) || !all_digits(m) {
        return None;
    }
    let (whole, frac) = sec.split_once('.').unwrap_or((sec, ""));
    if !all_digits(whole) || !(frac.is_empty() || all_digits(frac)) {
        return None;
    }

    let hours: u64 = h.parse().ok()?;
    let minutes: u64 = m.parse().ok()?;
    let seconds: f64 = sec.parse().ok()?;
    if minutes >= 60 || seconds >= 60.0 {
        return None;
    }

    let whole = days
        .checked_mul(86_400)?
        .checked_add(hours.checked_mul(3_600)?)?
        .checked_add(minutes * 60)?;
    Some(whole as f64 + seconds)
}

pub fn parse_resolved(cell: &CellValue) -> Option<Resolved> {
    match cell {
        CellValue::Text(s) => s.parse().ok(),
        CellValue::Bool(b) => Some(if *b { Resolved::Yes } else { Resolved::No }),
        _ => None,
    }
}
