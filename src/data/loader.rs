use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Float32Type, Float64Type, Int32Type, Int64Type, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use calamine::{open_workbook_auto, Data, ExcelDateTime, Range, Reader};
use chrono::NaiveTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CallDataset, CellValue, RawTable};
use super::normalize::normalize;
use crate::error::DataError;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load and normalize a call dataset.
///
/// A missing required column surfaces as [`DataError::MissingColumns`] inside
/// the returned error chain; callers treat any error here as fatal.
pub fn load_dataset(path: &Path) -> Result<CallDataset> {
    let table = load_file(path)?;
    let dataset = normalize(&table)
        .with_context(|| format!("validating dataset {}", path.display()))?;

    let report = dataset.report();
    log::info!(
        "Loaded {} of {} rows from {} ({} dropped)",
        report.rows_kept,
        report.rows_read,
        path.display(),
        report.rows_dropped()
    );
    Ok(dataset)
}

/// Read a raw table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – flat columns (strings, ints, floats, bools, dates, timestamps)
/// * `.json`    – `[{ "Satisfaction rating": 4, "Date": "...", ... }, ...]`
/// * `.csv`     – header row followed by one call per line
/// * `.xlsx` / `.xlsm` / `.xls` / `.ods` – sheet `Sheet1`, else the first sheet
pub fn load_file(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_workbook(path),
        other => Err(DataError::UnsupportedFormat(other.to_string()).into()),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON layout (one object per call):
///
/// ```json
/// [
///   {
///     "Satisfaction rating": 4,
///     "Date": "2024-01-10",
///     "Resolved": "Y",
///     "AvgTalkDuration": "00:02:30"
///   },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

fn parse_json(text: &str) -> Result<RawTable> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(JsonValue::as_object)
        .map(|obj| {
            columns
                .iter()
                .map(|col| obj.get(col).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    Ok(RawTable { columns, rows })
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one call per line.
/// Short rows are padded with nulls so a ragged export does not abort loading.
fn load_csv(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening CSV")?;
    parse_csv(file)
}

fn parse_csv<R: Read>(input: R) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let row: Vec<CellValue> = (0..columns.len())
            .map(|idx| record.get(idx).map(guess_cell_type).unwrap_or(CellValue::Null))
            .collect();
        rows.push(row);
    }

    Ok(RawTable { columns, rows })
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    CellValue::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// Excel loader
// ---------------------------------------------------------------------------

const DEFAULT_SHEET: &str = "Sheet1";

/// First row of the sheet is the header. Time-of-day and duration cells become
/// seconds; date cells become dates or timestamps.
fn load_workbook(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).context("opening workbook")?;
    let names = workbook.sheet_names();
    let sheet = names
        .iter()
        .find(|n| n.as_str() == DEFAULT_SHEET)
        .or_else(|| names.first())
        .cloned()
        .context("workbook has no sheets")?;
    let range = workbook
        .worksheet_range(&sheet)
        .with_context(|| format!("reading sheet {sheet}"))?;
    Ok(sheet_to_table(&range))
}

fn sheet_to_table(range: &Range<Data>) -> RawTable {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return RawTable::default();
    };
    let columns: Vec<String> = header.iter().map(|c| c.to_string().trim().to_string()).collect();

    let rows = rows
        .map(|row| {
            (0..columns.len())
                .map(|idx| row.get(idx).map(workbook_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    RawTable { columns, rows }
}

fn workbook_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => guess_cell_type(s),
        Data::DateTime(dt) => workbook_datetime(dt),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        _ => CellValue::Null,
    }
}

fn workbook_datetime(dt: &ExcelDateTime) -> CellValue {
    let serial = dt.as_f64();
    // A serial below one day carries no date part: it is a talk time.
    if dt.is_duration() || (0.0..1.0).contains(&serial) {
        return CellValue::Float((serial * 86_400_000.0).round() / 1_000.0);
    }
    match dt.as_datetime() {
        Some(ts) if ts.time() == NaiveTime::MIN => CellValue::Date(ts.date()),
        Some(ts) => CellValue::DateTime(ts),
        None => CellValue::Null,
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing call records.
///
/// Every top-level column becomes a raw column. Works with files written by
/// any writer that stores flat columns (no nested lists or structs).
fn load_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| extract_cell(col, row))
                .collect();
            rows.push(cells);
        }
    }

    Ok(RawTable { columns, rows })
}

// -- Parquet / Arrow helpers --

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &ArrayRef, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let cell = match col.data_type() {
        DataType::Utf8 => col
            .as_string_opt::<i32>()
            .map(|a| CellValue::Text(a.value(row).to_string())),
        DataType::LargeUtf8 => col
            .as_string_opt::<i64>()
            .map(|a| CellValue::Text(a.value(row).to_string())),
        DataType::Int32 => col
            .as_primitive_opt::<Int32Type>()
            .map(|a| CellValue::Integer(a.value(row) as i64)),
        DataType::Int64 => col
            .as_primitive_opt::<Int64Type>()
            .map(|a| CellValue::Integer(a.value(row))),
        DataType::Float32 => col
            .as_primitive_opt::<Float32Type>()
            .map(|a| CellValue::Float(a.value(row) as f64)),
        DataType::Float64 => col
            .as_primitive_opt::<Float64Type>()
            .map(|a| CellValue::Float(a.value(row))),
        DataType::Boolean => col
            .as_boolean_opt()
            .map(|a| CellValue::Bool(a.value(row))),
        DataType::Date32 => col
            .as_primitive_opt::<Date32Type>()
            .and_then(|a| a.value_as_date(row))
            .map(CellValue::Date),
        DataType::Timestamp(unit, _) => match unit {
            TimeUnit::Second => col
                .as_primitive_opt::<TimestampSecondType>()
                .and_then(|a| a.value_as_datetime(row)),
            TimeUnit::Millisecond => col
                .as_primitive_opt::<TimestampMillisecondType>()
                .and_then(|a| a.value_as_datetime(row)),
            TimeUnit::Microsecond => col
                .as_primitive_opt::<TimestampMicrosecondType>()
                .and_then(|a| a.value_as_datetime(row)),
            TimeUnit::Nanosecond => col
                .as_primitive_opt::<TimestampNanosecondType>()
                .and_then(|a| a.value_as_datetime(row)),
        }
        .map(CellValue::DateTime),
        other => {
            log::debug!("Unsupported parquet column type {other:?}; treating as null");
            None
        }
    };
    cell.unwrap_or(CellValue::Null)
}
