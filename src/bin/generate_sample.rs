//! Writes a synthetic call-center dataset for demos and manual testing.
//!
//! ```text
//! cargo run --bin generate_sample [-- out.csv | out.parquet]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use callsense::data::normalize::{DATE_COLUMN, DURATION_COLUMN, RATING_COLUMN, RESOLVED_COLUMN};
use chrono::{Duration, NaiveDate};
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ROWS: usize = 600;
const SEED: u64 = 42;
const AGENTS: [&str; 5] = ["Avery", "Jordan", "Morgan", "Riley", "Taylor"];
const TOPICS: [&str; 4] = ["Billing", "Outage", "Upgrade", "Cancellation"];
const HEADER: [&str; 7] = [
    "Call Id",
    "Agent",
    "Topic",
    DATE_COLUMN,
    RESOLVED_COLUMN,
    DURATION_COLUMN,
    RATING_COLUMN,
];

/// One generated row. Cells stay textual so malformed values survive.
struct SampleCall {
    call_id: i64,
    agent: &'static str,
    topic: &'static str,
    date: String,
    resolved: String,
    duration: String,
    rating: Option<i64>,
}

fn generate(rng: &mut StdRng, first_day: NaiveDate) -> Vec<SampleCall> {
    (0..ROWS)
        .map(|i| {
            let resolved = rng.gen_bool(0.7);
            // Resolved calls skew positive, unresolved ones negative.
            let rating = if resolved {
                rng.gen_range(2..=5)
            } else {
                rng.gen_range(1..=4)
            };
            let secs: u32 = if resolved {
                rng.gen_range(60..420)
            } else {
                rng.gen_range(180..900)
            };
            let date = first_day + Duration::days(rng.gen_range(0..270));

            let mut call = SampleCall {
                call_id: i as i64 + 1,
                agent: AGENTS[rng.gen_range(0..AGENTS.len())],
                topic: TOPICS[rng.gen_range(0..TOPICS.len())],
                date: date.format("%Y-%m-%d").to_string(),
                resolved: if resolved { "Y" } else { "N" }.to_string(),
                duration: format!("{}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60),
                rating: Some(rating),
            };

            // About 2% of rows get one broken field.
            if rng.gen_bool(0.02) {
                match rng.gen_range(0..4) {
                    0 => call.date = "not a date".to_string(),
                    1 => call.duration = "-".to_string(),
                    2 => call.resolved = "maybe".to_string(),
                    _ => call.rating = None,
                }
            }
            call
        })
        .collect()
}

fn write_csv(path: &Path, calls: &[SampleCall]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Cannot create {}", path.display()))?;

    writer.write_record(HEADER)?;

    for call in calls {
        writer.write_record([
            call.call_id.to_string(),
            call.agent.to_string(),
            call.topic.to_string(),
            call.date.clone(),
            call.resolved.clone(),
            call.duration.clone(),
            call.rating.map(|r| r.to_string()).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, calls: &[SampleCall]) -> Result<()> {
    let text = |f: fn(&SampleCall) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(calls.iter().map(f).collect::<Vec<_>>()))
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new(HEADER[0], DataType::Int64, false),
        Field::new(HEADER[1], DataType::Utf8, false),
        Field::new(HEADER[2], DataType::Utf8, false),
        Field::new(HEADER[3], DataType::Utf8, false),
        Field::new(HEADER[4], DataType::Utf8, false),
        Field::new(HEADER[5], DataType::Utf8, false),
        Field::new(HEADER[6], DataType::Int64, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from_iter_values(calls.iter().map(|c| c.call_id))),
            text(|c| c.agent),
            text(|c| c.topic),
            text(|c| c.date.as_str()),
            text(|c| c.resolved.as_str()),
            text(|c| c.duration.as_str()),
            Arc::new(Int64Array::from(
                calls.iter().map(|c| c.rating).collect::<Vec<_>>(),
            )),
        ],
    )
    .context("Failed to build record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("Cannot create {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let output = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_calls.csv"));

    let mut rng = StdRng::seed_from_u64(SEED);
    let first_day = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid start date")?;
    let calls = generate(&mut rng, first_day);

    let is_parquet = output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));
    if is_parquet {
        write_parquet(&output, &calls)?;
    } else {
        write_csv(&output, &calls)?;
    }

    println!("Wrote {} calls to {}", calls.len(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use callsense::data::loader::load_dataset;
    use callsense::data::normalize::REQUIRED_COLUMNS;

    use super::*;

    fn sample() -> Vec<SampleCall> {
        let mut rng = StdRng::seed_from_u64(SEED);
        generate(&mut rng, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[test]
    fn header_carries_every_required_column() {
        for column in REQUIRED_COLUMNS {
            assert!(HEADER.contains(&column), "{column}");
        }
    }

    #[test]
    fn written_files_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let calls = sample();

        for name in ["calls.csv", "calls.parquet"] {
            let path = dir.path().join(name);
            if name.ends_with(".parquet") {
                write_parquet(&path, &calls).unwrap();
            } else {
                write_csv(&path, &calls).unwrap();
            }
            let dataset = load_dataset(&path).unwrap();
            assert_eq!(dataset.report().rows_read, ROWS, "{name}");
            assert!(dataset.report().rows_dropped() < ROWS / 10, "{name}");
        }
    }
}
