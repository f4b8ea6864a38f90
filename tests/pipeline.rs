//! End-to-end: file on disk → normalized dataset → filter → dashboard views,
//! plus the saved-filter log on a real SQLite file.

use std::io::Write;

use chrono::NaiveDate;

use callsense::data::filter::apply;
use callsense::data::loader::load_dataset;
use callsense::{DashboardViews, FilterCriteria, FilterHistoryStore, Resolved, Sentiment};

fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

fn write_csv(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const TWO_CALLS: &str = "\
Satisfaction rating,Date,Resolved,AvgTalkDuration,Agent
5,2024-01-10,Y,120,Avery
2,2024-01-15,N,300,Jordan
";

fn january(min: f64, max: f64) -> FilterCriteria {
    FilterCriteria::from_parts(Vec::new(), day(1, 1), day(1, 31), None, min, max).unwrap()
}

#[test]
fn full_january_window_keeps_both_calls() {
    let file = write_csv(TWO_CALLS);
    let dataset = load_dataset(file.path()).unwrap();
    assert_eq!(dataset.len(), 2);

    let subset = apply(dataset.records(), &january(0.0, 400.0));
    let views = DashboardViews::compute(&subset);

    let dist = &views.sentiment_distribution.counts;
    assert_eq!(dist.get(&Sentiment::Positive), Some(&1));
    assert_eq!(dist.get(&Sentiment::Negative), Some(&1));
    assert_eq!(dist.get(&Sentiment::Neutral), None);

    assert_eq!(views.churn_indicator.counts.len(), 1);
    assert_eq!(views.churn_indicator.counts.get(&Resolved::No), Some(&1));
    assert_eq!(views.sentiment_trend.months.len(), 1);
}

#[test]
fn duration_window_isolates_the_short_call() {
    let file = write_csv(TWO_CALLS);
    let dataset = load_dataset(file.path()).unwrap();

    let subset = apply(dataset.records(), &january(0.0, 200.0));
    assert_eq!(subset.len(), 1);

    let views = DashboardViews::compute(&subset);
    let durations = &views.duration_by_sentiment.summaries;
    assert_eq!(durations.len(), 1);
    let s = durations[&Sentiment::Positive];
    for v in [s.min, s.q1, s.median, s.q3, s.max] {
        assert_eq!(v, 120.0);
    }
    assert!(views.churn_indicator.counts.is_empty());
}

#[test]
fn malformed_rows_are_dropped_and_counted() {
    let file = write_csv(
        "\
Satisfaction rating,Date,Resolved,AvgTalkDuration
4,2024-02-01,Yes,0:03:00
,2024-02-02,N,60
3,not a date,N,60
1,2024-02-03,maybe,60
2,2024-02-04,N,-
",
    );
    let dataset = load_dataset(file.path()).unwrap();
    assert_eq!(dataset.len(), 1);
    assert_eq!(dataset.report().rows_read, 5);
    assert_eq!(dataset.report().rows_dropped(), 4);
    assert_eq!(dataset.records()[0].avg_talk_duration_secs(), 180.0);
}

#[test]
fn unfiltered_criteria_cover_the_whole_dataset() {
    let file = write_csv(TWO_CALLS);
    let dataset = load_dataset(file.path()).unwrap();

    let criteria = FilterCriteria::unfiltered(&dataset);
    let subset = apply(dataset.records(), &criteria);
    assert_eq!(subset.len(), dataset.len());
    assert_eq!(
        DashboardViews::compute(&subset),
        DashboardViews::compute_parallel(&subset)
    );
}

#[test]
fn saved_views_persist_across_reopen_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("history.db");

    let criteria = FilterCriteria::from_parts(
        [Sentiment::Negative],
        day(1, 1),
        day(1, 31),
        Some(Resolved::No),
        0.0,
        400.0,
    )
    .unwrap();

    {
        let store = FilterHistoryStore::open(&db).unwrap();
        assert_eq!(store.save(&criteria).unwrap().id, 1);
    }

    let store = FilterHistoryStore::open(&db).unwrap();
    let saved = store.list_all().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].criteria().unwrap(), criteria);

    assert_eq!(store.clear_all().unwrap(), 1);
    assert!(store.list_all().unwrap().is_empty());
    assert_eq!(store.save(&criteria).unwrap().id, 2);
}
