use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::model::{CallRecord, Resolved, Sentiment, YearMonth};

// ---------------------------------------------------------------------------
// View types (chart-ready, serializable with stable keys)
// ---------------------------------------------------------------------------

/// Record count per sentiment, only for sentiments present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SentimentDistribution {
    pub counts: BTreeMap<Sentiment, usize>,
}

impl SentimentDistribution {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Monthly sentiment counts.
///
/// `series` lists every sentiment seen anywhere in the subset; each month row
/// carries a count for each of them, zero where the month had none.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SentimentTrend {
    pub series: Vec<Sentiment>,
    pub months: Vec<MonthlySentiment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySentiment {
    pub month: YearMonth,
    pub counts: BTreeMap<Sentiment, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolutionCount {
    pub resolved: Resolved,
    pub sentiment: Sentiment,
    pub count: usize,
}

/// Counts per (resolved, sentiment) pair, ordered by flag then sentiment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResolutionImpact {
    pub rows: Vec<ResolutionCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FiveNumberSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl FiveNumberSummary {
    /// Summary of an unsorted sample; `None` when it is empty.
    pub fn from_sample(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            min: sorted[0],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
        })
    }
}

/// Linear interpolation between the two closest ranks at `p * (n - 1)`.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Talk-duration summary per sentiment present in the subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DurationBySentiment {
    pub summaries: BTreeMap<Sentiment, FiveNumberSummary>,
}

/// Resolution outcome of negative-sentiment calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChurnIndicator {
    pub counts: BTreeMap<Resolved, usize>,
}

impl ChurnIndicator {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

// ---------------------------------------------------------------------------
// Aggregations
// ---------------------------------------------------------------------------

pub fn sentiment_distribution(subset: &[&CallRecord]) -> SentimentDistribution {
    let mut counts = BTreeMap::new();
    for r in subset {
        *counts.entry(r.sentiment()).or_insert(0) += 1;
    }
    SentimentDistribution { counts }
}

pub fn sentiment_trend(subset: &[&CallRecord]) -> SentimentTrend {
    let series: BTreeSet<Sentiment> = subset.iter().map(|r| r.sentiment()).collect();

    let mut by_month: BTreeMap<YearMonth, BTreeMap<Sentiment, usize>> = BTreeMap::new();
    for r in subset {
        let row = by_month
            .entry(r.year_month())
            .or_insert_with(|| series.iter().map(|s| (*s, 0)).collect());
        *row.entry(r.sentiment()).or_insert(0) += 1;
    }

    SentimentTrend {
        series: series.into_iter().collect(),
        months: by_month
            .into_iter()
            .map(|(month, counts)| MonthlySentiment { month, counts })
            .collect(),
    }
}

pub fn resolution_impact(subset: &[&CallRecord]) -> ResolutionImpact {
    let mut counts: BTreeMap<(Resolved, Sentiment), usize> = BTreeMap::new();
    for r in subset {
        *counts.entry((r.resolved(), r.sentiment())).or_insert(0) += 1;
    }
    ResolutionImpact {
        rows: counts
            .into_iter()
            .map(|((resolved, sentiment), count)| ResolutionCount {
                resolved,
                sentiment,
                count,
            })
            .collect(),
    }
}

pub fn duration_by_sentiment(subset: &[&CallRecord]) -> DurationBySentiment {
    let mut samples: BTreeMap<Sentiment, Vec<f64>> = BTreeMap::new();
    for r in subset {
        samples
            .entry(r.sentiment())
            .or_default()
            .push(r.avg_talk_duration_secs());
    }
    DurationBySentiment {
        summaries: samples
            .into_iter()
            .filter_map(|(s, values)| FiveNumberSummary::from_sample(&values).map(|f| (s, f)))
            .collect(),
    }
}

pub fn churn_indicator(subset: &[&CallRecord]) -> ChurnIndicator {
    let mut counts = BTreeMap::new();
    for r in subset.iter().filter(|r| r.sentiment() == Sentiment::Negative) {
        *counts.entry(r.resolved()).or_insert(0) += 1;
    }
    ChurnIndicator { counts }
}

// ---------------------------------------------------------------------------
// All five views at once
// ---------------------------------------------------------------------------

/// The five dashboard views derived from one filtered subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardViews {
    pub sentiment_distribution: SentimentDistribution,
    pub sentiment_trend: SentimentTrend,
    pub resolution_impact: ResolutionImpact,
    pub duration_by_sentiment: DurationBySentiment,
    pub churn_indicator: ChurnIndicator,
}

impl DashboardViews {
    pub fn compute(subset: &[&CallRecord]) -> Self {
        Self {
            sentiment_distribution: sentiment_distribution(subset),
            sentiment_trend: sentiment_trend(subset),
            resolution_impact: resolution_impact(subset),
            duration_by_sentiment: duration_by_sentiment(subset),
            churn_indicator: churn_indicator(subset),
        }
    }

    /// Same as [`compute`](Self::compute), one scoped thread per view.
    pub fn compute_parallel(subset: &[&CallRecord]) -> Self {
        std::thread::scope(|s| {
            let distribution = s.spawn(|| sentiment_distribution(subset));
            let trend = s.spawn(|| sentiment_trend(subset));
            let resolution = s.spawn(|| resolution_impact(subset));
            let durations = s.spawn(|| duration_by_sentiment(subset));
            let churn = churn_indicator(subset);

            Self {
                sentiment_distribution: joined("distribution", distribution),
                sentiment_trend: joined("trend", trend),
                resolution_impact: joined("resolution", resolution),
                duration_by_sentiment: joined("duration", durations),
                churn_indicator: churn,
            }
        })
    }
}

fn joined<T: Default>(view: &str, handle: std::thread::ScopedJoinHandle<'_, T>) -> T {
    handle.join().unwrap_or_else(|_| {
        log::error!("{view} aggregation panicked; showing an empty view");
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn rec(rating: i64, ts: NaiveDateTime, resolved: Resolved, secs: f64) -> CallRecord {
        CallRecord::new(rating, ts, secs, resolved).unwrap()
    }

    fn mixed() -> Vec<CallRecord> {
        vec![
            rec(5, at(2024, 1, 3), Resolved::Yes, 100.0),
            rec(4, at(2024, 1, 9), Resolved::No, 200.0),
            rec(1, at(2024, 1, 20), Resolved::No, 300.0),
            rec(2, at(2024, 3, 2), Resolved::Yes, 400.0),
            rec(3, at(2024, 3, 5), Resolved::Yes, 50.0),
            rec(2, at(2024, 3, 9), Resolved::No, 500.0),
            rec(5, at(2023, 12, 31), Resolved::Yes, 150.0),
        ]
    }

    #[test]
    fn views_over_empty_subset_are_empty() {
        let views = DashboardViews::compute(&[]);
        assert!(views.sentiment_distribution.counts.is_empty());
        assert!(views.sentiment_trend.months.is_empty());
        assert!(views.sentiment_trend.series.is_empty());
        assert!(views.resolution_impact.rows.is_empty());
        assert!(views.duration_by_sentiment.summaries.is_empty());
        assert!(views.churn_indicator.counts.is_empty());
    }

    #[test]
    fn distribution_sums_to_subset_size() {
        let records = mixed();
        let subset: Vec<&CallRecord> = records.iter().collect();
        let dist = sentiment_distribution(&subset);
        assert_eq!(dist.total(), subset.len());
        assert_eq!(dist.counts[&Sentiment::Positive], 3);
        assert_eq!(dist.counts[&Sentiment::Neutral], 1);
        assert_eq!(dist.counts[&Sentiment::Negative], 3);
    }

    #[test]
    fn distribution_omits_absent_sentiments() {
        let records = vec![rec(5, at(2024, 1, 1), Resolved::Yes, 1.0)];
        let subset: Vec<&CallRecord> = records.iter().collect();
        let dist = sentiment_distribution(&subset);
        assert_eq!(dist.counts.len(), 1);
        assert!(!dist.counts.contains_key(&Sentiment::Negative));
    }

    #[test]
    fn trend_zero_fills_cells_but_not_months() {
        let records = mixed();
        let subset: Vec<&CallRecord> = records.iter().collect();
        let trend = sentiment_trend(&subset);

        assert_eq!(trend.series, Sentiment::ALL.to_vec());
        let labels: Vec<String> = trend.months.iter().map(|m| m.month.to_string()).collect();
        // February has no calls and is not invented.
        assert_eq!(labels, vec!["2023-12", "2024-01", "2024-03"]);

        let dec = &trend.months[0].counts;
        assert_eq!(dec[&Sentiment::Positive], 1);
        assert_eq!(dec[&Sentiment::Neutral], 0);
        assert_eq!(dec[&Sentiment::Negative], 0);

        let mar = &trend.months[2].counts;
        assert_eq!(mar[&Sentiment::Positive], 0);
        assert_eq!(mar[&Sentiment::Neutral], 1);
        assert_eq!(mar[&Sentiment::Negative], 2);

        let cells: usize = trend.months.iter().flat_map(|m| m.counts.values()).sum();
        assert_eq!(cells, records.len());
    }

    #[test]
    fn trend_series_only_cover_seen_sentiments() {
        let records = vec![
            rec(5, at(2024, 1, 1), Resolved::Yes, 1.0),
            rec(1, at(2024, 2, 1), Resolved::No, 1.0),
        ];
        let subset: Vec<&CallRecord> = records.iter().collect();
        let trend = sentiment_trend(&subset);
        assert_eq!(trend.series, vec![Sentiment::Positive, Sentiment::Negative]);
        assert!(trend.months.iter().all(|m| m.counts.len() == 2));
    }

    #[test]
    fn resolution_impact_groups_by_pair() {
        let records = mixed();
        let subset: Vec<&CallRecord> = records.iter().collect();
        let impact = resolution_impact(&subset);
        let pairs: Vec<(Resolved, Sentiment, usize)> = impact
            .rows
            .iter()
            .map(|r| (r.resolved, r.sentiment, r.count))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (Resolved::No, Sentiment::Positive, 1),
                (Resolved::No, Sentiment::Negative, 2),
                (Resolved::Yes, Sentiment::Positive, 2),
                (Resolved::Yes, Sentiment::Neutral, 1),
                (Resolved::Yes, Sentiment::Negative, 1),
            ]
        );
    }

    #[test]
    fn quartiles_interpolate_linearly() {
        let s = FiveNumberSummary::from_sample(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(s.min, 1.0);
        assert_eq!(s.q1, 1.75);
        assert_eq!(s.median, 2.5);
        assert_eq!(s.q3, 3.25);
        assert_eq!(s.max, 4.0);

        let odd = FiveNumberSummary::from_sample(&[10.0, 20.0, 30.0, 40.0, 50.0]).unwrap();
        assert_eq!((odd.q1, odd.median, odd.q3), (20.0, 30.0, 40.0));

        assert!(FiveNumberSummary::from_sample(&[]).is_none());
    }

    #[test]
    fn duration_summary_per_present_sentiment() {
        let records = mixed();
        let subset: Vec<&CallRecord> = records.iter().collect();
        let durations = duration_by_sentiment(&subset);

        assert_eq!(durations.summaries.len(), 3);
        let neg = durations.summaries[&Sentiment::Negative];
        assert_eq!((neg.min, neg.median, neg.max), (300.0, 400.0, 500.0));
        let neutral = durations.summaries[&Sentiment::Neutral];
        assert_eq!((neutral.min, neutral.q1, neutral.q3), (50.0, 50.0, 50.0));
    }

    #[test]
    fn churn_counts_negative_calls_only() {
        let records = mixed();
        let subset: Vec<&CallRecord> = records.iter().collect();
        let churn = churn_indicator(&subset);
        let negatives = subset
            .iter()
            .filter(|r| r.sentiment() == Sentiment::Negative)
            .count();
        assert_eq!(churn.total(), negatives);
        assert_eq!(churn.counts[&Resolved::No], 2);
        assert_eq!(churn.counts[&Resolved::Yes], 1);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let records = mixed();
        let subset: Vec<&CallRecord> = records.iter().collect();
        assert_eq!(
            DashboardViews::compute(&subset),
            DashboardViews::compute_parallel(&subset)
        );
    }

    #[test]
    fn views_serialize_with_category_keys() {
        let records = mixed();
        let subset: Vec<&CallRecord> = records.iter().collect();
        let json = serde_json::to_value(DashboardViews::compute(&subset)).unwrap();

        assert_eq!(json["sentiment_distribution"]["Positive"], 3);
        assert_eq!(json["churn_indicator"]["N"], 2);
        assert_eq!(json["sentiment_trend"]["months"][0]["month"], "2023-12");
        assert_eq!(json["resolution_impact"][0]["resolved"], "N");
        assert_eq!(json["duration_by_sentiment"]["Neutral"]["median"], 50.0);
    }
}
