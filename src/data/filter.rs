use std::collections::BTreeSet;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use super::model::{CallDataset, CallRecord, DateRange, DurationRange, Resolved, Sentiment};
use crate::error::FilterError;

// ---------------------------------------------------------------------------
// Filter criteria: the user's current selection
// ---------------------------------------------------------------------------

/// An immutable set of constraints narrowing the record set.
///
/// An empty sentiment set or an absent resolution flag means "no filter"
/// (match all). The date and duration ranges always apply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterCriteria {
    sentiments: BTreeSet<Sentiment>,
    date_range: DateRange,
    resolved: Option<Resolved>,
    duration_range: DurationRange,
}

impl FilterCriteria {
    pub fn new(
        sentiments: BTreeSet<Sentiment>,
        date_range: DateRange,
        resolved: Option<Resolved>,
        duration_range: DurationRange,
    ) -> Self {
        Self {
            sentiments,
            date_range,
            resolved,
            duration_range,
        }
    }

    /// Build criteria from unchecked bounds, rejecting inverted ranges.
    pub fn from_parts(
        sentiments: impl IntoIterator<Item = Sentiment>,
        start: NaiveDate,
        end: NaiveDate,
        resolved: Option<Resolved>,
        min_secs: f64,
        max_secs: f64,
    ) -> Result<Self, FilterError> {
        Ok(Self::new(
            sentiments.into_iter().collect(),
            DateRange::new(start, end)?,
            resolved,
            DurationRange::new(min_secs, max_secs)?,
        ))
    }

    /// Criteria that keep every record of `dataset`: no sentiment or
    /// resolution filter, full date span and full duration span.
    pub fn unfiltered(dataset: &CallDataset) -> Self {
        let date_range = dataset
            .date_bounds()
            .unwrap_or_else(|| DateRange::single_day(Local::now().date_naive()));
        let duration_range = dataset.duration_bounds().unwrap_or_default();
        Self::new(BTreeSet::new(), date_range, None, duration_range)
    }

    pub fn sentiments(&self) -> &BTreeSet<Sentiment> {
        &self.sentiments
    }

    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    pub fn resolved(&self) -> Option<Resolved> {
        self.resolved
    }

    pub fn duration_range(&self) -> DurationRange {
        self.duration_range
    }

    pub fn with_sentiments(mut self, sentiments: BTreeSet<Sentiment>) -> Self {
        self.sentiments = sentiments;
        self
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    pub fn with_resolved(mut self, resolved: Option<Resolved>) -> Self {
        self.resolved = resolved;
        self
    }

    pub fn with_duration_range(mut self, duration_range: DurationRange) -> Self {
        self.duration_range = duration_range;
        self
    }

    /// Whether a single record passes every active clause.
    ///
    /// A record passes when:
    /// * the sentiment set is empty, or contains the record's sentiment
    /// * its calendar day lies within the date range (inclusive)
    /// * no resolution flag is set, or it equals the record's flag
    /// * its talk duration lies within the duration range (inclusive)
    pub fn matches(&self, record: &CallRecord) -> bool {
        if !self.sentiments.is_empty() && !self.sentiments.contains(&record.sentiment()) {
            return false;
        }
        if !self.date_range.contains(record.day()) {
            return false;
        }
        if let Some(wanted) = self.resolved {
            if record.resolved() != wanted {
                return false;
            }
        }
        self.duration_range.contains(record.avg_talk_duration_secs())
    }
}

// ---------------------------------------------------------------------------
// Applying criteria
// ---------------------------------------------------------------------------

/// Return the records that pass all active filters, in dataset order.
pub fn apply<'a>(records: &'a [CallRecord], criteria: &FilterCriteria) -> Vec<&'a CallRecord> {
    records.iter().filter(|r| criteria.matches(r)).collect()
}

/// Return indices of records that pass all active filters.
pub fn apply_indices(records: &[CallRecord], criteria: &FilterCriteria) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| criteria.matches(r))
        .map(|(i, _)| i)
        .collect()
}
