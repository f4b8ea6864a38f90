use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;

use callsense::data::filter::apply_indices;
use callsense::{
    CallDataset, CallRecord, DashboardViews, FilterCriteria, FilterHistoryStore, Resolved,
    SavedFilter, Sentiment,
};

// ---------------------------------------------------------------------------
// Filter inputs as edited in the side panel
// ---------------------------------------------------------------------------

/// Raw widget values. They may be inconsistent while the user edits;
/// only a validated copy becomes the active [`FilterCriteria`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDraft {
    pub sentiments: BTreeSet<Sentiment>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub resolved: Option<Resolved>,
    pub min_secs: f64,
    pub max_secs: f64,
}

impl From<&FilterCriteria> for FilterDraft {
    fn from(criteria: &FilterCriteria) -> Self {
        Self {
            sentiments: criteria.sentiments().clone(),
            start: criteria.date_range().start(),
            end: criteria.date_range().end(),
            resolved: criteria.resolved(),
            min_secs: criteria.duration_range().min(),
            max_secs: criteria.duration_range().max(),
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Dataset loaded at startup; never replaced.
    pub dataset: Arc<CallDataset>,

    /// Saved-filter log. `None` when the database could not be opened.
    pub history: Option<FilterHistoryStore>,

    /// Last valid criteria.
    pub criteria: FilterCriteria,

    /// Widget values being edited.
    pub draft: FilterDraft,

    /// Indices of records passing the current criteria (cached).
    pub visible_indices: Vec<usize>,

    /// The five chart views for `visible_indices`.
    pub views: DashboardViews,

    /// Saved filters as last listed.
    pub saved: Vec<SavedFilter>,

    /// Whether the history panel is open.
    pub show_history: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(dataset: Arc<CallDataset>, history: Option<FilterHistoryStore>) -> Self {
        let criteria = FilterCriteria::unfiltered(&dataset);
        let mut state = Self {
            draft: FilterDraft::from(&criteria),
            dataset,
            history,
            criteria,
            visible_indices: Vec::new(),
            views: DashboardViews::default(),
            saved: Vec::new(),
            show_history: false,
            status_message: None,
        };
        state.refilter();
        state
    }

    /// Recompute `visible_indices` and the views after a criteria change.
    pub fn refilter(&mut self) {
        let records = self.dataset.records();
        self.visible_indices = apply_indices(records, &self.criteria);
        let subset: Vec<&CallRecord> = self.visible_indices.iter().map(|&i| &records[i]).collect();
        self.views = DashboardViews::compute(&subset);
    }

    /// Validate the draft and make it the active criteria.
    ///
    /// An inverted range is reported in the status line and the previous
    /// criteria stay active.
    pub fn apply_draft(&mut self) {
        let d = &self.draft;
        match FilterCriteria::from_parts(
            d.sentiments.iter().copied(),
            d.start,
            d.end,
            d.resolved,
            d.min_secs,
            d.max_secs,
        ) {
            Ok(criteria) => {
                self.status_message = None;
                if criteria != self.criteria {
                    self.criteria = criteria;
                    self.refilter();
                }
            }
            Err(e) => {
                log::warn!("Rejected filter: {e}");
                self.status_message = Some(format!("Invalid filter: {e}"));
            }
        }
    }

    /// Toggle a sentiment in the draft and apply.
    pub fn toggle_sentiment(&mut self, sentiment: Sentiment) {
        if !self.draft.sentiments.remove(&sentiment) {
            self.draft.sentiments.insert(sentiment);
        }
        self.apply_draft();
    }

    /// Back to the full dataset.
    pub fn reset_filters(&mut self) {
        self.criteria = FilterCriteria::unfiltered(&self.dataset);
        self.draft = FilterDraft::from(&self.criteria);
        self.status_message = None;
        self.refilter();
    }

    /// Snapshot the active criteria into the history log.
    pub fn save_current(&mut self) {
        let Some(store) = &self.history else {
            self.status_message = Some("Filter history is unavailable".into());
            return;
        };
        match store.save(&self.criteria) {
            Ok(saved) => {
                self.status_message = Some(format!("Saved view #{}", saved.id));
                self.refresh_history();
                self.show_history = true;
            }
            Err(e) => self.report_history_error(e),
        }
    }

    /// Reload the saved filters from the store.
    pub fn refresh_history(&mut self) {
        let Some(store) = &self.history else {
            return;
        };
        match store.list_all() {
            Ok(saved) => self.saved = saved,
            Err(e) => self.report_history_error(e),
        }
    }

    pub fn view_history(&mut self) {
        self.refresh_history();
        self.show_history = true;
    }

    pub fn clear_history(&mut self) {
        let Some(store) = &self.history else {
            return;
        };
        match store.clear_all() {
            Ok(n) => {
                self.status_message = Some(format!("Deleted {n} saved views"));
                self.refresh_history();
            }
            Err(e) => self.report_history_error(e),
        }
    }

    /// Make a saved filter the active criteria.
    pub fn restore(&mut self, id: i64) {
        let Some(saved) = self.saved.iter().find(|s| s.id == id) else {
            return;
        };
        match saved.criteria() {
            Ok(criteria) => {
                self.draft = FilterDraft::from(&criteria);
                self.criteria = criteria;
                self.status_message = Some(format!("Restored view #{id}"));
                self.refilter();
            }
            Err(e) => self.report_history_error(e),
        }
    }

    fn report_history_error(&mut self, e: callsense::error::HistoryError) {
        log::error!("Filter history: {e}");
        self.status_message = Some(format!("Error: {e}"));
    }
}

#[cfg(test)]
mod tests {
    use callsense::data::model::NormalizeReport;

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn state() -> AppState {
        let records = vec![
            CallRecord::new(5, day(10).and_hms_opt(9, 0, 0).unwrap(), 120.0, Resolved::Yes).unwrap(),
            CallRecord::new(2, day(15).and_hms_opt(9, 0, 0).unwrap(), 300.0, Resolved::No).unwrap(),
        ];
        let dataset = Arc::new(CallDataset::from_records(records, NormalizeReport::default()));
        AppState::new(dataset, Some(FilterHistoryStore::open_in_memory().unwrap()))
    }

    #[test]
    fn starts_with_everything_visible() {
        let s = state();
        assert_eq!(s.visible_indices, vec![0, 1]);
        assert_eq!(s.views.sentiment_distribution.total(), 2);
        assert_eq!(s.draft.min_secs, 120.0);
        assert_eq!(s.draft.max_secs, 300.0);
    }

    #[test]
    fn inverted_draft_keeps_previous_criteria() {
        let mut s = state();
        let before = s.criteria.clone();
        s.draft.start = day(20);
        s.draft.end = day(1);
        s.apply_draft();
        assert_eq!(s.criteria, before);
        assert!(s.status_message.is_some());
        assert_eq!(s.visible_indices.len(), 2);
    }

    #[test]
    fn duration_draft_narrows_the_views() {
        let mut s = state();
        s.draft.min_secs = 0.0;
        s.draft.max_secs = 200.0;
        s.apply_draft();
        assert_eq!(s.visible_indices, vec![0]);
        assert!(s.views.churn_indicator.counts.is_empty());
    }

    #[test]
    fn toggling_a_sentiment_twice_restores_match_all() {
        let mut s = state();
        s.toggle_sentiment(Sentiment::Negative);
        assert_eq!(s.visible_indices, vec![1]);
        s.toggle_sentiment(Sentiment::Negative);
        assert_eq!(s.visible_indices, vec![0, 1]);
    }

    #[test]
    fn save_clear_and_restore_round_trip() {
        let mut s = state();
        s.draft.resolved = Some(Resolved::No);
        s.apply_draft();
        s.save_current();
        assert_eq!(s.saved.len(), 1);
        let id = s.saved[0].id;

        s.reset_filters();
        assert_eq!(s.visible_indices.len(), 2);

        s.restore(id);
        assert_eq!(s.criteria.resolved(), Some(Resolved::No));
        assert_eq!(s.visible_indices, vec![1]);

        s.clear_history();
        assert!(s.saved.is_empty());
    }
}
