//! Call-center sentiment analysis: load call records, filter them, and derive
//! the dashboard views; keep a log of saved filters.

pub mod config;
pub mod data;
pub mod error;
pub mod history;

pub use data::aggregate::DashboardViews;
pub use data::filter::FilterCriteria;
pub use data::model::{CallDataset, CallRecord, Resolved, Sentiment};
pub use history::{FilterHistoryStore, SavedFilter};
