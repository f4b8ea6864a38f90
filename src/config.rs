//! Command-line and environment configuration.
//!
//! Every flag has an environment fallback; a `.env` file in the working
//! directory is read before parsing.

use std::path::PathBuf;

use clap::Parser;

/// Call-center sentiment dashboard
#[derive(Parser, Debug, Clone)]
#[command(name = "callsense")]
#[command(about = "Sentiment, resolution and talk-time breakdowns of call-center records")]
pub struct Args {
    /// Dataset to analyse (.csv, .json, .parquet or an Excel workbook). A file dialog opens when omitted.
    #[arg(env = "CALLSENSE_DATA")]
    pub data: Option<PathBuf>,

    /// SQLite file holding saved filters
    #[arg(long, env = "CALLSENSE_HISTORY_DB", default_value = "call_center_data.db")]
    pub history_db: PathBuf,

    /// Default log filter when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, env = "CALLSENSE_LOG", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn validate(&self) -> Result<(), String> {
        if self.history_db.as_os_str().is_empty() {
            return Err("history database path must not be empty".into());
        }
        if let Some(data) = &self.data {
            if data.as_os_str().is_empty() {
                return Err("dataset path must not be empty".into());
            }
        }
        Ok(())
    }
}
