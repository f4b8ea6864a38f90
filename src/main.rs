mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eframe::egui;

use app::CallSenseApp;
use callsense::config::Args;
use callsense::data::loader::load_dataset;
use callsense::FilterHistoryStore;
use state::AppState;

fn main() -> eframe::Result {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    if let Err(e) = args.validate() {
        log::error!("Invalid configuration: {e}");
        std::process::exit(2);
    }

    let Some(path) = dataset_path(&args) else {
        log::info!("No dataset selected, exiting");
        return Ok(());
    };

    let dataset = match load_dataset(&path) {
        Ok(dataset) => Arc::new(dataset),
        Err(e) => {
            log::error!("{e:#}");
            std::process::exit(1);
        }
    };

    // The dashboard still works without the history log.
    let history = match FilterHistoryStore::open(&args.history_db) {
        Ok(store) => Some(store),
        Err(e) => {
            log::warn!(
                "Filter history disabled ({}): {e}",
                args.history_db.display()
            );
            None
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "CallSense – Call Center Sentiment",
        options,
        Box::new(move |_cc| Ok(Box::new(CallSenseApp::new(AppState::new(dataset, history))))),
    )
}

fn dataset_path(args: &Args) -> Option<PathBuf> {
    if let Some(path) = &args.data {
        return Some(path.clone());
    }
    rfd::FileDialog::new()
        .set_title("Open call-center dataset")
        .add_filter(
            "Call data",
            &["csv", "json", "parquet", "pq", "xlsx", "xlsm", "xlsb", "xls", "ods"],
        )
        .pick_file()
}
