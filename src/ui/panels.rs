use eframe::egui::{self, Color32, DragValue, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use callsense::{Resolved, Sentiment};

use crate::color::sentiment_color;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let mut changed = false;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Sentiment (none checked = all) ----
            ui.strong("Sentiment");
            for sentiment in Sentiment::ALL {
                let mut checked = state.draft.sentiments.contains(&sentiment);
                let text = RichText::new(sentiment.as_str()).color(sentiment_color(sentiment));
                if ui.checkbox(&mut checked, text).changed() {
                    state.toggle_sentiment(sentiment);
                }
            }
            if state.draft.sentiments.is_empty() {
                ui.weak("No selection: all sentiments");
            }
            ui.separator();

            // ---- Date range ----
            ui.strong("Date range");
            egui::Grid::new("date_range").num_columns(2).show(ui, |ui: &mut Ui| {
                ui.label("From");
                changed |= ui
                    .add(DatePickerButton::new(&mut state.draft.start).id_salt("start_date"))
                    .changed();
                ui.end_row();
                ui.label("To");
                changed |= ui
                    .add(DatePickerButton::new(&mut state.draft.end).id_salt("end_date"))
                    .changed();
                ui.end_row();
            });
            ui.separator();

            // ---- Resolution ----
            ui.strong("Resolved calls");
            let selected = match state.draft.resolved {
                None => "Any",
                Some(Resolved::Yes) => "Yes",
                Some(Resolved::No) => "No",
            };
            egui::ComboBox::from_id_salt("resolved_filter")
                .selected_text(selected)
                .show_ui(ui, |ui: &mut Ui| {
                    changed |= ui
                        .selectable_value(&mut state.draft.resolved, None, "Any")
                        .changed();
                    changed |= ui
                        .selectable_value(&mut state.draft.resolved, Some(Resolved::Yes), "Yes")
                        .changed();
                    changed |= ui
                        .selectable_value(&mut state.draft.resolved, Some(Resolved::No), "No")
                        .changed();
                });
            ui.separator();

            // ---- Duration (clamped to the dataset span) ----
            ui.strong("Call duration (seconds)");
            let bounds = state.dataset.duration_bounds().unwrap_or_default();
            let (lo, hi) = (bounds.min(), bounds.max());
            egui::Grid::new("duration_range").num_columns(2).show(ui, |ui: &mut Ui| {
                ui.label("Min");
                changed |= ui
                    .add(DragValue::new(&mut state.draft.min_secs).range(lo..=hi).speed(10.0))
                    .changed();
                ui.end_row();
                ui.label("Max");
                changed |= ui
                    .add(DragValue::new(&mut state.draft.max_secs).range(lo..=hi).speed(10.0))
                    .changed();
                ui.end_row();
            });
            ui.separator();

            if ui.button("Reset filters").clicked() {
                state.reset_filters();
            }
        });

    if changed {
        state.apply_draft();
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("History", |ui: &mut Ui| {
            let available = state.history.is_some();
            if ui.add_enabled(available, egui::Button::new("Save View")).clicked() {
                state.save_current();
                ui.close_menu();
            }
            if ui.add_enabled(available, egui::Button::new("View Past Data")).clicked() {
                state.view_history();
                ui.close_menu();
            }
            if ui.add_enabled(available, egui::Button::new("Delete All")).clicked() {
                state.clear_history();
                ui.close_menu();
            }
        });

        ui.separator();

        let report = state.dataset.report();
        ui.label(format!(
            "{} calls loaded ({} rows dropped), {} visible",
            state.dataset.len(),
            report.rows_dropped(),
            state.visible_indices.len()
        ));

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Bottom panel – saved filters
// ---------------------------------------------------------------------------

/// Render the saved-filter table. Clicking a row restores it.
pub fn history_panel(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.heading("Past filters");
        if ui.small_button("Refresh").clicked() {
            state.refresh_history();
        }
        if ui.small_button("Close").clicked() {
            state.show_history = false;
        }
    });

    if state.saved.is_empty() {
        ui.label("No saved views.");
        return;
    }

    let mut restore = None;
    ScrollArea::vertical().max_height(180.0).show(ui, |ui: &mut Ui| {
        egui::Grid::new("past_filters")
            .striped(true)
            .num_columns(8)
            .show(ui, |ui: &mut Ui| {
                for header in [
                    "id", "sentiment", "start_date", "end_date", "resolved", "duration_range",
                    "saved_at", "",
                ] {
                    ui.strong(header);
                }
                ui.end_row();

                for saved in &state.saved {
                    ui.label(saved.id.to_string());
                    ui.label(&saved.sentiment);
                    ui.label(&saved.start_date);
                    ui.label(&saved.end_date);
                    ui.label(&saved.resolved);
                    ui.label(&saved.duration_range);
                    ui.label(
                        saved
                            .saved_at
                            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_default(),
                    );
                    if ui.small_button("Apply").clicked() {
                        restore = Some(saved.id);
                    }
                    ui.end_row();
                }
            });
    });

    if let Some(id) = restore {
        state.restore(id);
    }
}
