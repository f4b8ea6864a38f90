use std::ops::RangeInclusive;

use eframe::egui::{self, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Line, Plot, PlotPoints, PlotUi,
};

use callsense::data::aggregate::{
    ChurnIndicator, DurationBySentiment, ResolutionImpact, SentimentDistribution, SentimentTrend,
};
use callsense::{Resolved, Sentiment};

use crate::color::{resolved_color, sentiment_color, sentiment_fill};
use crate::state::AppState;

const CHART_HEIGHT: f32 = 260.0;

// ---------------------------------------------------------------------------
// Dashboard (central panel)
// ---------------------------------------------------------------------------

/// Render the five charts in the central panel.
pub fn dashboard(ui: &mut Ui, state: &AppState) {
    if state.visible_indices.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No calls match the current filters");
        });
        return;
    }

    let views = &state.views;
    egui::ScrollArea::vertical().show(ui, |ui: &mut Ui| {
        ui.columns(2, |cols| {
            chart_frame(&mut cols[0], "Sentiment Distribution", |ui| {
                distribution_chart(ui, &views.sentiment_distribution)
            });
            chart_frame(&mut cols[1], "Sentiment Trends Over Time", |ui| {
                trend_chart(ui, &views.sentiment_trend)
            });
        });
        ui.columns(2, |cols| {
            chart_frame(&mut cols[0], "Impact of Resolution on Sentiment", |ui| {
                resolution_chart(ui, &views.resolution_impact)
            });
            chart_frame(&mut cols[1], "Call Duration vs. Sentiment", |ui| {
                duration_chart(ui, &views.duration_by_sentiment)
            });
        });
        chart_frame(ui, "Churn Indicator: Resolution vs. Negative Sentiment", |ui| {
            churn_chart(ui, &views.churn_indicator)
        });
    });
}

fn chart_frame(ui: &mut Ui, title: &str, body: impl FnOnce(&mut Ui)) {
    ui.group(|ui: &mut Ui| {
        ui.strong(title);
        body(ui);
    });
}

/// Show a non-interactive plot with category labels on the x axis.
fn category_plot(
    ui: &mut Ui,
    id: &str,
    labels: Vec<String>,
    y_label: &str,
    body: impl FnOnce(&mut PlotUi),
) {
    Plot::new(id.to_string())
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .y_axis_label(y_label.to_string())
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .x_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
            category_label(&labels, mark.value)
        })
        .show(ui, body);
}

fn category_label(labels: &[String], x: f64) -> String {
    if x.fract().abs() > f64::EPSILON || x < 0.0 {
        return String::new();
    }
    labels.get(x as usize).cloned().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Individual charts
// ---------------------------------------------------------------------------

fn distribution_chart(ui: &mut Ui, dist: &SentimentDistribution) {
    let present: Vec<(Sentiment, usize)> = dist.counts.iter().map(|(s, c)| (*s, *c)).collect();
    let labels = present.iter().map(|(s, _)| s.to_string()).collect();

    category_plot(ui, "sentiment_distribution", labels, "Calls", |plot_ui| {
        for (x, (sentiment, count)) in present.iter().enumerate() {
            let bar = Bar::new(x as f64, *count as f64)
                .name(sentiment.as_str())
                .width(0.6);
            plot_ui.bar_chart(
                BarChart::new(vec![bar])
                    .name(sentiment.as_str())
                    .color(sentiment_color(*sentiment)),
            );
        }
    });
}

fn trend_chart(ui: &mut Ui, trend: &SentimentTrend) {
    let labels = trend.months.iter().map(|m| m.month.to_string()).collect();

    category_plot(ui, "sentiment_trend", labels, "Calls", |plot_ui| {
        for sentiment in &trend.series {
            let points: PlotPoints = trend
                .months
                .iter()
                .enumerate()
                .map(|(x, m)| [x as f64, m.counts.get(sentiment).copied().unwrap_or(0) as f64])
                .collect();
            plot_ui.line(
                Line::new(points)
                    .name(sentiment.as_str())
                    .color(sentiment_color(*sentiment))
                    .width(2.0),
            );
        }
    });
}

fn resolution_chart(ui: &mut Ui, impact: &ResolutionImpact) {
    let labels = Resolved::ALL.iter().map(|r| r.to_string()).collect();
    let offset = |s: Sentiment| match s {
        Sentiment::Positive => -0.25,
        Sentiment::Neutral => 0.0,
        Sentiment::Negative => 0.25,
    };

    category_plot(ui, "resolution_impact", labels, "Count", |plot_ui| {
        for sentiment in Sentiment::ALL {
            let bars: Vec<Bar> = impact
                .rows
                .iter()
                .filter(|row| row.sentiment == sentiment)
                .map(|row| {
                    let x = Resolved::ALL
                        .iter()
                        .position(|r| *r == row.resolved)
                        .unwrap_or_default() as f64;
                    Bar::new(x + offset(sentiment), row.count as f64)
                        .name(format!("{} / {}", row.resolved, sentiment))
                        .width(0.25)
                })
                .collect();
            if bars.is_empty() {
                continue;
            }
            plot_ui.bar_chart(
                BarChart::new(bars)
                    .name(sentiment.as_str())
                    .color(sentiment_color(sentiment)),
            );
        }
    });
}

fn duration_chart(ui: &mut Ui, durations: &DurationBySentiment) {
    let present: Vec<Sentiment> = durations.summaries.keys().copied().collect();
    let labels = present.iter().map(|s| s.to_string()).collect();

    category_plot(ui, "duration_by_sentiment", labels, "AvgTalkDuration (s)", |plot_ui| {
        for (x, sentiment) in present.iter().enumerate() {
            let Some(s) = durations.summaries.get(sentiment) else {
                continue;
            };
            let elem = BoxElem::new(x as f64, BoxSpread::new(s.min, s.q1, s.median, s.q3, s.max))
                .name(sentiment.as_str())
                .box_width(0.5)
                .fill(sentiment_fill(*sentiment))
                .stroke(egui::Stroke::new(1.5, sentiment_color(*sentiment)));
            plot_ui.box_plot(
                BoxPlot::new(vec![elem])
                    .name(sentiment.as_str())
                    .color(sentiment_color(*sentiment)),
            );
        }
    });
}

fn churn_chart(ui: &mut Ui, churn: &ChurnIndicator) {
    let present: Vec<(Resolved, usize)> = churn.counts.iter().map(|(r, c)| (*r, *c)).collect();
    let labels = present.iter().map(|(r, _)| r.to_string()).collect();

    category_plot(ui, "churn_indicator", labels, "Count", |plot_ui| {
        for (x, (resolved, count)) in present.iter().enumerate() {
            plot_ui.bar_chart(
                BarChart::new(vec![Bar::new(x as f64, *count as f64)
                    .name(resolved.as_str())
                    .width(0.5)])
                .name(resolved.as_str())
                .color(resolved_color(*resolved)),
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_only_on_whole_ticks() {
        let labels = vec!["2024-01".to_string(), "2024-02".to_string()];
        assert_eq!(category_label(&labels, 0.0), "2024-01");
        assert_eq!(category_label(&labels, 1.0), "2024-02");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, 2.0), "");
        assert_eq!(category_label(&labels, -1.0), "");
    }
}
