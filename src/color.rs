use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use callsense::{Resolved, Sentiment};

// ---------------------------------------------------------------------------
// Category colours
// ---------------------------------------------------------------------------

/// Convert an HSL triple to an egui colour.
fn hsl(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

/// Green / orange / red, the same hue for a sentiment in every chart.
pub fn sentiment_color(sentiment: Sentiment) -> Color32 {
    match sentiment {
        Sentiment::Positive => hsl(120.0, 0.55, 0.42),
        Sentiment::Neutral => hsl(33.0, 0.95, 0.52),
        Sentiment::Negative => hsl(0.0, 0.72, 0.50),
    }
}

pub fn resolved_color(resolved: Resolved) -> Color32 {
    match resolved {
        Resolved::Yes => hsl(120.0, 0.45, 0.38),
        Resolved::No => hsl(0.0, 0.60, 0.45),
    }
}

/// Lighter variant for box-plot fills.
pub fn sentiment_fill(sentiment: Sentiment) -> Color32 {
    sentiment_color(sentiment).gamma_multiply(0.35)
}
