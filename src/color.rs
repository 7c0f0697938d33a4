use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::aggregate::ThresholdLabel;

/// Bars and points above the threshold.
pub const ABOVE_COLOR: Color32 = Color32::from_rgb(0xe0, 0x5a, 0x47);
/// Bars and points at or below the threshold.
pub const BELOW_COLOR: Color32 = Color32::from_rgb(0x3f, 0x8e, 0xc4);

pub fn threshold_color(label: ThresholdLabel) -> Color32 {
    match label {
        ThresholdLabel::Above => ABOVE_COLOR,
        ThresholdLabel::Below => BELOW_COLOR,
    }
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.65, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: category key → Color32
// ---------------------------------------------------------------------------

/// Maps category keys (cities) to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Colours are assigned in the order the keys are given.
    pub fn new(keys: &[String]) -> Self {
        let mapping = keys
            .iter()
            .cloned()
            .zip(generate_palette(keys.len()))
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a key.
    pub fn color_for(&self, key: &str) -> Color32 {
        self.mapping.get(key).copied().unwrap_or(self.default_color)
    }
}
