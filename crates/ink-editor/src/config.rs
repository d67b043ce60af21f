//! Host configuration for a sketch canvas.

use crate::tools::{CanvasMode, DrawOptions};
use ink_core::model::Color;
use serde::Deserialize;

// ─── Canvas config ───────────────────────────────────────────────────────

/// Style and behavior settings supplied by the host.
///
/// Every field has a default, so hosts may pass partial JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SketchConfig {
    /// Stroke color for new shapes. Default: **black**.
    pub line_color: String,
    /// Stroke width for new shapes. Default: **10**.
    pub line_width: f64,
    /// Fill color for closed shapes. Default: **transparent**.
    pub fill_color: String,
    /// Canvas background color. Default: **transparent**.
    pub background_color: String,
    pub opacity: f64,
    /// Undo depth. Default: **25**.
    pub undo_steps: usize,
    /// Initial tool name. Unknown names fall back to the pencil.
    pub tool: String,
    pub width: f64,
    pub height: f64,
    /// Subtracted from the host width on resize. Default: **2**.
    pub width_correction: f64,
    pub height_correction: f64,
    /// Dump history stacks through `log::debug!` on every change.
    pub debug_history: bool,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            line_color: "black".to_string(),
            line_width: 10.0,
            fill_color: "transparent".to_string(),
            background_color: "transparent".to_string(),
            opacity: 1.0,
            undo_steps: 25,
            tool: "pencil".to_string(),
            width: 550.0,
            height: 400.0,
            width_correction: 2.0,
            height_correction: 0.0,
            debug_history: false,
        }
    }
}

impl SketchConfig {
    /// Parse a (possibly partial) JSON config.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Drawing defaults handed to tools on activation. Unparseable colors
    /// fall back to black stroke / no fill.
    pub fn draw_options(&self) -> DrawOptions {
        let stroke = Color::parse(&self.line_color).unwrap_or_else(|| {
            log::warn!("config: unknown line color `{}`", self.line_color);
            Color::BLACK
        });
        let fill = Color::parse(&self.fill_color).filter(|c| !c.is_transparent());
        DrawOptions {
            stroke,
            stroke_width: self.line_width,
            fill,
            opacity: self.opacity,
            mode: CanvasMode::default(),
        }
    }

    pub fn background(&self) -> Option<Color> {
        Color::parse(&self.background_color).filter(|c| !c.is_transparent())
    }
}
