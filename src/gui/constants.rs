//! GUI-specific constants for layout, status colors and intervals

use eframe::egui;

/// Window dimensions
pub const WINDOW_WIDTH: f32 = 460.0;
pub const WINDOW_HEIGHT: f32 = 720.0;
pub const WINDOW_MIN_WIDTH: f32 = 400.0;
pub const WINDOW_MIN_HEIGHT: f32 = 520.0;

/// Layout spacing
pub const PADDING: f32 = 8.0;
pub const SECTION_SPACING: f32 = 12.0;
pub const ITEM_SPACING: f32 = 6.0;

/// Color preview swatch
pub const SWATCH_SIZE: [f32; 2] = [56.0, 24.0];
pub const SWATCH_ROUNDING: f32 = 4.0;

/// Status colors
pub const STATUS_OK: egui::Color32 = egui::Color32::from_rgb(0, 180, 0);
pub const STATUS_ERROR: egui::Color32 = egui::Color32::from_rgb(200, 0, 0);
pub const STATUS_PENDING: egui::Color32 = egui::Color32::from_rgb(200, 160, 0);

/// Upper bound between repaints, so background status changes show up
pub const REFRESH_INTERVAL_MS: u64 = 250;
