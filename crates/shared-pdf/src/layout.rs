//! Page geometry and brand colours

use serde::{Deserialize, Serialize};
use shared_types::CompanySettings;

/// Points per millimetre
pub const PT_PER_MM: f32 = 72.0 / 25.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    /// (width, height) in points
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
        }
    }
}

/// Fixed page box with a uniform margin.
///
/// Layout works top-down: `y` grows from the top edge of the page, and is
/// flipped into PDF space only when drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    /// Band reserved at the bottom for the running footer
    pub footer_height: f32,
}

impl PageGeometry {
    pub fn new(size: PageSize, margin_mm: f32) -> Self {
        let (width, height) = size.dimensions();
        Self {
            width,
            height,
            margin: margin_mm * PT_PER_MM,
            footer_height: 24.0,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn left(&self) -> f32 {
        self.margin
    }

    pub fn right(&self) -> f32 {
        self.width - self.margin
    }

    pub fn content_top(&self) -> f32 {
        self.margin
    }

    /// Lowest top-down y a line may reach before a page break.
    pub fn content_bottom(&self) -> f32 {
        self.height - self.margin - self.footer_height
    }

    /// Convert a top-down y into PDF user space.
    pub fn flip(&self, y: f32) -> f32 {
        self.height - y
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::new(PageSize::A4, 20.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb(1.0, 1.0, 1.0);
}

/// Parse hex color string (e.g., "#FF0000" or "FF0000") to RGB floats (0-1 range).
/// Anything unparseable yields `fallback`.
pub fn parse_hex_color(color: &str, fallback: Rgb) -> Rgb {
    let hex = color.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return fallback;
    }
    let hex = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 => hex.to_string(),
        _ => return fallback,
    };
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0),
        _ => fallback,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub primary: Rgb,
    pub secondary: Rgb,
    pub text: Rgb,
    pub muted: Rgb,
    pub rule: Rgb,
    pub panel: Rgb,
    pub success: Rgb,
    pub warning: Rgb,
}

impl Theme {
    pub fn from_company(company: &CompanySettings) -> Self {
        let base = Self::default();
        Self {
            primary: parse_hex_color(&company.primary_color, base.primary),
            secondary: parse_hex_color(&company.secondary_color, base.secondary),
            ..base
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Rgb(0.118, 0.227, 0.373),
            secondary: Rgb(0.231, 0.510, 0.965),
            text: Rgb(0.12, 0.14, 0.17),
            muted: Rgb(0.42, 0.45, 0.50),
            rule: Rgb(0.82, 0.84, 0.86),
            panel: Rgb(0.95, 0.96, 0.97),
            success: Rgb(0.086, 0.639, 0.290),
            warning: Rgb(0.851, 0.467, 0.024),
        }
    }
}
