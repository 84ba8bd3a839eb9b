//! TOML configuration.
//!
//! Every field has a default, so an empty file (or none at all) is valid:
//!
//! ```toml
//! [pricing]
//! tax_label = "HST (13%)"
//! tax_rate = 0.13
//! show_tax = true
//! discount_policy = "clamp"
//!
//! [signing]
//! undo_capacity = 10
//! stroke_width = 2.5
//! stroke_color = "#1e293b"
//! pad_width = 600
//! pad_height = 200
//! lookup_timeout_ms = 3000
//!
//! [pdf]
//! page_size = "a4"
//! margin_mm = 20.0
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context};
use docsign_core::{PadStyle, DEFAULT_UNDO_CAPACITY};
use serde::{Deserialize, Serialize};
use shared_pdf::{parse_hex_color, ExportOptions, PageSize, Rgb};

use crate::pricing::{DiscountPolicy, PricingCalculator};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pricing: PricingConfig,
    pub signing: SigningConfig,
    pub pdf: PdfConfig,
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            (0.0..1.0).contains(&self.pricing.tax_rate),
            "pricing.tax_rate must be a fraction in [0, 1), got {}",
            self.pricing.tax_rate
        );
        ensure!(self.signing.undo_capacity > 0, "signing.undo_capacity must be positive");
        ensure!(
            self.signing.pad_width > 0 && self.signing.pad_height > 0,
            "signing pad dimensions must be positive"
        );
        ensure!(
            self.pdf.margin_mm >= 0.0 && self.pdf.margin_mm < 80.0,
            "pdf.margin_mm must be between 0 and 80, got {}",
            self.pdf.margin_mm
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub tax_label: String,
    /// Fraction, e.g. 0.13
    pub tax_rate: f64,
    pub show_tax: bool,
    pub discount_policy: DiscountPolicy,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_label: "HST (13%)".to_string(),
            tax_rate: 0.13,
            show_tax: true,
            discount_policy: DiscountPolicy::Clamp,
        }
    }
}

impl PricingConfig {
    pub fn calculator(&self) -> PricingCalculator {
        PricingCalculator {
            policy: self.discount_policy,
            tax: self
                .show_tax
                .then(|| (self.tax_label.clone(), self.tax_rate)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    pub undo_capacity: usize,
    pub stroke_width: f32,
    /// Hex colour
    pub stroke_color: String,
    pub pad_width: u32,
    pub pad_height: u32,
    pub lookup_timeout_ms: u64,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            undo_capacity: DEFAULT_UNDO_CAPACITY,
            stroke_width: 2.5,
            stroke_color: "#1e293b".to_string(),
            pad_width: 600,
            pad_height: 200,
            lookup_timeout_ms: 3000,
        }
    }
}

impl SigningConfig {
    pub fn pad_style(&self) -> PadStyle {
        let defaults = PadStyle::default();
        let fallback = Rgb(
            defaults.stroke_color[0] as f32 / 255.0,
            defaults.stroke_color[1] as f32 / 255.0,
            defaults.stroke_color[2] as f32 / 255.0,
        );
        let Rgb(r, g, b) = parse_hex_color(&self.stroke_color, fallback);
        PadStyle {
            width: self.pad_width,
            height: self.pad_height,
            stroke_color: [to_byte(r), to_byte(g), to_byte(b), 255],
            stroke_width: self.stroke_width,
            ..defaults
        }
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

fn to_byte(channel: f32) -> u8 {
    (channel * 255.0).round().clamp(0.0, 255.0) as u8
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    pub page_size: PageSize,
    pub margin_mm: f32,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            margin_mm: 20.0,
        }
    }
}

impl PdfConfig {
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            page_size: self.page_size,
            margin_mm: self.margin_mm,
        }
    }
}
