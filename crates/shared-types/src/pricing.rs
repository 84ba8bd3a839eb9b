//! Pricing value types. Arithmetic lives in the builder's calculator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingLineItem {
    pub id: String,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LineItemError {
    #[error("line item '{0}' needs a description")]
    MissingDescription(String),

    #[error("line item '{id}' has quantity {quantity}; quantity must be greater than zero")]
    NonPositiveQuantity { id: String, quantity: f64 },

    #[error("line item '{id}' has unit price {unit_price}; price cannot be negative")]
    NegativeUnitPrice { id: String, unit_price: f64 },
}

impl PricingLineItem {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        quantity: f64,
        unit_price: f64,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> f64 {
        self.quantity * self.unit_price
    }

    pub fn validate(&self) -> Result<(), LineItemError> {
        if self.description.trim().is_empty() {
            return Err(LineItemError::MissingDescription(self.id.clone()));
        }
        // NaN fails both comparisons, so test the positive form
        if !(self.quantity > 0.0) || !self.quantity.is_finite() {
            return Err(LineItemError::NonPositiveQuantity {
                id: self.id.clone(),
                quantity: self.quantity,
            });
        }
        if !(self.unit_price >= 0.0) || !self.unit_price.is_finite() {
            return Err(LineItemError::NegativeUnitPrice {
                id: self.id.clone(),
                unit_price: self.unit_price,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percentage,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscountSpec {
    pub kind: DiscountKind,
    pub value: f64,
}

impl DiscountSpec {
    pub fn percentage(value: f64) -> Self {
        Self {
            kind: DiscountKind::Percentage,
            value,
        }
    }

    pub fn fixed(value: f64) -> Self {
        Self {
            kind: DiscountKind::Fixed,
            value,
        }
    }

    /// Human label, e.g. "Discount (10%)".
    pub fn label(&self) -> String {
        match self.kind {
            DiscountKind::Percentage => format!("Discount ({}%)", trim_number(self.value)),
            DiscountKind::Fixed => "Discount".to_string(),
        }
    }
}

/// Display-only tax line; not folded into `PricingSummary::total`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxLine {
    pub label: String,
    pub rate: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingSummary {
    pub subtotal: f64,
    pub discount_amount: f64,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<TaxLine>,
}

impl PricingSummary {
    /// Total including the display tax line, if any.
    pub fn grand_total(&self) -> f64 {
        round_cents(self.total + self.tax.as_ref().map_or(0.0, |t| t.amount))
    }
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// `1234.5` -> `$1,234.50`, `-30` -> `-$30.00`.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
