//! Pricing calculator.
//!
//! `total = subtotal - discount` always holds. A discount larger than the
//! subtotal is clamped or rejected depending on [`DiscountPolicy`].

use serde::{Deserialize, Serialize};
use shared_types::{
    round_cents, DiscountKind, DiscountSpec, PricingLineItem, PricingSummary, TaxLine,
};
use tracing::warn;

use crate::error::PricingError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountPolicy {
    /// Cap the discount at the subtotal
    #[default]
    Clamp,
    Reject,
}

pub fn compute(
    items: &[PricingLineItem],
    discount: Option<&DiscountSpec>,
    policy: DiscountPolicy,
) -> Result<PricingSummary, PricingError> {
    for item in items {
        item.validate()?;
    }
    let subtotal = round_cents(items.iter().map(PricingLineItem::line_total).sum());

    let mut discount_amount = match discount {
        None => 0.0,
        Some(d) => {
            if !(d.value >= 0.0) || !d.value.is_finite() {
                return Err(PricingError::NegativeDiscount(d.value));
            }
            match d.kind {
                DiscountKind::Percentage => subtotal * d.value / 100.0,
                DiscountKind::Fixed => d.value,
            }
        }
    };
    discount_amount = round_cents(discount_amount);

    if discount_amount > subtotal {
        match policy {
            DiscountPolicy::Clamp => {
                warn!(
                    discount = discount_amount,
                    subtotal, "Discount exceeds subtotal, clamping"
                );
                discount_amount = subtotal;
            }
            DiscountPolicy::Reject => {
                return Err(PricingError::DiscountExceedsSubtotal {
                    discount: discount_amount,
                    subtotal,
                });
            }
        }
    }

    Ok(PricingSummary {
        subtotal,
        discount_amount,
        total: round_cents(subtotal - discount_amount),
        tax: None,
    })
}

/// Attach a display-only tax line computed on the discounted total.
pub fn with_tax(mut summary: PricingSummary, rate: f64, label: &str) -> PricingSummary {
    summary.tax = Some(TaxLine {
        label: label.to_string(),
        rate,
        amount: round_cents(summary.total * rate),
    });
    summary
}

/// Calculator configured once per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingCalculator {
    pub policy: DiscountPolicy,
    /// (label, rate) of the display tax line
    pub tax: Option<(String, f64)>,
}

impl Default for PricingCalculator {
    fn default() -> Self {
        Self {
            policy: DiscountPolicy::Clamp,
            tax: Some(("HST (13%)".to_string(), 0.13)),
        }
    }
}

impl PricingCalculator {
    pub fn summarize(
        &self,
        items: &[PricingLineItem],
        discount: Option<&DiscountSpec>,
    ) -> Result<PricingSummary, PricingError> {
        let summary = compute(items, discount, self.policy)?;
        Ok(match &self.tax {
            Some((label, rate)) if !items.is_empty() => with_tax(summary, *rate, label),
            _ => summary,
        })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn line_items() -> impl Strategy<Value = Vec<PricingLineItem>> {
        prop::collection::vec((1u32..20, 0u32..500_000), 0..12).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (qty, cents))| {
                    PricingLineItem::new(
                        format!("item_{}", i),
                        "Work",
                        qty as f64,
                        cents as f64 / 100.0,
                    )
                })
                .collect()
        })
    }

    fn discount() -> impl Strategy<Value = Option<DiscountSpec>> {
        prop_oneof![
            Just(None),
            (0u32..=100).prop_map(|p| Some(DiscountSpec::percentage(p as f64))),
            (0u32..10_000_000).prop_map(|c| Some(DiscountSpec::fixed(c as f64 / 100.0))),
        ]
    }

    proptest! {
        /// Property: total equals subtotal minus discount and never goes negative under Clamp
        #[test]
        fn total_is_subtotal_minus_discount(items in line_items(), d in discount()) {
            let s = compute(&items, d.as_ref(), DiscountPolicy::Clamp).unwrap();
            prop_assert!((s.total - (s.subtotal - s.discount_amount)).abs() < 0.005);
            prop_assert!(s.discount_amount >= 0.0);
            prop_assert!(s.discount_amount <= s.subtotal);
            prop_assert!(s.total >= 0.0);
        }

        /// Property: Reject only fails when the discount is larger than the subtotal
        #[test]
        fn reject_agrees_with_clamp(items in line_items(), d in discount()) {
            let clamped = compute(&items, d.as_ref(), DiscountPolicy::Clamp).unwrap();
            match compute(&items, d.as_ref(), DiscountPolicy::Reject) {
                Ok(s) => prop_assert_eq!(s, clamped),
                Err(PricingError::DiscountExceedsSubtotal { subtotal, .. }) => {
                    prop_assert_eq!(subtotal, clamped.subtotal);
                    prop_assert_eq!(clamped.total, 0.0);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }
}
