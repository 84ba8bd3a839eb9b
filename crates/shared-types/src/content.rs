//! Versioned wire shapes for section content and pricing snapshots.
//!
//! Both are stored as JSON blobs on the document row. The current shape is
//! `{"schema_version": 1, ...}`; older rows hold a bare array (or, for pricing,
//! an unversioned `{items, discount}` object), which is upgraded on read.
//! Unknown versions are rejected rather than guessed at.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::Section;
use crate::pricing::{
    round_cents, DiscountKind, DiscountSpec, LineItemError, PricingLineItem, PricingSummary,
};

pub const CONTENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContentError {
    #[error("unsupported content schema version {0}")]
    UnsupportedVersion(u32),

    #[error("duplicate section key '{0}'")]
    DuplicateSectionKey(String),

    #[error("invalid pricing: {0}")]
    InvalidLineItem(#[from] LineItemError),

    #[error("malformed content JSON: {0}")]
    Malformed(String),
}

// ============================================================================
// Section content
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ContentWire")]
pub struct DocumentContent {
    pub schema_version: u32,
    pub sections: Vec<Section>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContentWire {
    Versioned {
        schema_version: u32,
        sections: Vec<Section>,
    },
    Legacy(Vec<Section>),
}

impl TryFrom<ContentWire> for DocumentContent {
    type Error = ContentError;

    fn try_from(wire: ContentWire) -> Result<Self, Self::Error> {
        match wire {
            ContentWire::Versioned {
                schema_version,
                sections,
            } => {
                if schema_version != CONTENT_SCHEMA_VERSION {
                    return Err(ContentError::UnsupportedVersion(schema_version));
                }
                DocumentContent::new(sections)
            }
            ContentWire::Legacy(sections) => DocumentContent::new(sections),
        }
    }
}

impl Default for DocumentContent {
    fn default() -> Self {
        Self {
            schema_version: CONTENT_SCHEMA_VERSION,
            sections: Vec::new(),
        }
    }
}

impl DocumentContent {
    /// Validate keys and renumber sort orders densely from zero.
    pub fn new(mut sections: Vec<Section>) -> Result<Self, ContentError> {
        let mut seen = HashSet::new();
        for section in &sections {
            if !seen.insert(section.key.as_str()) {
                return Err(ContentError::DuplicateSectionKey(section.key.clone()));
            }
        }
        sections.sort_by_key(|s| s.sort_order);
        for (i, section) in sections.iter_mut().enumerate() {
            section.sort_order = i as u32;
        }
        Ok(Self {
            schema_version: CONTENT_SCHEMA_VERSION,
            sections,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        let wire: ContentWire =
            serde_json::from_str(json).map_err(|e| ContentError::Malformed(e.to_string()))?;
        Self::try_from(wire)
    }

    pub fn to_json(&self) -> Result<String, ContentError> {
        serde_json::to_string(self).map_err(|e| ContentError::Malformed(e.to_string()))
    }
}

// ============================================================================
// Pricing snapshot
// ============================================================================

/// Pricing as frozen on the document when it is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PricingWire")]
pub struct PricingData {
    pub schema_version: u32,
    pub items: Vec<PricingLineItem>,
    pub discount: Option<DiscountSpec>,
    pub summary: PricingSummary,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PricingWire {
    Versioned {
        schema_version: u32,
        items: Vec<PricingLineItem>,
        #[serde(default)]
        discount: Option<DiscountSpec>,
        #[serde(default)]
        summary: PricingSummary,
    },
    LegacyObject {
        items: Vec<PricingLineItem>,
        #[serde(default)]
        discount: Option<DiscountSpec>,
    },
    Legacy(Vec<PricingLineItem>),
}

impl TryFrom<PricingWire> for PricingData {
    type Error = ContentError;

    fn try_from(wire: PricingWire) -> Result<Self, Self::Error> {
        match wire {
            PricingWire::Versioned {
                schema_version,
                items,
                discount,
                summary,
            } => {
                if schema_version != CONTENT_SCHEMA_VERSION {
                    return Err(ContentError::UnsupportedVersion(schema_version));
                }
                PricingData::new(items, discount, summary)
            }
            PricingWire::LegacyObject { items, discount } => {
                let summary = legacy_summary(&items, discount.as_ref());
                PricingData::new(items, discount, summary)
            }
            PricingWire::Legacy(items) => {
                let summary = legacy_summary(&items, None);
                PricingData::new(items, None, summary)
            }
        }
    }
}

/// Summaries were not stored before versioning. The discount is clamped into
/// `[0, subtotal]`.
fn legacy_summary(items: &[PricingLineItem], discount: Option<&DiscountSpec>) -> PricingSummary {
    let subtotal = round_cents(items.iter().map(PricingLineItem::line_total).sum());
    let raw = match discount {
        None => 0.0,
        Some(d) => match d.kind {
            DiscountKind::Percentage => subtotal * d.value / 100.0,
            DiscountKind::Fixed => d.value,
        },
    };
    let discount_amount = round_cents(raw.max(0.0).min(subtotal.max(0.0)));
    PricingSummary {
        subtotal,
        discount_amount,
        total: round_cents(subtotal - discount_amount),
        tax: None,
    }
}

impl Default for PricingData {
    fn default() -> Self {
        Self {
            schema_version: CONTENT_SCHEMA_VERSION,
            items: Vec::new(),
            discount: None,
            summary: PricingSummary::default(),
        }
    }
}

impl PricingData {
    pub fn new(
        items: Vec<PricingLineItem>,
        discount: Option<DiscountSpec>,
        summary: PricingSummary,
    ) -> Result<Self, ContentError> {
        for item in &items {
            item.validate()?;
        }
        Ok(Self {
            schema_version: CONTENT_SCHEMA_VERSION,
            items,
            discount,
            summary,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        let wire: PricingWire =
            serde_json::from_str(json).map_err(|e| ContentError::Malformed(e.to_string()))?;
        Self::try_from(wire)
    }

    pub fn to_json(&self) -> Result<String, ContentError> {
        serde_json::to_string(self).map_err(|e| ContentError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn legacy_section_array_is_upgraded() {
        let json = r#"[
            {"key": "terms", "title": "Terms", "content": "<p>t</p>", "sort_order": 7},
            {"key": "intro", "title": "Intro", "content": "<p>i</p>", "sort_order": 2}
        ]"#;
        let content = DocumentContent::from_json(json).unwrap();
        assert_eq!(content.schema_version, CONTENT_SCHEMA_VERSION);
        let keys: Vec<_> = content.sections.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["intro", "terms"]);
        let orders: Vec<_> = content.sections.iter().map(|s| s.sort_order).collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[test]
    fn unknown_version_rejected() {
        let json = r#"{"schema_version": 9, "sections": []}"#;
        assert_eq!(
            DocumentContent::from_json(json),
            Err(ContentError::UnsupportedVersion(9))
        );
    }

    #[test]
    fn duplicate_keys_rejected() {
        let json = r#"[
            {"key": "a", "title": "A", "content": "", "sort_order": 0},
            {"key": "a", "title": "B", "content": "", "sort_order": 1}
        ]"#;
        assert_eq!(
            DocumentContent::from_json(json),
            Err(ContentError::DuplicateSectionKey("a".to_string()))
        );
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            DocumentContent::from_json("{\"nope\": true}"),
            Err(ContentError::Malformed(_))
        ));
    }

    #[test]
    fn versioned_content_roundtrips_through_serde() {
        let content = DocumentContent::new(vec![Section::new("intro", "Intro", "<p>Hi</p>")])
            .unwrap();
        let json = content.to_json().unwrap();
        assert!(json.contains("\"schema_version\":1"));
        let back: DocumentContent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn legacy_pricing_array_gets_summary() {
        let json = r#"[
            {"id": "1", "description": "Design", "quantity": 2, "unit_price": 50},
            {"id": "2", "description": "Hosting", "quantity": 1, "unit_price": 20}
        ]"#;
        let pricing = PricingData::from_json(json).unwrap();
        assert_eq!(pricing.summary.subtotal, 120.0);
        assert_eq!(pricing.summary.total, 120.0);
        assert!(pricing.discount.is_none());
    }

    #[test]
    fn legacy_pricing_object_is_upgraded() {
        let json = r#"{
            "items": [
                {"id": "1", "description": "Design", "quantity": 1, "unit_price": 100},
                {"id": "2", "description": "Build", "quantity": 2, "unit_price": 50},
                {"id": "3", "description": "Hosting", "quantity": 4, "unit_price": 25}
            ],
            "discount": {"kind": "percentage", "value": 10}
        }"#;
        let pricing = PricingData::from_json(json).unwrap();
        assert_eq!(pricing.schema_version, CONTENT_SCHEMA_VERSION);
        assert_eq!(pricing.discount, Some(DiscountSpec::percentage(10.0)));
        assert_eq!(pricing.summary.subtotal, 300.0);
        assert_eq!(pricing.summary.discount_amount, 30.0);
        assert_eq!(pricing.summary.total, 270.0);
    }

    #[test]
    fn legacy_pricing_object_clamps_large_discount() {
        let json = r#"{
            "items": [{"id": "1", "description": "Audit", "quantity": 1, "unit_price": 40}],
            "discount": {"kind": "fixed", "value": 75}
        }"#;
        let pricing = PricingData::from_json(json).unwrap();
        assert_eq!(pricing.summary.discount_amount, 40.0);
        assert_eq!(pricing.summary.total, 0.0);
    }

    #[test]
    fn pricing_with_zero_quantity_rejected() {
        let json = r#"{"schema_version": 1, "items": [
            {"id": "1", "description": "Design", "quantity": 0, "unit_price": 50}
        ]}"#;
        assert!(matches!(
            PricingData::from_json(json),
            Err(ContentError::InvalidLineItem(LineItemError::NonPositiveQuantity { .. }))
        ));
    }
}
