//! Documents, sections and the document lifecycle

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::content::{DocumentContent, PricingData};

/// Key prefix for sections the author added by hand.
pub const CUSTOM_SECTION_PREFIX: &str = "custom_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Proposal,
    Contract,
    Sla,
}

impl DocumentType {
    pub const ALL: [DocumentType; 3] = [Self::Proposal, Self::Contract, Self::Sla];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposal => "proposal",
            Self::Contract => "contract",
            Self::Sla => "sla",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Proposal => "Proposal",
            Self::Contract => "Contract",
            Self::Sla => "Service Level Agreement",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    WebsitePwaBuild,
    WebsiteOnly,
    PwaOnly,
    Cybersecurity,
    GraphicDesign,
}

impl ServiceType {
    pub const ALL: [ServiceType; 5] = [
        Self::WebsitePwaBuild,
        Self::WebsiteOnly,
        Self::PwaOnly,
        Self::Cybersecurity,
        Self::GraphicDesign,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WebsitePwaBuild => "website_pwa_build",
            Self::WebsiteOnly => "website_only",
            Self::PwaOnly => "pwa_only",
            Self::Cybersecurity => "cybersecurity",
            Self::GraphicDesign => "graphic_design",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::WebsitePwaBuild => "Website + PWA Build",
            Self::WebsiteOnly => "Website Only",
            Self::PwaOnly => "PWA Only",
            Self::Cybersecurity => "Cybersecurity",
            Self::GraphicDesign => "Graphic Design",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a document.
///
/// ```text
/// Draft -> Sent -> Signed
///   |        |
///   +--------+--> Cancelled
///            +--> Expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Sent,
    Signed,
    Expired,
    Cancelled,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Signed => "signed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Sent => "Awaiting Signatures",
            Self::Signed => "Signed",
            Self::Expired => "Expired",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Content and pricing may only change while a document is a draft.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, next),
            (Draft, Sent) | (Sent, Signed) | (Draft, Cancelled) | (Sent, Cancelled) | (Sent, Expired)
        )
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DocumentError {
    #[error("document is {0} and can no longer be edited")]
    NotEditable(DocumentStatus),

    #[error("cannot move document from {from} to {to}")]
    InvalidTransition {
        from: DocumentStatus,
        to: DocumentStatus,
    },
}

/// One titled block of rich text inside a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub key: String,
    pub title: String,
    /// HTML-ish rich text; may contain `{{TOKEN}}` placeholders
    pub content: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub locked: bool,
    pub sort_order: u32,
}

impl Section {
    pub fn new(key: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            content: content.into(),
            required: false,
            locked: false,
            sort_order: 0,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.key.starts_with(CUSTOM_SECTION_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub document_type: DocumentType,
    pub service_type: ServiceType,
    pub status: DocumentStatus,
    pub version: u32,
    pub content: DocumentContent,
    pub pricing: PricingData,
    pub compliance_confirmed: bool,
    pub client_id: Uuid,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl Document {
    /// A fresh draft at version 1.
    pub fn new_draft(
        title: impl Into<String>,
        document_type: DocumentType,
        service_type: ServiceType,
        client_id: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            document_type,
            service_type,
            status: DocumentStatus::Draft,
            version: 1,
            content: DocumentContent::default(),
            pricing: PricingData::default(),
            compliance_confirmed: false,
            client_id,
            expires_at: None,
            created_at: now,
            updated_at: now,
            sent_at: None,
        }
    }

    pub fn ensure_editable(&self) -> Result<(), DocumentError> {
        if self.status.is_editable() {
            Ok(())
        } else {
            Err(DocumentError::NotEditable(self.status))
        }
    }

    /// Move to `next`, stamping `sent_at` on dispatch.
    pub fn transition(
        &mut self,
        next: DocumentStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DocumentError> {
        if !self.status.can_transition_to(next) {
            return Err(DocumentError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        if next == DocumentStatus::Sent {
            self.sent_at = Some(now);
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn sections(&self) -> &[Section] {
        &self.content.sections
    }
}
