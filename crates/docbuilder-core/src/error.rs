use docsign_core::SigningError;
use shared_pdf::PdfExportError;
use shared_types::{ContentError, DocumentStatus, LineItemError, StoreError};
use thiserror::Error;

use crate::wizard::WizardStep;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error(transparent)]
    InvalidLineItem(#[from] LineItemError),

    #[error("Discount cannot be negative (got {0})")]
    NegativeDiscount(f64),

    #[error("Discount of {discount:.2} exceeds the subtotal of {subtotal:.2}")]
    DiscountExceedsSubtotal { discount: f64, subtotal: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SectionError {
    #[error("Section '{0}' not found")]
    NotFound(String),

    #[error("Section '{0}' is locked and cannot be changed")]
    Locked(String),

    #[error("Section '{0}' is required and cannot be removed")]
    Required(String),

    #[error("Section title cannot be empty")]
    EmptyTitle,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignerError {
    #[error("Add at least one signer")]
    NoSigners,

    #[error("Mark at least one signer as required")]
    NoRequiredSigner,

    #[error("Signer {0} needs a name")]
    MissingName(usize),

    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),

    #[error("{0} is already a signer")]
    DuplicateEmail(String),

    #[error("No signer at position {0}")]
    OutOfRange(usize),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WizardError {
    #[error("{} is not complete: {reason}", step.label())]
    StepIncomplete { step: WizardStep, reason: String },

    #[error("Review is the last step")]
    NoNextStep,

    #[error("A {0} document can no longer be edited")]
    NotEditable(DocumentStatus),

    #[error("No template reload is waiting for confirmation")]
    NoPendingReload,

    #[error("Unknown compliance item '{0}'")]
    UnknownComplianceItem(String),

    #[error("Unknown line item '{0}'")]
    UnknownLineItem(String),

    #[error("{0} must be chosen before saving")]
    Missing(&'static str),

    #[error(transparent)]
    Section(#[from] SectionError),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Content(#[from] ContentError),
}

/// Errors surfaced by persisting and exporting actions.
#[derive(Error, Debug)]
pub enum BuilderError {
    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Export(#[from] PdfExportError),

    #[error("Not permitted: {0}")]
    Forbidden(&'static str),
}
