use std::time::Duration;

use shared_types::{DocumentStatus, StoreError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PadError {
    #[error("Failed to encode signature PNG: {0}")]
    Encode(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProvenanceError {
    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("Lookup failed: {0}")]
    Lookup(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SigningError {
    #[error("Please draw your signature before submitting")]
    EmptySignature,

    #[error("Invalid signature image: {0}")]
    InvalidImage(&'static str),

    #[error("You must agree to sign this document electronically")]
    AgreementRequired,

    #[error("This signature is assigned to a different signer")]
    SignerMismatch,

    #[error("Document is {actual}, expected {expected}")]
    InvalidStatus {
        expected: DocumentStatus,
        actual: DocumentStatus,
    },

    #[error("Add at least one signer before sending")]
    NoSigners,

    #[error("This signature has already been recorded")]
    AlreadySigned,

    #[error("Not permitted: {0}")]
    Forbidden(&'static str),

    #[error(transparent)]
    Pad(#[from] PadError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for SigningError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadySigned(_) => SigningError::AlreadySigned,
            other => SigningError::Store(other),
        }
    }
}
