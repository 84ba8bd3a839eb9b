//! Signature capture and the signing workflow
//!
//! This crate provides the hand-drawn signature pad (raster, undo history,
//! PNG export), pointer coordinate normalization, best-effort signing
//! provenance, and the dispatch/view/sign operations that drive a document
//! from Draft to Signed through a [`shared_types::DocumentStore`].
//!
//! The `server` feature (default) bounds provenance lookups with tokio
//! timeouts; the `wasm` build runs them unbounded and lets the lookup traits
//! wrap non-`Send` browser futures.

pub mod coords;
pub mod error;
pub mod pad;
pub mod provenance;
pub mod surface;
pub mod validate;
pub mod workflow;

pub use coords::{to_canvas_space, ElementRect, Point};
pub use error::{PadError, ProvenanceError, SigningError};
pub use pad::{ChangeObserver, PadState, PadStyle, SignaturePad, DEFAULT_UNDO_CAPACITY};
pub use provenance::{
    Geolocator, IpLookup, MaybeSendSync, ProvenanceCollector, DEFAULT_LOOKUP_TIMEOUT,
};
pub use surface::{Rgba, Surface};
pub use validate::{
    decode_signature_data_url, png_data_url, validate_drawn_signature, PNG_MAGIC,
};
pub use workflow::{SignOutcome, SignRequest, SigningWorkflow};
