pub mod audit;
pub mod company;
pub mod content;
pub mod document;
pub mod pricing;
pub mod session;
pub mod signature;
pub mod store;

pub use audit::{AuditAction, AuditChain, AuditEvent};
pub use company::{Client, ClientContact, CompanySettings};
pub use content::{ContentError, DocumentContent, PricingData, CONTENT_SCHEMA_VERSION};
pub use document::{
    Document, DocumentError, DocumentStatus, DocumentType, Section, ServiceType,
    CUSTOM_SECTION_PREFIX,
};
pub use pricing::{
    format_currency, round_cents, DiscountKind, DiscountSpec, LineItemError, PricingLineItem,
    PricingSummary, TaxLine,
};
pub use session::{Role, SessionContext};
pub use signature::{LocationData, Provenance, Signature, SignatureCapture};
pub use store::{DocumentStore, MemoryStore, StoreError, StoreOp, StoreResult};
