//! Proposal and contract builder
//!
//! Assembles client documents from a template catalog through an
//! eight-step wizard, prices them, persists drafts through a
//! [`shared_types::DocumentStore`], hands them to the signing workflow in
//! `docsign-core`, and exports them to PDF via `shared-pdf`.
//!
//! ```text
//! TemplateCatalog ─► DocumentWizard ─► DocumentStore ─► SigningWorkflow
//!                        │                    │
//!                  PricingCalculator     export_document ─► PdfExporter
//! ```

pub mod catalog;
pub mod compliance;
pub mod config;
pub mod error;
pub mod export;
pub mod notify;
pub mod placeholder;
pub mod pricing;
pub mod sections;
pub mod signers;
pub mod telemetry;
pub mod wizard;

pub use catalog::{LineItemTemplate, SectionTemplate, Template, TemplateCatalog};
pub use compliance::{ComplianceChecklist, ComplianceItem};
pub use config::{AppConfig, PdfConfig, PricingConfig, SigningConfig};
pub use error::{BuilderError, PricingError, SectionError, SignerError, WizardError};
pub use export::{document_context, export_document, prepare_export_input};
pub use notify::{Notification, NotificationLevel};
pub use placeholder::{expand, long_date, tokens_in, Placeholder, PlaceholderContext};
pub use pricing::{compute, with_tax, DiscountPolicy, PricingCalculator};
pub use sections::SectionList;
pub use signers::{is_valid_email, SignerDraft, SignerList};
pub use telemetry::init_tracing;
pub use wizard::{DocumentWizard, TemplateOutcome, WizardStep};
