//! Eight-step document assembly wizard.
//!
//! The wizard owns the in-progress draft. Forward navigation is guarded per
//! step; `back()` never validates. Arriving at [`WizardStep::LoadTemplate`]
//! from the previous step loads the catalog template for the current
//! (document type, service type), unless the draft carries manual edits, in
//! which case the reload waits for [`DocumentWizard::confirm_template_reload`]
//! or [`DocumentWizard::keep_current_content`].
//!
//! Persisting actions leave the wizard's state untouched when they fail.

use chrono::{DateTime, NaiveDate, Utc};
use docsign_core::SigningWorkflow;
use serde::{Deserialize, Serialize};
use shared_types::{
    Client, ClientContact, CompanySettings, DiscountSpec, Document, DocumentContent,
    DocumentStatus, DocumentStore, DocumentType, PricingData, PricingLineItem, PricingSummary,
    ServiceType, SessionContext, Signature,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::catalog::{Template, TemplateCatalog};
use crate::compliance::ComplianceChecklist;
use crate::config::AppConfig;
use crate::error::{BuilderError, PricingError, WizardError};
use crate::notify::Notification;
use crate::placeholder::{expand, tokens_in, PlaceholderContext};
use crate::pricing::PricingCalculator;
use crate::sections::SectionList;
use crate::signers::{SignerDraft, SignerList};

const LINE_ITEM_PREFIX: &str = "item_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    SelectClient,
    SelectService,
    LoadTemplate,
    EditSections,
    Pricing,
    Compliance,
    Signatures,
    Review,
}

impl WizardStep {
    pub const ALL: [WizardStep; 8] = [
        Self::SelectClient,
        Self::SelectService,
        Self::LoadTemplate,
        Self::EditSections,
        Self::Pricing,
        Self::Compliance,
        Self::Signatures,
        Self::Review,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn next(&self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn prev(&self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::SelectClient => "Select Client",
            Self::SelectService => "Select Service",
            Self::LoadTemplate => "Load Template",
            Self::EditSections => "Edit Sections",
            Self::Pricing => "Pricing",
            Self::Compliance => "Compliance",
            Self::Signatures => "Signatures",
            Self::Review => "Review",
        }
    }
}

/// What happened on the last arrival at the template step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateOutcome {
    NotLoaded,
    Applied,
    /// Manual edits exist; waiting for the author to decide
    Pending,
    /// No template for the combination; the editor starts empty
    Missing,
    /// Same combination as already loaded
    Unchanged,
    /// The author kept their edits over a reload
    Kept,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Persisted {
    id: Uuid,
    version: u32,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DocumentWizard {
    catalog: TemplateCatalog,
    calculator: PricingCalculator,
    clock: fn() -> DateTime<Utc>,
    step: WizardStep,
    persisted: Option<Persisted>,

    client: Option<Client>,
    document_type: Option<DocumentType>,
    service_type: Option<ServiceType>,
    title: String,
    expires_at: Option<DateTime<Utc>>,
    sections: SectionList,
    line_items: Vec<PricingLineItem>,
    discount: Option<DiscountSpec>,
    compliance: ComplianceChecklist,
    signers: SignerList,

    loaded_template: Option<(DocumentType, ServiceType)>,
    dirty: bool,
    pending_reload: bool,
    template_outcome: TemplateOutcome,
}

impl Default for DocumentWizard {
    fn default() -> Self {
        Self::new(TemplateCatalog::builtin().clone(), PricingCalculator::default())
    }
}

impl DocumentWizard {
    pub fn new(catalog: TemplateCatalog, calculator: PricingCalculator) -> Self {
        Self {
            catalog,
            calculator,
            clock: Utc::now,
            step: WizardStep::SelectClient,
            persisted: None,
            client: None,
            document_type: None,
            service_type: None,
            title: String::new(),
            expires_at: None,
            sections: SectionList::default(),
            line_items: Vec::new(),
            discount: None,
            compliance: ComplianceChecklist::default(),
            signers: SignerList::default(),
            loaded_template: None,
            dirty: false,
            pending_reload: false,
            template_outcome: TemplateOutcome::NotLoaded,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            TemplateCatalog::builtin().clone(),
            config.pricing.calculator(),
        )
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Reopen a saved draft for editing.
    pub fn resume(
        catalog: TemplateCatalog,
        calculator: PricingCalculator,
        document: Document,
        client: Client,
        signatures: &[Signature],
    ) -> Result<Self, WizardError> {
        if document.status != DocumentStatus::Draft {
            return Err(WizardError::NotEditable(document.status));
        }
        let key = (document.document_type, document.service_type);
        let mut compliance = catalog
            .lookup(key.0, key.1)
            .map(|t| ComplianceChecklist::new(t.compliance.clone()))
            .unwrap_or_default();
        if document.compliance_confirmed {
            compliance.acknowledge_all();
        }

        let mut wizard = Self::new(catalog, calculator);
        wizard.step = WizardStep::EditSections;
        wizard.persisted = Some(Persisted {
            id: document.id,
            version: document.version,
            created_at: document.created_at,
        });
        wizard.client = Some(client);
        wizard.document_type = Some(key.0);
        wizard.service_type = Some(key.1);
        wizard.title = document.title;
        wizard.expires_at = document.expires_at;
        wizard.sections = SectionList::new(document.content.sections);
        wizard.line_items = document.pricing.items;
        wizard.discount = document.pricing.discount;
        wizard.compliance = compliance;
        wizard.signers = SignerList::from_rows(signatures);
        wizard.loaded_template = Some(key);
        // saved content counts as edited
        wizard.dirty = true;
        Ok(wizard)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn document_id(&self) -> Option<Uuid> {
        self.persisted.map(|p| p.id)
    }

    pub fn client(&self) -> Option<&Client> {
        self.client.as_ref()
    }

    pub fn document_type(&self) -> Option<DocumentType> {
        self.document_type
    }

    pub fn service_type(&self) -> Option<ServiceType> {
        self.service_type
    }

    /// Raw title, placeholders included.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn sections(&self) -> &SectionList {
        &self.sections
    }

    pub fn line_items(&self) -> &[PricingLineItem] {
        &self.line_items
    }

    pub fn discount(&self) -> Option<&DiscountSpec> {
        self.discount.as_ref()
    }

    pub fn compliance(&self) -> &ComplianceChecklist {
        &self.compliance
    }

    pub fn signers(&self) -> &SignerList {
        &self.signers
    }

    pub fn template_outcome(&self) -> TemplateOutcome {
        self.template_outcome
    }

    pub fn has_pending_reload(&self) -> bool {
        self.pending_reload
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Check the forward guard of the current step.
    pub fn check_step(&self) -> Result<(), WizardError> {
        self.check_guard(self.step)
    }

    /// Every guard before Review, in order. Sending requires all of them.
    pub fn check_ready(&self) -> Result<(), WizardError> {
        WizardStep::ALL
            .iter()
            .filter(|step| **step != WizardStep::Review)
            .try_for_each(|step| self.check_guard(*step))
    }

    fn check_guard(&self, step: WizardStep) -> Result<(), WizardError> {
        let incomplete = |reason: String| WizardError::StepIncomplete { step, reason };
        match step {
            WizardStep::SelectClient => {
                if self.client.is_none() {
                    return Err(incomplete("Select a client".into()));
                }
            }
            WizardStep::SelectService => {
                if self.document_type.is_none() || self.service_type.is_none() {
                    return Err(incomplete("Choose a document type and a service".into()));
                }
            }
            WizardStep::LoadTemplate => {
                if self.pending_reload {
                    return Err(incomplete(
                        "Confirm the template reload or keep your current content".into(),
                    ));
                }
                if self.title.trim().is_empty() {
                    return Err(incomplete("Give the document a title".into()));
                }
            }
            WizardStep::EditSections => {
                if self.sections.is_empty() {
                    return Err(incomplete("Add at least one section".into()));
                }
            }
            WizardStep::Pricing => {
                self.pricing_summary()
                    .map_err(|e| incomplete(e.to_string()))?;
            }
            WizardStep::Compliance => {
                let outstanding = self.compliance.outstanding();
                if !outstanding.is_empty() {
                    let labels: Vec<&str> = outstanding.iter().map(|i| i.label.as_str()).collect();
                    return Err(incomplete(format!("Acknowledge: {}", labels.join(", "))));
                }
            }
            WizardStep::Signatures => {
                self.signers
                    .validate()
                    .map_err(|e| incomplete(e.to_string()))?;
            }
            WizardStep::Review => return Err(WizardError::NoNextStep),
        }
        Ok(())
    }

    pub fn advance(&mut self) -> Result<WizardStep, WizardError> {
        self.check_step()?;
        let next = self.step.next().ok_or(WizardError::NoNextStep)?;
        debug!(from = ?self.step, to = ?next, "Wizard advanced");
        self.step = next;
        if next == WizardStep::LoadTemplate {
            self.arrive_at_template_step();
        }
        Ok(next)
    }

    /// Step back. Always allowed; returns `false` on the first step.
    pub fn back(&mut self) -> bool {
        match self.step.prev() {
            Some(prev) => {
                self.step = prev;
                true
            }
            None => false,
        }
    }

    /// Jump to `target`. Forward jumps pass every guard on the way and stop
    /// at the first one that fails.
    pub fn go_to(&mut self, target: WizardStep) -> Result<WizardStep, WizardError> {
        if target <= self.step {
            self.step = target;
            return Ok(target);
        }
        while self.step < target {
            self.advance()?;
        }
        Ok(self.step)
    }

    // ------------------------------------------------------------------
    // Template loading
    // ------------------------------------------------------------------

    fn selection(&self) -> Option<(DocumentType, ServiceType)> {
        Some((self.document_type?, self.service_type?))
    }

    fn arrive_at_template_step(&mut self) {
        let Some(key) = self.selection() else {
            return;
        };
        if self.loaded_template == Some(key) {
            self.template_outcome = TemplateOutcome::Unchanged;
            return;
        }
        if self.dirty {
            self.pending_reload = true;
            self.template_outcome = TemplateOutcome::Pending;
            info!(document_type = %key.0, service_type = %key.1, "Template reload awaits confirmation");
            return;
        }
        self.load_template(key);
    }

    fn load_template(&mut self, key: (DocumentType, ServiceType)) {
        match self.catalog.lookup(key.0, key.1).cloned() {
            Some(template) => self.apply_template(&template),
            None => {
                self.title.clear();
                self.sections = SectionList::default();
                self.line_items.clear();
                self.discount = None;
                self.compliance = ComplianceChecklist::default();
                self.template_outcome = TemplateOutcome::Missing;
                info!(document_type = %key.0, service_type = %key.1, "No template for combination");
            }
        }
        self.loaded_template = Some(key);
        self.pending_reload = false;
        self.dirty = false;
    }

    fn apply_template(&mut self, template: &Template) {
        self.title = template.title.clone();
        self.sections = SectionList::new(template.build_sections());
        self.line_items = template.build_line_items();
        self.discount = None;
        self.compliance = ComplianceChecklist::new(template.compliance.clone());
        self.template_outcome = TemplateOutcome::Applied;
        info!(
            document_type = %template.document_type,
            service_type = %template.service_type,
            sections = self.sections.len(),
            line_items = self.line_items.len(),
            "Template applied"
        );
    }

    /// Overwrite the draft with the template for the current selection.
    pub fn confirm_template_reload(&mut self) -> Result<(), WizardError> {
        if !self.pending_reload {
            return Err(WizardError::NoPendingReload);
        }
        let key = self.selection().ok_or(WizardError::Missing("A service"))?;
        self.load_template(key);
        Ok(())
    }

    /// Keep the edited content and treat the current selection as loaded.
    pub fn keep_current_content(&mut self) -> Result<(), WizardError> {
        if !self.pending_reload {
            return Err(WizardError::NoPendingReload);
        }
        self.pending_reload = false;
        self.loaded_template = self.selection();
        self.template_outcome = TemplateOutcome::Kept;
        Ok(())
    }

    /// Banner for the template step, if any.
    pub fn template_notice(&self) -> Option<Notification> {
        match self.template_outcome {
            TemplateOutcome::Applied => Some(Notification::success(
                "Template loaded",
                "Default sections, pricing and compliance items were loaded.",
            )),
            TemplateOutcome::Pending => Some(Notification::warning(
                "Replace your edits?",
                "Loading the template will overwrite the sections and pricing you changed.",
            )),
            TemplateOutcome::Missing => Some(Notification::info(
                "No template",
                "There is no template for this combination. Start from an empty document.",
            )),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    pub fn select_client(&mut self, client: Client) {
        self.client = Some(client);
    }

    pub fn select_document_type(&mut self, document_type: DocumentType) {
        self.document_type = Some(document_type);
    }

    pub fn select_service_type(&mut self, service_type: ServiceType) {
        self.service_type = Some(service_type);
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        self.dirty = true;
    }

    pub fn set_expiry(&mut self, expires_at: Option<DateTime<Utc>>) {
        self.expires_at = expires_at;
    }

    pub fn add_custom_section(&mut self, title: &str) -> Result<String, WizardError> {
        let key = self.sections.add_custom(title)?;
        self.dirty = true;
        Ok(key)
    }

    pub fn remove_section(&mut self, key: &str) -> Result<(), WizardError> {
        self.sections.remove(key)?;
        self.dirty = true;
        Ok(())
    }

    pub fn move_section_up(&mut self, key: &str) -> Result<bool, WizardError> {
        let moved = self.sections.move_up(key)?;
        self.dirty |= moved;
        Ok(moved)
    }

    pub fn move_section_down(&mut self, key: &str) -> Result<bool, WizardError> {
        let moved = self.sections.move_down(key)?;
        self.dirty |= moved;
        Ok(moved)
    }

    pub fn rename_section(&mut self, key: &str, title: &str) -> Result<(), WizardError> {
        self.sections.rename(key, title)?;
        self.dirty = true;
        Ok(())
    }

    pub fn update_section_content(&mut self, key: &str, content: &str) -> Result<(), WizardError> {
        self.sections.update_content(key, content)?;
        self.dirty = true;
        Ok(())
    }

    /// Append a line item and return its id. Values are checked by the
    /// pricing step guard, so a blank row can be added and filled in later.
    pub fn add_line_item(&mut self, description: &str, quantity: f64, unit_price: f64) -> String {
        let next = self
            .line_items
            .iter()
            .filter_map(|i| i.id.strip_prefix(LINE_ITEM_PREFIX))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .map_or(1, |n| n + 1);
        let id = format!("{}{}", LINE_ITEM_PREFIX, next);
        self.line_items
            .push(PricingLineItem::new(id.clone(), description, quantity, unit_price));
        self.dirty = true;
        id
    }

    pub fn update_line_item(
        &mut self,
        id: &str,
        description: &str,
        quantity: f64,
        unit_price: f64,
    ) -> Result<(), WizardError> {
        let item = self
            .line_items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| WizardError::UnknownLineItem(id.to_string()))?;
        item.description = description.to_string();
        item.quantity = quantity;
        item.unit_price = unit_price;
        self.dirty = true;
        Ok(())
    }

    pub fn remove_line_item(&mut self, id: &str) -> Result<PricingLineItem, WizardError> {
        let idx = self
            .line_items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| WizardError::UnknownLineItem(id.to_string()))?;
        self.dirty = true;
        Ok(self.line_items.remove(idx))
    }

    pub fn set_discount(&mut self, discount: Option<DiscountSpec>) {
        self.discount = discount;
        self.dirty = true;
    }

    /// Live totals for the pricing step.
    pub fn pricing_summary(&self) -> Result<PricingSummary, PricingError> {
        self.calculator
            .summarize(&self.line_items, self.discount.as_ref())
    }

    pub fn acknowledge(&mut self, key: &str, acknowledged: bool) -> Result<(), WizardError> {
        if self.compliance.set_acknowledged(key, acknowledged) {
            Ok(())
        } else {
            Err(WizardError::UnknownComplianceItem(key.to_string()))
        }
    }

    pub fn acknowledge_all(&mut self) {
        self.compliance.acknowledge_all();
    }

    pub fn add_signer(&mut self, signer: SignerDraft) -> Result<usize, WizardError> {
        Ok(self.signers.add(signer)?)
    }

    pub fn add_contact_signer(&mut self, contact: &ClientContact) -> Result<usize, WizardError> {
        Ok(self.signers.add_contact(contact)?)
    }

    /// Add the selected client's primary contact.
    pub fn add_primary_contact_signer(&mut self) -> Result<usize, WizardError> {
        let contact = self
            .client
            .as_ref()
            .and_then(Client::primary_contact)
            .cloned()
            .ok_or(WizardError::Missing("A client contact"))?;
        self.add_contact_signer(&contact)
    }

    pub fn add_company_representative(
        &mut self,
        company: &CompanySettings,
        name: &str,
        email: &str,
    ) -> Result<usize, WizardError> {
        Ok(self.signers.add_company_representative(company, name, email)?)
    }

    pub fn remove_signer(&mut self, index: usize) -> Result<SignerDraft, WizardError> {
        Ok(self.signers.remove(index)?)
    }

    pub fn toggle_signer_required(&mut self, index: usize) -> Result<bool, WizardError> {
        Ok(self.signers.toggle_required(index)?)
    }

    pub fn move_signer(&mut self, index: usize, up: bool) -> Result<bool, WizardError> {
        Ok(self.signers.move_signer(index, up)?)
    }

    // ------------------------------------------------------------------
    // Review
    // ------------------------------------------------------------------

    pub fn placeholder_context(&self, today: NaiveDate) -> PlaceholderContext {
        let expiry = self.expires_at.map(|e| e.date_naive());
        match &self.client {
            Some(client) => PlaceholderContext::for_client(client, today, expiry),
            None => PlaceholderContext {
                date: Some(today),
                expiry_date: expiry,
                ..Default::default()
            },
        }
    }

    /// Placeholders that would survive expansion, one line per location.
    pub fn review_warnings(&self, today: NaiveDate) -> Vec<String> {
        let ctx = self.placeholder_context(today);
        let mut warnings = Vec::new();
        let mut check = |location: &str, text: &str| {
            let left = tokens_in(&expand(text, &ctx));
            if !left.is_empty() {
                let names: Vec<String> = left.iter().map(|p| p.token()).collect();
                warnings.push(format!("{} still contains {}", location, names.join(", ")));
            }
        };
        check("The title", &self.title);
        for section in self.sections.as_slice() {
            check(&format!("Section '{}'", section.title), &section.content);
        }
        warnings
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// The draft as it would be saved at `now`.
    pub fn build_document(&self, now: DateTime<Utc>) -> Result<Document, WizardError> {
        let client = self.client.as_ref().ok_or(WizardError::Missing("A client"))?;
        let document_type = self
            .document_type
            .ok_or(WizardError::Missing("A document type"))?;
        let service_type = self.service_type.ok_or(WizardError::Missing("A service"))?;

        let summary = self.pricing_summary()?;
        let pricing = PricingData::new(self.line_items.clone(), self.discount, summary)?;
        let content = DocumentContent::new(self.sections.clone().into_vec())?;

        let created_at = self.persisted.map_or(now, |p| p.created_at);
        let ctx = self.placeholder_context(created_at.date_naive());
        let mut doc = Document::new_draft(
            expand(&self.title, &ctx),
            document_type,
            service_type,
            client.id,
            now,
        );
        if let Some(p) = self.persisted {
            doc.id = p.id;
            doc.version = p.version + 1;
            doc.created_at = p.created_at;
        }
        doc.content = content;
        doc.pricing = pricing;
        doc.compliance_confirmed = self.compliance.is_complete();
        doc.expires_at = self.expires_at;
        Ok(doc)
    }

    /// Insert or update the draft and replace its signer rows.
    ///
    /// The document id is remembered as soon as the first insert succeeds,
    /// so a retry after a later failure updates instead of duplicating.
    #[instrument(skip(self, store, session), fields(actor = %session.email))]
    pub async fn save_draft(
        &mut self,
        store: &dyn DocumentStore,
        session: &SessionContext,
    ) -> Result<Document, BuilderError> {
        if !session.can_author() {
            return Err(BuilderError::Forbidden("only staff can save documents"));
        }
        let doc = self.build_document((self.clock)())?;

        match self.persisted.as_mut() {
            None => {
                store.insert_document(&doc).await?;
                self.persisted = Some(Persisted {
                    id: doc.id,
                    version: doc.version,
                    created_at: doc.created_at,
                });
            }
            Some(p) => {
                store.update_document(&doc).await?;
                p.version = doc.version;
            }
        }

        store
            .replace_signers(doc.id, &self.signers.to_rows(doc.id))
            .await?;

        info!(
            document_id = %doc.id,
            version = doc.version,
            signers = self.signers.len(),
            "Draft saved"
        );
        Ok(doc)
    }

    /// Save, then move the draft to Sent. Nothing is written unless every
    /// step guard passes.
    #[instrument(skip(self, store, session, workflow), fields(actor = %session.email))]
    pub async fn send_for_signature(
        &mut self,
        store: &dyn DocumentStore,
        session: &SessionContext,
        workflow: &SigningWorkflow,
    ) -> Result<Document, BuilderError> {
        self.signers.validate().map_err(WizardError::from)?;
        self.check_ready()?;
        let saved = self.save_draft(store, session).await?;
        let sent = workflow.dispatch(store, session, saved.id).await?;
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SectionError;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use shared_types::{MemoryStore, StoreOp};

    fn acme() -> Client {
        let mut client = Client::new("Acme Dental");
        client.address = Some("12 King St W, Toronto".into());
        client.contacts.push(ClientContact {
            name: "Ana Silva".into(),
            email: "ana@acme.ca".into(),
            phone: None,
            job_title: Some("Owner".into()),
            is_primary: true,
        });
        client
    }

    /// A wizard sitting on the template step with the proposal template loaded.
    fn loaded() -> DocumentWizard {
        let mut w = DocumentWizard::default();
        w.select_client(acme());
        w.advance().unwrap();
        w.select_document_type(DocumentType::Proposal);
        w.select_service_type(ServiceType::WebsiteOnly);
        w.advance().unwrap();
        w
    }

    #[test]
    fn step_order() {
        assert_eq!(WizardStep::SelectClient.prev(), None);
        assert_eq!(WizardStep::Review.next(), None);
        assert_eq!(WizardStep::Pricing.next(), Some(WizardStep::Compliance));
        assert_eq!(WizardStep::Pricing.prev(), Some(WizardStep::EditSections));
        assert_eq!(WizardStep::ALL.len(), 8);
    }

    #[test]
    fn cannot_leave_select_client_without_client() {
        let mut w = DocumentWizard::default();
        let err = w.advance().unwrap_err();
        assert!(matches!(
            err,
            WizardError::StepIncomplete {
                step: WizardStep::SelectClient,
                ..
            }
        ));
        assert_eq!(w.step(), WizardStep::SelectClient);
    }

    #[test]
    fn arrival_applies_template() {
        let w = loaded();
        assert_eq!(w.step(), WizardStep::LoadTemplate);
        assert_eq!(w.template_outcome(), TemplateOutcome::Applied);
        assert!(!w.sections().is_empty());
        assert!(!w.compliance().items().is_empty());
        assert!(w.title().contains("{{CLIENT_NAME}}"));
        assert!(!w.is_dirty());
    }

    #[test]
    fn missing_template_leaves_empty_editor() {
        let mut w = DocumentWizard::default();
        w.select_client(acme());
        w.advance().unwrap();
        w.select_document_type(DocumentType::Sla);
        w.select_service_type(ServiceType::GraphicDesign);
        w.advance().unwrap();
        assert_eq!(w.template_outcome(), TemplateOutcome::Missing);
        assert!(w.sections().is_empty());
        assert_eq!(w.template_notice().unwrap().title, "No template");

        // title is required before leaving the step
        assert!(w.advance().is_err());
        w.set_title("Design retainer");
        w.advance().unwrap();
        // and a section before leaving the editor
        assert!(w.advance().is_err());
        w.add_custom_section("Scope").unwrap();
        assert_eq!(w.advance().unwrap(), WizardStep::Pricing);
    }

    #[test]
    fn edited_draft_requires_reload_confirmation() {
        let mut w = loaded();
        w.advance().unwrap();
        w.add_custom_section("Extras").unwrap();
        w.go_to(WizardStep::SelectService).unwrap();
        w.select_service_type(ServiceType::Cybersecurity);
        w.advance().unwrap();

        assert!(w.has_pending_reload());
        assert_eq!(w.template_outcome(), TemplateOutcome::Pending);
        assert!(w.sections().get("custom_1").is_some());
        assert!(matches!(
            w.advance(),
            Err(WizardError::StepIncomplete {
                step: WizardStep::LoadTemplate,
                ..
            })
        ));

        w.confirm_template_reload().unwrap();
        assert!(w.sections().get("custom_1").is_none());
        assert!(w.title().starts_with("Cybersecurity"));
        assert_eq!(w.confirm_template_reload(), Err(WizardError::NoPendingReload));
    }

    #[test]
    fn keep_current_content_skips_reload() {
        let mut w = loaded();
        w.set_title("My own title");
        w.back();
        w.select_document_type(DocumentType::Contract);
        w.advance().unwrap();
        w.keep_current_content().unwrap();
        assert_eq!(w.title(), "My own title");
        assert_eq!(w.template_outcome(), TemplateOutcome::Kept);

        // returning with the same selection does not prompt again
        w.back();
        w.advance().unwrap();
        assert!(!w.has_pending_reload());
        assert_eq!(w.template_outcome(), TemplateOutcome::Unchanged);
    }

    #[test]
    fn go_to_stops_at_first_failing_guard() {
        let mut w = loaded();
        let err = w.go_to(WizardStep::Review).unwrap_err();
        assert!(matches!(
            err,
            WizardError::StepIncomplete {
                step: WizardStep::Compliance,
                ..
            }
        ));
        assert_eq!(w.step(), WizardStep::Compliance);

        assert_eq!(w.go_to(WizardStep::SelectClient).unwrap(), WizardStep::SelectClient);
    }

    #[test]
    fn review_is_terminal() {
        let mut w = loaded();
        w.acknowledge_all();
        w.add_primary_contact_signer().unwrap();
        assert_eq!(w.go_to(WizardStep::Review).unwrap(), WizardStep::Review);
        assert_eq!(w.advance(), Err(WizardError::NoNextStep));
        assert!(w.back());
    }

    #[test]
    fn invalid_line_item_blocks_pricing() {
        let mut w = loaded();
        w.go_to(WizardStep::Pricing).unwrap();
        let id = w.add_line_item("", 1.0, 10.0);
        assert!(w.advance().is_err());
        w.update_line_item(&id, "Rush fee", 1.0, 10.0).unwrap();
        assert_eq!(w.advance().unwrap(), WizardStep::Compliance);
        assert_eq!(
            w.update_line_item("item_99", "x", 1.0, 1.0),
            Err(WizardError::UnknownLineItem("item_99".into()))
        );
    }

    #[test]
    fn line_item_ids_continue_after_template() {
        let mut w = loaded();
        let n = w.line_items().len();
        let id = w.add_line_item("Extra page", 1.0, 150.0);
        assert_eq!(id, format!("item_{}", n + 1));
        w.remove_line_item(&id).unwrap();
        assert_eq!(w.line_items().len(), n);
    }

    #[test]
    fn locked_sections_stay() {
        let mut w = loaded();
        let locked = w
            .sections()
            .as_slice()
            .iter()
            .find(|s| s.locked)
            .map(|s| s.key.clone())
            .unwrap();
        assert_eq!(
            w.remove_section(&locked),
            Err(WizardError::Section(SectionError::Locked(locked)))
        );
    }

    #[test]
    fn review_warns_about_unresolved_placeholders() {
        let mut w = loaded();
        w.go_to(WizardStep::EditSections).unwrap();
        let key = w.add_custom_section("Validity").unwrap();
        w.update_section_content(&key, "<p>Valid until {{EXPIRY_DATE}}</p>")
            .unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        let warnings = w.review_warnings(today);
        assert_eq!(
            warnings,
            vec![
                "Section 'Terms & Validity' still contains {{EXPIRY_DATE}}".to_string(),
                "Section 'Validity' still contains {{EXPIRY_DATE}}".to_string(),
            ]
        );

        w.set_expiry(Some(Utc::now()));
        assert!(w.review_warnings(today).is_empty());
    }

    #[test]
    fn build_document_expands_title_and_freezes_pricing() {
        let mut w = loaded();
        w.set_discount(Some(DiscountSpec::percentage(10.0)));
        let doc = w.build_document(Utc::now()).unwrap();
        assert!(doc.title.contains("Acme Dental"));
        assert_eq!(doc.version, 1);
        assert_eq!(doc.status, DocumentStatus::Draft);
        assert!(!doc.compliance_confirmed);
        let summary = w.pricing_summary().unwrap();
        assert_eq!(doc.pricing.summary, summary);
        assert_eq!(doc.content.sections.len(), w.sections().len());
    }

    #[tokio::test]
    async fn resave_bumps_version() {
        let store = MemoryStore::new();
        let staff = SessionContext::staff("pm@cipherx.ca");
        let mut w = loaded();
        w.add_signer(SignerDraft::new("Ana", "ana@acme.ca", "Owner", true))
            .unwrap();

        let first = w.save_draft(&store, &staff).await.unwrap();
        w.set_title("Revised");
        let second = w.save_draft(&store, &staff).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.version, 2);
        assert_eq!(second.created_at, first.created_at);
        let stored = store.get_document(first.id).await.unwrap();
        assert_eq!(stored.title, "Revised");
        assert_eq!(store.list_signatures(first.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn client_cannot_save() {
        let store = MemoryStore::new();
        let mut w = loaded();
        let client = SessionContext::client("ana@acme.ca", Uuid::new_v4());
        assert!(matches!(
            w.save_draft(&store, &client).await,
            Err(BuilderError::Forbidden(_))
        ));
        assert_eq!(w.document_id(), None);
    }

    #[tokio::test]
    async fn failed_insert_keeps_state() {
        let store = MemoryStore::new();
        store.fail_on(StoreOp::InsertDocument).unwrap();
        let staff = SessionContext::staff("pm@cipherx.ca");
        let mut w = loaded();
        w.set_title("Keep me");
        let before_sections = w.sections().clone();

        assert!(matches!(
            w.save_draft(&store, &staff).await,
            Err(BuilderError::Store(_))
        ));
        assert_eq!(w.title(), "Keep me");
        assert_eq!(w.sections(), &before_sections);
        assert_eq!(w.document_id(), None);

        store.clear_failures().unwrap();
        let doc = w.save_draft(&store, &staff).await.unwrap();
        assert_eq!(doc.version, 1);
    }

    fn march_fourth() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn title_date_stays_at_creation_date() {
        let store = MemoryStore::new();
        let staff = SessionContext::staff("pm@cipherx.ca");
        let mut w = loaded().with_clock(march_fourth);
        w.set_title("Plan dated {{DATE}}");

        let first = w.save_draft(&store, &staff).await.unwrap();
        assert_eq!(first.title, "Plan dated March 4, 2026");
        let later = w
            .build_document(Utc.with_ymd_and_hms(2026, 5, 20, 9, 0, 0).unwrap())
            .unwrap();
        assert_eq!(later.title, "Plan dated March 4, 2026");
        assert_eq!(later.created_at, first.created_at);
    }

    #[tokio::test]
    async fn sending_runs_every_step_guard() {
        let store = MemoryStore::new();
        let staff = SessionContext::staff("pm@cipherx.ca");
        let workflow = SigningWorkflow::default();
        let mut w = loaded();
        assert_eq!(w.step(), WizardStep::LoadTemplate);
        w.add_signer(SignerDraft::new("Ana", "ana@acme.ca", "Owner", true))
            .unwrap();

        let err = w
            .send_for_signature(&store, &staff, &workflow)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BuilderError::Wizard(WizardError::StepIncomplete {
                step: WizardStep::Compliance,
                ..
            })
        ));
        assert_eq!(w.document_id(), None);

        w.acknowledge_all();
        w.set_title("  ");
        let err = w
            .send_for_signature(&store, &staff, &workflow)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BuilderError::Wizard(WizardError::StepIncomplete {
                step: WizardStep::LoadTemplate,
                ..
            })
        ));
        assert_eq!(w.document_id(), None);

        w.set_title("Website Proposal");
        let sent = w.send_for_signature(&store, &staff, &workflow).await.unwrap();
        assert_eq!(sent.status, DocumentStatus::Sent);
        assert!(sent.compliance_confirmed);
    }

    #[test]
    fn resume_refuses_sent_documents() {
        let mut doc = loaded().build_document(Utc::now()).unwrap();
        doc.status = DocumentStatus::Sent;
        let err = DocumentWizard::resume(
            TemplateCatalog::builtin().clone(),
            PricingCalculator::default(),
            doc,
            acme(),
            &[],
        )
        .unwrap_err();
        assert_eq!(err, WizardError::NotEditable(DocumentStatus::Sent));
    }

    #[test]
    fn resume_restores_draft() {
        let mut w = loaded();
        w.acknowledge_all();
        let doc = w.build_document(Utc::now()).unwrap();
        let rows = vec![Signature::pending(doc.id, "Ana", "ana@acme.ca", "Owner", true, 0)];
        let resumed = DocumentWizard::resume(
            TemplateCatalog::builtin().clone(),
            PricingCalculator::default(),
            doc.clone(),
            acme(),
            &rows,
        )
        .unwrap();
        assert_eq!(resumed.document_id(), Some(doc.id));
        assert_eq!(resumed.step(), WizardStep::EditSections);
        assert!(resumed.compliance().is_complete());
        assert_eq!(resumed.signers().len(), 1);
        assert_eq!(resumed.line_items(), doc.pricing.items.as_slice());
    }
}
