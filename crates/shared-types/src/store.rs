//! Backend contract for document persistence.
//!
//! The hosted backend owns auth and row-level access; this trait only captures
//! the reads and (conditional) writes the builder and signing flow depend on.
//! `MemoryStore` backs tests and offline use.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::audit::{AuditChain, AuditEvent};
use crate::company::{Client, CompanySettings};
use crate::document::{Document, DocumentStatus};
use crate::signature::{Signature, SignatureCapture};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("conflicting update: {0}")]
    Conflict(String),

    #[error("signature {0} has already been signed")]
    AlreadySigned(Uuid),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_document(&self, document: &Document) -> StoreResult<()>;

    /// Overwrite a draft. Fails with `Conflict` once the stored row left Draft.
    async fn update_document(&self, document: &Document) -> StoreResult<()>;

    async fn get_document(&self, id: Uuid) -> StoreResult<Document>;

    async fn list_documents_for_client(&self, client_id: Uuid) -> StoreResult<Vec<Document>>;

    async fn get_client(&self, id: Uuid) -> StoreResult<Client>;

    async fn company_settings(&self) -> StoreResult<CompanySettings>;

    /// Compare-and-set on the status column.
    async fn transition_status(
        &self,
        id: Uuid,
        from: DocumentStatus,
        to: DocumentStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Document>;

    /// Replace every signer row of a draft document.
    async fn replace_signers(&self, document_id: Uuid, signers: &[Signature]) -> StoreResult<()>;

    /// Signer rows ordered by `sort_order`.
    async fn list_signatures(&self, document_id: Uuid) -> StoreResult<Vec<Signature>>;

    async fn get_signature(&self, id: Uuid) -> StoreResult<Signature>;

    /// Write image, timestamp and provenance in one conditional update.
    /// Fails with `AlreadySigned` if the row already carries a signature.
    async fn record_signature(
        &self,
        signature_id: Uuid,
        capture: SignatureCapture,
    ) -> StoreResult<Signature>;

    /// Atomically flip Sent -> Signed when no required signer is outstanding.
    /// A document without any required signer needs every signer instead.
    /// Returns whether this call performed the flip.
    async fn complete_if_all_required_signed(
        &self,
        document_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    async fn append_audit(&self, event: AuditEvent) -> StoreResult<AuditEvent>;

    async fn list_audit(&self, document_id: Uuid) -> StoreResult<Vec<AuditEvent>>;
}

/// Operations `MemoryStore` can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    InsertDocument,
    UpdateDocument,
    GetDocument,
    TransitionStatus,
    ReplaceSigners,
    RecordSignature,
    CompleteDocument,
    AppendAudit,
    ListAudit,
}

#[derive(Default)]
struct Inner {
    documents: HashMap<Uuid, Document>,
    clients: HashMap<Uuid, Client>,
    signatures: HashMap<Uuid, Vec<Signature>>,
    audit: HashMap<Uuid, AuditChain>,
    company: CompanySettings,
    failing: HashSet<StoreOp>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_company(company: CompanySettings) -> Self {
        let store = Self::default();
        if let Ok(mut inner) = store.inner.lock() {
            inner.company = company;
        }
        store
    }

    pub fn add_client(&self, client: Client) -> StoreResult<()> {
        self.lock()?.clients.insert(client.id, client);
        Ok(())
    }

    /// Make every subsequent `op` fail with a backend error.
    pub fn fail_on(&self, op: StoreOp) -> StoreResult<()> {
        self.lock()?.failing.insert(op);
        Ok(())
    }

    pub fn clear_failures(&self) -> StoreResult<()> {
        self.lock()?.failing.clear();
        Ok(())
    }

    pub fn audit_chain(&self, document_id: Uuid) -> StoreResult<AuditChain> {
        Ok(self
            .lock()?
            .audit
            .get(&document_id)
            .cloned()
            .unwrap_or_else(|| AuditChain::new(document_id)))
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn guard(&self, op: StoreOp) -> StoreResult<MutexGuard<'_, Inner>> {
        let inner = self.lock()?;
        if inner.failing.contains(&op) {
            return Err(StoreError::Backend(format!("injected failure on {:?}", op)));
        }
        Ok(inner)
    }
}

fn not_found(entity: &'static str, id: Uuid) -> StoreError {
    StoreError::NotFound { entity, id }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_document(&self, document: &Document) -> StoreResult<()> {
        let mut inner = self.guard(StoreOp::InsertDocument)?;
        if inner.documents.contains_key(&document.id) {
            return Err(StoreError::Conflict(format!(
                "document {} already exists",
                document.id
            )));
        }
        inner.documents.insert(document.id, document.clone());
        debug!(document_id = %document.id, "Inserted document");
        Ok(())
    }

    async fn update_document(&self, document: &Document) -> StoreResult<()> {
        let mut inner = self.guard(StoreOp::UpdateDocument)?;
        let stored = inner
            .documents
            .get_mut(&document.id)
            .ok_or_else(|| not_found("document", document.id))?;
        if !stored.status.is_editable() {
            return Err(StoreError::Conflict(format!(
                "document {} is {} and cannot be edited",
                document.id, stored.status
            )));
        }
        *stored = document.clone();
        debug!(document_id = %document.id, version = document.version, "Updated document");
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> StoreResult<Document> {
        let inner = self.guard(StoreOp::GetDocument)?;
        inner
            .documents
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("document", id))
    }

    async fn list_documents_for_client(&self, client_id: Uuid) -> StoreResult<Vec<Document>> {
        let inner = self.lock()?;
        let mut docs: Vec<Document> = inner
            .documents
            .values()
            .filter(|d| d.client_id == client_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(docs)
    }

    async fn get_client(&self, id: Uuid) -> StoreResult<Client> {
        self.lock()?
            .clients
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("client", id))
    }

    async fn company_settings(&self) -> StoreResult<CompanySettings> {
        Ok(self.lock()?.company.clone())
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: DocumentStatus,
        to: DocumentStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Document> {
        let mut inner = self.guard(StoreOp::TransitionStatus)?;
        let doc = inner
            .documents
            .get_mut(&id)
            .ok_or_else(|| not_found("document", id))?;
        if doc.status != from {
            return Err(StoreError::Conflict(format!(
                "document {} is {}, expected {}",
                id, doc.status, from
            )));
        }
        doc.transition(to, at)
            .map_err(|e| StoreError::Conflict(e.to_string()))?;
        Ok(doc.clone())
    }

    async fn replace_signers(&self, document_id: Uuid, signers: &[Signature]) -> StoreResult<()> {
        let mut inner = self.guard(StoreOp::ReplaceSigners)?;
        let doc = inner
            .documents
            .get(&document_id)
            .ok_or_else(|| not_found("document", document_id))?;
        if !doc.status.is_editable() {
            return Err(StoreError::Conflict(format!(
                "signers of {} document {} are fixed",
                doc.status, document_id
            )));
        }
        let mut rows: Vec<Signature> = signers
            .iter()
            .cloned()
            .map(|mut s| {
                s.document_id = document_id;
                s
            })
            .collect();
        rows.sort_by_key(|s| s.sort_order);
        inner.signatures.insert(document_id, rows);
        Ok(())
    }

    async fn list_signatures(&self, document_id: Uuid) -> StoreResult<Vec<Signature>> {
        let inner = self.lock()?;
        let mut rows = inner
            .signatures
            .get(&document_id)
            .cloned()
            .unwrap_or_default();
        rows.sort_by_key(|s| s.sort_order);
        Ok(rows)
    }

    async fn get_signature(&self, id: Uuid) -> StoreResult<Signature> {
        let inner = self.lock()?;
        inner
            .signatures
            .values()
            .flatten()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| not_found("signature", id))
    }

    async fn record_signature(
        &self,
        signature_id: Uuid,
        capture: SignatureCapture,
    ) -> StoreResult<Signature> {
        let mut inner = self.guard(StoreOp::RecordSignature)?;
        let row = inner
            .signatures
            .values_mut()
            .flatten()
            .find(|s| s.id == signature_id)
            .ok_or_else(|| not_found("signature", signature_id))?;
        if row.signed_at.is_some() || row.signature_image.is_some() {
            return Err(StoreError::AlreadySigned(signature_id));
        }
        row.signature_image = Some(capture.image_data_url);
        row.signed_at = Some(capture.signed_at);
        row.ip_address = capture.provenance.ip_address;
        row.location = capture.provenance.location;
        row.user_agent = capture.provenance.user_agent;
        Ok(row.clone())
    }

    async fn complete_if_all_required_signed(
        &self,
        document_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut inner = self.guard(StoreOp::CompleteDocument)?;
        let outstanding = inner
            .signatures
            .get(&document_id)
            .map(|rows| {
                let any_required = rows.iter().any(|s| s.required);
                rows.iter()
                    .any(|s| (s.required || !any_required) && !s.is_signed())
            })
            .unwrap_or(false);
        let doc = inner
            .documents
            .get_mut(&document_id)
            .ok_or_else(|| not_found("document", document_id))?;
        if outstanding || doc.status != DocumentStatus::Sent {
            return Ok(false);
        }
        doc.transition(DocumentStatus::Signed, at)
            .map_err(|e| StoreError::Conflict(e.to_string()))?;
        Ok(true)
    }

    async fn append_audit(&self, event: AuditEvent) -> StoreResult<AuditEvent> {
        let mut inner = self.guard(StoreOp::AppendAudit)?;
        let document_id = event.document_id;
        let chain = inner
            .audit
            .entry(document_id)
            .or_insert_with(|| AuditChain::new(document_id));
        Ok(chain.push(event).clone())
    }

    async fn list_audit(&self, document_id: Uuid) -> StoreResult<Vec<AuditEvent>> {
        let inner = self.guard(StoreOp::ListAudit)?;
        Ok(inner
            .audit
            .get(&document_id)
            .map(|c| c.events.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentType, ServiceType};
    use crate::signature::Provenance;

    fn draft() -> Document {
        Document::new_draft(
            "Proposal",
            DocumentType::Proposal,
            ServiceType::WebsiteOnly,
            Uuid::new_v4(),
            Utc::now(),
        )
    }

    fn capture() -> SignatureCapture {
        SignatureCapture {
            image_data_url: "data:image/png;base64,iVBORw0KGgo=".to_string(),
            signed_at: Utc::now(),
            provenance: Provenance::default(),
        }
    }

    #[tokio::test]
    async fn update_rejected_after_send() {
        let store = MemoryStore::new();
        let doc = draft();
        store.insert_document(&doc).await.unwrap();
        store
            .transition_status(doc.id, DocumentStatus::Draft, DocumentStatus::Sent, Utc::now())
            .await
            .unwrap();

        let err = store.update_document(&doc).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn transition_is_compare_and_set() {
        let store = MemoryStore::new();
        let doc = draft();
        store.insert_document(&doc).await.unwrap();
        let err = store
            .transition_status(doc.id, DocumentStatus::Sent, DocumentStatus::Signed, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn second_signature_write_rejected() {
        let store = MemoryStore::new();
        let doc = draft();
        store.insert_document(&doc).await.unwrap();
        let signer = Signature::pending(doc.id, "Ana", "ana@client.com", "Client", true, 0);
        store.replace_signers(doc.id, &[signer.clone()]).await.unwrap();

        let first = store.record_signature(signer.id, capture()).await.unwrap();
        assert!(first.is_signed());

        let err = store.record_signature(signer.id, capture()).await.unwrap_err();
        assert_eq!(err, StoreError::AlreadySigned(signer.id));
        let stored = store.get_signature(signer.id).await.unwrap();
        assert_eq!(stored.signed_at, first.signed_at);
    }

    #[tokio::test]
    async fn completion_waits_for_required_signers_only() {
        let store = MemoryStore::new();
        let doc = draft();
        store.insert_document(&doc).await.unwrap();
        let required = Signature::pending(doc.id, "Ana", "ana@client.com", "Client", true, 0);
        let optional = Signature::pending(doc.id, "Witness", "w@client.com", "Witness", false, 1);
        store
            .replace_signers(doc.id, &[required.clone(), optional])
            .await
            .unwrap();
        store
            .transition_status(doc.id, DocumentStatus::Draft, DocumentStatus::Sent, Utc::now())
            .await
            .unwrap();

        assert!(!store
            .complete_if_all_required_signed(doc.id, Utc::now())
            .await
            .unwrap());
        store.record_signature(required.id, capture()).await.unwrap();
        assert!(store
            .complete_if_all_required_signed(doc.id, Utc::now())
            .await
            .unwrap());
        // second caller loses the race
        assert!(!store
            .complete_if_all_required_signed(doc.id, Utc::now())
            .await
            .unwrap());
        assert_eq!(
            store.get_document(doc.id).await.unwrap().status,
            DocumentStatus::Signed
        );
    }

    #[tokio::test]
    async fn optional_only_documents_wait_for_everyone() {
        let store = MemoryStore::new();
        let doc = draft();
        store.insert_document(&doc).await.unwrap();
        let ana = Signature::pending(doc.id, "Ana", "ana@client.com", "Client", false, 0);
        let raj = Signature::pending(doc.id, "Raj", "raj@client.com", "Client", false, 1);
        store
            .replace_signers(doc.id, &[ana.clone(), raj.clone()])
            .await
            .unwrap();
        store
            .transition_status(doc.id, DocumentStatus::Draft, DocumentStatus::Sent, Utc::now())
            .await
            .unwrap();

        store.record_signature(ana.id, capture()).await.unwrap();
        assert!(!store
            .complete_if_all_required_signed(doc.id, Utc::now())
            .await
            .unwrap());
        store.record_signature(raj.id, capture()).await.unwrap();
        assert!(store
            .complete_if_all_required_signed(doc.id, Utc::now())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn injected_failures_surface_as_backend_errors() {
        let store = MemoryStore::new();
        store.fail_on(StoreOp::InsertDocument).unwrap();
        let err = store.insert_document(&draft()).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));

        store.clear_failures().unwrap();
        assert!(store.insert_document(&draft()).await.is_ok());
    }

    #[tokio::test]
    async fn signatures_listed_in_sort_order() {
        let store = MemoryStore::new();
        let doc = draft();
        store.insert_document(&doc).await.unwrap();
        let b = Signature::pending(doc.id, "B", "b@x.com", "Client", true, 1);
        let a = Signature::pending(doc.id, "A", "a@x.com", "Client", true, 0);
        store.replace_signers(doc.id, &[b, a]).await.unwrap();
        let names: Vec<_> = store
            .list_signatures(doc.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.signer_name)
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
