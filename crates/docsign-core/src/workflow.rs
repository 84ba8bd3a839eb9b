//! Dispatch, view tracking and signing against a `DocumentStore`.

use chrono::{DateTime, Utc};
use shared_types::{
    AuditAction, AuditEvent, Document, DocumentStatus, DocumentStore, SessionContext, Signature,
    SignatureCapture,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::SigningError;
use crate::pad::SignaturePad;
use crate::provenance::ProvenanceCollector;
use crate::validate::decode_signature_data_url;

/// What the signer submits.
#[derive(Debug, Clone, PartialEq)]
pub struct SignRequest {
    pub signature_id: Uuid,
    /// PNG data URL; `None` when nothing was drawn
    pub image_data_url: Option<String>,
    /// The "I agree to sign electronically" checkbox
    pub agreed: bool,
    pub user_agent: Option<String>,
}

impl SignRequest {
    /// Build a request from the current pad contents. The pad is only read.
    pub fn from_pad(
        signature_id: Uuid,
        pad: &SignaturePad,
        agreed: bool,
        user_agent: Option<String>,
    ) -> Result<Self, SigningError> {
        Ok(Self {
            signature_id,
            image_data_url: pad.export_data_url()?,
            agreed,
            user_agent,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignOutcome {
    pub signature: Signature,
    /// True when this signature was the last required one
    pub document_completed: bool,
}

#[derive(Debug, Clone)]
pub struct SigningWorkflow {
    provenance: ProvenanceCollector,
    clock: fn() -> DateTime<Utc>,
}

impl Default for SigningWorkflow {
    fn default() -> Self {
        Self::new(ProvenanceCollector::disabled())
    }
}

impl SigningWorkflow {
    pub fn new(provenance: ProvenanceCollector) -> Self {
        Self {
            provenance,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Draft -> Sent. Requires an author session and at least one signer.
    #[instrument(skip(self, store, session), fields(actor = %session.email))]
    pub async fn dispatch(
        &self,
        store: &dyn DocumentStore,
        session: &SessionContext,
        document_id: Uuid,
    ) -> Result<Document, SigningError> {
        if !session.can_author() {
            return Err(SigningError::Forbidden("only staff can send documents"));
        }
        let doc = store.get_document(document_id).await?;
        if doc.status != DocumentStatus::Draft {
            return Err(SigningError::InvalidStatus {
                expected: DocumentStatus::Draft,
                actual: doc.status,
            });
        }
        let signers = store.list_signatures(document_id).await?;
        if signers.is_empty() {
            return Err(SigningError::NoSigners);
        }

        let now = (self.clock)();
        let sent = store
            .transition_status(document_id, DocumentStatus::Draft, DocumentStatus::Sent, now)
            .await?;
        store
            .append_audit(
                AuditEvent::new(document_id, AuditAction::Sent, &session.email, now)
                    .with_details(format!("Sent to {} signer(s)", signers.len())),
            )
            .await?;

        info!(%document_id, signers = signers.len(), "Document sent for signature");
        Ok(sent)
    }

    /// Log that `session` opened the document. Failures are logged, not raised.
    #[instrument(skip(self, store, session), fields(actor = %session.email))]
    pub async fn record_view(
        &self,
        store: &dyn DocumentStore,
        session: &SessionContext,
        document_id: Uuid,
    ) -> Option<AuditEvent> {
        let event = AuditEvent::new(
            document_id,
            AuditAction::Viewed,
            &session.email,
            (self.clock)(),
        );
        match store.append_audit(event).await {
            Ok(stored) => Some(stored),
            Err(e) => {
                warn!(%document_id, error = %e, "Could not record document view");
                None
            }
        }
    }

    /// Record one signer's signature and complete the document if it was
    /// the last required one.
    ///
    /// Writes are not rolled back: an error after the signature row was
    /// written leaves it signed, and the same signer retrying restores the
    /// missing audit event and re-runs completion.
    #[instrument(
        skip(self, store, session, request),
        fields(actor = %session.email, signature_id = %request.signature_id)
    )]
    pub async fn sign(
        &self,
        store: &dyn DocumentStore,
        session: &SessionContext,
        request: SignRequest,
    ) -> Result<SignOutcome, SigningError> {
        let image = request
            .image_data_url
            .filter(|url| !url.trim().is_empty())
            .ok_or(SigningError::EmptySignature)?;
        decode_signature_data_url(&image).map_err(SigningError::InvalidImage)?;
        if !request.agreed {
            return Err(SigningError::AgreementRequired);
        }

        let row = store.get_signature(request.signature_id).await?;
        if !row.email_matches(&session.email) {
            return Err(SigningError::SignerMismatch);
        }
        let doc = store.get_document(row.document_id).await?;
        if row.signed_at.is_some() || row.signature_image.is_some() {
            return self.resume_signed(store, session, &doc, row).await;
        }
        if doc.status != DocumentStatus::Sent {
            return Err(SigningError::InvalidStatus {
                expected: DocumentStatus::Sent,
                actual: doc.status,
            });
        }

        let provenance = self.provenance.collect(request.user_agent.as_deref()).await;
        let now = (self.clock)();
        let signature = store
            .record_signature(
                row.id,
                SignatureCapture {
                    image_data_url: image,
                    signed_at: now,
                    provenance: provenance.clone(),
                },
            )
            .await?;
        info!(document_id = %doc.id, signer = %signature.signer_name, "Signature recorded");

        let audited = store
            .append_audit(
                AuditEvent::new(doc.id, AuditAction::Signed, &session.email, now)
                    .with_signature(signature.id)
                    .with_provenance(&provenance),
            )
            .await;
        if let Err(e) = &audited {
            warn!(document_id = %doc.id, error = %e, "Could not append signed audit event");
        }

        // completion runs even when the audit write failed
        let document_completed = self.complete(store, doc.id, &session.email, now).await?;
        audited?;

        Ok(SignOutcome {
            signature,
            document_completed,
        })
    }

    /// Retry of a signature whose row was written by an earlier attempt.
    /// Fills in a missing `signed` audit event and re-runs completion; only
    /// a retry that completes the document succeeds.
    async fn resume_signed(
        &self,
        store: &dyn DocumentStore,
        session: &SessionContext,
        doc: &Document,
        row: Signature,
    ) -> Result<SignOutcome, SigningError> {
        if !matches!(doc.status, DocumentStatus::Sent | DocumentStatus::Signed) {
            return Err(SigningError::AlreadySigned);
        }
        let events = store.list_audit(doc.id).await?;
        let audited = events
            .iter()
            .any(|e| e.action == AuditAction::Signed && e.signature_id == Some(row.id));
        if !audited {
            let at = row.signed_at.unwrap_or_else(self.clock);
            store
                .append_audit(
                    AuditEvent::new(doc.id, AuditAction::Signed, &session.email, at)
                        .with_signature(row.id)
                        .with_provenance(&row.provenance()),
                )
                .await?;
            info!(document_id = %doc.id, signature_id = %row.id, "Restored missing signed audit event");
        }

        let now = (self.clock)();
        let document_completed = match doc.status {
            DocumentStatus::Sent => self.complete(store, doc.id, &session.email, now).await?,
            _ => {
                if !events.iter().any(|e| e.action == AuditAction::Completed) {
                    store.append_audit(completed_event(doc.id, &session.email, now)).await?;
                }
                false
            }
        };
        if document_completed {
            Ok(SignOutcome {
                signature: row,
                document_completed,
            })
        } else {
            Err(SigningError::AlreadySigned)
        }
    }

    /// Sent -> Signed once no required signature is outstanding.
    async fn complete(
        &self,
        store: &dyn DocumentStore,
        document_id: Uuid,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, SigningError> {
        let completed = store.complete_if_all_required_signed(document_id, now).await?;
        if completed {
            store
                .append_audit(completed_event(document_id, actor, now))
                .await?;
            info!(%document_id, "Document fully signed");
        }
        Ok(completed)
    }
}

fn completed_event(document_id: Uuid, actor: &str, at: DateTime<Utc>) -> AuditEvent {
    AuditEvent::new(document_id, AuditAction::Completed, actor, at)
        .with_details("All required signatures collected")
}
