//! Glue between stored documents and the PDF exporter.

use chrono::{DateTime, Utc};
use shared_pdf::{ExportInput, ExportOptions, ExportedPdf, PdfExporter};
use shared_types::{
    AuditEvent, Client, CompanySettings, Document, DocumentStore, SessionContext, Signature,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::BuilderError;
use crate::placeholder::{expand, PlaceholderContext};

/// Context used when rendering a stored document: `{{DATE}}` is the day it
/// was created.
pub fn document_context(document: &Document, client: &Client) -> PlaceholderContext {
    PlaceholderContext::for_client(
        client,
        document.created_at.date_naive(),
        document.expires_at.map(|e| e.date_naive()),
    )
}

/// Expand placeholders in the title and every section and bundle the rest.
pub fn prepare_export_input(
    mut document: Document,
    client: Client,
    signatures: Vec<Signature>,
    company: CompanySettings,
    audit_events: Vec<AuditEvent>,
    generated_on: DateTime<Utc>,
) -> ExportInput {
    let ctx = document_context(&document, &client);
    document.title = expand(&document.title, &ctx);
    for section in &mut document.content.sections {
        section.title = expand(&section.title, &ctx);
        section.content = expand(&section.content, &ctx);
    }
    ExportInput {
        document,
        client,
        signatures,
        company,
        audit_events,
        generated_on,
    }
}

/// Load everything the exporter needs and render the PDF.
///
/// Staff can export any document; a client session only its own client's.
#[instrument(skip(store, session, options), fields(actor = %session.email))]
pub async fn export_document(
    store: &dyn DocumentStore,
    session: &SessionContext,
    document_id: Uuid,
    options: &ExportOptions,
    generated_on: DateTime<Utc>,
) -> Result<ExportedPdf, BuilderError> {
    let document = store.get_document(document_id).await?;
    if !session.can_author() && session.client_id != Some(document.client_id) {
        return Err(BuilderError::Forbidden(
            "clients can only export their own documents",
        ));
    }

    let client = store.get_client(document.client_id).await?;
    let signatures = store.list_signatures(document_id).await?;
    let company = store.company_settings().await?;
    let audit_events = store.list_audit(document_id).await?;

    let input = prepare_export_input(
        document,
        client,
        signatures,
        company,
        audit_events,
        generated_on,
    );
    let exported = PdfExporter::new(options).export(&input)?;

    info!(
        %document_id,
        pages = exported.pages.len(),
        bytes = exported.bytes.len(),
        file_name = %exported.file_name,
        "Document exported"
    );
    Ok(exported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared_types::{DocumentContent, DocumentType, MemoryStore, Section, ServiceType};

    fn stored(client: &Client) -> Document {
        let created = Utc.with_ymd_and_hms(2026, 3, 4, 9, 0, 0).unwrap();
        let mut doc = Document::new_draft(
            "Proposal for {{CLIENT_NAME}}",
            DocumentType::Proposal,
            ServiceType::WebsiteOnly,
            client.id,
            created,
        );
        doc.content = DocumentContent::new(vec![Section::new(
            "summary",
            "Summary",
            "<p>Prepared on {{DATE}}, valid until {{EXPIRY_DATE}}.</p>",
        )])
        .unwrap();
        doc
    }

    #[test]
    fn placeholders_are_expanded_from_the_document() {
        let client = Client::new("Acme Dental");
        let input = prepare_export_input(
            stored(&client),
            client,
            Vec::new(),
            CompanySettings::default(),
            Vec::new(),
            Utc::now(),
        );
        assert_eq!(input.document.title, "Proposal for Acme Dental");
        assert_eq!(
            input.document.content.sections[0].content,
            "<p>Prepared on March 4, 2026, valid until {{EXPIRY_DATE}}.</p>"
        );
    }

    #[tokio::test]
    async fn other_clients_cannot_export() {
        let store = MemoryStore::new();
        let client = Client::new("Acme Dental");
        store.add_client(client.clone()).unwrap();
        let doc = stored(&client);
        store.insert_document(&doc).await.unwrap();

        let stranger = SessionContext::client("eve@other.ca", Uuid::new_v4());
        let err = export_document(
            &store,
            &stranger,
            doc.id,
            &ExportOptions::default(),
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BuilderError::Forbidden(_)));

        let owner = SessionContext::client("ana@acme.ca", client.id);
        let pdf = export_document(&store, &owner, doc.id, &ExportOptions::default(), Utc::now())
            .await
            .unwrap();
        assert!(pdf.bytes.starts_with(b"%PDF"));
    }
}
