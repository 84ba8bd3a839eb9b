//! Paginated document export.
//!
//! Page order is fixed: cover, table of contents, one run of pages per
//! section, pricing (only with line items), signatures (only with signer rows)
//! and the audit summary. Body pages are laid out before the table of contents
//! is drawn, so TOC page numbers are the real start pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{
    format_currency, AuditEvent, Client, CompanySettings, Document, PricingData, Signature,
};
use tracing::{debug, info, warn};

use crate::error::PdfExportError;
use crate::filename::export_file_name;
use crate::image::{decode_data_url, DecodedImage};
use crate::layout::{PageGeometry, PageSize, Rgb, Theme};
use crate::metrics::Font;
use crate::page::{Page, PageKind};
use crate::text::{html_to_blocks, truncate_to_width, wrap, BlockKind};
use crate::writer::{write_pdf, DocInfo};

pub const PRICING_TOC_TITLE: &str = "Pricing & Investment";
pub const SIGNATURES_TOC_TITLE: &str = "Signatures";

const BODY_SIZE: f32 = 10.5;
const BODY_LEADING: f32 = 15.0;
const HEADING_SIZE: f32 = 12.0;
const HEADING_LEADING: f32 = 17.0;
const BULLET_INDENT: f32 = 12.0;
const TOC_ENTRY_HEIGHT: f32 = 22.0;
const TOC_FIRST_ENTRY: f32 = 56.0;
const SIGNATURE_CARD_HEIGHT: f32 = 128.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub page_size: PageSize,
    pub margin_mm: f32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            margin_mm: 20.0,
        }
    }
}

/// Everything the exporter reads. Section content must already have its
/// placeholders expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportInput {
    pub document: Document,
    pub client: Client,
    #[serde(default)]
    pub signatures: Vec<Signature>,
    #[serde(default)]
    pub company: CompanySettings,
    #[serde(default)]
    pub audit_events: Vec<AuditEvent>,
    /// Date printed on the cover and in the file name
    pub generated_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub title: String,
    /// 1-based page number in the final document
    pub page: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedPdf {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub pages: Vec<PageKind>,
    pub toc: Vec<TocEntry>,
}

impl ExportedPdf {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Result of the layout pass, before serialization.
#[derive(Debug, Clone)]
pub struct LaidOutDocument {
    pub pages: Vec<Page>,
    pub images: Vec<DecodedImage>,
    pub toc: Vec<TocEntry>,
}

#[derive(Debug, Clone)]
pub struct PdfExporter {
    geometry: PageGeometry,
}

impl Default for PdfExporter {
    fn default() -> Self {
        Self::new(&ExportOptions::default())
    }
}

fn long_date(at: &DateTime<Utc>) -> String {
    at.format("%B %-d, %Y").to_string()
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

impl PdfExporter {
    pub fn new(options: &ExportOptions) -> Self {
        Self {
            geometry: PageGeometry::new(options.page_size, options.margin_mm),
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Lay out and serialize the document.
    pub fn export(&self, input: &ExportInput) -> Result<ExportedPdf, PdfExportError> {
        let laid_out = self.layout(input)?;
        let doc = &input.document;
        let info = DocInfo {
            title: doc.title.clone(),
            author: input.company.company_name.clone(),
            subject: format!("{} - {}", doc.document_type.label(), doc.service_type.label()),
            created: input.generated_on,
        };
        let bytes = write_pdf(&laid_out.pages, &laid_out.images, &info)?;
        let file_name = export_file_name(&doc.title, input.generated_on.date_naive());

        info!(
            document_id = %doc.id,
            pages = laid_out.pages.len(),
            bytes = bytes.len(),
            file_name = %file_name,
            "Exported document PDF"
        );

        Ok(ExportedPdf {
            bytes,
            file_name,
            pages: laid_out.pages.iter().map(|p| p.kind.clone()).collect(),
            toc: laid_out.toc,
        })
    }

    /// Build every page without serializing.
    pub fn layout(&self, input: &ExportInput) -> Result<LaidOutDocument, PdfExportError> {
        if input.client.id != input.document.client_id {
            return Err(PdfExportError::InvalidInput(format!(
                "client {} does not own document {}",
                input.client.id, input.document.id
            )));
        }

        let theme = Theme::from_company(&input.company);
        let mut ctx = LayoutContext {
            geometry: self.geometry,
            theme,
            input,
            images: Vec::new(),
        };

        let include_pricing = !input.document.pricing.is_empty();
        let include_signatures = !input.signatures.is_empty();

        let mut toc_titles: Vec<String> = input
            .document
            .sections()
            .iter()
            .map(|s| s.title.clone())
            .collect();
        if include_pricing {
            toc_titles.push(PRICING_TOC_TITLE.to_string());
        }
        if include_signatures {
            toc_titles.push(SIGNATURES_TOC_TITLE.to_string());
        }
        let per_toc_page = self.toc_capacity();
        let toc_page_count = toc_titles.len().div_ceil(per_toc_page).max(1);
        // cover + toc pages precede the body
        let body_offset = 1 + toc_page_count as u32;

        let mut body = Flow::new(&ctx);
        let mut starts: Vec<usize> = Vec::with_capacity(toc_titles.len());

        for section in input.document.sections() {
            starts.push(body.pages.len());
            ctx.section_pages(&mut body, &section.key, &section.title, &section.content);
        }
        if include_pricing {
            starts.push(body.pages.len());
            ctx.pricing_pages(&mut body, &input.document.pricing);
        }
        if include_signatures {
            starts.push(body.pages.len());
            ctx.signature_pages(&mut body);
        }
        ctx.audit_pages(&mut body);

        let toc: Vec<TocEntry> = toc_titles
            .into_iter()
            .zip(starts)
            .map(|(title, start)| TocEntry {
                title,
                page: body_offset + start as u32 + 1,
            })
            .collect();

        let mut pages = Vec::with_capacity(1 + toc_page_count + body.pages.len());
        pages.push(ctx.cover_page());
        pages.extend(ctx.toc_pages(&toc, per_toc_page, toc_page_count));
        pages.extend(body.pages);

        let footer_title = input.document.title.clone();
        for (i, page) in pages.iter_mut().enumerate().skip(1) {
            ctx.footer(page, &footer_title, i as u32 + 1);
        }

        debug!(
            pages = pages.len(),
            toc_pages = toc_page_count,
            images = ctx.images.len(),
            "Laid out document"
        );

        Ok(LaidOutDocument {
            pages,
            images: ctx.images,
            toc,
        })
    }

    fn toc_capacity(&self) -> usize {
        let usable = self.geometry.content_bottom() - self.geometry.content_top() - TOC_FIRST_ENTRY;
        ((usable / TOC_ENTRY_HEIGHT).floor() as usize).max(1)
    }
}

/// Pages being filled top-down with automatic breaks.
struct Flow {
    pages: Vec<Page>,
    y: f32,
    kind: PageKind,
}

impl Flow {
    fn new(ctx: &LayoutContext<'_>) -> Self {
        Self {
            pages: Vec::new(),
            y: ctx.geometry.content_top(),
            kind: PageKind::Audit,
        }
    }

    fn page(&mut self) -> &mut Page {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }
}

struct LayoutContext<'a> {
    geometry: PageGeometry,
    theme: Theme,
    input: &'a ExportInput,
    images: Vec<DecodedImage>,
}

impl LayoutContext<'_> {
    // ------------------------------------------------------------------
    // Shared page furniture
    // ------------------------------------------------------------------

    fn start_page(&self, flow: &mut Flow, kind: PageKind) {
        let mut page = Page::new(kind.clone(), self.geometry);
        self.running_header(&mut page);
        flow.pages.push(page);
        flow.kind = kind;
        flow.y = self.geometry.content_top();
    }

    /// Break to a continuation page unless `needed` points still fit.
    fn ensure_space(&self, flow: &mut Flow, needed: f32) {
        if flow.pages.is_empty() || flow.y + needed > self.geometry.content_bottom() {
            let kind = flow.kind.clone();
            self.start_page(flow, kind);
        }
    }

    fn running_header(&self, page: &mut Page) {
        let g = self.geometry;
        let t = self.theme;
        page.fill_rect(0.0, 0.0, g.width, 6.0, t.primary);
        let baseline = g.margin * 0.6;
        page.text(
            g.left(),
            baseline,
            Font::Bold,
            9.0,
            t.primary,
            &self.input.company.company_name,
        );
        page.text_right(
            g.right(),
            baseline,
            Font::Regular,
            9.0,
            t.muted,
            self.input.document.document_type.label(),
        );
        page.hline(g.left(), g.right(), baseline + 8.0, 0.5, t.rule);
    }

    fn footer(&self, page: &mut Page, title: &str, number: u32) {
        let g = self.geometry;
        let suffix = format!(" | Page {}", number);
        let room = g.content_width() - Font::Regular.text_width(&suffix, 8.0);
        let text = format!(
            "{}{}",
            truncate_to_width(title, Font::Regular, 8.0, room),
            suffix
        );
        let rule_y = g.content_bottom() + 6.0;
        page.hline(g.left(), g.right(), rule_y, 0.5, self.theme.rule);
        page.text_centered(
            g.width / 2.0,
            rule_y + 12.0,
            Font::Regular,
            8.0,
            self.theme.muted,
            &text,
        );
    }

    fn page_title(&self, flow: &mut Flow, title: &str) {
        let width = self.geometry.content_width();
        for line in wrap(title, Font::Bold, 16.0, width) {
            self.ensure_space(flow, 22.0);
            let y = flow.y + 16.0;
            let left = self.geometry.left();
            flow.page()
                .text(left, y, Font::Bold, 16.0, self.theme.primary, &line);
            flow.y += 22.0;
        }
        let left = self.geometry.left();
        let y = flow.y;
        flow.page()
            .hline(left, left + 48.0, y, 2.0, self.theme.secondary);
        flow.y += 14.0;
    }

    /// Wrap and place one paragraph, breaking pages line by line.
    #[allow(clippy::too_many_arguments)]
    fn paragraph(
        &self,
        flow: &mut Flow,
        text: &str,
        font: Font,
        size: f32,
        leading: f32,
        indent: f32,
        color: Rgb,
    ) {
        let left = self.geometry.left() + indent;
        let width = self.geometry.content_width() - indent;
        for line in wrap(text, font, size, width) {
            self.ensure_space(flow, leading);
            let baseline = flow.y + size;
            flow.page().text(left, baseline, font, size, color, &line);
            flow.y += leading;
        }
    }

    // ------------------------------------------------------------------
    // Cover
    // ------------------------------------------------------------------

    fn cover_page(&self) -> Page {
        let g = self.geometry;
        let t = self.theme;
        let doc = &self.input.document;
        let company = &self.input.company;
        let client = &self.input.client;
        let mut page = Page::new(PageKind::Cover, g);

        // brand band
        page.fill_rect(0.0, 0.0, g.width, 150.0, t.primary);
        page.fill_rect(0.0, 150.0, g.width, 6.0, t.secondary);
        page.text(
            g.left(),
            g.margin + 10.0,
            Font::Bold,
            22.0,
            Rgb::WHITE,
            &company.company_name,
        );
        if let Some(address) = &company.address {
            page.text(g.left(), g.margin + 30.0, Font::Regular, 9.0, Rgb::WHITE, address);
        }
        page.text(
            g.left(),
            128.0,
            Font::Bold,
            11.0,
            Rgb::WHITE,
            &doc.document_type.label().to_uppercase(),
        );

        // title
        let mut y = 220.0;
        for line in wrap(&doc.title, Font::Bold, 26.0, g.content_width()) {
            page.text(g.left(), y, Font::Bold, 26.0, t.text, &line);
            y += 32.0;
        }
        page.text(g.left(), y, Font::Regular, 13.0, t.muted, doc.service_type.label());
        y += 36.0;

        // prepared-for panel
        let contact = client.primary_contact();
        let address_lines = client
            .address
            .as_deref()
            .map(|a| wrap(a, Font::Regular, 10.0, g.content_width() - 32.0))
            .unwrap_or_default();
        let panel_height =
            58.0 + address_lines.len() as f32 * 14.0 + if contact.is_some() { 28.0 } else { 0.0 };
        page.fill_rect(g.left(), y, g.content_width(), panel_height, t.panel);
        page.fill_rect(g.left(), y, 4.0, panel_height, t.secondary);
        let inner = g.left() + 16.0;
        page.text(inner, y + 20.0, Font::Bold, 8.0, t.muted, "PREPARED FOR");
        page.text(inner, y + 40.0, Font::Bold, 14.0, t.text, &client.company_name);
        let mut line_y = y + 56.0;
        for line in &address_lines {
            page.text(inner, line_y, Font::Regular, 10.0, t.text, line);
            line_y += 14.0;
        }
        if let Some(contact) = contact {
            line_y += 6.0;
            page.text(
                inner,
                line_y,
                Font::Regular,
                10.0,
                t.muted,
                &format!("{} <{}>", contact.name, contact.email),
            );
        }
        y += panel_height + 30.0;

        // key dates
        let mut details: Vec<(&str, String)> = vec![("Date", long_date(&self.input.generated_on))];
        if let Some(expires) = &doc.expires_at {
            details.push(("Valid until", long_date(expires)));
        }
        details.push(("Status", doc.status.label().to_string()));
        details.push(("Version", doc.version.to_string()));
        for (label, value) in details {
            page.text(g.left(), y, Font::Bold, 10.0, t.muted, label);
            page.text(g.left() + 90.0, y, Font::Regular, 10.0, t.text, &value);
            y += 18.0;
        }

        // footer band
        let band_top = g.height - 64.0;
        page.fill_rect(0.0, band_top, g.width, 64.0, t.primary);
        let contact_line = [&company.email, &company.phone, &company.website]
            .iter()
            .filter_map(|v| v.as_deref())
            .collect::<Vec<_>>()
            .join("  |  ");
        page.text(g.left(), band_top + 26.0, Font::Regular, 9.0, Rgb::WHITE, &contact_line);
        if let Some(footer) = &company.document_footer {
            let footer =
                truncate_to_width(footer, Font::Regular, 8.0, g.content_width());
            page.text(g.left(), band_top + 42.0, Font::Regular, 8.0, Rgb::WHITE, &footer);
        }

        page
    }

    // ------------------------------------------------------------------
    // Table of contents
    // ------------------------------------------------------------------

    fn toc_pages(&self, toc: &[TocEntry], per_page: usize, page_count: usize) -> Vec<Page> {
        let g = self.geometry;
        let t = self.theme;
        let mut pages = Vec::with_capacity(page_count);

        for chunk_index in 0..page_count {
            let mut page = Page::new(PageKind::TableOfContents, g);
            self.running_header(&mut page);
            let heading = if chunk_index == 0 {
                "Table of Contents"
            } else {
                "Table of Contents (continued)"
            };
            page.text(g.left(), g.content_top() + 20.0, Font::Bold, 18.0, t.primary, heading);
            page.hline(g.left(), g.left() + 48.0, g.content_top() + 30.0, 2.0, t.secondary);

            let chunk = toc.iter().skip(chunk_index * per_page).take(per_page);
            let mut y = g.content_top() + TOC_FIRST_ENTRY;
            for (offset, entry) in chunk.enumerate() {
                let number = chunk_index * per_page + offset + 1;
                let page_label = entry.page.to_string();
                let label_width = Font::Regular.text_width(&page_label, 11.0);
                let title = truncate_to_width(
                    &format!("{}. {}", number, entry.title),
                    Font::Regular,
                    11.0,
                    g.content_width() - label_width - 24.0,
                );
                page.text(g.left(), y, Font::Regular, 11.0, t.text, &title);
                page.text_right(g.right(), y, Font::Regular, 11.0, t.text, &page_label);
                page.hline(g.left(), g.right(), y + 7.0, 0.3, t.rule);
                y += TOC_ENTRY_HEIGHT;
            }
            pages.push(page);
        }
        pages
    }

    // ------------------------------------------------------------------
    // Sections
    // ------------------------------------------------------------------

    fn section_pages(&self, flow: &mut Flow, key: &str, title: &str, content: &str) {
        self.start_page(
            flow,
            PageKind::Section {
                key: key.to_string(),
            },
        );
        self.page_title(flow, title);

        for block in html_to_blocks(content) {
            match block.kind {
                BlockKind::Heading => {
                    flow.y += 4.0;
                    self.paragraph(
                        flow,
                        &block.text,
                        Font::Bold,
                        HEADING_SIZE,
                        HEADING_LEADING,
                        0.0,
                        self.theme.text,
                    );
                }
                BlockKind::Paragraph => {
                    self.paragraph(
                        flow,
                        &block.text,
                        Font::Regular,
                        BODY_SIZE,
                        BODY_LEADING,
                        0.0,
                        self.theme.text,
                    );
                    flow.y += 6.0;
                }
                BlockKind::Bullet => {
                    self.ensure_space(flow, BODY_LEADING);
                    let (left, baseline) = (self.geometry.left() + 2.0, flow.y + BODY_SIZE);
                    flow.page().text(
                        left,
                        baseline,
                        Font::Regular,
                        BODY_SIZE,
                        self.theme.secondary,
                        "•",
                    );
                    self.paragraph(
                        flow,
                        &block.text,
                        Font::Regular,
                        BODY_SIZE,
                        BODY_LEADING,
                        BULLET_INDENT,
                        self.theme.text,
                    );
                    flow.y += 2.0;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Pricing
    // ------------------------------------------------------------------

    fn pricing_header_row(&self, flow: &mut Flow, cols: &PriceColumns) {
        let g = self.geometry;
        let t = self.theme;
        let y = flow.y;
        let page = flow.page();
        page.fill_rect(g.left(), y, g.content_width(), 22.0, t.panel);
        let baseline = y + 15.0;
        page.text(g.left() + 6.0, baseline, Font::Bold, 9.5, t.text, "Description");
        page.text_right(cols.qty_right, baseline, Font::Bold, 9.5, t.text, "Qty");
        page.text_right(cols.unit_right, baseline, Font::Bold, 9.5, t.text, "Unit Price");
        page.text_right(cols.total_right, baseline, Font::Bold, 9.5, t.text, "Total");
        flow.y += 22.0;
    }

    fn pricing_pages(&self, flow: &mut Flow, pricing: &PricingData) {
        let g = self.geometry;
        let t = self.theme;
        let cols = PriceColumns::new(&g);

        self.start_page(flow, PageKind::Pricing);
        self.page_title(flow, PRICING_TOC_TITLE);
        self.pricing_header_row(flow, &cols);

        for item in &pricing.items {
            let lines = wrap(&item.description, Font::Regular, 10.0, cols.description_width);
            let row_height = lines.len().max(1) as f32 * 14.0 + 10.0;
            if flow.y + row_height > g.content_bottom() {
                self.start_page(flow, PageKind::Pricing);
                self.pricing_header_row(flow, &cols);
            }
            let top = flow.y;
            let page = flow.page();
            let mut baseline = top + 17.0;
            for line in &lines {
                page.text(g.left() + 6.0, baseline, Font::Regular, 10.0, t.text, line);
                baseline += 14.0;
            }
            let first = top + 17.0;
            page.text_right(
                cols.qty_right,
                first,
                Font::Regular,
                10.0,
                t.text,
                &trim_quantity(item.quantity),
            );
            page.text_right(
                cols.unit_right,
                first,
                Font::Regular,
                10.0,
                t.text,
                &format_currency(item.unit_price),
            );
            page.text_right(
                cols.total_right,
                first,
                Font::Regular,
                10.0,
                t.text,
                &format_currency(item.line_total()),
            );
            page.hline(g.left(), g.right(), top + row_height, 0.4, t.rule);
            flow.y += row_height;
        }

        // summary block stays together
        let summary = &pricing.summary;
        let block_height = 120.0 + if summary.tax.is_some() { 40.0 } else { 0.0 };
        self.ensure_space(flow, block_height);
        flow.y += 14.0;
        let label_x = g.left() + g.content_width() * 0.5;

        let mut y = flow.y;
        let page = flow.page();
        page.text(label_x, y + 12.0, Font::Regular, 10.0, t.text, "Subtotal");
        page.text_right(
            g.right(),
            y + 12.0,
            Font::Regular,
            10.0,
            t.text,
            &format_currency(summary.subtotal),
        );
        y += 20.0;

        if summary.discount_amount > 0.0 {
            let label = pricing
                .discount
                .map(|d| d.label())
                .unwrap_or_else(|| "Discount".to_string());
            page.text(label_x, y + 12.0, Font::Regular, 10.0, t.success, &label);
            page.text_right(
                g.right(),
                y + 12.0,
                Font::Regular,
                10.0,
                t.success,
                &format!("-{}", format_currency(summary.discount_amount)),
            );
            y += 20.0;
        }

        y += 6.0;
        page.fill_rect(label_x - 8.0, y, g.right() - label_x + 8.0, 28.0, t.primary);
        page.text(label_x, y + 18.5, Font::Bold, 12.0, Rgb::WHITE, "Total");
        page.text_right(
            g.right() - 8.0,
            y + 18.5,
            Font::Bold,
            12.0,
            Rgb::WHITE,
            &format_currency(summary.total),
        );
        y += 36.0;

        if let Some(tax) = &summary.tax {
            page.text(label_x, y + 12.0, Font::Regular, 10.0, t.muted, &tax.label);
            page.text_right(
                g.right(),
                y + 12.0,
                Font::Regular,
                10.0,
                t.muted,
                &format_currency(tax.amount),
            );
            y += 20.0;
            page.text(label_x, y + 12.0, Font::Bold, 10.0, t.text, "Total with tax");
            page.text_right(
                g.right(),
                y + 12.0,
                Font::Bold,
                10.0,
                t.text,
                &format_currency(summary.grand_total()),
            );
            y += 20.0;
        }
        flow.y = y;
    }

    // ------------------------------------------------------------------
    // Signatures
    // ------------------------------------------------------------------

    fn signature_pages(&mut self, flow: &mut Flow) {
        let g = self.geometry;
        let t = self.theme;
        let input = self.input;

        self.start_page(flow, PageKind::Signatures);
        self.page_title(flow, "Signatures");
        let intro = format!(
            "By signing below, the parties agree to the terms of this {}.",
            input.document.document_type.label().to_lowercase()
        );
        self.paragraph(flow, &intro, Font::Regular, BODY_SIZE, BODY_LEADING, 0.0, t.muted);
        flow.y += 10.0;

        for signature in &input.signatures {
            let image_index = self.signature_image(signature);
            self.ensure_space(flow, SIGNATURE_CARD_HEIGHT + 12.0);
            let top = flow.y;
            let inner = g.left() + 14.0;
            let text_width = g.content_width() * 0.5;
            let page = flow.page();

            page.stroke_rect(g.left(), top, g.content_width(), SIGNATURE_CARD_HEIGHT, 0.8, t.rule);
            page.text(
                inner,
                top + 20.0,
                Font::Bold,
                8.0,
                t.muted,
                &signature.signer_role.to_uppercase(),
            );
            page.text(
                inner,
                top + 38.0,
                Font::Bold,
                12.0,
                t.text,
                &truncate_to_width(&signature.signer_name, Font::Bold, 12.0, text_width),
            );
            page.text(
                inner,
                top + 52.0,
                Font::Regular,
                9.5,
                t.muted,
                &truncate_to_width(&signature.signer_email, Font::Regular, 9.5, text_width),
            );

            match signature.signed_at.filter(|_| signature.is_signed()) {
                Some(signed_at) => {
                    page.text(
                        inner,
                        top + 74.0,
                        Font::Bold,
                        9.5,
                        t.success,
                        &format!("Signed on {}", timestamp(&signed_at)),
                    );
                    let mut detail_y = top + 90.0;
                    if let Some(ip) = &signature.ip_address {
                        page.text(inner, detail_y, Font::Regular, 8.5, t.muted, &format!("IP: {}", ip));
                        detail_y += 13.0;
                    }
                    if let Some(place) = signature.location.as_ref().and_then(|l| l.display()) {
                        page.text(
                            inner,
                            detail_y,
                            Font::Regular,
                            8.5,
                            t.muted,
                            &truncate_to_width(
                                &format!("Location: {}", place),
                                Font::Regular,
                                8.5,
                                text_width,
                            ),
                        );
                    }
                }
                None => {
                    page.text(inner, top + 74.0, Font::Bold, 9.5, t.warning, "Pending signature");
                }
            }

            // signature box on the right half
            let box_left = g.left() + g.content_width() * 0.55;
            let box_width = g.right() - 14.0 - box_left;
            let box_height = 70.0;
            let box_top = top + 18.0;
            if let Some(index) = image_index {
                let ratio = self.images[index].aspect_ratio();
                let (mut w, mut h) = (box_width, box_width / ratio);
                if h > box_height {
                    h = box_height;
                    w = h * ratio;
                }
                page.image(index, box_left, box_top + (box_height - h), w, h);
            }
            page.hline(box_left, box_left + box_width, box_top + box_height + 4.0, 0.8, t.text);
            page.text(
                box_left,
                box_top + box_height + 18.0,
                Font::Regular,
                8.0,
                t.muted,
                "Signature",
            );

            flow.y += SIGNATURE_CARD_HEIGHT + 12.0;
        }
    }

    /// Decode a signed row's image once; failures degrade to a text-only card.
    fn signature_image(&mut self, signature: &Signature) -> Option<usize> {
        if !signature.is_signed() {
            return None;
        }
        let url = signature.signature_image.as_deref()?;
        match decode_data_url(url) {
            Ok(image) => {
                self.images.push(image);
                Some(self.images.len() - 1)
            }
            Err(e) => {
                warn!(signature_id = %signature.id, error = %e, "Skipping undecodable signature image");
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Audit summary
    // ------------------------------------------------------------------

    fn audit_pages(&self, flow: &mut Flow) {
        let g = self.geometry;
        let t = self.theme;
        let doc = &self.input.document;

        self.start_page(flow, PageKind::Audit);
        self.page_title(flow, "Document Audit Trail");

        let rows = [
            ("Document ID", doc.id.to_string()),
            ("Created", timestamp(&doc.created_at)),
            ("Last updated", timestamp(&doc.updated_at)),
            ("Version", doc.version.to_string()),
            ("Status", doc.status.label().to_string()),
            (
                "Compliance confirmed",
                if doc.compliance_confirmed { "Yes" } else { "No" }.to_string(),
            ),
            (
                "Sent",
                doc.sent_at
                    .as_ref()
                    .map(timestamp)
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ];
        for (label, value) in rows {
            self.ensure_space(flow, 18.0);
            let y = flow.y + 12.0;
            let page = flow.page();
            page.text(g.left(), y, Font::Bold, 9.5, t.muted, label);
            page.text(g.left() + 130.0, y, Font::Regular, 9.5, t.text, &value);
            flow.y += 18.0;
        }

        flow.y += 12.0;
        self.paragraph(flow, "Signing Events", Font::Bold, HEADING_SIZE, HEADING_LEADING, 0.0, t.primary);

        if self.input.audit_events.is_empty() {
            self.paragraph(
                flow,
                "No signing events recorded.",
                Font::Regular,
                9.5,
                14.0,
                0.0,
                t.muted,
            );
            return;
        }

        let widths = [0.26, 0.14, 0.38, 0.22].map(|f| f * g.content_width());
        let mut xs = [g.left(); 4];
        for i in 1..4 {
            xs[i] = xs[i - 1] + widths[i - 1];
        }
        let header = ["Date", "Action", "Actor", "IP Address"];
        let draw_header = |flow: &mut Flow| {
            let y = flow.y;
            let page = flow.page();
            page.fill_rect(g.left(), y, g.content_width(), 18.0, t.panel);
            for (x, label) in xs.iter().zip(header) {
                page.text(x + 4.0, y + 12.5, Font::Bold, 8.5, t.text, label);
            }
            flow.y += 18.0;
        };

        self.ensure_space(flow, 36.0);
        draw_header(flow);
        for event in &self.input.audit_events {
            if flow.y + 16.0 > g.content_bottom() {
                self.start_page(flow, PageKind::Audit);
                draw_header(flow);
            }
            let cells = [
                timestamp(&event.timestamp),
                event.action.as_str().to_string(),
                event.actor_email.clone(),
                event.ip_address.clone().unwrap_or_else(|| "-".to_string()),
            ];
            let y = flow.y + 11.5;
            let row_bottom = flow.y + 16.0;
            let page = flow.page();
            for ((x, width), cell) in xs.iter().zip(widths).zip(cells) {
                let cell = truncate_to_width(&cell, Font::Regular, 8.5, width - 8.0);
                page.text(x + 4.0, y, Font::Regular, 8.5, t.text, &cell);
            }
            page.hline(g.left(), g.right(), row_bottom, 0.3, t.rule);
            flow.y += 16.0;
        }
    }
}

struct PriceColumns {
    description_width: f32,
    qty_right: f32,
    unit_right: f32,
    total_right: f32,
}

impl PriceColumns {
    fn new(g: &PageGeometry) -> Self {
        let total_right = g.right() - 6.0;
        let unit_right = total_right - 90.0;
        let qty_right = unit_right - 90.0;
        Self {
            description_width: qty_right - 50.0 - (g.left() + 6.0),
            qty_right,
            unit_right,
            total_right,
        }
    }
}

fn trim_quantity(q: f64) -> String {
    if q.fract() == 0.0 {
        format!("{}", q as i64)
    } else {
        format!("{:.2}", q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use shared_types::{
        AuditAction, DiscountSpec, DocumentContent, DocumentType, PricingLineItem,
        PricingSummary, Section, ServiceType,
    };

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 7, 9, 30, 0).unwrap()
    }

    fn input_with(sections: Vec<Section>) -> ExportInput {
        let client = Client::new("Acme Corp");
        let mut document = Document::new_draft(
            "Website Proposal for Acme Corp",
            DocumentType::Proposal,
            ServiceType::WebsiteOnly,
            client.id,
            at(),
        );
        document.content = DocumentContent::new(sections).unwrap();
        ExportInput {
            document,
            client,
            signatures: Vec::new(),
            company: CompanySettings::default(),
            audit_events: Vec::new(),
            generated_on: at(),
        }
    }

    fn sections(n: usize) -> Vec<Section> {
        (0..n)
            .map(|i| {
                let mut s = Section::new(
                    format!("s{}", i),
                    format!("Section {}", i + 1),
                    "<p>Short body.</p>",
                );
                s.sort_order = i as u32;
                s
            })
            .collect()
    }

    #[test]
    fn three_sections_no_pricing() {
        let input = input_with(sections(3));
        let laid = PdfExporter::default().layout(&input).unwrap();

        let kinds: Vec<PageKind> = laid.pages.iter().map(|p| p.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                PageKind::Cover,
                PageKind::TableOfContents,
                PageKind::Section { key: "s0".into() },
                PageKind::Section { key: "s1".into() },
                PageKind::Section { key: "s2".into() },
                PageKind::Audit,
            ]
        );
        assert_eq!(
            laid.toc,
            vec![
                TocEntry { title: "Section 1".into(), page: 3 },
                TocEntry { title: "Section 2".into(), page: 4 },
                TocEntry { title: "Section 3".into(), page: 5 },
            ]
        );
    }

    #[test]
    fn toc_numbers_follow_page_breaks() {
        let long = (0..400).map(|i| format!("<p>Paragraph {} with some words in it.</p>", i)).collect::<String>();
        let mut secs = sections(2);
        secs[0].content = long;
        let input = input_with(secs);
        let laid = PdfExporter::default().layout(&input).unwrap();

        for entry in &laid.toc {
            let page = &laid.pages[entry.page as usize - 1];
            assert!(
                page.texts().contains(&entry.title.as_str()),
                "page {} should open '{}'",
                entry.page,
                entry.title
            );
        }
        assert!(laid.toc[1].page > laid.toc[0].page + 1);
    }

    #[test]
    fn pricing_page_present_with_items() {
        let mut input = input_with(sections(1));
        input.document.pricing = PricingData::new(
            vec![
                PricingLineItem::new("1", "Design", 1.0, 100.0),
                PricingLineItem::new("2", "Build", 2.0, 50.0),
                PricingLineItem::new("3", "Hosting", 4.0, 25.0),
            ],
            Some(DiscountSpec::percentage(10.0)),
            PricingSummary {
                subtotal: 300.0,
                discount_amount: 30.0,
                total: 270.0,
                tax: None,
            },
        )
        .unwrap();
        let laid = PdfExporter::default().layout(&input).unwrap();
        let pricing = laid
            .pages
            .iter()
            .find(|p| p.kind == PageKind::Pricing)
            .expect("pricing page");
        let texts = pricing.texts();
        assert!(texts.contains(&"-$30.00"));
        assert!(texts.contains(&"$270.00"));
        assert!(texts.contains(&"Discount (10%)"));
        assert_eq!(laid.toc.last().unwrap().title, PRICING_TOC_TITLE);
    }

    #[test]
    fn signature_cards_show_status() {
        let mut input = input_with(sections(1));
        let doc_id = input.document.id;
        let mut signed = Signature::pending(doc_id, "Ana Client", "ana@acme.com", "Client", true, 0);
        signed.signed_at = Some(at());
        signed.signature_image = Some("data:image/png;base64,not-really".into());
        signed.ip_address = Some("203.0.113.9".into());
        let pending = Signature::pending(doc_id, "Sam Staff", "sam@cipherx.ca", "Company", true, 1);
        input.signatures = vec![signed, pending];

        let laid = PdfExporter::default().layout(&input).unwrap();
        let page = laid
            .pages
            .iter()
            .find(|p| p.kind == PageKind::Signatures)
            .unwrap();
        let texts = page.texts();
        assert!(texts.iter().any(|t| t.starts_with("Signed on 2025-03-07")));
        assert!(texts.contains(&"Pending signature"));
        assert!(texts.contains(&"IP: 203.0.113.9"));
        // bad image degrades to text only
        assert_eq!(page.image_count(), 0);
        assert!(laid.images.is_empty());
    }

    #[test]
    fn signed_image_is_embedded() {
        use base64::{engine::general_purpose::STANDARD, Engine as _};

        let mut input = input_with(sections(1));
        let png = crate::image::encode_test_png(4, 2, &[0u8; 4 * 2 * 4]);
        let mut signed =
            Signature::pending(input.document.id, "Ana", "ana@acme.com", "Client", true, 0);
        signed.signed_at = Some(at());
        signed.signature_image = Some(format!("data:image/png;base64,{}", STANDARD.encode(png)));
        input.signatures = vec![signed];

        let exporter = PdfExporter::default();
        let laid = exporter.layout(&input).unwrap();
        assert_eq!(laid.images.len(), 1);
        let page = laid
            .pages
            .iter()
            .find(|p| p.kind == PageKind::Signatures)
            .unwrap();
        assert_eq!(page.image_count(), 1);
        assert!(exporter.export(&input).is_ok());
    }

    #[test]
    fn footer_on_every_page_but_cover() {
        let input = input_with(sections(2));
        let laid = PdfExporter::default().layout(&input).unwrap();
        assert!(!laid.pages[0].texts().iter().any(|t| t.contains("| Page")));
        for (i, page) in laid.pages.iter().enumerate().skip(1) {
            let expected = format!("Website Proposal for Acme Corp | Page {}", i + 1);
            assert!(page.texts().contains(&expected.as_str()));
        }
    }

    #[test]
    fn audit_events_listed() {
        let mut input = input_with(sections(1));
        input.audit_events = vec![AuditEvent::new(
            input.document.id,
            AuditAction::Sent,
            "sam@cipherx.ca",
            at(),
        )];
        let laid = PdfExporter::default().layout(&input).unwrap();
        let audit = laid.pages.last().unwrap();
        assert_eq!(audit.kind, PageKind::Audit);
        assert!(audit.texts().contains(&"sent"));
        assert!(audit.texts().contains(&"sam@cipherx.ca"));
    }

    #[test]
    fn mismatched_client_rejected() {
        let mut input = input_with(sections(1));
        input.client = Client::new("Someone Else");
        assert!(matches!(
            PdfExporter::default().layout(&input),
            Err(PdfExportError::InvalidInput(_))
        ));
    }

    #[test]
    fn export_names_file_and_is_deterministic() {
        let input = input_with(sections(2));
        let exporter = PdfExporter::default();
        let a = exporter.export(&input).unwrap();
        let b = exporter.export(&input).unwrap();
        assert_eq!(a.file_name, "Website_Proposal_for_Acme_Corp_2025-03-07.pdf");
        assert_eq!(a.bytes, b.bytes);
        let parsed = lopdf::Document::load_mem(&a.bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), a.page_count());
    }
}
