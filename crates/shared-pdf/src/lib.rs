//! PDF export for builder documents.
//!
//! Layout happens in top-down page coordinates over the two standard
//! Helvetica faces, then `writer` serializes the pages with lopdf. No fonts
//! are embedded; text is encoded as WinAnsi.

pub mod error;
pub mod export;
pub mod filename;
pub mod image;
pub mod layout;
pub mod metrics;
pub mod page;
pub mod text;
pub mod writer;

pub use error::PdfExportError;
pub use export::{
    ExportInput, ExportOptions, ExportedPdf, LaidOutDocument, PdfExporter, TocEntry,
    PRICING_TOC_TITLE, SIGNATURES_TOC_TITLE,
};
pub use filename::export_file_name;
pub use layout::{parse_hex_color, PageGeometry, PageSize, Rgb, Theme};
pub use metrics::Font;
pub use page::{DrawOp, Page, PageKind};
