use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfExportError {
    #[error("Invalid export input: {0}")]
    InvalidInput(String),

    #[error("Failed to embed image: {0}")]
    Image(String),

    #[error("Failed to encode page content: {0}")]
    Content(String),

    #[error("Failed to write PDF: {0}")]
    Write(String),
}

impl From<lopdf::Error> for PdfExportError {
    fn from(e: lopdf::Error) -> Self {
        PdfExportError::Write(e.to_string())
    }
}
