//! Error types for the rcpt-core library.

use thiserror::Error;

/// Main error type for the rcpt library.
#[derive(Error, Debug)]
pub enum RcptError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Quota or vendor memory persistence error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed or serialized.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to OCR engines.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors from the quota and vendor memory persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file could not be (de)serialized.
    #[error("store data is invalid: {0}")]
    Serde(#[from] serde_json::Error),

    /// The store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Failure of a single extraction strategy attempt.
///
/// These never escape the orchestrator: each one either advances the
/// fallback chain or becomes the reported blocking reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    /// The provider is not configured (or disabled) until an admin acts.
    #[error("not configured: {0}")]
    Configuration(String),

    /// The monthly cloud OCR budget is spent.
    #[error("monthly quota reached ({used}/{limit})")]
    QuotaExceeded { used: u32, limit: u32 },

    /// Network or I/O failure on an external call.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The payload could not be decoded (image or PDF).
    #[error("decode failure: {0}")]
    Decode(String),

    /// The call succeeded but produced no usable text.
    #[error("no text extracted")]
    EmptyResult,

    /// The requested mode cannot handle this input.
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),
}

impl From<PdfError> for StrategyError {
    fn from(err: PdfError) -> Self {
        match err {
            PdfError::NoPages => StrategyError::EmptyResult,
            other => StrategyError::Decode(other.to_string()),
        }
    }
}

impl From<OcrError> for StrategyError {
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::ModelLoad(msg) => StrategyError::Configuration(msg),
            OcrError::InvalidImage(msg) => StrategyError::Decode(msg),
            OcrError::Recognition(msg) => StrategyError::Transport(msg),
        }
    }
}

/// Result type for the rcpt library.
pub type Result<T> = std::result::Result<T, RcptError>;
