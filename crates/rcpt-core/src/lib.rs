//! Core library for receipt OCR suggestions.
//!
//! This crate provides:
//! - provider orchestration (PDF text layer, cloud OCR, local OCR) with
//!   request-token supersession
//! - a persistent monthly quota for the cloud service
//! - image normalization for OCR
//! - receipt field extraction (date, total, vendor, location) and
//!   category inference
//! - vendor memory that learns from confirmed suggestions

pub mod error;
pub mod memory;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod quota;
pub mod receipt;

pub use error::{OcrError, PdfError, RcptError, Result, StoreError, StrategyError};
pub use memory::{JsonVendorStore, VendorMemory, VendorMemoryEntry, VendorStore};
pub use models::config::RcptConfig;
pub use models::receipt::{
    ExtractionMode, ExtractionRequest, MediaKind, OcrSuggestion, Provider, ProviderDecision,
    RequestToken,
};
pub use ocr::{CloudOcr, HttpCloudOcr, LocalOcr, TextNormalizer};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use pdf::PdfExtractor;
pub use pipeline::{Blocker, Pipeline, PipelineBuilder, PipelineResult, RunOutcome, StatusSink};
pub use quota::{JsonQuotaStore, QuotaState, QuotaStore, QuotaTracker};
pub use receipt::{ReceiptParser, VendorSource};
