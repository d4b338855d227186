//! Receipt suggestion data model.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Declared media kind of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Pdf,
}

impl MediaKind {
    /// Guess the media kind from a file extension. Anything that is not a
    /// PDF is treated as an image.
    pub fn from_path(path: &std::path::Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext == "pdf" { MediaKind::Pdf } else { MediaKind::Image }
    }
}

/// User-selected provider mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMode {
    #[default]
    Auto,
    ForceLocal,
    ForceCloud,
}

/// Monotonically increasing token identifying one user-initiated upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestToken(pub u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One pipeline run request. Immutable once issued; superseded as soon as
/// a newer token exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// File to extract from.
    pub file: PathBuf,
    /// Declared media kind.
    pub media: MediaKind,
    /// Token binding every side effect of this run.
    pub token: RequestToken,
    /// Provider mode.
    pub mode: ExtractionMode,
}

/// Structured fields suggested for a receipt.
///
/// Never constructed empty: see [`OcrSuggestion::from_parts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrSuggestion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,
}

impl OcrSuggestion {
    /// Build a suggestion, returning `None` when every field is absent.
    pub fn from_parts(
        date: Option<NaiveDate>,
        vendor: Option<String>,
        location: Option<String>,
        total: Option<Decimal>,
    ) -> Option<Self> {
        let vendor = vendor.filter(|v| !v.trim().is_empty());
        let location = location.filter(|l| !l.trim().is_empty());
        let total = total.filter(|t| !t.is_sign_negative());

        if date.is_none() && vendor.is_none() && location.is_none() && total.is_none() {
            return None;
        }

        Some(Self {
            date,
            vendor,
            location,
            total,
        })
    }

    /// Date formatted as `YYYY-MM-DD`.
    pub fn date_string(&self) -> Option<String> {
        self.date.map(|d| d.format("%Y-%m-%d").to_string())
    }
}

/// Extraction strategy (provider) that produced or was asked to produce text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    PdfText,
    CloudOcr,
    LocalOcr,
    None,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::PdfText => "pdf-text",
            Provider::CloudOcr => "cloud-ocr",
            Provider::LocalOcr => "local-ocr",
            Provider::None => "none",
        };
        f.write_str(name)
    }
}

/// A provider choice with a human-readable reason. The reason is for
/// status reporting only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDecision {
    pub provider: Provider,
    pub reason: String,
}

impl ProviderDecision {
    pub fn new(provider: Provider, reason: impl Into<String>) -> Self {
        Self {
            provider,
            reason: reason.into(),
        }
    }
}
