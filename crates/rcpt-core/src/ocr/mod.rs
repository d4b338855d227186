//! OCR boundaries: the remote cloud service, the in-process engine and the
//! image normalization that feeds both.

mod cloud;
mod preprocessing;
#[cfg(feature = "native")]
mod pure_engine;

pub use cloud::HttpCloudOcr;
pub use preprocessing::TextNormalizer;
#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::{OcrError, StrategyError};

/// Bytes handed to the cloud service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPayload {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl DocumentPayload {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    pub fn pdf(data: Vec<u8>) -> Self {
        Self::new(data, "application/pdf")
    }
}

/// Cloud response mapped to generic receipt fields. Field values are the
/// provider's raw strings; they are normalized by the field rules later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudDocument {
    pub raw_text: String,
    pub vendor: Option<String>,
    pub date: Option<String>,
    pub total: Option<String>,
    pub address: Option<String>,
}

impl CloudDocument {
    /// True when the provider returned neither text nor any field.
    pub fn is_empty(&self) -> bool {
        self.raw_text.trim().is_empty()
            && self.vendor.is_none()
            && self.date.is_none()
            && self.total.is_none()
            && self.address.is_none()
    }

    /// Text to run the field rules on. Falls back to the provider fields
    /// when no free text came back.
    pub fn text(&self) -> String {
        if !self.raw_text.trim().is_empty() {
            return self.raw_text.clone();
        }
        [&self.vendor, &self.address, &self.date, &self.total]
            .into_iter()
            .flatten()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Percentage-complete updates from a long-running recognizer. Display
/// only; never consulted for control flow.
pub trait ProgressObserver: Send + Sync {
    fn progress(&self, percent: u8);
}

/// Remote, quota-limited document OCR service.
#[async_trait]
pub trait CloudOcr: Send + Sync {
    /// Whether the service is switched on.
    fn is_enabled(&self) -> bool;

    /// Whether endpoint and credentials are present.
    fn is_configured(&self) -> bool;

    /// Send one document. Every completed call counts against the quota.
    async fn analyze(
        &self,
        payload: &DocumentPayload,
        document_type: &str,
    ) -> Result<CloudDocument, StrategyError>;
}

/// In-process OCR engine.
#[async_trait]
pub trait LocalOcr: Send + Sync {
    fn is_available(&self) -> bool;

    /// Recognize the text of a normalized image, lines in reading order.
    async fn recognize(
        &self,
        image: &DynamicImage,
        progress: &dyn ProgressObserver,
    ) -> Result<String, OcrError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cloud_document_text_prefers_raw_lines() {
        let doc = CloudDocument {
            raw_text: "STARBUCKS\nTotal 6.75".to_string(),
            vendor: Some("Starbucks".to_string()),
            ..CloudDocument::default()
        };
        assert_eq!(doc.text(), "STARBUCKS\nTotal 6.75");
    }

    #[test]
    fn test_cloud_document_text_from_fields() {
        let doc = CloudDocument {
            vendor: Some("Starbucks".to_string()),
            total: Some("$6.75".to_string()),
            ..CloudDocument::default()
        };
        assert!(!doc.is_empty());
        assert_eq!(doc.text(), "Starbucks\n$6.75");
        assert!(CloudDocument::default().is_empty());
    }
}
