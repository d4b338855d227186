//! HTTP client for the cloud document OCR service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{CloudDocument, CloudOcr, DocumentPayload};
use crate::error::StrategyError;
use crate::models::config::CloudOcrConfig;

/// Cloud OCR over a JSON analyze endpoint with bearer authentication.
pub struct HttpCloudOcr {
    enabled: bool,
    endpoint: Option<String>,
    api_key: Option<String>,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpCloudOcr {
    pub fn new(endpoint: Option<String>, api_key: Option<String>) -> Self {
        Self {
            enabled: true,
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client: reqwest::Client::new(),
            timeout_secs: 60,
        }
    }

    /// Build from configuration, reading the key from the environment.
    pub fn from_config(config: &CloudOcrConfig) -> Self {
        Self {
            enabled: config.enabled,
            timeout_secs: config.timeout_secs,
            ..Self::new(config.endpoint.clone(), config.api_key())
        }
    }
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    document: String,
    mime_type: &'a str,
    document_type: &'a str,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    summary_fields: Vec<SummaryField>,
    #[serde(default)]
    lines: Vec<String>,
}

#[derive(Deserialize)]
struct SummaryField {
    #[serde(rename = "type")]
    field_type: String,
    #[serde(default)]
    value: String,
}

impl AnalyzeResponse {
    /// First non-blank value among the given field types, in order.
    fn field(&self, types: &[&str]) -> Option<String> {
        types.iter().find_map(|t| {
            self.summary_fields
                .iter()
                .find(|f| f.field_type.eq_ignore_ascii_case(t) && !f.value.trim().is_empty())
                .map(|f| f.value.trim().to_string())
        })
    }

    fn into_document(self) -> CloudDocument {
        CloudDocument {
            vendor: self.field(&["VENDOR_NAME"]),
            date: self.field(&["INVOICE_RECEIPT_DATE"]),
            total: self.field(&["TOTAL", "AMOUNT_PAID"]),
            address: self.field(&["VENDOR_ADDRESS", "ADDRESS"]),
            raw_text: self.lines.join("\n"),
        }
    }
}

#[async_trait]
impl CloudOcr for HttpCloudOcr {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_configured(&self) -> bool {
        self.endpoint.is_some() && self.api_key.is_some()
    }

    async fn analyze(
        &self,
        payload: &DocumentPayload,
        document_type: &str,
    ) -> Result<CloudDocument, StrategyError> {
        let (Some(endpoint), Some(api_key)) = (&self.endpoint, &self.api_key) else {
            return Err(StrategyError::Configuration(
                "cloud OCR endpoint or API key missing".to_string(),
            ));
        };

        use base64::Engine;
        let request = AnalyzeRequest {
            document: base64::engine::general_purpose::STANDARD.encode(&payload.data),
            mime_type: &payload.mime_type,
            document_type,
        };

        debug!(
            "Sending {} bytes ({}) to cloud OCR",
            payload.data.len(),
            payload.mime_type
        );

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .timeout(Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| StrategyError::Transport(format!("cloud OCR request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StrategyError::Configuration(format!(
                "cloud OCR rejected credentials ({})",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StrategyError::Transport(format!(
                "cloud OCR returned {}: {}",
                status, body
            )));
        }

        let result: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| StrategyError::Decode(format!("failed to parse cloud OCR response: {}", e)))?;

        let document = result.into_document();
        if document.is_empty() {
            return Err(StrategyError::EmptyResult);
        }

        info!(
            "Cloud OCR returned {} chars of text",
            document.raw_text.len()
        );
        Ok(document)
    }
}
