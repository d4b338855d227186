//! Configuration structures for the suggestion pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::RcptError;

/// Main configuration for the rcpt pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RcptConfig {
    /// Cloud OCR service configuration.
    pub cloud: CloudOcrConfig,

    /// Local OCR engine configuration.
    pub local: LocalOcrConfig,

    /// PDF text-layer configuration.
    pub pdf: PdfConfig,

    /// Image normalization before recognition.
    pub normalizer: NormalizerConfig,

    /// Where quota and vendor memory files live.
    pub storage: StorageConfig,
}

/// Cloud OCR service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudOcrConfig {
    /// Master switch for the cloud service.
    pub enabled: bool,

    /// Analyze endpoint URL. The service counts as not configured without it.
    pub endpoint: Option<String>,

    /// Name of the environment variable holding the API key.
    pub api_key_env: String,

    /// Monthly call budget (0 = unlimited).
    pub monthly_limit: u32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Document-type hint sent with each request.
    pub document_type: String,
}

impl Default for CloudOcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
            api_key_env: "RCPT_CLOUD_OCR_KEY".to_string(),
            monthly_limit: 100,
            timeout_secs: 60,
            document_type: "receipt".to_string(),
        }
    }
}

impl CloudOcrConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// Local OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalOcrConfig {
    /// Allow the local engine to run.
    pub enabled: bool,

    /// Directory containing `det.onnx`, `latin_rec.onnx` and `latin_dict.txt`.
    pub model_dir: PathBuf,

    /// Keep `[UNK]` tokens in recognized text instead of replacing them.
    pub keep_unk: bool,
}

impl Default for LocalOcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_dir: PathBuf::from("models"),
            keep_unk: false,
        }
    }
}

/// PDF text-layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Extract embedded text from PDFs.
    pub text_layer: bool,

    /// Maximum pages to read (0 = unlimited).
    pub max_pages: u32,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            text_layer: true,
            max_pages: 10,
        }
    }
}

/// Image normalization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Longest side after downscaling, in pixels.
    pub max_dimension: u32,

    /// Convert to grayscale before recognition.
    pub grayscale: bool,

    /// JPEG quality for the cloud payload (1-100).
    pub jpeg_quality: u8,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1600,
            grayscale: true,
            jpeg_quality: 85,
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `quota.json` and `vendors.json`.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl StorageConfig {
    pub fn quota_path(&self) -> PathBuf {
        self.data_dir.join("quota.json")
    }

    pub fn vendors_path(&self) -> PathBuf {
        self.data_dir.join("vendors.json")
    }
}

impl RcptConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| RcptError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RcptError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
