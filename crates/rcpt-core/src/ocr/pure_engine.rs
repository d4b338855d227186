//! Local OCR engine wrapper using `pure-onnx-ocr`.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use super::{LocalOcr, ProgressObserver};
use crate::error::OcrError;
use crate::models::config::LocalOcrConfig;

const DET_MODEL: &str = "det.onnx";
const REC_MODEL: &str = "latin_rec.onnx";
const DICTIONARY: &str = "latin_dict.txt";

type Engine = pure_onnx_ocr::engine::OcrEngine;

/// In-process OCR backed by `pure-onnx-ocr` (pure Rust, no external ONNX
/// Runtime). Models load on first use, on the blocking thread pool along
/// with inference.
pub struct PureOcrEngine {
    recognizer: Arc<Recognizer>,
}

impl PureOcrEngine {
    pub fn new(config: LocalOcrConfig) -> Self {
        Self {
            recognizer: Arc::new(Recognizer {
                config,
                engine: OnceLock::new(),
            }),
        }
    }

    /// Recognize text on the calling thread.
    pub fn extract_text(&self, image: &DynamicImage) -> Result<String, OcrError> {
        self.recognizer.extract_text(image)
    }
}

struct Recognizer {
    config: LocalOcrConfig,
    engine: OnceLock<Result<Mutex<Engine>, String>>,
}

impl Recognizer {
    fn model_paths(&self) -> [PathBuf; 3] {
        let dir = &self.config.model_dir;
        [dir.join(DET_MODEL), dir.join(REC_MODEL), dir.join(DICTIONARY)]
    }

    fn load(&self) -> Result<Mutex<Engine>, String> {
        let [det_path, rec_path, dict_path] = self.model_paths();

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| format!("pure-onnx-ocr: {}", e))?;

        info!("Loaded pure-onnx-ocr engine from {}", self.config.model_dir.display());
        Ok(Mutex::new(engine))
    }

    fn engine(&self) -> Result<&Mutex<Engine>, OcrError> {
        self.engine
            .get_or_init(|| self.load())
            .as_ref()
            .map_err(|e| OcrError::ModelLoad(e.clone()))
    }

    fn extract_text(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        debug!("Recognizing image: {}x{}", width, height);

        let engine = self
            .engine()?
            .lock()
            .map_err(|_| OcrError::Recognition("engine lock poisoned".to_string()))?;

        let results = engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        let boxes: Vec<RecognizedBox> = results
            .iter()
            .map(|r| {
                let text = if self.config.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                RecognizedBox::from_polygon(&r.bounding_box, text)
            })
            .collect();

        let text = assemble_lines(boxes);
        info!(
            "OCR complete: {} text regions in {}ms",
            results.len(),
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}

#[async_trait]
impl LocalOcr for PureOcrEngine {
    fn is_available(&self) -> bool {
        let recognizer = &self.recognizer;
        recognizer.config.enabled && recognizer.model_paths().iter().all(|p| p.exists())
    }

    async fn recognize(
        &self,
        image: &DynamicImage,
        progress: &dyn ProgressObserver,
    ) -> Result<String, OcrError> {
        progress.progress(0);

        let recognizer = Arc::clone(&self.recognizer);
        let image = image.clone();
        let text = tokio::task::spawn_blocking(move || recognizer.extract_text(&image))
            .await
            .map_err(|e| OcrError::Recognition(format!("OCR worker failed: {}", e)))??;

        progress.progress(100);
        Ok(text)
    }
}

/// A recognized region reduced to its axis-aligned box.
#[derive(Debug, Clone)]
struct RecognizedBox {
    left: f32,
    top: f32,
    bottom: f32,
    text: String,
}

impl RecognizedBox {
    fn from_polygon(polygon: &pure_onnx_ocr::Polygon<f64>, text: String) -> Self {
        let mut left = f32::INFINITY;
        let mut top = f32::INFINITY;
        let mut bottom = f32::NEG_INFINITY;
        for coord in polygon.exterior().coords().take(4) {
            left = left.min(coord.x as f32);
            top = top.min(coord.y as f32);
            bottom = bottom.max(coord.y as f32);
        }
        Self {
            left,
            top,
            bottom,
            text,
        }
    }

    fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }
}

/// Join boxes into text lines in reading order. Boxes whose vertical
/// centre falls inside the current row's span share a line, left to right.
fn assemble_lines(mut boxes: Vec<RecognizedBox>) -> String {
    boxes.retain(|b| !b.text.trim().is_empty());
    boxes.sort_by(|a, b| a.top.partial_cmp(&b.top).unwrap_or(std::cmp::Ordering::Equal));

    let mut rows: Vec<Vec<RecognizedBox>> = Vec::new();
    for b in boxes {
        let same_row = rows
            .last()
            .and_then(|row| row.first())
            .is_some_and(|first| b.center_y() >= first.top && b.center_y() <= first.bottom);

        match rows.last_mut() {
            Some(row) if same_row => row.push(b),
            _ => rows.push(vec![b]),
        }
    }

    rows.into_iter()
        .map(|mut row| {
            row.sort_by(|a, b| a.left.partial_cmp(&b.left).unwrap_or(std::cmp::Ordering::Equal));
            row.iter()
                .map(|b| b.text.trim())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rbox(left: f32, top: f32, text: &str) -> RecognizedBox {
        RecognizedBox {
            left,
            top,
            bottom: top + 20.0,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_assemble_lines_reading_order() {
        let boxes = vec![
            rbox(200.0, 62.0, "$6.75"),
            rbox(10.0, 0.0, "STARBUCKS COFFEE"),
            rbox(10.0, 60.0, "Total:"),
            rbox(10.0, 30.0, "Date: 01/15/2024"),
        ];
        assert_eq!(
            assemble_lines(boxes),
            "STARBUCKS COFFEE\nDate: 01/15/2024\nTotal: $6.75"
        );
    }

    #[test]
    fn test_assemble_lines_drops_blank_boxes() {
        let boxes = vec![rbox(0.0, 0.0, "  "), rbox(0.0, 40.0, "Thanks")];
        assert_eq!(assemble_lines(boxes), "Thanks");
    }

    #[test]
    fn test_unavailable_without_models() {
        let dir = tempfile::tempdir().unwrap();
        let engine = PureOcrEngine::new(LocalOcrConfig {
            model_dir: dir.path().to_path_buf(),
            ..LocalOcrConfig::default()
        });
        assert!(!engine.is_available());
    }

    #[tokio::test]
    async fn test_missing_models_fail_off_executor() {
        struct Silent;
        impl ProgressObserver for Silent {
            fn progress(&self, _percent: u8) {}
        }

        let dir = tempfile::tempdir().unwrap();
        let engine = PureOcrEngine::new(LocalOcrConfig {
            model_dir: dir.path().to_path_buf(),
            ..LocalOcrConfig::default()
        });
        let image = DynamicImage::new_rgb8(8, 8);

        assert!(engine.recognize(&image, &Silent).await.is_err());
    }
}
