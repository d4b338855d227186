//! Image normalization before recognition.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

use super::DocumentPayload;
use crate::error::OcrError;
use crate::models::config::NormalizerConfig;

/// Downscales and desaturates captured images so payloads stay small and
/// recognition sees clean contrast.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    config: NormalizerConfig,
}

impl TextNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Decode image bytes.
    pub fn decode(&self, data: &[u8]) -> Result<DynamicImage, OcrError> {
        image::load_from_memory(data).map_err(|e| OcrError::InvalidImage(e.to_string()))
    }

    /// Fit the image within `max_dimension` and optionally convert it to
    /// grayscale. Never upscales.
    pub fn normalize(&self, image: &DynamicImage) -> DynamicImage {
        let (width, height) = image.dimensions();
        let (new_width, new_height) =
            calculate_resize_dimensions(width, height, self.config.max_dimension);

        let resized = if (new_width, new_height) != (width, height) {
            debug!(
                "Downscaling {}x{} -> {}x{}",
                width, height, new_width, new_height
            );
            image.resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3)
        } else {
            image.clone()
        };

        if self.config.grayscale {
            DynamicImage::ImageLuma8(resized.to_luma8())
        } else {
            resized
        }
    }

    /// Encode a normalized image as the JPEG payload sent to the cloud.
    pub fn encode(&self, image: &DynamicImage) -> Result<DocumentPayload, OcrError> {
        let mut data = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut data, self.config.jpeg_quality);

        // JPEG has no alpha channel
        let flattened = match image {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image.clone(),
            other if other.color().has_color() => DynamicImage::ImageRgb8(other.to_rgb8()),
            other => DynamicImage::ImageLuma8(other.to_luma8()),
        };
        flattened
            .write_with_encoder(encoder)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;

        Ok(DocumentPayload::new(data, "image/jpeg"))
    }

    /// Decode, normalize and encode in one step.
    pub fn prepare(&self, data: &[u8]) -> Result<(DynamicImage, DocumentPayload), OcrError> {
        let normalized = self.normalize(&self.decode(data)?);
        let payload = self.encode(&normalized)?;
        Ok((normalized, payload))
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default())
    }
}

fn calculate_resize_dimensions(width: u32, height: u32, target_size: u32) -> (u32, u32) {
    let max_dim = width.max(height);

    if target_size == 0 || max_dim <= target_size {
        return (width, height);
    }

    let scale = target_size as f32 / max_dim as f32;
    let new_width = (width as f32 * scale).round() as u32;
    let new_height = (height as f32 * scale).round() as u32;

    (new_width.clamp(1, target_size), new_height.clamp(1, target_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn sample(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255])))
    }

    #[test]
    fn test_resize_dimensions() {
        assert_eq!(calculate_resize_dimensions(500, 300, 1600), (500, 300));
        assert_eq!(calculate_resize_dimensions(3200, 1600, 1600), (1600, 800));
        assert_eq!(calculate_resize_dimensions(1000, 4000, 1600), (400, 1600));
        assert_eq!(calculate_resize_dimensions(4000, 3000, 0), (4000, 3000));
    }

    #[test]
    fn test_normalize_downscales_and_grays() {
        let normalizer = TextNormalizer::default();
        let out = normalizer.normalize(&sample(3200, 200));
        assert_eq!(out.dimensions(), (1600, 100));
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_normalize_keeps_color_when_disabled() {
        let normalizer = TextNormalizer::new(NormalizerConfig {
            grayscale: false,
            ..NormalizerConfig::default()
        });
        let out = normalizer.normalize(&sample(10, 10));
        assert_eq!(out.dimensions(), (10, 10));
        assert!(out.color().has_color());
    }

    #[test]
    fn test_prepare_produces_decodable_jpeg() {
        let normalizer = TextNormalizer::default();
        let mut png = Vec::new();
        sample(40, 20)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let (image, payload) = normalizer.prepare(&png).unwrap();
        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(image.dimensions(), (40, 20));

        let decoded = image::load_from_memory_with_format(&payload.data, image::ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (40, 20));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = TextNormalizer::default().decode(b"not an image").unwrap_err();
        assert!(matches!(err, OcrError::InvalidImage(_)));
    }
}
