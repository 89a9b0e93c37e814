mod geom;
mod parse;
mod tesseract;
mod text;

use anyhow::Result;
use image::RgbImage;
use std::time::Duration;

pub use tesseract::{TesseractEngine, TesseractOptions, list_tesseract_languages};

/// One engine result before validation, expected to be `[box, text, score]`.
pub type RawDetection = serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct EngineOutput {
    pub detections: Vec<RawDetection>,
    pub elapsed: Duration,
}

/// An OCR backend shared by all admitted requests.
///
/// Implementations must tolerate concurrent `detect` calls; the server admits up to
/// `max_concurrency` of them at once.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, image: &RgbImage) -> Result<EngineOutput>;
}
