mod adapter;
mod engine;
mod normalize;
mod response;

pub use adapter::{infer, shape_detections};
pub use engine::{
    EngineOutput, OcrEngine, RawDetection, TesseractEngine, TesseractOptions,
    list_tesseract_languages,
};
pub use normalize::{NormalizedImage, normalize, target_dimensions};
pub use response::{OcrOutcome, OcrResponse, SUCCESS_CODE};

use tracing::error;

/// A single recognized region: polygon outline, text and confidence.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DetectionItem {
    #[serde(rename = "box")]
    pub polygon: Vec<[f64; 2]>,
    pub text: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_dimension: 1024,
            jpeg_quality: 95,
        }
    }
}

/// Normalizes `image_bytes` and runs the engine on the result.
///
/// Never fails: decode errors are reported as [`OcrOutcome::EngineFailure`] just like
/// engine faults, so the caller always gets something it can serialize.
pub fn recognize(
    engine: &dyn OcrEngine,
    image_bytes: &[u8],
    options: NormalizeOptions,
) -> OcrOutcome {
    let normalized = match normalize(image_bytes, options.max_dimension, options.jpeg_quality) {
        Ok(normalized) => normalized,
        Err(err) => {
            error!("OCR error: {:#}", err);
            return OcrOutcome::EngineFailure(format!("{:#}", err));
        }
    };
    infer(engine, &normalized)
}
