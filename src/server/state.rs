use std::sync::Arc;

use crate::ocr::{NormalizeOptions, OcrEngine};

use super::admission::AdmissionController;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<dyn OcrEngine>,
    pub admission: AdmissionController,
    pub normalize: NormalizeOptions,
    pub max_body_bytes: usize,
}

impl ServerState {
    pub fn new(settings: &crate::settings::Settings, engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            engine,
            admission: AdmissionController::new(settings.max_concurrency),
            normalize: NormalizeOptions {
                max_dimension: settings.max_dimension,
                jpeg_quality: settings.jpeg_quality,
            },
            max_body_bytes: settings.max_body_bytes,
        }
    }
}
