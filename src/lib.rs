use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod logging;
pub mod ocr;
pub mod server;
pub mod settings;

/// Command line overrides applied on top of the loaded settings.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_concurrency: Option<usize>,
    pub max_dimension: Option<u32>,
    pub languages: Option<String>,
    pub tesseract: Option<String>,
    pub settings_path: Option<String>,
}

pub fn resolve_settings(config: &Config) -> Result<settings::Settings> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let mut settings = settings::load_settings(settings_path)?;
    if let Some(host) = config.host.as_deref() {
        settings.host = host.to_string();
    }
    if let Some(port) = config.port {
        settings.port = port;
    }
    if let Some(limit) = config.max_concurrency {
        settings.max_concurrency = limit;
    }
    if let Some(max) = config.max_dimension {
        settings.max_dimension = max;
    }
    if let Some(languages) = config.languages.as_deref() {
        settings.ocr_languages = languages.to_string();
    }
    if let Some(path) = config.tesseract.as_deref() {
        settings.tesseract_path = path.to_string();
    }
    Ok(settings)
}

pub fn build_engine(settings: &settings::Settings) -> Result<ocr::TesseractEngine> {
    ocr::TesseractEngine::new(ocr::TesseractOptions {
        binary: PathBuf::from(&settings.tesseract_path),
        languages: settings.ocr_languages.clone(),
        page_segmentation_mode: settings.page_segmentation_mode,
    })
    .with_context(|| "failed to initialize tesseract engine")
}

pub async fn run(config: Config) -> Result<()> {
    let settings = resolve_settings(&config)?;
    let engine = build_engine(&settings)?;
    tracing::info!(languages = engine.languages(), "tesseract engine ready");
    server::run_server(settings, Arc::new(engine)).await
}

pub fn show_languages(config: &Config) -> Result<String> {
    let settings = resolve_settings(config)?;
    let languages = ocr::list_tesseract_languages(Path::new(&settings.tesseract_path))?;
    Ok(languages.join("\n"))
}
