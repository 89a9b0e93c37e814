use anyhow::{Context, Result, anyhow};
use image::RgbImage;
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;
use tracing::warn;

use super::geom::to_polygon;
use super::parse::{TsvLine, parse_tsv_lines};
use super::{EngineOutput, OcrEngine, RawDetection};

#[derive(Debug, Clone)]
pub struct TesseractOptions {
    pub binary: PathBuf,
    pub languages: String,
    pub page_segmentation_mode: u32,
}

impl Default for TesseractOptions {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            languages: "eng".to_string(),
            page_segmentation_mode: 3,
        }
    }
}

/// Runs the `tesseract` CLI once per image and reports one detection per text line.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
    languages: String,
    psm: u32,
}

impl TesseractEngine {
    pub fn new(options: TesseractOptions) -> Result<Self> {
        let languages = normalize_ocr_languages(&options.binary, &options.languages)?;
        Ok(Self {
            binary: options.binary,
            languages,
            psm: options.page_segmentation_mode,
        })
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }

    fn run_tsv(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .arg("--oem")
            .arg("1")
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("tsv")
            .output()
            .with_context(|| "failed to run tesseract (is it installed?)")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("tesseract failed: {}", stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn detect(&self, image: &RgbImage) -> Result<EngineOutput> {
        let started = Instant::now();
        let mut tmp = tempfile::Builder::new()
            .prefix("ocr-server-")
            .suffix(".png")
            .tempfile()
            .with_context(|| "failed to create temp file for OCR")?;
        image
            .write_to(&mut tmp, image::ImageFormat::Png)
            .with_context(|| "failed to write temp image for OCR")?;
        tmp.flush()
            .with_context(|| "failed to flush temp image for OCR")?;

        let tsv = self.run_tsv(tmp.path())?;
        let detections = parse_tsv_lines(&tsv)
            .iter()
            .map(line_to_detection)
            .collect();
        Ok(EngineOutput {
            detections,
            elapsed: started.elapsed(),
        })
    }
}

fn line_to_detection(line: &TsvLine) -> RawDetection {
    let score = (line.conf as f64 / 100.0).clamp(0.0, 1.0);
    json!([to_polygon(&line.bbox), line.text, score])
}

pub fn list_tesseract_languages(binary: &Path) -> Result<Vec<String>> {
    let output = Command::new(binary)
        .arg("--list-langs")
        .output()
        .with_context(|| "failed to run tesseract --list-langs")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract --list-langs failed: {}", stderr.trim()));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_language_list(&stdout))
}

// First line is a "List of available languages ..." banner.
fn parse_language_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_ocr_languages(binary: &Path, requested: &str) -> Result<String> {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("ocr languages is empty"));
    }

    let available = match list_tesseract_languages(binary) {
        Ok(list) => list,
        Err(err) => {
            warn!("could not list tesseract languages: {:#}", err);
            return Ok(trimmed.to_string());
        }
    };
    select_languages(trimmed, &available)
}

fn select_languages(requested: &str, available: &[String]) -> Result<String> {
    let mut chosen = Vec::new();
    let mut missing = Vec::new();
    for raw in requested.split(['+', ',', ' ']) {
        let lang = raw.trim();
        if lang.is_empty() {
            continue;
        }
        if available.iter().any(|value| value == lang) {
            chosen.push(lang.to_string());
        } else {
            missing.push(lang.to_string());
        }
    }

    if chosen.is_empty() {
        return Err(anyhow!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        ));
    }
    if !missing.is_empty() {
        warn!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        );
    }

    Ok(chosen.join("+"))
}
