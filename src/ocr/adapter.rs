use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::engine::{OcrEngine, RawDetection};
use super::normalize::NormalizedImage;
use super::{DetectionItem, OcrOutcome};

/// Runs `engine` once on a normalized image and shapes its output.
pub fn infer(engine: &dyn OcrEngine, image: &NormalizedImage) -> OcrOutcome {
    match run_engine(engine, image) {
        Ok(detections) => {
            let items = shape_detections(detections);
            if items.is_empty() {
                OcrOutcome::NoText
            } else {
                OcrOutcome::Recognized(items)
            }
        }
        Err(err) => {
            error!(engine = engine.name(), "OCR error: {:#}", err);
            OcrOutcome::EngineFailure(format!("{:#}", err))
        }
    }
}

fn run_engine(engine: &dyn OcrEngine, image: &NormalizedImage) -> Result<Vec<RawDetection>> {
    let pixels = image::load_from_memory(&image.bytes)
        .with_context(|| "failed to decode normalized image")?
        .into_rgb8();
    let output = engine.detect(&pixels)?;
    info!(
        engine = engine.name(),
        detections = output.detections.len(),
        elapsed_ms = output.elapsed.as_millis() as u64,
        "OCR engine finished"
    );
    debug!(raw = ?output.detections, "OCR raw result");
    Ok(output.detections)
}

/// Keeps the well-formed `[box, text, score]` triples and drops the rest.
pub fn shape_detections(detections: Vec<RawDetection>) -> Vec<DetectionItem> {
    detections
        .into_iter()
        .enumerate()
        .filter_map(|(idx, raw)| match shape_detection(raw) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(index = idx, "skipping invalid detection: {}", err);
                None
            }
        })
        .collect()
}

fn shape_detection(raw: RawDetection) -> Result<DetectionItem> {
    let Value::Array(fields) = raw else {
        return Err(anyhow!("expected a [box, text, score] array"));
    };
    let [polygon, text, score] = <[Value; 3]>::try_from(fields)
        .map_err(|fields| anyhow!("expected 3 fields, got {}", fields.len()))?;
    Ok(DetectionItem {
        polygon: parse_polygon(&polygon)?,
        text: match text {
            Value::String(text) => text,
            other => return Err(anyhow!("text is not a string: {}", other)),
        },
        score: coerce_score(&score)?,
    })
}

const MIN_POLYGON_POINTS: usize = 3;

fn parse_polygon(value: &Value) -> Result<Vec<[f64; 2]>> {
    let points = value
        .as_array()
        .ok_or_else(|| anyhow!("box is not a list of points"))?;
    if points.len() < MIN_POLYGON_POINTS {
        return Err(anyhow!(
            "box has {} points, need at least {}",
            points.len(),
            MIN_POLYGON_POINTS
        ));
    }
    points
        .iter()
        .map(|point| match point.as_array().map(Vec::as_slice) {
            Some([x, y]) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => Ok([x, y]),
                _ => Err(anyhow!("box point is not numeric: {}", point)),
            },
            _ => Err(anyhow!("box point is not an [x, y] pair: {}", point)),
        })
        .collect()
}

/// Finite scores are passed through as the engine reports them; range is not enforced here.
fn coerce_score(value: &Value) -> Result<f64> {
    let score = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| anyhow!("score is not a number: {}", value))?;
    if !score.is_finite() {
        return Err(anyhow!("score is not finite: {}", score));
    }
    Ok(score)
}
