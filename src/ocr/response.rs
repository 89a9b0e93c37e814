use axum::http::StatusCode;
use serde::Serialize;

use super::DetectionItem;

pub const SUCCESS_CODE: u16 = 100;
const BAD_INPUT_CODE: u16 = 400;
const FAILURE_CODE: u16 = 500;

const BUSY_MESSAGE: &str = "service busy, try again later";
const MISSING_INPUT_MESSAGE: &str = "No data part";
const NO_TEXT_MESSAGE: &str = "no text content in image";

/// What happened to one OCR request.
#[derive(Debug, Clone, PartialEq)]
pub enum OcrOutcome {
    Recognized(Vec<DetectionItem>),
    Busy,
    MissingInput,
    EngineFailure(String),
    NoText,
    Fault(String),
}

impl OcrOutcome {
    /// HTTP status for the outcome. Business failures that completed the pipeline stay 200.
    pub fn status(&self) -> StatusCode {
        match self {
            OcrOutcome::Recognized(_) | OcrOutcome::EngineFailure(_) | OcrOutcome::NoText => {
                StatusCode::OK
            }
            OcrOutcome::MissingInput => StatusCode::BAD_REQUEST,
            OcrOutcome::Busy | OcrOutcome::Fault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response_body(self) -> OcrResponse {
        match self {
            OcrOutcome::Recognized(data) => OcrResponse::Success {
                code: SUCCESS_CODE,
                data,
            },
            OcrOutcome::Busy => OcrResponse::failure(FAILURE_CODE, BUSY_MESSAGE),
            OcrOutcome::MissingInput => OcrResponse::failure(BAD_INPUT_CODE, MISSING_INPUT_MESSAGE),
            OcrOutcome::EngineFailure(description) => {
                OcrResponse::failure(FAILURE_CODE, format!("OCR Error: {}", description))
            }
            OcrOutcome::NoText => OcrResponse::failure(FAILURE_CODE, NO_TEXT_MESSAGE),
            OcrOutcome::Fault(description) => OcrResponse::failure(FAILURE_CODE, description),
        }
    }
}

/// Wire envelope: `{code, data}` on success, `{code, msg}` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OcrResponse {
    Success { code: u16, data: Vec<DetectionItem> },
    Failure { code: u16, msg: String },
}

impl OcrResponse {
    fn failure(code: u16, msg: impl Into<String>) -> Self {
        OcrResponse::Failure {
            code,
            msg: msg.into(),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            OcrResponse::Success { code, .. } | OcrResponse::Failure { code, .. } => *code,
        }
    }

    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
