use anyhow::{Context, Result};
use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::ocr::{self, OcrOutcome};
use crate::settings;

use super::state::ServerState;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const FALLBACK_CODE: u16 = 500;
const FALLBACK_BODY: &str = "{\n  \"code\": 500,\n  \"msg\": \"failed to serialize response\"\n}";

pub async fn run_server(
    settings: settings::Settings,
    engine: Arc<dyn ocr::OcrEngine>,
) -> Result<()> {
    let addr = format!("{}:{}", settings.host, settings.port);
    let state = Arc::new(ServerState::new(&settings, engine));
    info!(
        %addr,
        engine = state.engine.name(),
        max_concurrency = state.admission.capacity(),
        "starting OCR server"
    );
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address: {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .with_context(|| "server terminated unexpectedly")?;
    info!("OCR server stopped");
    Ok(())
}

pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new().route("/ocr", post(recognize_image)).with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining in-flight requests");
}

async fn recognize_image(State(state): State<Arc<ServerState>>, request: Request) -> Response {
    let started = Instant::now();
    let outcome = handle_ocr(&state, request.into_body()).await;
    let (response, code) = render(outcome);
    info!(
        code,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "OCR request finished"
    );
    response
}

async fn handle_ocr(state: &ServerState, body: Body) -> OcrOutcome {
    let Some(permit) = state.admission.try_acquire() else {
        warn!(
            capacity = state.admission.capacity(),
            "rejecting request: maximum concurrent OCR tasks reached"
        );
        return OcrOutcome::Busy;
    };

    let bytes: Bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            error!("failed to read request body: {}", err);
            return OcrOutcome::Fault(format!("failed to read request body: {}", err));
        }
    };
    if bytes.is_empty() {
        error!("request body is missing image data");
        return OcrOutcome::MissingInput;
    }

    let engine = state.engine.clone();
    let options = state.normalize;
    let task = tokio::task::spawn_blocking(move || {
        // Held until inference ends, even if the client goes away first.
        let _permit = permit;
        ocr::recognize(engine.as_ref(), &bytes, options)
    });
    match task.await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("OCR task failed: {}", err);
            OcrOutcome::Fault(format!("OCR task failed: {}", err))
        }
    }
}

/// Builds the HTTP response and returns the business code carried in its body.
fn render(outcome: OcrOutcome) -> (Response, u16) {
    let status = outcome.status();
    let body = outcome.into_response_body();
    let code = body.code();
    match body.to_pretty_json() {
        Ok(json) => (json_response(status, json), code),
        Err(err) => {
            error!("failed to serialize OCR response: {}", err);
            let response =
                json_response(StatusCode::INTERNAL_SERVER_ERROR, FALLBACK_BODY.to_string());
            (response, FALLBACK_CODE)
        }
    }
}

fn json_response(status: StatusCode, body: String) -> Response {
    let mut response = (status, body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_CONTENT_TYPE),
    );
    response
}
