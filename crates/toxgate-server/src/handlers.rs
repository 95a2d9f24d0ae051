//! API route handlers.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use tracing::{info, warn};

use toxgate_core::classifier::ToxicityReading;

use crate::error::{ApiError, Result};
use crate::models::{AnalyzeRequest, AnalyzeResponse};
use crate::state::AppState;

/// POST /analyze_chat - Score a chat message for toxicity.
pub async fn analyze_chat(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>> {
    // Availability is checked before the payload: when both fail, the
    // dead model is reported, not the bad request.
    if !state.classifier.is_available() {
        return Err(ApiError::ModelNotLoaded);
    }

    let message = match req.message {
        Some(message) if !message.is_empty() => message,
        _ => return Err(ApiError::MissingMessage),
    };

    let classifier = state.classifier.clone();
    let text = message.clone();
    let start = Instant::now();

    // Inference blocks for the duration of the model run; keep it off
    // the async executor.
    let output = tokio::task::spawn_blocking(move || classifier.classify(&text))
        .await
        .map_err(|e| ApiError::Inference(e.to_string()))?;

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            warn!(error = %e, "Inference failed");
            return Err(ApiError::from(e));
        }
    };

    let reading = ToxicityReading::from_output(&output, start.elapsed().as_micros() as u64);

    info!(
        message_len = message.len(),
        score = reading.score,
        latency_ms = reading.duration_us / 1000,
        "Analyzed message"
    );

    Ok(Json(AnalyzeResponse {
        success: true,
        message,
        score: reading.score,
        label: reading.verdict(),
    }))
}
