//! API request and response models.

use serde::{Deserialize, Serialize};

use toxgate_core::classifier::Verdict;

/// Request body for POST /analyze_chat.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// The chat message to analyze. Must be present and non-empty.
    #[serde(default)]
    pub message: Option<String>,
}

/// Response body for a successful POST /analyze_chat.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    /// Always true on the success path.
    pub success: bool,
    /// The analyzed message, echoed back.
    pub message: String,
    /// Score of the "toxic" label (0.0 to 1.0).
    pub score: f32,
    /// Binary verdict derived from the score.
    pub label: Verdict,
}
