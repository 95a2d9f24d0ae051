//! Toxic-bert ML classifier.
//!
//! Runs unitary/toxic-bert via ONNX for toxicity scoring. The model is
//! multi-label: six independent sigmoid heads, one per toxicity type.
//! Inference runs on the CPU.

#[cfg(feature = "ml")]
use std::path::Path;

use super::{ClassifierError, LabelScore, TextClassifier};

/// Output labels of toxic-bert, in model head order.
pub const TOXIC_BERT_LABELS: [&str; 6] = [
    "toxic",
    "severe_toxic",
    "obscene",
    "threat",
    "insult",
    "identity_hate",
];

/// Error types for the toxic-bert classifier.
#[derive(Debug, thiserror::Error)]
pub enum ToxicBertError {
    /// Model file not found.
    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    /// Tokenizer file not found.
    #[error("Tokenizer file not found: {0}")]
    TokenizerNotFound(String),

    /// ONNX runtime error.
    #[error("ONNX runtime error: {0}")]
    #[cfg(feature = "ml")]
    OrtError(#[from] ort::Error),

    /// Tokenizer error.
    #[error("Tokenizer error: {0}")]
    TokenizerError(String),

    /// Inference error.
    #[error("Inference error: {0}")]
    InferenceError(String),

    /// ML feature not enabled.
    #[error("ML feature not enabled - rebuild with --features ml")]
    MlNotEnabled,
}

#[cfg(feature = "ml")]
impl From<tokenizers::Error> for ToxicBertError {
    fn from(e: tokenizers::Error) -> Self {
        ToxicBertError::TokenizerError(e.to_string())
    }
}

/// Configuration for the toxic-bert classifier.
#[derive(Debug, Clone)]
pub struct ToxicBertConfig {
    /// Path to the ONNX model file.
    pub model_path: String,
    /// Path to the tokenizer.json file.
    pub tokenizer_path: String,
    /// Maximum sequence length (tokens).
    pub max_length: usize,
}

impl Default for ToxicBertConfig {
    fn default() -> Self {
        Self {
            model_path: "models/toxic_bert.onnx".to_string(),
            tokenizer_path: "models/tokenizer.json".to_string(),
            max_length: 512,
        }
    }
}

/// ML-based toxicity classifier backed by the toxic-bert model.
///
/// Loads an ONNX session once and scores text against all six toxicity
/// heads per call.
#[cfg(feature = "ml")]
pub struct ToxicBertClassifier {
    session: ort::session::Session,
    tokenizer: tokenizers::Tokenizer,
    config: ToxicBertConfig,
}

#[cfg(feature = "ml")]
impl ToxicBertClassifier {
    /// Creates a new classifier by loading the ONNX model and tokenizer.
    ///
    /// Returns an error if either file is missing or fails to load.
    pub fn new(config: ToxicBertConfig) -> Result<Self, ToxicBertError> {
        use ort::session::{builder::GraphOptimizationLevel, Session};

        if !Path::new(&config.model_path).exists() {
            return Err(ToxicBertError::ModelNotFound(config.model_path.clone()));
        }
        if !Path::new(&config.tokenizer_path).exists() {
            return Err(ToxicBertError::TokenizerNotFound(
                config.tokenizer_path.clone(),
            ));
        }

        // CPU inference with a single intra-op thread
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(1)?
            .commit_from_file(&config.model_path)?;

        let tokenizer = tokenizers::Tokenizer::from_file(&config.tokenizer_path)?;

        Ok(Self {
            session,
            tokenizer,
            config,
        })
    }

    /// Loads the classifier from default paths.
    pub fn load_default() -> Result<Self, ToxicBertError> {
        Self::new(ToxicBertConfig::default())
    }

    /// Scores the given text against all six toxicity heads.
    ///
    /// The returned sequence is in model head order, so the "toxic"
    /// entry comes first.
    pub fn score(&mut self, text: &str) -> Result<Vec<LabelScore>, ToxicBertError> {
        use ort::value::Tensor;

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ToxicBertError::TokenizerError(e.to_string()))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();

        let seq_len = input_ids.len().min(self.config.max_length);
        let input_ids = input_ids[..seq_len].to_vec();
        let attention_mask = attention_mask[..seq_len].to_vec();

        // Input tensors with shape [1, seq_len]
        let input_ids_tensor = Tensor::from_array(([1, seq_len], input_ids.into_boxed_slice()))?;
        let attention_mask_tensor =
            Tensor::from_array(([1, seq_len], attention_mask.into_boxed_slice()))?;

        let outputs = self.session.run(ort::inputs![
            "input_ids" => input_ids_tensor,
            "attention_mask" => attention_mask_tensor
        ])?;

        let logits_tensor = outputs["logits"].try_extract_tensor::<f32>().map_err(|e| {
            ToxicBertError::InferenceError(format!("Failed to extract logits: {}", e))
        })?;

        let shape = logits_tensor.0;
        let logits = logits_tensor.1;

        // Expect [1, 6] - one logit per toxicity head
        let dims: Vec<_> = shape.iter().collect();
        if dims.len() != 2 || *dims[0] != 1 || *dims[1] != TOXIC_BERT_LABELS.len() as i64 {
            return Err(ToxicBertError::InferenceError(format!(
                "Unexpected output shape: {:?}",
                dims
            )));
        }

        // Multi-label model: independent sigmoid per head, no softmax
        let scores = TOXIC_BERT_LABELS
            .iter()
            .zip(logits.iter())
            .map(|(label, &logit)| LabelScore::new(*label, sigmoid(logit)))
            .collect();

        Ok(scores)
    }
}

/// Logistic sigmoid.
#[cfg(feature = "ml")]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Stub classifier when the ML feature is not enabled.
///
/// Construction always fails, so the service reports the model as not
/// loaded instead of crashing.
#[cfg(not(feature = "ml"))]
pub struct ToxicBertClassifier {
    _config: ToxicBertConfig,
}

#[cfg(not(feature = "ml"))]
impl ToxicBertClassifier {
    /// Creates a stub classifier (ML feature not enabled).
    pub fn new(_config: ToxicBertConfig) -> Result<Self, ToxicBertError> {
        Err(ToxicBertError::MlNotEnabled)
    }

    /// Loads the classifier from default paths (ML feature not enabled).
    pub fn load_default() -> Result<Self, ToxicBertError> {
        Err(ToxicBertError::MlNotEnabled)
    }

    /// Scores text (ML feature not enabled).
    pub fn score(&mut self, _text: &str) -> Result<Vec<LabelScore>, ToxicBertError> {
        Err(ToxicBertError::MlNotEnabled)
    }
}

impl TextClassifier for ToxicBertClassifier {
    fn classify(&mut self, text: &str) -> Result<Vec<LabelScore>, ClassifierError> {
        self.score(text)
            .map_err(|e| ClassifierError::Inference(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "toxic_bert"
    }
}
