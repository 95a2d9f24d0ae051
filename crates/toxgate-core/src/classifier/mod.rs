//! Text toxicity classification.
//!
//! This module provides the classifier boundary used by the HTTP API:
//! the [`TextClassifier`] trait, the raw label/score output type, and
//! the toxicity score extraction applied to it.

mod score;
mod toxic_bert;

pub use score::{LabelScore, ToxicityReading, Verdict, TOXIC_LABEL, TOXIC_THRESHOLD};
pub use toxic_bert::{
    ToxicBertClassifier, ToxicBertConfig, ToxicBertError, TOXIC_BERT_LABELS,
};

use thiserror::Error;

/// Error surfaced to the request path by a classifier invocation.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The classifier handle was never initialized.
    #[error("NLP model not loaded")]
    Unavailable,

    /// A specific inference call failed.
    #[error("{0}")]
    Inference(String),
}

/// Trait for text classifiers producing label/score pairs.
///
/// The HTTP layer talks to the model exclusively through this seam,
/// so tests can substitute fixed or failing classifiers.
pub trait TextClassifier: Send + Sync {
    /// Classifies the given text and returns an ordered sequence of
    /// label/score pairs. The sequence is not sorted and may or may not
    /// contain a `"toxic"` entry.
    fn classify(&mut self, text: &str) -> Result<Vec<LabelScore>, ClassifierError>;

    /// Returns the name of this classifier for logging/debugging.
    fn name(&self) -> &'static str;
}
