//! Application state for the API server.

use std::sync::{Arc, RwLock};

use toxgate_core::classifier::{ClassifierError, LabelScore, TextClassifier};

/// Classifier handle fixed at process startup.
///
/// `Unavailable` is observed by every request until the process restarts
/// with a working model; it is never retried in-flight.
pub enum ClassifierSlot {
    /// Model loaded and ready for inference.
    Ready(RwLock<Box<dyn TextClassifier>>),
    /// Model failed to initialize at startup.
    Unavailable,
}

impl ClassifierSlot {
    /// Wraps a loaded classifier.
    pub fn ready<C>(classifier: C) -> Self
    where
        C: TextClassifier + 'static,
    {
        ClassifierSlot::Ready(RwLock::new(Box::new(classifier)))
    }

    /// Returns true if a classifier was loaded.
    pub fn is_available(&self) -> bool {
        matches!(self, ClassifierSlot::Ready(_))
    }

    /// Runs the classifier on the given text.
    ///
    /// Takes the write lock for the duration of the call, since ONNX
    /// inference needs mutable session access; classification therefore
    /// serializes across requests.
    pub fn classify(&self, text: &str) -> Result<Vec<LabelScore>, ClassifierError> {
        match self {
            ClassifierSlot::Ready(classifier) => classifier.write().unwrap().classify(text),
            ClassifierSlot::Unavailable => Err(ClassifierError::Unavailable),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Classifier handle shared read-only across requests.
    pub classifier: Arc<ClassifierSlot>,
}

impl AppState {
    /// Creates application state around a classifier slot.
    pub fn new(slot: ClassifierSlot) -> Self {
        Self {
            classifier: Arc::new(slot),
        }
    }

    /// Creates application state with no loaded model.
    pub fn unavailable() -> Self {
        Self::new(ClassifierSlot::Unavailable)
    }
}
