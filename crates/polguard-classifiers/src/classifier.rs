//! Classifier trait

use polguard_core::Result;

/// A text classifier producing a probability distribution over its classes.
///
/// Implementations are CPU/GPU bound and synchronous; async callers should
/// run them on the blocking pool (see [`crate::engine::InferenceEngine`]).
pub trait SequenceClassifier: Send + Sync {
    /// Softmax distribution over the model's classes for `text`
    fn class_probabilities(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the classifier name
    fn name(&self) -> &str;
}
