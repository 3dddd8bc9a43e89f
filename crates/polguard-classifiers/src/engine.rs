//! Async inference front-end
//!
//! Runs classifiers on Tokio's blocking pool, bounded by a semaphore so that
//! a burst of requests cannot start more forward passes than configured.

use crate::decision;
use crate::registry::ModelRegistry;
use polguard_core::{Error, ModelKind, Prediction, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::debug;

/// Shared inference engine: registry, threshold and admission control
#[derive(Clone)]
pub struct InferenceEngine {
    registry: Arc<ModelRegistry>,
    permits: Arc<Semaphore>,
    threshold: f32,
}

impl InferenceEngine {
    /// Create an engine allowing `max_concurrent` simultaneous forward passes
    pub fn new(registry: Arc<ModelRegistry>, threshold: f32, max_concurrent: usize) -> Self {
        Self {
            registry,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            threshold,
        }
    }

    /// The underlying registry
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Decision threshold
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Classify `text` with the model registered for `kind`.
    ///
    /// The permit moves into the blocking job, so a forward pass keeps its
    /// slot until it finishes even if the caller stops waiting.
    pub async fn classify(&self, kind: ModelKind, text: String) -> Result<Prediction> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| Error::internal(format!("inference semaphore closed: {}", e)))?;

        let classifier = Arc::clone(self.registry.get(kind));
        let (probabilities, elapsed) = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let start = Instant::now();
            let probabilities = classifier.class_probabilities(&text);
            (probabilities, start.elapsed())
        })
        .await
        .map_err(|e| Error::internal(format!("inference task failed: {}", e)))?;

        metrics::histogram!("polguard_inference_latency_us", "model" => kind.as_str())
            .record(elapsed.as_micros() as f64);

        let prediction = decision::decide(&probabilities?, self.threshold)?;
        debug!(
            model = %kind,
            argmax = prediction.argmax,
            positive_probability = prediction.positive_probability,
            predicted_class = prediction.predicted_class,
            latency_us = elapsed.as_micros() as u64,
            "classified text"
        );

        Ok(prediction)
    }
}
