//! Application state shared across requests

use metrics_exporter_prometheus::PrometheusHandle;
use polguard_classifiers::{InferenceEngine, ModelRegistry};
use std::sync::Arc;

use crate::config::ServerConfig;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,

    /// Registry-backed inference with admission control
    pub engine: InferenceEngine,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    /// Assemble state around an already loaded registry
    pub fn new(
        config: ServerConfig,
        registry: Arc<ModelRegistry>,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        let engine = InferenceEngine::new(
            registry,
            config.models.threshold,
            config.max_concurrent_inferences,
        );

        Self {
            config: Arc::new(config),
            engine,
            metrics_handle,
        }
    }
}
