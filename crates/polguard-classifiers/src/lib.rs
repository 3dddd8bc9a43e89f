//! polguard classifiers
//!
//! Two pretrained Polish sequence classifiers (hate speech, disinformation)
//! served through a fixed-threshold decision rule:
//! - [`bert`]: Candle BERT encoder + pooler + classification head
//! - [`registry`]: the immutable two-model registry built at startup
//! - [`decision`]: the strict `p(class 1) > threshold` rule
//! - [`engine`]: bounded async inference on the blocking pool

pub mod bert;
pub mod classifier;
pub mod config;
pub mod decision;
pub mod engine;
pub mod registry;

pub use bert::BertSequenceClassifier;
pub use classifier::SequenceClassifier;
pub use config::{DeviceSpec, ModelSourceSpec, ModelSpec, ModelsConfig, DEFAULT_THRESHOLD};
pub use engine::InferenceEngine;
pub use registry::ModelRegistry;
