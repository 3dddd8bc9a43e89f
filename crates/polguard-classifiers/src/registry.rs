//! Model registry
//!
//! Holds exactly one classifier per [`ModelKind`]. Built once at startup and
//! never mutated afterwards, so it is shared across request handlers behind
//! an `Arc` without locking.

use crate::bert::BertSequenceClassifier;
use crate::classifier::SequenceClassifier;
use crate::config::ModelsConfig;
use crate::decision;
use polguard_core::{ModelKind, Result};
use std::sync::Arc;
use tracing::info;

/// Registry of the loaded classifiers
pub struct ModelRegistry {
    hate_speech: Arc<dyn SequenceClassifier>,
    fake_news: Arc<dyn SequenceClassifier>,
}

impl ModelRegistry {
    /// Build a registry from already constructed classifiers
    pub fn from_classifiers(
        hate_speech: Arc<dyn SequenceClassifier>,
        fake_news: Arc<dyn SequenceClassifier>,
    ) -> Self {
        Self {
            hate_speech,
            fake_news,
        }
    }

    /// Load both configured models. Any failure aborts the whole load.
    pub fn load(config: &ModelsConfig) -> Result<Self> {
        config.validate()?;
        info!("Initializing model registry with {} models", ModelKind::ALL.len());

        let hate_speech = Arc::new(BertSequenceClassifier::load(&config.hate_speech)?);
        info!("Loaded model: {}", ModelKind::HateSpeech);

        let fake_news = Arc::new(BertSequenceClassifier::load(&config.fake_news)?);
        info!("Loaded model: {}", ModelKind::FakeNews);

        Ok(Self::from_classifiers(hate_speech, fake_news))
    }

    /// Classifier registered for `kind`
    pub fn get(&self, kind: ModelKind) -> &Arc<dyn SequenceClassifier> {
        match kind {
            ModelKind::HateSpeech => &self.hate_speech,
            ModelKind::FakeNews => &self.fake_news,
        }
    }

    /// Keys of the registered models
    pub fn model_kinds(&self) -> [ModelKind; 2] {
        ModelKind::ALL
    }

    /// Classify `text` once with every model and log the outcome.
    ///
    /// Surfaces broken checkpoints (wrong head size, tokenizer mismatch)
    /// before the server starts accepting traffic.
    pub fn warm_up(&self, text: &str, threshold: f32) -> Result<()> {
        for kind in self.model_kinds() {
            let classifier = self.get(kind);
            let probabilities = classifier.class_probabilities(text)?;
            let prediction = decision::decide(&probabilities, threshold)?;
            info!(
                model = %kind,
                argmax = prediction.argmax,
                predicted_class = prediction.predicted_class,
                probabilities = ?prediction.probabilities,
                "Warm-up classification of {:?}",
                text
            );
        }
        Ok(())
    }
}
