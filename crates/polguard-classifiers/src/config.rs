//! Configuration for the two served models

use candle_core::Device;
use polguard_core::{Error, ModelKind, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default hate-speech model on the Hugging Face Hub
pub const DEFAULT_HATE_SPEECH_REPO: &str = "dkleczek/Polish-Hate-Speech-Detection-Herbert-Large";

/// Default disinformation model on the Hugging Face Hub
pub const DEFAULT_FAKE_NEWS_REPO: &str = "ArkadiusDS/polbert-base-polish-disinfo";

/// Probability of class 1 must exceed this to return a positive label
pub const DEFAULT_THRESHOLD: f32 = 0.8;

/// Configuration for the model registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Decision threshold applied to the class-1 probability
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Text classified by every model once at startup, `None` to skip
    #[serde(default = "default_warmup_text")]
    pub warmup_text: Option<String>,

    /// Hate-speech model
    #[serde(default = "default_hate_speech")]
    pub hate_speech: ModelSpec,

    /// Disinformation model
    #[serde(default = "default_fake_news")]
    pub fake_news: ModelSpec,
}

/// Where and how to load one model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model source specification
    #[serde(flatten)]
    pub source: ModelSourceSpec,

    /// Device to run inference on
    #[serde(default)]
    pub device: DeviceSpec,

    /// Truncation length, defaults to the model's position embedding size
    #[serde(default)]
    pub max_length: Option<usize>,
}

/// Model source specification (for config files)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelSourceSpec {
    /// Directory holding config.json, tokenizer.json and weights
    Local { path: PathBuf },

    /// Hugging Face Hub repository
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
    },
}

/// Device specification (for config files)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSpec {
    #[default]
    Cpu,
    Cuda { index: Option<usize> },
    Metal { index: Option<usize> },
}

impl DeviceSpec {
    /// Create the Candle device
    pub fn to_device(&self) -> Result<Device> {
        match self {
            DeviceSpec::Cpu => Ok(Device::Cpu),
            DeviceSpec::Cuda { index } => Device::new_cuda(index.unwrap_or(0))
                .map_err(|e| Error::model(format!("Failed to create CUDA device: {}", e))),
            DeviceSpec::Metal { index } => Device::new_metal(index.unwrap_or(0))
                .map_err(|e| Error::model(format!("Failed to create Metal device: {}", e))),
        }
    }
}

impl ModelSpec {
    /// Spec for a Hugging Face repository at `main`
    pub fn from_hf(repo: impl Into<String>) -> Self {
        Self {
            source: ModelSourceSpec::HuggingFace {
                repo: repo.into(),
                revision: default_revision(),
            },
            device: DeviceSpec::Cpu,
            max_length: None,
        }
    }

    /// Spec for a local model directory
    pub fn from_local(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ModelSourceSpec::Local { path: path.into() },
            device: DeviceSpec::Cpu,
            max_length: None,
        }
    }

    /// Human-readable model identifier for logs
    pub fn display_name(&self) -> String {
        match &self.source {
            ModelSourceSpec::Local { path } => path.display().to_string(),
            ModelSourceSpec::HuggingFace { repo, revision } => format!("{}@{}", repo, revision),
        }
    }
}

impl ModelsConfig {
    /// Spec for the given model kind
    pub fn spec(&self, kind: ModelKind) -> &ModelSpec {
        match kind {
            ModelKind::HateSpeech => &self.hate_speech,
            ModelKind::FakeNews => &self.fake_news,
        }
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::config(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }

        for kind in ModelKind::ALL {
            let spec = self.spec(kind);
            if spec.max_length == Some(0) {
                return Err(Error::config(format!("{}: max_length must be positive", kind)));
            }
            if let ModelSourceSpec::HuggingFace { repo, .. } = &spec.source {
                if repo.trim().is_empty() {
                    return Err(Error::config(format!("{}: empty repository id", kind)));
                }
            }
        }

        Ok(())
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            warmup_text: default_warmup_text(),
            hate_speech: default_hate_speech(),
            fake_news: default_fake_news(),
        }
    }
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

fn default_warmup_text() -> Option<String> {
    Some("czlowiek to koks".to_string())
}

fn default_hate_speech() -> ModelSpec {
    ModelSpec::from_hf(DEFAULT_HATE_SPEECH_REPO)
}

fn default_fake_news() -> ModelSpec {
    ModelSpec::from_hf(DEFAULT_FAKE_NEWS_REPO)
}

fn default_revision() -> String {
    "main".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModelsConfig::default();
        assert_eq!(config.threshold, 0.8);
        assert_eq!(config.warmup_text.as_deref(), Some("czlowiek to koks"));
        assert_eq!(
            config.hate_speech.source,
            ModelSourceSpec::HuggingFace {
                repo: DEFAULT_HATE_SPEECH_REPO.to_string(),
                revision: "main".to_string(),
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_models_config_yaml() {
        let yaml = r#"
threshold: 0.9
hate_speech:
  path: ./models/herbert-hate
  max_length: 256
fake_news:
  repo: ArkadiusDS/polbert-base-polish-disinfo
  revision: v1
  device:
    cuda:
      index: 1
"#;

        let config: ModelsConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.threshold, 0.9);
        assert_eq!(
            config.hate_speech.source,
            ModelSourceSpec::Local { path: PathBuf::from("./models/herbert-hate") }
        );
        assert_eq!(config.hate_speech.max_length, Some(256));
        assert_eq!(config.hate_speech.device, DeviceSpec::Cpu);
        assert_eq!(config.fake_news.device, DeviceSpec::Cuda { index: Some(1) });
        assert_eq!(config.fake_news.display_name(), "ArkadiusDS/polbert-base-polish-disinfo@v1");
    }

    #[test]
    fn test_missing_models_fall_back_to_defaults() {
        let config: ModelsConfig = serde_yaml::from_str("threshold: 0.5").unwrap();
        assert_eq!(config.spec(ModelKind::FakeNews).display_name(), format!("{}@main", DEFAULT_FAKE_NEWS_REPO));
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let config = ModelsConfig { threshold: 1.5, ..Default::default() };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_max_length() {
        let mut config = ModelsConfig::default();
        config.fake_news.max_length = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cpu_device() {
        let device = DeviceSpec::Cpu.to_device().unwrap();
        assert!(device.is_cpu());
    }
}
