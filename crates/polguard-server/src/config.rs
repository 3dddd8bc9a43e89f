//! Server configuration

use polguard_classifiers::ModelsConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix, e.g. `POLGUARD_PORT=8080` or
/// `POLGUARD_MODELS__THRESHOLD=0.9`
pub const ENV_PREFIX: &str = "POLGUARD";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Forward passes allowed to run at the same time
    #[serde(default = "default_max_concurrent_inferences")]
    pub max_concurrent_inferences: usize,

    /// Model registry configuration
    #[serde(default)]
    pub models: ModelsConfig,
}

impl ServerConfig {
    /// Load configuration from an optional YAML file, then environment
    /// variables. A missing file yields defaults.
    pub fn load(config_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(config_path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_body_bytes == 0 {
            anyhow::bail!("max_body_bytes must be positive");
        }
        if self.max_concurrent_inferences == 0 {
            anyhow::bail!("max_concurrent_inferences must be positive");
        }
        self.models.validate()?;
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
            max_concurrent_inferences: default_max_concurrent_inferences(),
            models: ModelsConfig::default(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_max_concurrent_inferences() -> usize {
    num_cpus::get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use polguard_classifiers::{DeviceSpec, ModelSourceSpec};
    use std::path::PathBuf;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load(dir.path().join("absent.yaml")).unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.max_body_bytes, 64 * 1024);
        assert!(config.max_concurrent_inferences >= 1);
        assert_eq!(config.models.threshold, 0.8);
    }

    #[test]
    fn test_load_yaml_file() {
        let yaml = r#"
listen: 127.0.0.1
port: 8080
max_concurrent_inferences: 2
models:
  threshold: 0.75
  warmup_text: "to jest test"
  hate_speech:
    path: ./models/hate
    max_length: 128
  fake_news:
    repo: ArkadiusDS/polbert-base-polish-disinfo
    revision: main
    device: cpu
"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polguard.yaml");
        std::fs::write(&path, yaml).unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.listen, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_concurrent_inferences, 2);
        assert_eq!(config.models.threshold, 0.75);
        assert_eq!(config.models.warmup_text.as_deref(), Some("to jest test"));
        assert_eq!(
            config.models.hate_speech.source,
            ModelSourceSpec::Local { path: PathBuf::from("./models/hate") }
        );
        assert_eq!(config.models.hate_speech.max_length, Some(128));
        assert_eq!(config.models.fake_news.device, DeviceSpec::Cpu);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polguard.yaml");
        std::fs::write(&path, "models:\n  threshold: 2.0\n").unwrap();

        assert!(ServerConfig::load(&path).is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = ServerConfig {
            max_concurrent_inferences: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
