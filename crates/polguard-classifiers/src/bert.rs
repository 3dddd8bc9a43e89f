//! BERT sequence classifier backed by Candle
//!
//! Loads a `BertForSequenceClassification` checkpoint (encoder, pooler and
//! linear classification head) from the Hugging Face Hub or a local
//! directory. Both served Polish models use this architecture.

use crate::classifier::SequenceClassifier;
use crate::config::{ModelSourceSpec, ModelSpec};
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use hf_hub::{api::sync::Api, Repo, RepoType};
use polguard_core::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};
use tracing::{debug, info};

/// Number of classes assumed when config.json carries no label map
const DEFAULT_NUM_LABELS: usize = 2;

/// Sequence length used when the tokenizer declares no usable limit
const DEFAULT_MAX_LENGTH: usize = 512;

/// Files making up a checkpoint on disk
#[derive(Debug, Clone)]
struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
    pytorch_weights: bool,
    tokenizer_config: Option<PathBuf>,
}

/// Classification-head fields of config.json not covered by [`BertConfig`]
#[derive(Debug, Default, Deserialize)]
struct HeadConfig {
    #[serde(default)]
    id2label: HashMap<String, String>,
}

/// Fields of tokenizer_config.json that affect encoding
#[derive(Debug, Default, Deserialize)]
struct TokenizerConfig {
    /// Float because checkpoints without a limit store a huge sentinel
    #[serde(default)]
    model_max_length: Option<f64>,
}

/// Truncation length: the tokenizer's declared limit when the encoder can
/// hold it, else 512 capped by the position embeddings.
fn truncation_length(tokenizer_config: &TokenizerConfig, max_position_embeddings: usize) -> usize {
    match tokenizer_config.model_max_length {
        Some(limit) if limit >= 1.0 && limit <= max_position_embeddings as f64 => limit as usize,
        _ => DEFAULT_MAX_LENGTH.min(max_position_embeddings),
    }
}

fn read_tokenizer_config(path: Option<&Path>) -> Result<TokenizerConfig> {
    match path {
        Some(path) => Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?),
        None => Ok(TokenizerConfig::default()),
    }
}

/// BERT encoder with pooler and classification head
pub struct BertSequenceClassifier {
    name: String,
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
    num_labels: usize,
}

fn model_err<E: Display>(context: &'static str) -> impl Fn(E) -> Error {
    move |e| Error::model(format!("{}: {}", context, e))
}

fn inference_err<E: Display>(context: &'static str) -> impl Fn(E) -> Error {
    move |e| Error::classifier(format!("{}: {}", context, e))
}

impl BertSequenceClassifier {
    /// Load a classifier from a model spec
    pub fn load(spec: &ModelSpec) -> Result<Self> {
        let name = spec.display_name();
        info!("Loading BERT classifier: {}", name);
        let start = Instant::now();

        let files = resolve_model_files(&spec.source)?;
        let device = spec.device.to_device()?;

        let config_json = std::fs::read_to_string(&files.config)?;
        let bert_config: BertConfig = serde_json::from_str(&config_json)?;
        let head_config: HeadConfig = serde_json::from_str(&config_json)?;
        let num_labels = if head_config.id2label.is_empty() {
            DEFAULT_NUM_LABELS
        } else {
            head_config.id2label.len()
        };

        let max_length = match spec.max_length {
            Some(max_length) => max_length,
            None => {
                let tokenizer_config = read_tokenizer_config(files.tokenizer_config.as_deref())?;
                truncation_length(&tokenizer_config, bert_config.max_position_embeddings)
            }
        };
        let mut tokenizer =
            Tokenizer::from_file(&files.tokenizer).map_err(model_err("Failed to load tokenizer"))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(model_err("Failed to configure truncation"))?;
        tokenizer.with_padding(Some(PaddingParams::default()));

        let vb = if files.pytorch_weights {
            VarBuilder::from_pth(&files.weights, DType::F32, &device)
                .map_err(model_err("Failed to load PyTorch weights"))?
        } else {
            // SAFETY: the weights file is not modified while the process runs.
            unsafe {
                VarBuilder::from_mmaped_safetensors(&[files.weights.clone()], DType::F32, &device)
                    .map_err(model_err("Failed to load SafeTensors weights"))?
            }
        };

        let bert = BertModel::load(vb.pp("bert"), &bert_config)
            .map_err(model_err("Failed to load BERT encoder"))?;
        let pooler = candle_nn::linear(
            bert_config.hidden_size,
            bert_config.hidden_size,
            vb.pp("bert.pooler.dense"),
        )
        .map_err(model_err("Failed to load pooler"))?;
        let classifier = candle_nn::linear(bert_config.hidden_size, num_labels, vb.pp("classifier"))
            .map_err(model_err("Failed to load classification head"))?;

        info!(
            "Loaded {} ({} labels, max_length {}) in {}ms",
            name,
            num_labels,
            max_length,
            start.elapsed().as_millis()
        );

        Ok(Self {
            name,
            bert,
            pooler,
            classifier,
            tokenizer,
            device,
            num_labels,
        })
    }

    /// Number of output classes
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    fn logits(&self, text: &str) -> Result<Tensor> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(inference_err("Tokenization failed"))?;

        let to_tensor = |ids: &[u32]| -> Result<Tensor> {
            Tensor::new(ids, &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(inference_err("Failed to build input tensor"))
        };
        let input_ids = to_tensor(encoding.get_ids())?;
        let token_type_ids = to_tensor(encoding.get_type_ids())?;
        let attention_mask = to_tensor(encoding.get_attention_mask())?;

        let hidden = self
            .bert
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(inference_err("Model forward pass failed"))?;

        // [CLS] token -> pooler (dense + tanh) -> classification head
        let cls = hidden.i((.., 0)).map_err(inference_err("Failed to select [CLS]"))?;
        let pooled = self
            .pooler
            .forward(&cls)
            .and_then(|t| t.tanh())
            .map_err(inference_err("Pooler failed"))?;
        self.classifier
            .forward(&pooled)
            .map_err(inference_err("Classification head failed"))
    }
}

impl SequenceClassifier for BertSequenceClassifier {
    fn class_probabilities(&self, text: &str) -> Result<Vec<f32>> {
        let logits = self.logits(text)?;
        let probabilities = candle_nn::ops::softmax(&logits, D::Minus1)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(inference_err("Softmax failed"))?;
        debug!(model = %self.name, ?probabilities, "computed class probabilities");
        Ok(probabilities)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Locate config, tokenizer and weights, downloading from the Hub if needed
fn resolve_model_files(source: &ModelSourceSpec) -> Result<ModelFiles> {
    match source {
        ModelSourceSpec::Local { path } => resolve_local_files(path),
        ModelSourceSpec::HuggingFace { repo, revision } => {
            info!("Fetching model from HuggingFace: {} @ {}", repo, revision);

            let api = Api::new().map_err(model_err("Failed to initialize HuggingFace API"))?;
            let repo = api.repo(Repo::with_revision(
                repo.clone(),
                RepoType::Model,
                revision.clone(),
            ));

            let config = repo
                .get("config.json")
                .map_err(model_err("Failed to download config.json"))?;
            let tokenizer = repo
                .get("tokenizer.json")
                .map_err(model_err("Failed to download tokenizer.json"))?;
            let tokenizer_config = repo.get("tokenizer_config.json").ok();

            let (weights, pytorch_weights) = match repo.get("model.safetensors") {
                Ok(weights) => (weights, false),
                Err(e) => {
                    debug!("model.safetensors unavailable ({}), trying pytorch_model.bin", e);
                    let weights = repo
                        .get("pytorch_model.bin")
                        .map_err(model_err("Failed to download model weights"))?;
                    (weights, true)
                }
            };

            Ok(ModelFiles {
                config,
                tokenizer,
                weights,
                pytorch_weights,
                tokenizer_config,
            })
        }
    }
}

fn resolve_local_files(dir: &Path) -> Result<ModelFiles> {
    if !dir.is_dir() {
        return Err(Error::model(format!(
            "Model directory does not exist: {}",
            dir.display()
        )));
    }

    let require = |file: &str| -> Result<PathBuf> {
        let path = dir.join(file);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::model(format!("Missing {} in {}", file, dir.display())))
        }
    };

    let config = require("config.json")?;
    let tokenizer = require("tokenizer.json")?;
    let (weights, pytorch_weights) = match require("model.safetensors") {
        Ok(weights) => (weights, false),
        Err(_) => (require("pytorch_model.bin")?, true),
    };
    let tokenizer_config = require("tokenizer_config.json").ok();

    Ok(ModelFiles {
        config,
        tokenizer,
        weights,
        pytorch_weights,
        tokenizer_config,
    })
}
