//! ONNX Runtime sentiment classifier for sequence-classification models.
//!
//! The model directory must contain `model.onnx`, `tokenizer.json`, and
//! `config.json` (for `id2label`). Works with BERT-style exports that take
//! `token_type_ids` and XLM-R/RoBERTa exports that do not.

use std::path::Path;
use std::sync::{Arc, Mutex};

use ort::session::Session;
use ort::value::Tensor;
use sentable_core::Prediction;
use tokenizers::Tokenizer;
use tracing::info;

use crate::adapter::{LoadResult, ModelLoader, SentimentModel};
use crate::config::{CONFIG_FILE, ClassifierConfig, MODEL_FILE, TOKENIZER_FILE};
use crate::error::ModelError;
use crate::labels::LabelVocabulary;

/// Sentiment classifier backed by an ONNX sequence-classification model.
pub struct OnnxSentimentModel {
    // `Session::run` needs exclusive access.
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    labels: LabelVocabulary,
    uses_token_type_ids: bool,
}

impl OnnxSentimentModel {
    /// Load a classifier from a directory containing `model.onnx`,
    /// `tokenizer.json`, and `config.json`.
    pub fn load(model_dir: &Path, config: &ClassifierConfig) -> anyhow::Result<Self> {
        let model_path = model_dir.join(MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);
        let config_path = model_dir.join(CONFIG_FILE);

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );
        anyhow::ensure!(config_path.exists(), "config.json not found in {model_dir:?}");

        let labels = LabelVocabulary::from_config_file(&config_path, &config.label_overrides)?;

        let session = Session::builder()?.commit_from_file(&model_path)?;
        let uses_token_type_ids = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: config.max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;
        // Single-text inference never needs padding.
        tokenizer.with_padding(None);

        info!(
            classes = labels.len(),
            max_length = config.max_length,
            model = %model_path.display(),
            "loaded sentiment model"
        );
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            labels,
            uses_token_type_ids,
        })
    }

    pub fn labels(&self) -> &LabelVocabulary {
        &self.labels
    }
}

impl SentimentModel for OnnxSentimentModel {
    fn predict(&self, text: &str) -> Result<Prediction, ModelError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ModelError::Inference(format!("tokenize: {e}")))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> = encoding.get_type_ids().iter().map(|&t| t as i64).collect();

        let shape = [1i64, input_ids.len() as i64];
        let ids_tensor = Tensor::from_array((shape, input_ids.into_boxed_slice()))
            .map_err(inference_error)?;
        let mask_tensor = Tensor::from_array((shape, attention_mask.into_boxed_slice()))
            .map_err(inference_error)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::Inference("session lock poisoned".into()))?;

        let run = if self.uses_token_type_ids {
            let type_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))
                .map_err(inference_error)?;
            session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
                "token_type_ids" => type_tensor,
            ])
        } else {
            session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
            ])
        };
        let outputs = run.map_err(inference_error)?;

        // Logits: [1, num_labels].
        let (output_shape, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference_error)?;
        let dims: &[i64] = output_shape;
        if dims.len() != 2 || dims[0] != 1 {
            return Err(ModelError::Inference(format!(
                "unexpected output shape: {dims:?}, expected [1, {}]",
                self.labels.len()
            )));
        }

        self.labels.pick(logits)
    }
}

fn inference_error(e: ort::Error) -> ModelError {
    ModelError::Inference(e.to_string())
}

/// Loader that resolves the configured source and builds an
/// [`OnnxSentimentModel`].
pub struct OnnxLoader {
    config: ClassifierConfig,
}

impl OnnxLoader {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }
}

impl ModelLoader for OnnxLoader {
    fn load(&self) -> LoadResult {
        let dir = self.config.source.resolve(&self.config.onnx_file)?;
        let model = OnnxSentimentModel::load(&dir, &self.config).map_err(|e| {
            match e.downcast::<ModelError>() {
                Ok(model_error) => model_error,
                Err(other) => ModelError::Load(format!("{other:#}")),
            }
        })?;
        Ok(Arc::new(model))
    }
}
