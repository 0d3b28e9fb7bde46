//! Where the classifier comes from and how it is run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sentable_core::Category;

use crate::error::ModelError;

/// Default token limit for XLM-R style encoders.
pub const DEFAULT_MAX_LENGTH: usize = 512;
pub const DEFAULT_REVISION: &str = "main";
/// Path of the ONNX export inside a hub repository.
pub const DEFAULT_ONNX_FILE: &str = "onnx/model.onnx";

/// Local file names inside a model directory.
pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// A directory already holding `model.onnx`, `tokenizer.json`, `config.json`.
    Local(PathBuf),
    /// A Hugging Face hub repository, downloaded into `cache_dir` on first use.
    Hub {
        repo: String,
        revision: String,
        cache_dir: PathBuf,
    },
}

impl ModelSource {
    /// Resolve to a local model directory, downloading if necessary.
    pub fn resolve(&self, onnx_file: &str) -> Result<PathBuf, ModelError> {
        match self {
            Self::Local(dir) => Ok(dir.clone()),
            #[cfg(feature = "hub")]
            Self::Hub {
                repo,
                revision,
                cache_dir,
            } => crate::hub::fetch_model(repo, revision, cache_dir, onnx_file),
            #[cfg(not(feature = "hub"))]
            Self::Hub { repo, .. } => {
                let _ = onnx_file;
                Err(ModelError::Fetch(format!(
                    "cannot download {repo}: built without the `hub` feature"
                )))
            }
        }
    }
}

/// Everything needed to build the ONNX classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub source: ModelSource,
    /// Tokens kept per input; longer text is truncated.
    pub max_length: usize,
    /// Model label → category, for models whose labels are not
    /// recognizable sentiment names.
    pub label_overrides: HashMap<String, Category>,
    /// ONNX file path inside a hub repository.
    pub onnx_file: String,
}

impl ClassifierConfig {
    pub fn local(model_dir: impl Into<PathBuf>) -> Self {
        Self::with_source(ModelSource::Local(model_dir.into()))
    }

    pub fn hub(repo: impl Into<String>, cache_dir: &Path) -> Self {
        Self::with_source(ModelSource::Hub {
            repo: repo.into(),
            revision: DEFAULT_REVISION.to_string(),
            cache_dir: cache_dir.to_path_buf(),
        })
    }

    fn with_source(source: ModelSource) -> Self {
        Self {
            source,
            max_length: DEFAULT_MAX_LENGTH,
            label_overrides: HashMap::new(),
            onnx_file: DEFAULT_ONNX_FILE.to_string(),
        }
    }
}
