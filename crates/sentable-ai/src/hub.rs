//! Model download from the Hugging Face hub.
//!
//! Files land in `{cache_dir}/{org}--{name}/` under their local names and are
//! reused on later runs. Each file is written to a temp file in the same
//! directory and renamed into place, so an interrupted download never leaves
//! a truncated model behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{CONFIG_FILE, MODEL_FILE, TOKENIZER_FILE};
use crate::error::ModelError;

const HUB_URL: &str = "https://huggingface.co";

/// Download (if missing) the files the ONNX classifier needs and return the
/// local model directory.
///
/// Reads an access token from `HF_TOKEN` when set, for gated repositories.
pub fn fetch_model(
    repo: &str,
    revision: &str,
    cache_dir: &Path,
    onnx_file: &str,
) -> Result<PathBuf, ModelError> {
    let dir = model_cache_dir(cache_dir, repo);
    std::fs::create_dir_all(&dir)
        .map_err(|e| ModelError::Fetch(format!("create {}: {e}", dir.display())))?;

    let files = [
        (onnx_file, MODEL_FILE),
        (TOKENIZER_FILE, TOKENIZER_FILE),
        (CONFIG_FILE, CONFIG_FILE),
    ];

    let token = std::env::var("HF_TOKEN").ok();
    let client = reqwest::blocking::Client::new();

    for (remote, local) in files {
        let target = dir.join(local);
        if target.exists() {
            debug!(file = %target.display(), "model file cached");
            continue;
        }

        let url = format!("{HUB_URL}/{repo}/resolve/{revision}/{remote}");
        info!(url = %url, "downloading model file");

        let mut request = client.get(&url);
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }
        let resp = request
            .send()
            .map_err(|e| ModelError::Fetch(format!("{url}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ModelError::Fetch(format!("{url}: server returned {status}")));
        }
        let bytes = resp
            .bytes()
            .map_err(|e| ModelError::Fetch(format!("{url}: {e}")))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| ModelError::Fetch(format!("temp file in {}: {e}", dir.display())))?;
        tmp.write_all(&bytes)
            .map_err(|e| ModelError::Fetch(format!("write {local}: {e}")))?;
        tmp.persist(&target)
            .map_err(|e| ModelError::Fetch(format!("persist {}: {e}", target.display())))?;

        info!(file = %target.display(), bytes = bytes.len(), "downloaded model file");
    }

    Ok(dir)
}

/// Cache directory for a repository: `org/name` becomes `org--name`.
pub fn model_cache_dir(cache_dir: &Path, repo: &str) -> PathBuf {
    cache_dir.join(repo.replace('/', "--"))
}
