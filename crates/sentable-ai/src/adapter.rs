//! Classifier adapter: a single-text sentiment contract behind a lazily
//! loaded, process-lifetime model handle.
//!
//! Loading a model can mean a network download and an ONNX session build, so
//! it happens once. [`Classifier`] guards the load with a single
//! [`OnceCell`]: concurrent first callers block on the same initialization,
//! and a failed load leaves the cell empty so the user can retry the whole
//! operation later.

use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::OnceCell;
use sentable_core::Prediction;
use tracing::{info, warn};

use crate::error::ModelError;

/// Single-text sentiment inference.
///
/// Implementations may assume `text` is real text: callers filter out
/// non-textual cells before calling. A returned [`Prediction`] is always one
/// of the closed categories.
pub trait SentimentModel: Send + Sync {
    fn predict(&self, text: &str) -> Result<Prediction, ModelError>;
}

pub type LoadResult = Result<Arc<dyn SentimentModel>, ModelError>;

/// Acquires a model. Called at most once per successful [`Classifier`] load.
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> LoadResult;
}

impl<F> ModelLoader for F
where
    F: Fn() -> LoadResult + Send + Sync,
{
    fn load(&self) -> LoadResult {
        self()
    }
}

static GLOBAL: OnceCell<Classifier> = OnceCell::new();

/// Lazily loaded, shared sentiment classifier.
///
/// States: uninitialized until the first successful [`model`](Self::model)
/// call, ready afterwards. The loaded model is shared read-only.
pub struct Classifier {
    loader: Box<dyn ModelLoader>,
    model: OnceCell<Arc<dyn SentimentModel>>,
}

impl Classifier {
    /// A classifier that loads through `loader` on first use.
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            model: OnceCell::new(),
        }
    }

    /// A classifier that is already ready.
    pub fn from_model(model: Arc<dyn SentimentModel>) -> Self {
        let shared = Arc::clone(&model);
        Self {
            loader: Box::new(move || -> LoadResult { Ok(Arc::clone(&shared)) }),
            model: OnceCell::with_value(model),
        }
    }

    /// Install the process-wide classifier.
    ///
    /// The first install wins; later calls log a warning and return the
    /// existing handle. The model itself is still loaded lazily.
    pub fn install_global(loader: impl ModelLoader + 'static) -> &'static Classifier {
        let mut installed = false;
        let classifier = GLOBAL.get_or_init(|| {
            installed = true;
            Classifier::new(loader)
        });
        if !installed {
            warn!("global classifier already installed, ignoring new loader");
        }
        classifier
    }

    /// The process-wide classifier, if one has been installed.
    pub fn global() -> Option<&'static Classifier> {
        GLOBAL.get()
    }

    /// The loaded model, loading it on first call.
    pub fn model(&self) -> Result<&Arc<dyn SentimentModel>, ModelError> {
        self.model.get_or_try_init(|| {
            let start = Instant::now();
            info!("loading sentiment model");
            match self.loader.load() {
                Ok(model) => {
                    info!(
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "sentiment model ready"
                    );
                    Ok(model)
                }
                Err(e) => {
                    warn!(error = %e, "sentiment model failed to load");
                    Err(e)
                }
            }
        })
    }

    pub fn is_ready(&self) -> bool {
        self.model.get().is_some()
    }

    /// Classify one piece of text, loading the model if needed.
    pub fn classify(&self, text: &str) -> Result<Prediction, ModelError> {
        self.model()?.predict(text)
    }
}
