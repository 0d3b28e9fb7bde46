//! Sentiment inference layer: a lazily loaded classifier adapter (ONNX
//! Runtime behind the `onnx` feature), the batch runner that applies it to a
//! table column, and category aggregation.

pub mod adapter;
pub mod aggregate;
pub mod config;
mod error;
pub mod labels;
pub mod runner;

#[cfg(feature = "hub")]
pub mod hub;
#[cfg(feature = "onnx")]
mod onnx;

pub use adapter::{Classifier, LoadResult, ModelLoader, SentimentModel};
pub use aggregate::{AggregateCounts, aggregate_table};
pub use config::{ClassifierConfig, ModelSource};
pub use error::{EngineError, ModelError};
pub use runner::{AugmentedTable, RunOptions, aggregate, run_batch, run_batch_with};

#[cfg(feature = "onnx")]
pub use onnx::{OnnxLoader, OnnxSentimentModel};
