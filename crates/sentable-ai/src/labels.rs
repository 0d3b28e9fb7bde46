//! Mapping from a model's class ids onto the closed category set.
//!
//! Sequence-classification models ship a `config.json` with an `id2label`
//! table. Each entry must resolve to a [`Category`], either through
//! [`Category::from_label`] or an explicit override; a model with any
//! unresolvable class is rejected at load time so inference can never emit a
//! label outside the set.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use sentable_core::{Category, Prediction};
use serde::Deserialize;

use crate::error::ModelError;

#[derive(Deserialize)]
struct ModelConfig {
    id2label: BTreeMap<String, String>,
}

/// Class id → category table for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVocabulary {
    by_id: Vec<Category>,
}

impl LabelVocabulary {
    /// Build from raw `id → label` pairs.
    ///
    /// Ids must be contiguous from 0. Overrides are matched on the exact
    /// label first, then case-insensitively.
    pub fn new(
        id2label: &BTreeMap<usize, String>,
        overrides: &HashMap<String, Category>,
    ) -> Result<Self, ModelError> {
        if id2label.is_empty() {
            return Err(ModelError::Vocabulary("id2label is empty".into()));
        }

        let mut by_id = Vec::with_capacity(id2label.len());
        for (expected, (&id, label)) in id2label.iter().enumerate() {
            if id != expected {
                return Err(ModelError::Vocabulary(format!(
                    "class ids are not contiguous: expected {expected}, found {id}"
                )));
            }
            let category = lookup_override(overrides, label)
                .or_else(|| Category::from_label(label))
                .ok_or_else(|| {
                    ModelError::Vocabulary(format!(
                        "class {id} has label {label:?} with no sentiment category \
                         (map it with LABEL=CATEGORY)"
                    ))
                })?;
            by_id.push(category);
        }

        Ok(Self { by_id })
    }

    /// Parse the `id2label` table out of a model `config.json`.
    pub fn from_config_json(
        json: &str,
        overrides: &HashMap<String, Category>,
    ) -> Result<Self, ModelError> {
        let config: ModelConfig = serde_json::from_str(json)
            .map_err(|e| ModelError::Vocabulary(format!("config.json: {e}")))?;

        let mut id2label = BTreeMap::new();
        for (key, label) in config.id2label {
            let id: usize = key
                .parse()
                .map_err(|_| ModelError::Vocabulary(format!("non-numeric class id {key:?}")))?;
            id2label.insert(id, label);
        }
        Self::new(&id2label, overrides)
    }

    pub fn from_config_file(
        path: &Path,
        overrides: &HashMap<String, Category>,
    ) -> Result<Self, ModelError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ModelError::Load(format!("read {}: {e}", path.display())))?;
        Self::from_config_json(&json, overrides)
    }

    /// Number of model classes.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn category(&self, id: usize) -> Option<Category> {
        self.by_id.get(id).copied()
    }

    /// Turn one row of logits into a prediction: softmax, then argmax.
    pub fn pick(&self, logits: &[f32]) -> Result<Prediction, ModelError> {
        if logits.len() != self.by_id.len() {
            return Err(ModelError::Inference(format!(
                "model returned {} logits for {} classes",
                logits.len(),
                self.by_id.len()
            )));
        }

        let probs = softmax(logits);
        let (best, &p) = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .ok_or_else(|| ModelError::Inference("empty logits".into()))?;

        Ok(Prediction::new(self.by_id[best], p))
    }
}

fn lookup_override(overrides: &HashMap<String, Category>, label: &str) -> Option<Category> {
    overrides.get(label).copied().or_else(|| {
        overrides
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(label))
            .map(|(_, &c)| c)
    })
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 {
        exps.into_iter().map(|e| e / sum).collect()
    } else {
        exps
    }
}

/// Parse a `LABEL=CATEGORY` override, as given on the command line.
pub fn parse_label_override(s: &str) -> Result<(String, Category), String> {
    let (label, category) = s
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=CATEGORY, got {s:?}"))?;
    let label = label.trim();
    if label.is_empty() {
        return Err(format!("empty label in {s:?}"));
    }
    let category = category.parse::<Category>().map_err(|e| e.to_string())?;
    Ok((label.to_string(), category))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_overrides() -> HashMap<String, Category> {
        HashMap::new()
    }

    #[test]
    fn softmax_sums_to_one() {
        let p = softmax(&[2.0, 1.0, 0.1]);
        let sum: f32 = p.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(p[0] > p[1] && p[1] > p[2]);
    }

    #[test]
    fn softmax_handles_large_logits() {
        let p = softmax(&[1000.0, 1000.0]);
        assert!((p[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn parses_config_json() {
        let json = r#"{
            "architectures": ["XLMRobertaForSequenceClassification"],
            "id2label": {"0": "Negative", "1": "Neutral", "2": "Positive"}
        }"#;
        let vocab = LabelVocabulary::from_config_json(json, &no_overrides()).unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.category(0), Some(Category::Negative));
        assert_eq!(vocab.category(2), Some(Category::Positive));
        assert_eq!(vocab.category(3), None);
    }

    #[test]
    fn numeric_ids_sorted_not_lexically() {
        let mut id2label = BTreeMap::new();
        for i in 0..12 {
            id2label.insert(i, if i % 2 == 0 { "pos" } else { "neg" }.to_string());
        }
        let vocab = LabelVocabulary::new(&id2label, &no_overrides()).unwrap();
        assert_eq!(vocab.category(10), Some(Category::Positive));
        assert_eq!(vocab.category(11), Some(Category::Negative));
    }

    #[test]
    fn unmapped_label_rejected() {
        let json = r#"{"id2label": {"0": "pos", "1": "neg", "2": "neu", "3": "q"}}"#;
        let err = LabelVocabulary::from_config_json(json, &no_overrides()).unwrap_err();
        assert!(matches!(err, ModelError::Vocabulary(msg) if msg.contains("\"q\"")));
    }

    #[test]
    fn override_maps_generic_labels() {
        let json = r#"{"id2label": {"0": "LABEL_0", "1": "LABEL_1", "2": "LABEL_2"}}"#;
        let overrides: HashMap<String, Category> = [
            ("LABEL_0".to_string(), Category::Negative),
            ("label_1".to_string(), Category::Neutral),
            ("LABEL_2".to_string(), Category::Positive),
        ]
        .into();
        let vocab = LabelVocabulary::from_config_json(json, &overrides).unwrap();
        assert_eq!(vocab.category(1), Some(Category::Neutral));
    }

    #[test]
    fn gap_in_ids_rejected() {
        let json = r#"{"id2label": {"0": "pos", "2": "neg"}}"#;
        assert!(LabelVocabulary::from_config_json(json, &no_overrides()).is_err());
    }

    #[test]
    fn pick_takes_argmax() {
        let json = r#"{"id2label": {"0": "Negative", "1": "Neutral", "2": "Positive"}}"#;
        let vocab = LabelVocabulary::from_config_json(json, &no_overrides()).unwrap();
        let p = vocab.pick(&[-1.0, 0.5, 3.0]).unwrap();
        assert_eq!(p.category, Category::Positive);
        assert!(p.confidence > 0.8 && p.confidence <= 1.0);

        assert!(matches!(
            vocab.pick(&[1.0, 2.0]),
            Err(ModelError::Inference(_))
        ));
    }

    #[test]
    fn label_override_parsing() {
        assert_eq!(
            parse_label_override("LABEL_0=negative").unwrap(),
            ("LABEL_0".to_string(), Category::Negative)
        );
        assert!(parse_label_override("LABEL_0").is_err());
        assert!(parse_label_override("=positive").is_err());
        assert!(parse_label_override("q=question").is_err());
    }
}
