//! The closed sentiment category set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A sentiment category. The set is closed: classifiers map onto it and
/// aggregation enumerates it, nothing else is ever emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Positive,
    Negative,
    Neutral,
}

impl Category {
    /// Every category, in presentation order.
    pub const ALL: [Category; 3] = [Category::Positive, Category::Negative, Category::Neutral];

    /// Canonical label written to the `sentiment` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
        }
    }

    /// Position in [`Category::ALL`].
    pub fn index(self) -> usize {
        match self {
            Self::Positive => 0,
            Self::Negative => 1,
            Self::Neutral => 2,
        }
    }

    /// Map a model or table label onto a category.
    ///
    /// Case-insensitive; accepts the canonical names and the short forms
    /// common in sentiment datasets (`pos`, `neg`, `neu`).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" => Some(Self::Positive),
            "negative" | "neg" => Some(Self::Negative),
            "neutral" | "neu" => Some(Self::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sentiment category: {0:?}")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_round_trip() {
        for cat in Category::ALL {
            assert_eq!(cat.as_str().parse::<Category>().unwrap(), cat);
        }
    }

    #[test]
    fn aliases_are_case_insensitive() {
        assert_eq!(Category::from_label("POS"), Some(Category::Positive));
        assert_eq!(Category::from_label(" negative "), Some(Category::Negative));
        assert_eq!(Category::from_label("Neu"), Some(Category::Neutral));
    }

    #[test]
    fn unknown_label_rejected() {
        assert_eq!(Category::from_label("q"), None);
        let err = "mixed".parse::<Category>().unwrap_err();
        assert_eq!(err.0, "mixed");
    }

    #[test]
    fn index_matches_all_order() {
        for (i, cat) in Category::ALL.iter().enumerate() {
            assert_eq!(cat.index(), i);
        }
    }

    #[test]
    fn serializes_as_variant_name() {
        let json = serde_json::to_string(&Category::Neutral).unwrap();
        assert_eq!(json, "\"Neutral\"");
    }
}
