use crate::category::Category;

/// A classifier's answer for one piece of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub category: Category,
    /// Always within `[0, 1]`.
    pub confidence: f32,
}

impl Prediction {
    /// Build a prediction, clamping the confidence into `[0, 1]`.
    /// NaN becomes 0.
    pub fn new(category: Category, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            category,
            confidence,
        }
    }
}

/// Per-cell outcome of a batch run.
///
/// `Absent` means the cell was not text and the classifier was never asked.
/// It is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ClassificationResult {
    Labeled(Prediction),
    #[default]
    Absent,
}

impl ClassificationResult {
    pub fn category(&self) -> Option<Category> {
        match self {
            Self::Labeled(p) => Some(p.category),
            Self::Absent => None,
        }
    }

    pub fn confidence(&self) -> Option<f32> {
        match self {
            Self::Labeled(p) => Some(p.confidence),
            Self::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl From<Prediction> for ClassificationResult {
    fn from(p: Prediction) -> Self {
        Self::Labeled(p)
    }
}
