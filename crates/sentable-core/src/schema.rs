//! Arrow schema pieces written and read by the engine.

use arrow::datatypes::{DataType, Field, TimeUnit, UnionFields, UnionMode};
use arrow::error::ArrowError;

/// Column holding the predicted category label.
pub const SENTIMENT_COLUMN: &str = "sentiment";
/// Column holding the prediction confidence.
pub const CONFIDENCE_COLUMN: &str = "confidence";

/// `sentiment`: nullable Utf8 (null for absent results).
pub fn sentiment_field() -> Field {
    Field::new(SENTIMENT_COLUMN, DataType::Utf8, true)
}

/// `confidence`: nullable Float32 in `[0, 1]`.
pub fn confidence_field() -> Field {
    Field::new(CONFIDENCE_COLUMN, DataType::Float32, true)
}

// ── Mixed-type columns ──

pub const MIXED_TEXT: i8 = 0;
pub const MIXED_NUMBER: i8 = 1;
pub const MIXED_BOOLEAN: i8 = 2;
pub const MIXED_DATETIME: i8 = 3;
pub const MIXED_EMPTY: i8 = 4;

/// Union members of a mixed column, in type-id order.
pub fn mixed_cell_fields() -> Result<UnionFields, ArrowError> {
    UnionFields::try_new(
        [MIXED_TEXT, MIXED_NUMBER, MIXED_BOOLEAN, MIXED_DATETIME, MIXED_EMPTY],
        [
            Field::new("text", DataType::Utf8, true),
            Field::new("number", DataType::Float64, true),
            Field::new("boolean", DataType::Boolean, true),
            Field::new(
                "datetime",
                DataType::Timestamp(TimeUnit::Millisecond, None),
                true,
            ),
            Field::new("empty", DataType::Null, true),
        ],
    )
}

/// Sparse union type used for heterogeneous columns.
pub fn mixed_cell_type() -> Result<DataType, ArrowError> {
    Ok(DataType::Union(mixed_cell_fields()?, UnionMode::Sparse))
}
