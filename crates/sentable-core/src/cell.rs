//! Typed view of a single table cell.
//!
//! Arrow columns are typed, but a column ingested from a spreadsheet may mix
//! text, numbers, and blanks. Those columns arrive as sparse union arrays and
//! [`Cell::at`] resolves the union member for each row, so callers only ever
//! match on one flat enum.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float16Type, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type,
    UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};
use arrow::error::ArrowError;

/// The value at one row of one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Boolean(bool),
    /// Dates, times, timestamps, durations.
    Temporal,
    /// Null, or a member of the `Null` type.
    Empty,
    /// Any other Arrow type (binary, nested, decimal, ...).
    Other,
}

impl<'a> Cell<'a> {
    /// Read the cell at `row`.
    ///
    /// Dictionary-encoded columns resolve to [`Cell::Other`]; decode them
    /// first with [`decode_dictionary`].
    pub fn at(array: &'a dyn Array, row: usize) -> Cell<'a> {
        if let Some(union) = array.as_union_opt() {
            let type_id = union.type_id(row);
            let offset = union.value_offset(row);
            return Cell::at(union.child(type_id).as_ref(), offset);
        }

        if array.is_null(row) {
            return Cell::Empty;
        }

        match array.data_type() {
            DataType::Null => Cell::Empty,
            DataType::Utf8 => Cell::Text(array.as_string::<i32>().value(row)),
            DataType::LargeUtf8 => Cell::Text(array.as_string::<i64>().value(row)),
            DataType::Utf8View => Cell::Text(array.as_string_view().value(row)),
            DataType::Boolean => Cell::Boolean(array.as_boolean().value(row)),
            DataType::Int8 => Cell::Number(array.as_primitive::<Int8Type>().value(row) as f64),
            DataType::Int16 => Cell::Number(array.as_primitive::<Int16Type>().value(row) as f64),
            DataType::Int32 => Cell::Number(array.as_primitive::<Int32Type>().value(row) as f64),
            DataType::Int64 => Cell::Number(array.as_primitive::<Int64Type>().value(row) as f64),
            DataType::UInt8 => Cell::Number(array.as_primitive::<UInt8Type>().value(row) as f64),
            DataType::UInt16 => Cell::Number(array.as_primitive::<UInt16Type>().value(row) as f64),
            DataType::UInt32 => Cell::Number(array.as_primitive::<UInt32Type>().value(row) as f64),
            DataType::UInt64 => Cell::Number(array.as_primitive::<UInt64Type>().value(row) as f64),
            DataType::Float16 => {
                Cell::Number(array.as_primitive::<Float16Type>().value(row).to_f64())
            }
            DataType::Float32 => {
                Cell::Number(array.as_primitive::<Float32Type>().value(row) as f64)
            }
            DataType::Float64 => Cell::Number(array.as_primitive::<Float64Type>().value(row)),
            DataType::Date32
            | DataType::Date64
            | DataType::Time32(_)
            | DataType::Time64(_)
            | DataType::Timestamp(_, _)
            | DataType::Duration(_)
            | DataType::Interval(_) => Cell::Temporal,
            _ => Cell::Other,
        }
    }

    /// The text content, if this is a textual cell.
    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Cell::Text(_))
    }
}

/// Decode a dictionary-encoded column to its value type; other columns are
/// returned unchanged (an `Arc` clone).
///
/// Parquet writers commonly dictionary-encode string columns, and
/// [`Cell::at`] reads plain arrays only.
pub fn decode_dictionary(array: &ArrayRef) -> Result<ArrayRef, ArrowError> {
    match array.data_type() {
        DataType::Dictionary(_, value_type) => arrow::compute::cast(array, value_type.as_ref()),
        _ => Ok(Arc::clone(array)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixed::MixedColumnBuilder;
    use arrow::array::{
        BooleanArray, Date32Array, DictionaryArray, Float64Array, Int64Array, LargeStringArray,
        NullArray, StringArray,
    };
    use arrow::datatypes::Int32Type;

    #[test]
    fn string_cells_are_text() {
        let arr = StringArray::from(vec![Some("good"), None]);
        assert_eq!(Cell::at(&arr, 0), Cell::Text("good"));
        assert_eq!(Cell::at(&arr, 1), Cell::Empty);

        let large = LargeStringArray::from(vec!["bad"]);
        assert_eq!(Cell::at(&large, 0).as_text(), Some("bad"));
    }

    #[test]
    fn numeric_and_boolean_cells() {
        let ints = Int64Array::from(vec![42]);
        assert_eq!(Cell::at(&ints, 0), Cell::Number(42.0));

        let floats = Float64Array::from(vec![Some(1.5), None]);
        assert_eq!(Cell::at(&floats, 0), Cell::Number(1.5));
        assert_eq!(Cell::at(&floats, 1), Cell::Empty);

        let bools = BooleanArray::from(vec![true]);
        assert_eq!(Cell::at(&bools, 0), Cell::Boolean(true));
    }

    #[test]
    fn temporal_and_null_cells() {
        let dates = Date32Array::from(vec![19000]);
        assert_eq!(Cell::at(&dates, 0), Cell::Temporal);

        let nulls = NullArray::new(2);
        assert_eq!(Cell::at(&nulls, 1), Cell::Empty);
    }

    #[test]
    fn union_cells_resolve_member() {
        let mut builder = MixedColumnBuilder::new();
        builder.append_text("Great!");
        builder.append_number(42.0);
        builder.append_empty();
        builder.append_boolean(false);
        let col = builder.finish().unwrap();

        assert_eq!(Cell::at(col.as_ref(), 0), Cell::Text("Great!"));
        assert_eq!(Cell::at(col.as_ref(), 1), Cell::Number(42.0));
        assert_eq!(Cell::at(col.as_ref(), 2), Cell::Empty);
        assert_eq!(Cell::at(col.as_ref(), 3), Cell::Boolean(false));
        assert!(!Cell::at(col.as_ref(), 1).is_text());
    }

    #[test]
    fn dictionary_decodes_to_text() {
        let dict: DictionaryArray<Int32Type> = vec!["a", "b", "a"].into_iter().collect();
        let arr: ArrayRef = Arc::new(dict);
        assert_eq!(Cell::at(arr.as_ref(), 0), Cell::Other);

        let decoded = decode_dictionary(&arr).unwrap();
        assert_eq!(Cell::at(decoded.as_ref(), 2), Cell::Text("a"));
    }

    #[test]
    fn decode_passes_plain_columns_through() {
        let arr: ArrayRef = Arc::new(StringArray::from(vec!["x"]));
        let out = decode_dictionary(&arr).unwrap();
        assert!(Arc::ptr_eq(&arr, &out));
    }
}
