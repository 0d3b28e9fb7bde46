//! Builder for heterogeneous columns.
//!
//! A mixed column is a sparse union with one child per cell kind (see
//! [`crate::schema::mixed_cell_fields`]). Every child has the full column
//! length; the type id of each row selects which child holds its value.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Float64Builder, NullArray, StringBuilder,
    TimestampMillisecondBuilder, UnionArray,
};
use arrow::buffer::ScalarBuffer;
use arrow::error::ArrowError;

use crate::schema::{
    MIXED_BOOLEAN, MIXED_DATETIME, MIXED_EMPTY, MIXED_NUMBER, MIXED_TEXT, mixed_cell_fields,
};

/// Accumulates cells of any kind into a sparse union column.
pub struct MixedColumnBuilder {
    type_ids: Vec<i8>,
    text: StringBuilder,
    number: Float64Builder,
    boolean: BooleanBuilder,
    datetime: TimestampMillisecondBuilder,
}

impl Default for MixedColumnBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MixedColumnBuilder {
    pub fn new() -> Self {
        Self {
            type_ids: Vec::new(),
            text: StringBuilder::new(),
            number: Float64Builder::new(),
            boolean: BooleanBuilder::new(),
            datetime: TimestampMillisecondBuilder::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.type_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.type_ids.is_empty()
    }

    pub fn append_text(&mut self, value: &str) {
        self.push(MIXED_TEXT);
        self.text.append_value(value);
    }

    pub fn append_number(&mut self, value: f64) {
        self.push(MIXED_NUMBER);
        self.number.append_value(value);
    }

    pub fn append_boolean(&mut self, value: bool) {
        self.push(MIXED_BOOLEAN);
        self.boolean.append_value(value);
    }

    /// Append a timestamp in milliseconds since the Unix epoch (no timezone).
    pub fn append_datetime(&mut self, millis: i64) {
        self.push(MIXED_DATETIME);
        self.datetime.append_value(millis);
    }

    pub fn append_empty(&mut self) {
        self.push(MIXED_EMPTY);
    }

    /// Record the type id and pad every child except the selected one.
    fn push(&mut self, type_id: i8) {
        self.type_ids.push(type_id);
        if type_id != MIXED_TEXT {
            self.text.append_null();
        }
        if type_id != MIXED_NUMBER {
            self.number.append_null();
        }
        if type_id != MIXED_BOOLEAN {
            self.boolean.append_null();
        }
        if type_id != MIXED_DATETIME {
            self.datetime.append_null();
        }
    }

    pub fn finish(mut self) -> Result<ArrayRef, ArrowError> {
        let len = self.type_ids.len();
        // Child order must match `mixed_cell_fields`.
        let children: Vec<ArrayRef> = vec![
            Arc::new(self.text.finish()),
            Arc::new(self.number.finish()),
            Arc::new(self.boolean.finish()),
            Arc::new(self.datetime.finish()),
            Arc::new(NullArray::new(len)),
        ];
        let union = UnionArray::try_new(
            mixed_cell_fields()?,
            ScalarBuffer::from(self.type_ids),
            None,
            children,
        )?;
        Ok(Arc::new(union))
    }
}
