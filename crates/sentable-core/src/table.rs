//! In-memory table: one schema, any number of record batches.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("record batch {batch} does not match the table schema")]
    SchemaMismatch { batch: usize },

    #[error("cannot infer a schema from zero record batches")]
    NoBatches,
}

/// A tabular dataset held as Arrow record batches.
///
/// Every batch has exactly the table's fields, so the column set is uniform
/// across all records. A table with no batches still has a schema.
#[derive(Debug, Clone)]
pub struct Table {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Table {
    /// Build a table, checking every batch against `schema`.
    ///
    /// Field lists are compared; schema metadata is ignored.
    pub fn try_new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<Self, TableError> {
        for (i, batch) in batches.iter().enumerate() {
            if batch.schema().fields() != schema.fields() {
                return Err(TableError::SchemaMismatch { batch: i });
            }
        }
        Ok(Self { schema, batches })
    }

    /// Build a table taking the schema of the first batch.
    pub fn from_batches(batches: Vec<RecordBatch>) -> Result<Self, TableError> {
        let schema = batches.first().ok_or(TableError::NoBatches)?.schema();
        Self::try_new(schema, batches)
    }

    /// A table with columns but no rows.
    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            schema,
            batches: Vec::new(),
        }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn into_batches(self) -> Vec<RecordBatch> {
        self.batches
    }

    /// Total rows across all batches.
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.index_of(name).ok()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }
}
