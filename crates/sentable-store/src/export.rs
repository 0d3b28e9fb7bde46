use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, StringBuilder};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use parquet::arrow::ArrowWriter;
use sentable_core::{Cell, Table};
use tracing::info;

use crate::StoreError;
use crate::format::TableFormat;
use crate::xlsx::write_xlsx;

/// Write a table to `path`, choosing the writer by extension.
pub fn write_table(table: &Table, path: &Path) -> Result<(), StoreError> {
    match TableFormat::for_output(path)? {
        TableFormat::Parquet => write_parquet(table, path)?,
        TableFormat::Csv => write_csv(table, path)?,
        TableFormat::Spreadsheet => write_xlsx(table, path)?,
    }
    info!(rows = table.num_rows(), path = %path.display(), "wrote table");
    Ok(())
}

/// Write a table as Parquet. Mixed (union) columns are written as text.
pub fn write_parquet(table: &Table, path: &Path) -> Result<(), StoreError> {
    let table = flatten_unions(table)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, Arc::clone(table.schema()), None)?;
    for batch in table.batches() {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(())
}

/// Write a table as CSV with a header row. Mixed (union) columns are
/// written as text.
pub fn write_csv(table: &Table, path: &Path) -> Result<(), StoreError> {
    let table = flatten_unions(table)?;
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    if table.batches().is_empty() {
        // The writer emits the header with the first batch.
        writer.write(&RecordBatch::new_empty(Arc::clone(table.schema())))?;
    }
    for batch in table.batches() {
        writer.write(batch)?;
    }
    Ok(())
}

/// Replace every union column with a nullable Utf8 column holding each
/// cell's display form. Neither Parquet nor CSV can store unions.
pub fn flatten_unions(table: &Table) -> Result<Table, StoreError> {
    let schema = table.schema();
    let union_cols: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| matches!(f.data_type(), DataType::Union(_, _)))
        .map(|(i, _)| i)
        .collect();
    if union_cols.is_empty() {
        return Ok(table.clone());
    }

    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, f)| {
            if union_cols.contains(&i) {
                Field::new(f.name(), DataType::Utf8, true)
            } else {
                f.as_ref().clone()
            }
        })
        .collect();
    let flat_schema = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));

    let mut batches = Vec::with_capacity(table.batches().len());
    for batch in table.batches() {
        let mut columns = batch.columns().to_vec();
        for &i in &union_cols {
            columns[i] = union_to_text(batch.column(i))?;
        }
        batches.push(RecordBatch::try_new(Arc::clone(&flat_schema), columns)?);
    }
    Ok(Table::try_new(flat_schema, batches)?)
}

fn union_to_text(array: &ArrayRef) -> Result<ArrayRef, StoreError> {
    let union = array.as_union();
    let options = FormatOptions::default();
    let mut out = StringBuilder::with_capacity(union.len(), union.len() * 8);

    for row in 0..union.len() {
        let type_id = union.type_id(row);
        let offset = union.value_offset(row);
        let child = union.child(type_id);
        match Cell::at(child.as_ref(), offset) {
            Cell::Empty => out.append_null(),
            Cell::Text(s) => out.append_value(s),
            Cell::Number(n) => out.append_value(format!("{n}")),
            Cell::Boolean(b) => out.append_value(if b { "true" } else { "false" }),
            Cell::Temporal | Cell::Other => {
                let formatter = ArrayFormatter::try_new(child.as_ref(), &options)?;
                out.append_value(formatter.value(offset).to_string());
            }
        }
    }
    Ok(Arc::new(out.finish()))
}
