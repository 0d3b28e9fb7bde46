use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use sentable_core::Table;
use tracing::{debug, info};

use crate::StoreError;
use crate::format::TableFormat;
use crate::xlsx::read_xlsx;

/// Read any supported file into a table, choosing the reader by extension.
pub fn read_table(path: &Path) -> Result<Table, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let table = match TableFormat::from_path(path)? {
        TableFormat::Parquet => read_parquet(path)?,
        TableFormat::Csv => read_csv(path)?,
        TableFormat::Spreadsheet => read_xlsx(path)?,
    };
    info!(
        rows = table.num_rows(),
        columns = table.num_columns(),
        path = %path.display(),
        "read table"
    );
    Ok(table)
}

/// Read a Parquet file. The schema comes from the file footer, so empty
/// files still yield their columns.
pub fn read_parquet(path: &Path) -> Result<Table, StoreError> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = Arc::clone(builder.schema());
    let reader = builder.build()?;
    let batches: Result<Vec<RecordBatch>, _> = reader.collect();
    Ok(Table::try_new(schema, batches?)?)
}

/// Read a CSV file with a header row, inferring column types.
///
/// Inference scans every record: a column whose text only starts late in
/// the file must still come out as Utf8.
pub fn read_csv(path: &Path) -> Result<Table, StoreError> {
    let mut file = File::open(path)?;
    let (schema, records) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, None)?;
    debug!(records, columns = schema.fields().len(), "inferred csv schema");
    file.seek(SeekFrom::Start(0))?;

    let schema = Arc::new(schema);
    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_header(true)
        .build(file)?;
    let batches: Result<Vec<RecordBatch>, _> = reader.collect();
    Ok(Table::try_new(schema, batches?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::DataType;
    use sentable_core::Cell;
    use tempfile::TempDir;

    #[test]
    fn missing_file_errors() {
        let err = read_table(Path::new("/nonexistent/reviews.csv")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn unsupported_extension_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("reviews.txt");
        std::fs::write(&path, "comment\nhello\n").unwrap();
        assert!(matches!(
            read_table(&path),
            Err(StoreError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn csv_infers_types_and_nulls() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("reviews.csv");
        std::fs::write(
            &path,
            "id,comment,score\n1,Great!,4.5\n2,,3\n3,\"Terrible, really\",1\n",
        )
        .unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.column_names(), vec!["id", "comment", "score"]);

        let schema = table.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Int64);
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(2).data_type(), &DataType::Float64);

        let comment = table.batches()[0].column(1);
        assert_eq!(Cell::at(comment.as_ref(), 0), Cell::Text("Great!"));
        assert_eq!(Cell::at(comment.as_ref(), 1), Cell::Empty);
        assert_eq!(Cell::at(comment.as_ref(), 2), Cell::Text("Terrible, really"));
    }

    #[test]
    fn csv_text_after_long_numeric_run_stays_text() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("late_text.csv");
        let mut body = String::from("comment\n");
        for i in 0..1200 {
            body.push_str(&format!("{i}\n"));
        }
        body.push_str("Great!\n");
        std::fs::write(&path, body).unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.num_rows(), 1201);
        assert_eq!(table.schema().field(0).data_type(), &DataType::Utf8);

        let last = table.batches().last().unwrap();
        let comment = last.column(0);
        assert_eq!(
            Cell::at(comment.as_ref(), last.num_rows() - 1),
            Cell::Text("Great!")
        );
    }
}
