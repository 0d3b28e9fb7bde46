use std::path::PathBuf;

use sentable_core::TableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("unsupported table format: {0}")]
    UnsupportedFormat(String),

    #[error("workbook has no worksheet: {0}")]
    NoWorksheet(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("xlsx export error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("table of {rows} rows and {columns} columns does not fit in one worksheet")]
    SheetLimit { rows: usize, columns: usize },

    #[error("table error: {0}")]
    Table(#[from] TableError),
}
