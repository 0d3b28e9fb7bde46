//! Storage layer: reads Parquet, CSV, and spreadsheet files into a [`Table`]
//! and writes augmented tables back out as Parquet, CSV, or xlsx.
//!
//! [`Table`]: sentable_core::Table

mod error;
pub use error::StoreError;

mod export;
mod format;
mod read;
mod xlsx;

pub use export::{flatten_unions, write_csv, write_parquet, write_table};
pub use format::TableFormat;
pub use read::{read_csv, read_parquet, read_table};
pub use xlsx::{range_to_table, read_xlsx, write_xlsx};
