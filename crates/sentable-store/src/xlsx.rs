//! Spreadsheet ingestion via calamine and `.xlsx` export via rust_xlsxwriter.
//!
//! Reads the first worksheet; the first row is the header. Spreadsheet
//! columns are untyped, so each column is typed from its cells: uniform
//! columns become plain Arrow arrays and mixed columns become sparse unions
//! (see [`MixedColumnBuilder`]). Export goes the other way, one typed cell
//! at a time, so a mixed column is written back with its numbers and dates
//! intact.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanBuilder, Float64Builder, StringBuilder,
    TimestampMillisecondBuilder,
};
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Field, Schema, TimeUnit, TimestampMicrosecondType,
    TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType,
};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use calamine::{Data, Range, Reader, open_workbook_auto};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};
use sentable_core::{Cell, MixedColumnBuilder, Table, decode_dictionary};
use tracing::debug;

use crate::StoreError;

/// Read the first worksheet of a workbook.
pub fn read_xlsx(path: &Path) -> Result<Table, StoreError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| StoreError::NoWorksheet(path.to_path_buf()))??;
    range_to_table(&range)
}

/// Normalized view of one spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
enum SheetCell<'a> {
    Text(&'a str),
    Number(f64),
    Boolean(bool),
    DateTime(i64),
    Empty,
}

impl<'a> SheetCell<'a> {
    fn from_data(data: &'a Data) -> Self {
        match data {
            Data::String(s) => Self::Text(s),
            Data::Int(i) => Self::Number(*i as f64),
            Data::Float(f) => Self::Number(*f),
            Data::Bool(b) => Self::Boolean(*b),
            Data::DateTime(dt) => dt
                .as_datetime()
                .map(|d| Self::DateTime(d.and_utc().timestamp_millis()))
                .unwrap_or(Self::Empty),
            Data::DateTimeIso(s) => s
                .parse::<chrono::NaiveDateTime>()
                .map(|d| Self::DateTime(d.and_utc().timestamp_millis()))
                .unwrap_or(Self::Empty),
            // Durations and formula errors (#N/A, #DIV/0!) carry no value.
            Data::DurationIso(_) | Data::Error(_) | Data::Empty => Self::Empty,
        }
    }

    fn kind(&self) -> Option<CellKind> {
        match self {
            Self::Text(_) => Some(CellKind::Text),
            Self::Number(_) => Some(CellKind::Number),
            Self::Boolean(_) => Some(CellKind::Boolean),
            Self::DateTime(_) => Some(CellKind::DateTime),
            Self::Empty => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Text,
    Number,
    Boolean,
    DateTime,
}

/// Column type decided from its non-empty cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Uniform(CellKind),
    Mixed,
    /// Only blank cells; stored as all-null Utf8.
    Blank,
}

fn column_kind(cells: &[SheetCell<'_>]) -> ColumnKind {
    let mut seen: Option<CellKind> = None;
    for kind in cells.iter().filter_map(|c| c.kind()) {
        match seen {
            None => seen = Some(kind),
            Some(k) if k == kind => {}
            Some(_) => return ColumnKind::Mixed,
        }
    }
    seen.map(ColumnKind::Uniform).unwrap_or(ColumnKind::Blank)
}

/// Convert a worksheet range to a table. Row 0 is the header.
pub fn range_to_table(range: &Range<Data>) -> Result<Table, StoreError> {
    let mut rows = range.rows();
    let header = match rows.next() {
        Some(h) => h,
        None => return Ok(Table::empty(Arc::new(Schema::empty()))),
    };
    let names = header_names(header);
    let body: Vec<&[Data]> = rows.collect();

    let mut fields = Vec::with_capacity(names.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(names.len());

    for (col, name) in names.iter().enumerate() {
        let cells: Vec<SheetCell<'_>> = body
            .iter()
            .map(|row| row.get(col).map(SheetCell::from_data).unwrap_or(SheetCell::Empty))
            .collect();
        let kind = column_kind(&cells);
        debug!(column = %name, ?kind, "typed spreadsheet column");

        let array = build_column(&cells, kind)?;
        fields.push(Field::new(name, array.data_type().clone(), true));
        columns.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    if body.is_empty() {
        return Ok(Table::empty(schema));
    }
    let batch = RecordBatch::try_new(Arc::clone(&schema), columns)?;
    Ok(Table::try_new(schema, vec![batch])?)
}

fn build_column(cells: &[SheetCell<'_>], kind: ColumnKind) -> Result<ArrayRef, StoreError> {
    let array: ArrayRef = match kind {
        ColumnKind::Uniform(CellKind::Text) | ColumnKind::Blank => {
            let mut b = StringBuilder::new();
            for cell in cells {
                match cell {
                    SheetCell::Text(s) => b.append_value(s),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        ColumnKind::Uniform(CellKind::Number) => {
            let mut b = Float64Builder::new();
            for cell in cells {
                match cell {
                    SheetCell::Number(n) => b.append_value(*n),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        ColumnKind::Uniform(CellKind::Boolean) => {
            let mut b = BooleanBuilder::new();
            for cell in cells {
                match cell {
                    SheetCell::Boolean(v) => b.append_value(*v),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        ColumnKind::Uniform(CellKind::DateTime) => {
            let mut b = TimestampMillisecondBuilder::new();
            for cell in cells {
                match cell {
                    SheetCell::DateTime(ms) => b.append_value(*ms),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        ColumnKind::Mixed => {
            let mut b = MixedColumnBuilder::new();
            for cell in cells {
                match cell {
                    SheetCell::Text(s) => b.append_text(s),
                    SheetCell::Number(n) => b.append_number(*n),
                    SheetCell::Boolean(v) => b.append_boolean(*v),
                    SheetCell::DateTime(ms) => b.append_datetime(*ms),
                    SheetCell::Empty => b.append_empty(),
                }
            }
            b.finish()?
        }
    };
    Ok(array)
}

/// Header row to unique column names. Blank headers become `Unnamed: {i}`;
/// repeated names get the first free `.1`, `.2`, ... suffix, so a generated
/// name never shadows a real header.
fn header_names(header: &[Data]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let base = match cell {
                Data::Empty => format!("Unnamed: {i}"),
                other => {
                    let s = other.to_string();
                    if s.trim().is_empty() {
                        format!("Unnamed: {i}")
                    } else {
                        s
                    }
                }
            };
            let mut name = base.clone();
            if taken.contains(&name) {
                let n = next_suffix.entry(base.clone()).or_insert(1);
                loop {
                    name = format!("{base}.{n}");
                    *n += 1;
                    if !taken.contains(&name) {
                        break;
                    }
                }
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}

// ── Export ──

/// Sheet size limits of the xlsx format.
const XLSX_MAX_ROWS: usize = 1_048_576;
const XLSX_MAX_COLUMNS: usize = 16_384;

const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Write a table to a single-worksheet `.xlsx` workbook with a bold header
/// row. Null cells are left blank.
pub fn write_xlsx(table: &Table, path: &Path) -> Result<(), StoreError> {
    let rows = table.num_rows() + 1;
    let columns = table.num_columns();
    if rows > XLSX_MAX_ROWS || columns > XLSX_MAX_COLUMNS {
        return Err(StoreError::SheetLimit {
            rows: table.num_rows(),
            columns,
        });
    }

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let header = Format::new().set_bold();
    let datetime = Format::new().set_num_format(DATETIME_FORMAT);

    for (col, field) in table.schema().fields().iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, field.name(), &header)?;
    }

    let mut row: u32 = 1;
    for batch in table.batches() {
        let arrays = batch
            .columns()
            .iter()
            .map(decode_dictionary)
            .collect::<Result<Vec<_>, _>>()?;
        for i in 0..batch.num_rows() {
            for (col, array) in arrays.iter().enumerate() {
                write_cell(sheet, row, col as u16, array.as_ref(), i, &datetime)?;
            }
            row += 1;
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    array: &dyn Array,
    index: usize,
    datetime: &Format,
) -> Result<(), StoreError> {
    match Cell::at(array, index) {
        Cell::Empty => {}
        Cell::Text(s) => {
            sheet.write_string(row, col, s)?;
        }
        Cell::Number(n) => {
            sheet.write_number(row, col, n)?;
        }
        Cell::Boolean(b) => {
            sheet.write_boolean(row, col, b)?;
        }
        Cell::Temporal | Cell::Other => {
            let (leaf, offset) = resolve_union(array, index);
            match epoch_seconds(leaf, offset) {
                Some(secs) => {
                    let value = ExcelDateTime::from_timestamp(secs)?;
                    sheet.write_datetime_with_format(row, col, &value, datetime)?;
                }
                None => {
                    let formatter = ArrayFormatter::try_new(leaf, &FormatOptions::default())?;
                    sheet.write_string(row, col, formatter.value(offset).to_string())?;
                }
            }
        }
    }
    Ok(())
}

/// The array and row actually holding the value, looking through unions.
fn resolve_union(array: &dyn Array, row: usize) -> (&dyn Array, usize) {
    match array.as_union_opt() {
        Some(union) => {
            let child = union.child(union.type_id(row));
            resolve_union(child.as_ref(), union.value_offset(row))
        }
        None => (array, row),
    }
}

/// Seconds since the epoch for date and timestamp cells; `None` for other
/// temporal types (times, durations, intervals).
fn epoch_seconds(array: &dyn Array, row: usize) -> Option<i64> {
    let value = match array.data_type() {
        DataType::Date32 => array.as_primitive::<Date32Type>().value_as_datetime(row),
        DataType::Date64 => array.as_primitive::<Date64Type>().value_as_datetime(row),
        DataType::Timestamp(TimeUnit::Second, _) => array
            .as_primitive::<TimestampSecondType>()
            .value_as_datetime(row),
        DataType::Timestamp(TimeUnit::Millisecond, _) => array
            .as_primitive::<TimestampMillisecondType>()
            .value_as_datetime(row),
        DataType::Timestamp(TimeUnit::Microsecond, _) => array
            .as_primitive::<TimestampMicrosecondType>()
            .value_as_datetime(row),
        DataType::Timestamp(TimeUnit::Nanosecond, _) => array
            .as_primitive::<TimestampNanosecondType>()
            .value_as_datetime(row),
        _ => None,
    };
    value.map(|dt| dt.and_utc().timestamp())
}
