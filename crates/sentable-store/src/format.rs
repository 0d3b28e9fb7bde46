use std::path::Path;

use crate::StoreError;

/// File formats the store understands, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Parquet,
    Csv,
    /// Any workbook calamine opens: xlsx, xlsm, xlsb, xls, ods.
    Spreadsheet,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "parquet" | "pq" => Ok(Self::Parquet),
            "csv" => Ok(Self::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Self::Spreadsheet),
            "" => Err(StoreError::UnsupportedFormat(format!(
                "{} has no file extension",
                path.display()
            ))),
            other => Err(StoreError::UnsupportedFormat(format!(".{other}"))),
        }
    }

    /// Format for writing to `path`. Of the spreadsheet family only `.xlsx`
    /// can be written.
    pub fn for_output(path: &Path) -> Result<Self, StoreError> {
        let format = Self::from_path(path)?;
        let is_xlsx = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
        if format == Self::Spreadsheet && !is_xlsx {
            return Err(StoreError::UnsupportedFormat(format!(
                "{}: only .xlsx spreadsheets can be written",
                path.display()
            )));
        }
        Ok(format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_extension() {
        assert_eq!(
            TableFormat::from_path(Path::new("in.PARQUET")).unwrap(),
            TableFormat::Parquet
        );
        assert_eq!(
            TableFormat::from_path(Path::new("a/b.csv")).unwrap(),
            TableFormat::Csv
        );
        assert_eq!(
            TableFormat::from_path(Path::new("reviews.xlsx")).unwrap(),
            TableFormat::Spreadsheet
        );
    }

    #[test]
    fn rejects_unknown_extensions() {
        assert!(matches!(
            TableFormat::from_path(Path::new("notes.txt")),
            Err(StoreError::UnsupportedFormat(e)) if e == ".txt"
        ));
        assert!(TableFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn output_formats() {
        assert_eq!(
            TableFormat::for_output(Path::new("sentiment_output.XLSX")).unwrap(),
            TableFormat::Spreadsheet
        );
        assert_eq!(
            TableFormat::for_output(Path::new("out.csv")).unwrap(),
            TableFormat::Csv
        );
        assert!(matches!(
            TableFormat::for_output(Path::new("out.ods")),
            Err(StoreError::UnsupportedFormat(_))
        ));
        assert!(TableFormat::for_output(Path::new("out.txt")).is_err());
    }
}
