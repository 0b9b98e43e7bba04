//! CSV table provider (feature `csv`).
//!
//! Convenience for callers without their own table source: parses a
//! headered CSV into a [`TableSlice`], keeping the columns where every cell
//! parses as a number and dropping the rest (identifiers, labels, dates).
//! The caller still picks which numeric columns feed the pipeline.

use std::io::Read;
use std::path::Path;

use crate::table::{Column, TableSlice};
use crate::{Error, Result};

/// Load a table slice from a CSV file on disk.
pub fn load_csv_path(path: &Path) -> Result<TableSlice> {
    let file = std::fs::File::open(path)?;
    load_csv(file)
}

/// Load a table slice from any CSV reader.
///
/// The first record is the header. A column with any cell that does not
/// parse as a number is treated as metadata and dropped; if no numeric
/// column remains, that is `Error::Data`.
pub fn load_csv<R: Read>(reader: R) -> Result<TableSlice> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv
        .headers()
        .map_err(|e| Error::Data(format!("invalid CSV header: {e}")))?
        .iter()
        .map(String::from)
        .collect();

    let mut raw: Vec<Vec<Option<f64>>> = vec![Vec::new(); headers.len()];
    for (row, record) in csv.records().enumerate() {
        let record = record.map_err(|e| Error::Data(format!("CSV row {row}: {e}")))?;
        if record.len() != headers.len() {
            return Err(Error::Data(format!(
                "CSV row {row} has {} fields, header has {}",
                record.len(),
                headers.len()
            )));
        }
        for (col, field) in record.iter().enumerate() {
            raw[col].push(field.parse::<f64>().ok().filter(|v| v.is_finite()));
        }
    }

    let mut columns = Vec::new();
    for (name, cells) in headers.into_iter().zip(raw) {
        match cells.into_iter().collect::<Option<Vec<f64>>>() {
            Some(values) => columns.push(Column::new(name, values)),
            None => tracing::warn!(column = %name, "dropping non-numeric CSV column"),
        }
    }
    if columns.is_empty() {
        return Err(Error::Data("CSV contains no numeric columns".into()));
    }

    TableSlice::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
sample,anxiety,mood,sleep
s1,2.0,3.5,7.1
s2,4.0,2.5,6.0
s3,1.0,4.0,8.2
";

    #[test]
    fn test_numeric_columns_kept_text_dropped() {
        let slice = load_csv(SAMPLE.as_bytes()).unwrap();
        let names: Vec<&str> = slice.column_names().collect();
        assert_eq!(names, vec!["anxiety", "mood", "sleep"]);
        assert_eq!(slice.height(), 3);
        assert_eq!(slice.columns()[0].values, vec![2.0, 4.0, 1.0]);
    }

    #[test]
    fn test_all_text_rejected() {
        let err = load_csv("a,b\nx,y\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
        assert!(err.to_string().contains("no numeric columns"));
    }

    #[test]
    fn test_ragged_row_rejected() {
        let err = load_csv("a,b\n1.0,2.0\n3.0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[test]
    fn test_mixed_column_is_dropped() {
        let slice = load_csv("a,b\n1.0,2.0\nn/a,3.0\n".as_bytes()).unwrap();
        let names: Vec<&str> = slice.column_names().collect();
        assert_eq!(names, vec!["b"]);
        // The surviving column is untouched by the drop.
        assert_eq!(slice.columns()[0].values, vec![2.0, 3.0]);
    }
}
