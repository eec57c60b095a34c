//! Trial tables
//!
//! A trial table is the spreadsheet an experiment iterates over: one row per
//! trial, one column per condition variable (image file, trigger code, ...).
//! Tables are read from CSV; the presentation order can be set separately so
//! randomised designs reuse the same rows.

use crate::error::{AppResult, StimError};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Rows of a trial table plus the order they are presented in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialTable {
    columns: Vec<String>,
    rows: Vec<HashMap<String, String>>,
    sequence: Vec<usize>,
}

impl TrialTable {
    /// Read a CSV file with a header row.
    ///
    /// # Errors
    ///
    /// Returns `StimError::TrialTable` if the file cannot be read or parsed.
    pub fn from_path<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let reader = csv::Reader::from_path(path.as_ref())?;
        let table = Self::from_csv(reader)?;
        debug!(
            path = %path.as_ref().display(),
            trials = table.len(),
            "Trial table loaded"
        );
        Ok(table)
    }

    /// Read CSV with a header row from any reader.
    ///
    /// # Errors
    ///
    /// Returns `StimError::TrialTable` if the data cannot be parsed.
    pub fn from_reader<R: Read>(reader: R) -> AppResult<Self> {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> AppResult<Self> {
        let columns: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row = columns
                .iter()
                .cloned()
                .zip(record.iter().map(|cell| cell.trim().to_string()))
                .collect();
            rows.push(row);
        }

        Ok(Self::from_rows(columns, rows))
    }

    /// Build a table from already parsed rows, presented in row order.
    pub fn from_rows(columns: Vec<String>, rows: Vec<HashMap<String, String>>) -> Self {
        let sequence = (0..rows.len()).collect();
        Self {
            columns,
            rows,
            sequence,
        }
    }

    /// Replace the presentation order.
    ///
    /// # Errors
    ///
    /// Returns `StimError::Stimulus` if an index does not name a row.
    pub fn with_sequence(mut self, sequence: Vec<usize>) -> AppResult<Self> {
        if let Some(bad) = sequence.iter().find(|&&i| i >= self.rows.len()) {
            return Err(StimError::Stimulus(format!(
                "trial index {} out of range for {} rows",
                bad,
                self.rows.len()
            )));
        }
        self.sequence = sequence;
        Ok(self)
    }

    /// Column names in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// True if the table has a column called `column`.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Presentation order as row indices.
    pub fn sequence(&self) -> &[usize] {
        &self.sequence
    }

    /// Cell at `row`/`column`; empty cells count as absent.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Values of `column` in presentation order, one per trial.
    pub fn sequence_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = Option<&'a str>> + 'a {
        self.sequence.iter().map(move |&row| self.value(row, column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "image,code\nf01.png,1\nf02.png,2\n,3\n";

    #[test]
    fn test_reads_rows_and_header() {
        let table = TrialTable::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(table.columns(), &["image".to_string(), "code".to_string()]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.value(0, "image"), Some("f01.png"));
        assert_eq!(table.value(1, "code"), Some("2"));
        assert_eq!(table.value(2, "image"), None);
        assert_eq!(table.value(9, "image"), None);
        assert!(table.has_column("code"));
        assert!(!table.has_column("missing"));
    }

    #[test]
    fn test_sequence_order() {
        let table = TrialTable::from_reader(CSV.as_bytes())
            .unwrap()
            .with_sequence(vec![1, 0, 1])
            .unwrap();
        let images: Vec<_> = table.sequence_values("image").collect();
        assert_eq!(images, vec![Some("f02.png"), Some("f01.png"), Some("f02.png")]);
    }

    #[test]
    fn test_sequence_rejects_unknown_rows() {
        let err = TrialTable::from_reader(CSV.as_bytes())
            .unwrap()
            .with_sequence(vec![0, 3])
            .unwrap_err();
        assert!(matches!(err, StimError::Stimulus(_)));
    }

    #[test]
    fn test_malformed_csv_is_an_error() {
        let err = TrialTable::from_reader("a,b\n1,2,3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, StimError::TrialTable(_)));
    }
}
