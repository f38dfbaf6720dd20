use crate::domain::RawRecord;
use crate::error::{EtlError, Result};
use csv::{Reader, ReaderBuilder, StringRecordsIntoIter};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

/// Streams `RawRecord`s out of a catalog CSV file.
///
/// The iterator is lazy and finite; a fresh `open` starts over from the top.
/// Structurally broken rows (ragged lengths, bad quoting) surface as per-row
/// errors so the caller can apply the skip-and-continue policy without
/// aborting the run.
pub struct CsvExtractor {
    path: PathBuf,
}

impl CsvExtractor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the file and validates that every required column is present in
    /// the header row. A header mismatch is a configuration error, not a data
    /// error: it fails before any row is read.
    pub fn open(&self, required_columns: &[&str]) -> Result<RawRecords> {
        let file = File::open(&self.path).map_err(|source| EtlError::InputFile {
            path: self.path.clone(),
            source,
        })?;

        let mut reader: Reader<File> = ReaderBuilder::new().from_reader(file);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let missing: Vec<&str> = required_columns
            .iter()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(EtlError::Config(format!(
                "Input file '{}' is missing required column(s): {}",
                self.path.display(),
                missing.join(", ")
            )));
        }

        info!(path = %self.path.display(), columns = headers.len(), "Opened catalog CSV");

        Ok(RawRecords {
            headers,
            records: reader.into_records(),
        })
    }
}

pub struct RawRecords {
    headers: Vec<String>,
    records: StringRecordsIntoIter<File>,
}

impl Iterator for RawRecords {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(EtlError::Csv(e))),
        };

        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let fields: HashMap<String, String> = self
            .headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();

        Some(Ok(RawRecord::new(line, fields)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const REQUIRED: &[&str] = &["ProductID", "ProductName", "Price (INR)"];

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_rows_in_source_order() {
        let file = csv_file(
            "ProductID,ProductName,Price (INR)\n\
             P1,Shirt,19.99\n\
             P2,Shoes,49.99\n",
        );
        let rows: Vec<_> = CsvExtractor::new(file.path())
            .open(REQUIRED)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("ProductID"), Some("P1"));
        assert_eq!(rows[1].get("ProductName"), Some("Shoes"));
        // Header is line 1, data starts at line 2.
        assert_eq!(rows[0].line, 2);
    }

    #[test]
    fn missing_file_fails_with_the_path() {
        let err = CsvExtractor::new("/no/such/products.csv")
            .open(REQUIRED)
            .err()
            .unwrap();
        assert!(matches!(err, EtlError::InputFile { .. }), "got: {err}");
        assert!(err.to_string().contains("/no/such/products.csv"));
    }

    #[test]
    fn missing_required_header_is_a_config_error() {
        let file = csv_file("ProductName,Price (INR)\nShirt,19.99\n");
        let err = CsvExtractor::new(file.path()).open(REQUIRED).err().unwrap();
        assert!(matches!(err, EtlError::Config(_)), "got: {err}");
        assert!(err.to_string().contains("ProductID"));
    }

    #[test]
    fn ragged_row_yields_an_error_item_and_iteration_continues() {
        let file = csv_file(
            "ProductID,ProductName,Price (INR)\n\
             P1,Shirt,19.99\n\
             P2,too,many,fields,here\n\
             P3,Socks,4.99\n",
        );
        let items: Vec<_> = CsvExtractor::new(file.path()).open(REQUIRED).unwrap().collect();

        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
        assert_eq!(items[2].as_ref().unwrap().get("ProductID"), Some("P3"));
    }

    #[test]
    fn reopening_starts_from_the_top() {
        let file = csv_file("ProductID,ProductName,Price (INR)\nP1,Shirt,19.99\n");
        let extractor = CsvExtractor::new(file.path());

        let first: Vec<_> = extractor.open(REQUIRED).unwrap().collect();
        let second: Vec<_> = extractor.open(REQUIRED).unwrap().collect();
        assert_eq!(first.len(), second.len());
    }
}
