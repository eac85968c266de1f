//! Tabular (CSV) source parsing.
//!
//! The whole source is parsed up front: column headers must be known
//! before mapping, and the total row count is part of the batch result.
//! A source that does not parse is fatal to the run; an individual
//! empty cell just means "field not provided" for that row.

use std::collections::BTreeMap;

use crate::error::Result;

/// A fully parsed tabular source: the header row plus every data row as
/// a column-name-to-value map. Empty cells are omitted from the maps.
#[derive(Debug, Clone)]
pub struct TabularSource {
    pub headers: Vec<String>,
    pub rows: Vec<BTreeMap<String, String>>,
}

/// Parse CSV bytes into headers and ordered row maps. The first row is
/// the header row; data rows may be ragged (missing trailing cells are
/// treated as empty).
pub fn parse_csv(bytes: &[u8]) -> Result<TabularSource> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = BTreeMap::new();
        for (i, header) in headers.iter().enumerate() {
            if let Some(value) = record.get(i) {
                if !value.is_empty() {
                    row.insert(header.clone(), value.to_string());
                }
            }
        }
        rows.push(row);
    }

    Ok(TabularSource { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BatchError;

    #[test]
    fn parses_headers_and_rows() {
        let csv = b"name,email\nAda Lovelace,ada@example.com\nAlan Turing,alan@example.com\n";
        let source = parse_csv(csv).unwrap();

        assert_eq!(source.headers, vec!["name", "email"]);
        assert_eq!(source.rows.len(), 2);
        assert_eq!(source.rows[0].get("name").unwrap(), "Ada Lovelace");
        assert_eq!(source.rows[1].get("email").unwrap(), "alan@example.com");
    }

    #[test]
    fn empty_cells_are_omitted() {
        let csv = b"name,email\nAda,\n,alan@example.com\n";
        let source = parse_csv(csv).unwrap();

        assert!(source.rows[0].get("email").is_none());
        assert!(source.rows[1].get("name").is_none());
    }

    #[test]
    fn ragged_rows_are_tolerated() {
        let csv = b"name,email,course\nAda,ada@example.com\n";
        let source = parse_csv(csv).unwrap();

        assert_eq!(source.rows.len(), 1);
        assert!(source.rows[0].get("course").is_none());
    }

    #[test]
    fn malformed_source_is_fatal() {
        let csv = b"name,email\n\"unterminated,quote\n";
        let err = parse_csv(csv).unwrap_err();
        assert!(matches!(err, BatchError::Source(_)));
    }

    #[test]
    fn headers_only_source_has_no_rows() {
        let source = parse_csv(b"name,email\n").unwrap();
        assert!(source.rows.is_empty());
    }
}
