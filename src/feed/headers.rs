// src/feed/headers.rs

//! Header aliasing for inconsistent feed exports.
//!
//! The dealer-management system renames columns between export modes, so a
//! logical field is looked up through an ordered candidate list. Matching is
//! case-insensitive on trimmed names; the first candidate present in the
//! document with a non-empty value in the row wins.

use std::collections::HashMap;

use csv::StringRecord;

/// Case-insensitive index from header name to column position.
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    columns: Vec<String>,
    by_name: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new(headers: &StringRecord) -> Self {
        let columns: Vec<String> = headers.iter().map(str::to_string).collect();
        let mut by_name = HashMap::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            // First occurrence wins on duplicate headers.
            by_name.entry(name.trim().to_lowercase()).or_insert(idx);
        }
        Self { columns, by_name }
    }

    /// The literal header names as they appeared in the document.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Resolve a logical field: first candidate whose column holds a
    /// non-empty value in `row`, trimmed.
    pub fn resolve<'a>(&self, row: &'a StringRecord, candidates: &[String]) -> Option<&'a str> {
        for candidate in candidates {
            let Some(&idx) = self.by_name.get(&candidate.trim().to_lowercase()) else {
                continue;
            };
            if let Some(value) = row.get(idx) {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    fn candidates(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn resolve_takes_first_present_candidate() {
        let index = HeaderIndex::new(&record(&["VIN", "Special Price", "Price"]));
        let row = record(&["X1", "42000", "45000"]);
        let got = index.resolve(&row, &candidates(&["Special Price", "Price"]));
        assert_eq!(got, Some("42000"));
    }

    #[test]
    fn resolve_falls_through_empty_values() {
        let index = HeaderIndex::new(&record(&["VIN", "Special Price", "Price"]));
        let row = record(&["X1", "   ", "45000"]);
        let got = index.resolve(&row, &candidates(&["Special Price", "Price"]));
        assert_eq!(got, Some("45000"));
    }

    #[test]
    fn resolve_is_case_insensitive_and_trims_headers() {
        let index = HeaderIndex::new(&record(&[" vin ", "PRICE"]));
        let row = record(&["X1", "45000"]);
        assert_eq!(index.resolve(&row, &candidates(&["VIN"])), Some("X1"));
        assert_eq!(index.resolve(&row, &candidates(&["Price"])), Some("45000"));
    }

    #[test]
    fn resolve_first_occurrence_wins_on_duplicates() {
        let index = HeaderIndex::new(&record(&["Price", "Price"]));
        let row = record(&["100", "200"]);
        assert_eq!(index.resolve(&row, &candidates(&["Price"])), Some("100"));
    }

    #[test]
    fn columns_keep_literal_names() {
        let index = HeaderIndex::new(&record(&[" VIN ", "Photo Url List"]));
        assert_eq!(index.columns(), [" VIN ", "Photo Url List"]);
    }

    #[test]
    fn resolve_missing_header_is_none() {
        let index = HeaderIndex::new(&record(&["VIN"]));
        let row = record(&["X1"]);
        assert_eq!(index.resolve(&row, &candidates(&["Mileage"])), None);
    }
}
