//! Source parsers.
//!
//! Each parser reads one kind of export, coerces its fields and aggregates to
//! one row per calendar date. Missing files and missing columns become
//! [`SourceOutcome::Unavailable`](crate::SourceOutcome); a file that exists but
//! cannot be read is an error.

pub mod activity;
pub mod diary;
pub mod export;
pub mod strength;
pub mod weight;

use crate::{Error, Result};
use csv::StringRecord;
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub use activity::{load_activity, ActivityTables};
pub use diary::load_diary;
pub use strength::load_strength;
pub use weight::load_weight;

/// Read a whole source file under a shared lock.
///
/// Returns `Ok(None)` when the file does not exist. A leading UTF-8 byte order
/// mark is stripped.
pub(crate) fn read_source_text(path: &Path, source_name: &'static str) -> Result<Option<String>> {
    if !path.exists() {
        tracing::debug!("No {} file found at {:?}", source_name, path);
        return Ok(None);
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let mut bytes = Vec::new();
    let read = BufReader::new(&file).read_to_end(&mut bytes);
    file.unlock()?;
    read?;

    let text = String::from_utf8(bytes).map_err(|e| {
        Error::corrupt(source_name, format!("{:?} is not valid UTF-8: {}", path, e))
    })?;

    let text = match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    };

    Ok(Some(text))
}

/// Build a lenient CSV reader over in-memory text.
///
/// Header names are trimmed so serde row structs and [`Schema`] agree on them.
pub(crate) fn csv_reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes())
}

/// Header name → column index, resolved once per file.
#[derive(Debug)]
pub(crate) struct Schema {
    columns: HashMap<String, usize>,
}

impl Schema {
    /// Index the header row.
    ///
    /// A leading column with an empty or `Unnamed...` header is an export
    /// artifact and is left out.
    pub(crate) fn from_headers(headers: &StringRecord) -> Self {
        let mut columns = HashMap::new();
        for (idx, name) in headers.iter().enumerate() {
            let name = name.trim();
            if idx == 0 && (name.is_empty() || name.starts_with("Unnamed")) {
                tracing::debug!("Dropping unnamed leading column");
                continue;
            }
            if name.is_empty() {
                continue;
            }
            columns.entry(name.to_string()).or_insert(idx);
        }
        Self { columns }
    }

    pub(crate) fn index(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    /// Names from `required` that the header row lacks
    pub(crate) fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|name| !self.columns.contains_key(*name))
            .collect()
    }

    /// A few header names for diagnostics, in file order
    pub(crate) fn preview(&self, limit: usize) -> Vec<&str> {
        let mut names: Vec<(&str, usize)> = self
            .columns
            .iter()
            .map(|(name, idx)| (name.as_str(), *idx))
            .collect();
        names.sort_by_key(|(_, idx)| *idx);
        names.into_iter().take(limit).map(|(name, _)| name).collect()
    }
}

/// Field `idx` of a record, if the column exists and the row is long enough
pub(crate) fn field(record: &StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| record.get(i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_drops_unnamed_leading_column() {
        let headers = StringRecord::from(vec!["", "start_time", "weight"]);
        let schema = Schema::from_headers(&headers);
        assert_eq!(schema.index("start_time"), Some(1));
        assert_eq!(schema.index("weight"), Some(2));
        assert_eq!(schema.preview(8), vec!["start_time", "weight"]);

        let headers = StringRecord::from(vec!["Unnamed: 0", "start_time"]);
        let schema = Schema::from_headers(&headers);
        assert_eq!(schema.index("Unnamed: 0"), None);
        assert_eq!(schema.index("start_time"), Some(1));
    }

    #[test]
    fn test_schema_missing_columns() {
        let headers = StringRecord::from(vec!["start_time", "height"]);
        let schema = Schema::from_headers(&headers);
        assert_eq!(schema.missing(&["start_time", "weight"]), vec!["weight"]);
    }

    #[test]
    fn test_csv_reader_trims_headers() {
        let mut reader = csv_reader("date, entry_type ,food\n2025-01-01, food ,Apple\n");
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["date", "entry_type", "food"]);

        // Field values are left alone
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(record.get(1), Some(" food "));
    }

    #[test]
    fn test_read_source_text_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let text = read_source_text(&temp_dir.path().join("absent.csv"), "test").unwrap();
        assert!(text.is_none());
    }

    #[test]
    fn test_read_source_text_strips_bom() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("bom.csv");
        std::fs::write(&path, "\u{feff}a,b\n1,2\n").unwrap();

        let text = read_source_text(&path, "test").unwrap().unwrap();
        assert!(text.starts_with("a,b"));
    }

    #[test]
    fn test_read_source_text_rejects_binary() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("binary.csv");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let result = read_source_text(&path, "test");
        assert!(matches!(result, Err(Error::Source { .. })));
    }
}
