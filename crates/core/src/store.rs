//! History persistence.
//!
//! [`HistoryStore`] is the seam between the calculator and durable storage.
//! [`CsvHistoryStore`] writes one row per record under the header
//! `operation,operand1,operand2,result,timestamp`; [`MemoryHistoryStore`]
//! keeps the last saved history in memory.
//!
//! ## Load semantics
//!
//! - A missing or empty file loads as an empty history, and
//!   [`HistoryStore::load_existing`] reports it as having nothing stored.
//! - A header without every required column fails with
//!   [`HistoryError::MissingColumns`].
//! - Rows that fail to parse are skipped; they never abort the load.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::HistoryError;
use crate::record::{Calculation, FIELDS};

/// Durable storage for the calculation history.
///
/// Implementations must be `Send + Sync` so a calculator can be moved behind
/// a mutex when shared.
pub trait HistoryStore: Send + Sync {
    /// Overwrite the stored history with `records`.
    fn save(&self, records: &[Calculation]) -> Result<(), HistoryError>;

    /// Read the stored history, oldest first.
    fn load(&self) -> Result<Vec<Calculation>, HistoryError>;

    /// Where this store writes, for messages.
    fn location(&self) -> &Path;

    /// Like [`load`](Self::load), but `None` when nothing has been stored
    /// yet, as opposed to an empty history that was saved.
    fn load_existing(&self) -> Result<Option<Vec<Calculation>>, HistoryError> {
        self.load().map(Some)
    }
}

// ──────────────────────────────────────────────
// CSV file store
// ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CsvHistoryStore {
    path: PathBuf,
}

impl CsvHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvHistoryStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl HistoryStore for CsvHistoryStore {
    fn save(&self, records: &[Calculation]) -> Result<(), HistoryError> {
        let text = encode(records).map_err(|message| HistoryError::Encode {
            path: self.path.clone(),
            message,
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        fs::write(&self.path, text).map_err(|e| self.io_error(e))
    }

    fn load(&self) -> Result<Vec<Calculation>, HistoryError> {
        Ok(self.load_existing()?.unwrap_or_default())
    }

    fn location(&self) -> &Path {
        &self.path
    }

    fn load_existing(&self) -> Result<Option<Vec<Calculation>>, HistoryError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        decode_table(&text, &self.path)
    }
}

/// Render `records` as CSV text, header first. Fails if a record's
/// timestamp has no RFC 3339 form.
pub fn encode(records: &[Calculation]) -> Result<String, String> {
    let mut out = FIELDS.join(",");
    out.push('\n');
    for record in records {
        let fields = record.to_fields()?;
        let row: Vec<String> = FIELDS.iter().map(|name| quote(&fields[name])).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    Ok(out)
}

/// Parse CSV text produced by [`encode`] (or any file with the same columns,
/// in any order). `path` is only used in error messages.
pub fn decode(text: &str, path: &Path) -> Result<Vec<Calculation>, HistoryError> {
    Ok(decode_table(text, path)?.unwrap_or_default())
}

/// `None` when the text has no header row at all.
fn decode_table(text: &str, path: &Path) -> Result<Option<Vec<Calculation>>, HistoryError> {
    let rows = split_rows(text).map_err(|message| HistoryError::Malformed {
        path: path.to_path_buf(),
        message,
    })?;
    let mut rows = rows.into_iter();

    let header = match rows.next() {
        Some(header) => header,
        None => return Ok(None),
    };
    let header: Vec<String> = header
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    let missing: Vec<String> = FIELDS
        .iter()
        .filter(|name| !header.iter().any(|h| h == *name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(HistoryError::MissingColumns {
            path: path.to_path_buf(),
            missing,
        });
    }

    let mut records = Vec::new();
    for (line, row) in rows.enumerate() {
        let field = |name: &str| {
            header
                .iter()
                .position(|h| h == name)
                .and_then(|i| row.get(i))
                .map(String::as_str)
        };
        match Calculation::from_fields(field) {
            Ok(record) => records.push(record),
            Err(reason) => {
                log::warn!(
                    "skipping row {} of {}: {}",
                    line + 2,
                    path.display(),
                    reason
                );
            }
        }
    }
    Ok(Some(records))
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split CSV text into rows of fields. Quoted fields may contain commas,
/// doubled quotes, and newlines. Blank lines are dropped.
fn split_rows(text: &str) -> Result<Vec<Vec<String>>, String> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                if !(row.len() == 1 && row[0].trim().is_empty()) {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        if !(row.len() == 1 && row[0].trim().is_empty()) {
            rows.push(row);
        }
    }
    Ok(rows)
}

// ──────────────────────────────────────────────
// In-memory store
// ──────────────────────────────────────────────

/// Keeps the last saved history in memory.
#[derive(Debug)]
pub struct MemoryHistoryStore {
    location: PathBuf,
    records: Mutex<Vec<Calculation>>,
    saves: Mutex<usize>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        MemoryHistoryStore::with_records(Vec::new())
    }

    pub fn with_records(records: Vec<Calculation>) -> Self {
        MemoryHistoryStore {
            location: PathBuf::from("<memory>"),
            records: Mutex::new(records),
            saves: Mutex::new(0),
        }
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        MemoryHistoryStore::new()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn save(&self, records: &[Calculation]) -> Result<(), HistoryError> {
        *self.records.lock().unwrap_or_else(|e| e.into_inner()) = records.to_vec();
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }

    fn load(&self) -> Result<Vec<Calculation>, HistoryError> {
        Ok(self.records.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn location(&self) -> &Path {
        &self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::OperationKind;
    use time::macros::datetime;

    fn sample() -> Vec<Calculation> {
        vec![
            Calculation::with_timestamp(
                OperationKind::Add,
                5.0,
                3.0,
                8.0,
                datetime!(2024-03-01 09:00:00 UTC),
            ),
            Calculation::with_timestamp(
                OperationKind::Divide,
                1.0,
                3.0,
                0.3333333333,
                datetime!(2024-03-01 09:00:01.5 +02:00),
            ),
        ]
    }

    #[test]
    fn missing_file_loads_empty() {
        let store = CsvHistoryStore::new("/nonexistent/path.csv");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvHistoryStore::new(dir.path().join("nested/history.csv"));
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());
    }

    #[test]
    fn empty_history_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvHistoryStore::new(dir.path().join("history.csv"));
        store.save(&[]).unwrap();
        let text = fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, "operation,operand1,operand2,result,timestamp\n");
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.load_existing().unwrap(), Some(Vec::new()));
    }

    #[test]
    fn empty_or_missing_file_has_nothing_stored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let store = CsvHistoryStore::new(&path);
        assert_eq!(store.load_existing().unwrap(), None);

        fs::write(&path, "").unwrap();
        assert_eq!(store.load_existing().unwrap(), None);
        fs::write(&path, "\n  \n").unwrap();
        assert_eq!(store.load_existing().unwrap(), None);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn unencodable_record_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvHistoryStore::new(dir.path().join("history.csv"));
        store.save(&sample()).unwrap();

        let ancient = time::Date::from_calendar_date(-1, time::Month::January, 1)
            .unwrap()
            .midnight()
            .assume_utc();
        let bad = Calculation::with_timestamp(OperationKind::Add, 1.0, 1.0, 2.0, ancient);
        assert!(matches!(
            store.save(&[bad]),
            Err(HistoryError::Encode { .. })
        ));
        assert_eq!(store.load().unwrap(), sample());
    }

    #[test]
    fn missing_columns_fail() {
        let err = decode("operation,operand1,result\nadd,1,2\n", Path::new("h.csv")).unwrap_err();
        match err {
            HistoryError::MissingColumns { missing, .. } => {
                assert_eq!(missing, vec!["operand2".to_string(), "timestamp".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_rows_are_skipped() {
        let text = "operation,operand1,operand2,result,timestamp\n\
                    add,1,2,3,2024-01-01T00:00:00\n\
                    sqrt,4,0,2,2024-01-01T00:00:00\n\
                    add,x,2,3,2024-01-01T00:00:00\n\
                    add,1,2\n\
                    \n\
                    multiply,2,3,6,2024-01-01T00:00:01Z\n";
        let records = decode(text, Path::new("h.csv")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].operation(), OperationKind::Multiply);
    }

    #[test]
    fn columns_may_be_reordered_and_extended() {
        let text = "index,timestamp,result,operand2,operand1,operation\r\n\
                    0,2024-01-01T00:00:00,6,3,2,multiply\r\n";
        let records = decode(text, Path::new("h.csv")).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].operand1(), 2.0);
        assert_eq!(records[0].result(), 6.0);
    }

    #[test]
    fn empty_file_loads_empty() {
        assert!(decode("", Path::new("h.csv")).unwrap().is_empty());
    }

    #[test]
    fn quoted_fields_are_unwrapped() {
        let rows = split_rows("a,\"b,c\",\"say \"\"hi\"\"\"\n").unwrap();
        assert_eq!(rows, vec![vec!["a", "b,c", "say \"hi\""]]);
        assert_eq!(quote("b,c"), "\"b,c\"");
        assert!(split_rows("\"open").is_err());
    }

    #[test]
    fn memory_store_counts_saves() {
        let store = MemoryHistoryStore::new();
        store.save(&sample()).unwrap();
        store.save(&sample()[..1]).unwrap();
        assert_eq!(store.save_count(), 2);
        assert_eq!(store.load().unwrap().len(), 1);
    }
}
