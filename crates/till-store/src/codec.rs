//! # CSV Tables
//!
//! Shared reading and writing of the four CSV tables. Column layouts live
//! next to the repository that owns each table.
//!
//! ## Read Tolerance
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  barcode,name,price,stock         ← header, skipped                     │
//! │  0001,Soap,5.00,10                ← parsed                              │
//! │  0002,Rice,abc,3                  ← malformed: warn + skip              │
//! │  0003,Salt,0.90,4                 ← parsed                              │
//! │  0004,Sug                         ← no trailing newline: torn, skipped  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every record occupies exactly one physical line, so one bad line never
//! swallows the next. Text fields cannot carry a line break because
//! `till_core::validation` (`validate_product_name`, `validate_concept`,
//! `validate_settings_field`) rejects control characters before a row is
//! written.

use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use std::io;
use std::path::Path;
use tracing::warn;

/// Encodes `rows` as CSV, optionally preceded by `header`.
pub fn write_table<T>(
    header: Option<&[&str]>,
    rows: &[T],
    fields: impl Fn(&T) -> Vec<String>,
) -> io::Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    if let Some(header) = header {
        writer.write_record(header)?;
    }
    for row in rows {
        writer.write_record(fields(row))?;
    }

    writer.into_inner().map_err(|err| err.into_error())
}

/// The header line of a table, newline included.
pub fn header_line(header: &[&str]) -> io::Result<Vec<u8>> {
    write_table::<()>(Some(header), &[], |_| Vec::new())
}

/// One data line of a table as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableLine<T> {
    Parsed(T),
    /// A line `parse` rejected, as it appears in the file (no newline).
    Skipped(String),
}

/// Decodes a table, skipping the header and every row `parse` rejects.
///
/// Skipped rows are logged with their line number and never abort the read.
pub fn read_table<T>(
    path: &Path,
    bytes: &[u8],
    parse: impl Fn(&StringRecord) -> Result<T, String>,
) -> Vec<T> {
    read_table_lines(path, bytes, parse)
        .into_iter()
        .filter_map(|line| match line {
            TableLine::Parsed(row) => Some(row),
            TableLine::Skipped(_) => None,
        })
        .collect()
}

/// Like `read_table`, but hands back the rejected lines too, in file order,
/// for tables that are rewritten in place.
pub fn read_table_lines<T>(
    path: &Path,
    bytes: &[u8],
    parse: impl Fn(&StringRecord) -> Result<T, String>,
) -> Vec<TableLine<T>> {
    let mut lines: Vec<&[u8]> = bytes.split(|b| *b == b'\n').collect();

    // The piece after the last newline is empty for a well-formed file.
    let torn = lines.pop().filter(|tail| !tail.is_empty());

    let mut out = Vec::with_capacity(lines.len());
    for (idx, line) in lines.into_iter().enumerate().skip(1) {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let parsed = parse_line(line).and_then(|record| parse(&record));
        match parsed {
            Ok(row) => out.push(TableLine::Parsed(row)),
            Err(reason) => {
                warn!(
                    path = %path.display(),
                    line = idx + 1,
                    reason = %reason,
                    "Skipping malformed row"
                );
                out.push(TableLine::Skipped(String::from_utf8_lossy(line).into_owned()));
            }
        }
    }

    if let Some(tail) = torn {
        let line = bytes.split(|b| *b == b'\n').count();
        warn!(path = %path.display(), line = line, "Skipping torn trailing row");
        // A torn first line is a torn header, not data.
        if line > 1 {
            out.push(TableLine::Skipped(String::from_utf8_lossy(tail).into_owned()));
        }
    }
    out
}

fn parse_line(line: &[u8]) -> Result<StringRecord, String> {
    // Escaped quotes come in pairs; an odd count means the row was cut.
    if line.iter().filter(|b| **b == b'"').count() % 2 == 1 {
        return Err("unbalanced quotes".to_string());
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line);
    match reader.records().next() {
        Some(Ok(record)) => Ok(record),
        Some(Err(err)) => Err(err.to_string()),
        None => Err("empty row".to_string()),
    }
}

/// Returns field `idx` of `record`, trimmed.
pub fn field<'r>(record: &'r StringRecord, idx: usize, name: &str) -> Result<&'r str, String> {
    record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| format!("missing column {name}"))
}

/// Checks the column count of a row.
pub fn expect_columns(record: &StringRecord, allowed: &[usize]) -> Result<(), String> {
    if allowed.contains(&record.len()) {
        Ok(())
    } else {
        Err(format!(
            "expected {:?} columns, found {}",
            allowed,
            record.len()
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
