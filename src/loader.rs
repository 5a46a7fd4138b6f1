// Dataset ingestion: bytes of a snapshot in, normalized records out.
//
// JSON snapshots may be `{"records": [...]}` or a bare array; spreadsheet
// exports are CSV with a header line and positional columns.
use csv::ReaderBuilder;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::error::DataError;
use crate::normalize::normalize;
use crate::types::{DailyRecord, RawRow, SignPolicy};

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum InputFormat {
    /// Sniff the first significant byte.
    #[default]
    Auto,
    Json,
    Csv,
}

impl InputFormat {
    /// Resolve `Auto` against the content.
    pub fn resolve(self, bytes: &[u8]) -> InputFormat {
        match self {
            InputFormat::Auto => match strip_bom(bytes)
                .iter()
                .copied()
                .find(|b| !b.is_ascii_whitespace())
            {
                Some(b'{') | Some(b'[') => InputFormat::Json,
                _ => InputFormat::Csv,
            },
            fixed => fixed,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            InputFormat::Csv => "csv",
            InputFormat::Json | InputFormat::Auto => "json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub format: InputFormat,
}

pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// Split a snapshot into raw rows without interpreting any field.
pub fn read_rows(bytes: &[u8], format: InputFormat) -> Result<Vec<RawRow>, DataError> {
    let bytes = strip_bom(bytes);
    match format.resolve(bytes) {
        InputFormat::Csv => {
            let mut rdr = ReaderBuilder::new()
                .flexible(true)
                .has_headers(true)
                .from_reader(bytes);
            let mut rows = Vec::new();
            for result in rdr.records() {
                let record = result?;
                rows.push(RawRow::Positional(record.iter().map(str::to_string).collect()));
            }
            Ok(rows)
        }
        _ => {
            let items = match serde_json::from_slice::<Value>(bytes)? {
                Value::Array(items) => items,
                Value::Object(mut map) => match map.remove("records") {
                    Some(Value::Array(items)) => items,
                    _ => return Err(DataError::Layout("expected a `records` array".into())),
                },
                _ => {
                    return Err(DataError::Layout(
                        "expected a JSON object or array at the top level".into(),
                    ))
                }
            };
            items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| {
                    RawRow::try_from(item)
                        .map_err(|source| DataError::MalformedRow { row: idx + 1, source })
                })
                .collect()
        }
    }
}

/// Normalize every row, failing on the first malformed one.
pub fn load_records(
    bytes: &[u8],
    format: InputFormat,
    policy: SignPolicy,
) -> Result<(Vec<DailyRecord>, LoadReport), DataError> {
    let format = format.resolve(bytes);
    let rows = read_rows(bytes, format)?;
    let records = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            normalize(row, policy)
                .map_err(|source| DataError::MalformedRow { row: idx + 1, source })
        })
        .collect::<Result<Vec<_>, _>>()?;
    debug!(rows = rows.len(), ?format, "normalized dataset");
    let report = LoadReport {
        total_rows: rows.len(),
        format,
    };
    Ok((records, report))
}

pub fn load_file(
    path: &Path,
    format: InputFormat,
    policy: SignPolicy,
) -> Result<(Vec<DailyRecord>, LoadReport), DataError> {
    let bytes = std::fs::read(path)?;
    load_records(&bytes, format, policy)
}
