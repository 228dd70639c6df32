//! Reading and validating per-base pileup tables.
//!
//! A per-base table is tab-separated text with a header row and one row per
//! sequence position. Only the columns in [`REQUIRED_COLUMNS`] are read; any
//! extra columns are ignored.

use crate::error::QcError;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::Read, path::Path};

pub const REQUIRED_COLUMNS: [&str; 12] = [
    "pos",
    "ref",
    "reads_all",
    "matches",
    "mismatches",
    "deletions",
    "insertions",
    "low_conf",
    "A",
    "C",
    "G",
    "T",
];

/// Raw counts observed at one sequence position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerBasePosition {
    pub pos: u64,
    #[serde(rename = "ref")]
    pub ref_base: char,
    pub reads_all: u64,
    pub matches: u64,
    pub mismatches: u64,
    pub deletions: u64,
    pub insertions: u64,
    pub low_conf: u64,
    #[serde(rename = "A")]
    pub a: u64,
    #[serde(rename = "C")]
    pub c: u64,
    #[serde(rename = "G")]
    pub g: u64,
    #[serde(rename = "T")]
    pub t: u64,
}

impl PerBasePosition {
    /// Base counts in A, C, G, T order.
    #[inline(always)]
    pub fn base_counts(&self) -> [u64; 4] {
        [self.a, self.c, self.g, self.t]
    }
}

/// Returns the required columns absent from `headers`, in required order.
pub fn missing_columns<'a, I>(headers: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let present: Vec<&str> = headers.into_iter().map(|h| h.trim()).collect();
    REQUIRED_COLUMNS
        .iter()
        .filter(|column| !present.contains(column))
        .map(|column| column.to_string())
        .collect()
}

pub fn read_per_base_file<P: AsRef<Path>>(path: P) -> Result<Vec<PerBasePosition>, QcError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        QcError::String(format!(
            "Could not open per-base file '{}': {e}",
            path.display()
        ))
    })?;
    read_per_base(file)
}

/// Parses a tab-separated per-base table.
///
/// Rows are returned sorted by `pos`. An input without a header or without
/// any data row is [`QcError::EmptyInput`]; duplicate positions are rejected.
pub fn read_per_base<R: Read>(reader: R) -> Result<Vec<PerBasePosition>, QcError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(QcError::EmptyInput);
    }
    let missing = missing_columns(headers.iter());
    if !missing.is_empty() {
        log::warn!("per-base table is missing columns: {missing:?}");
        return Err(QcError::MissingColumns(missing));
    }

    let mut rows = reader
        .deserialize::<PerBasePosition>()
        .collect::<Result<Vec<_>, _>>()?;
    if rows.is_empty() {
        return Err(QcError::EmptyInput);
    }

    rows.sort_by_key(|row| row.pos);
    if let Some(pair) = rows.windows(2).find(|pair| pair[0].pos == pair[1].pos) {
        return Err(QcError::String(format!(
            "Duplicate position {} in per-base table",
            pair[0].pos
        )));
    }
    log::debug!("read {} per-base rows", rows.len());
    Ok(rows)
}
