//! Writing the enriched table as TSV.

use crate::{error::QcError, metrics::EnrichedRow, metrics::PerBaseTable};
use csv::WriterBuilder;
use std::{io::Write, path::Path};

/// Columns shown when the table is displayed.
pub const TABULAR_COLUMNS: [&str; 20] = [
    "pos",
    "is_selected",
    "ref",
    "aligned_ref",
    "A",
    "C",
    "G",
    "T",
    "reads_all",
    "n_variants",
    "variant_fraction",
    "entropy",
    "effective_entropy",
    "percent_of_max_entropy",
    "insertions",
    "deletions",
    "indel_fraction",
    "indel_substitution_ratio",
    "alignment_mismatch",
    "max_variant_base",
];

/// Remaining raw and derived columns, appended for a full export.
pub const EXTRA_COLUMNS: [&str; 9] = [
    "matches",
    "mismatches",
    "low_conf",
    "codon_number",
    "n_indels",
    "n_total",
    "variant_fraction_percent",
    "expected_variant_codons",
    "expected_ref_n",
];

pub fn export_columns(tabular_only: bool) -> Vec<&'static str> {
    let mut columns = TABULAR_COLUMNS.to_vec();
    if !tabular_only {
        columns.extend(EXTRA_COLUMNS);
    }
    columns
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn cell(row: &EnrichedRow, column: &str) -> String {
    let raw = &row.raw;
    match column {
        "pos" => raw.pos.to_string(),
        "is_selected" => row.is_selected.to_string(),
        "ref" => raw.ref_base.to_string(),
        "aligned_ref" => row.aligned_ref.clone(),
        "A" => raw.a.to_string(),
        "C" => raw.c.to_string(),
        "G" => raw.g.to_string(),
        "T" => raw.t.to_string(),
        "reads_all" => raw.reads_all.to_string(),
        "matches" => raw.matches.to_string(),
        "mismatches" => raw.mismatches.to_string(),
        "low_conf" => raw.low_conf.to_string(),
        "insertions" => raw.insertions.to_string(),
        "deletions" => raw.deletions.to_string(),
        "codon_number" => row.codon_number.to_string(),
        "n_variants" => row.n_variants.to_string(),
        "n_indels" => row.n_indels.to_string(),
        "n_total" => row.n_total.to_string(),
        "variant_fraction" => optional(row.variant_fraction),
        "variant_fraction_percent" => optional(row.variant_fraction_percent),
        "indel_fraction" => optional(row.indel_fraction),
        "indel_substitution_ratio" => optional(row.indel_substitution_ratio),
        "max_variant_base" => row.max_variant_base.to_string(),
        "entropy" => row.entropy.to_string(),
        "effective_entropy" => row.effective_entropy.to_string(),
        "percent_of_max_entropy" => row.percent_of_max_entropy.to_string(),
        "expected_variant_codons" => row.expected_variant_codons.to_string(),
        "expected_ref_n" => row.expected_ref_n.to_string(),
        "alignment_mismatch" => row.alignment_mismatch.to_string(),
        _ => String::new(),
    }
}

/// Writes `table` with a header line; missing values become empty cells.
pub fn write_table<W: Write>(
    table: &PerBaseTable,
    writer: W,
    tabular_only: bool,
) -> Result<(), QcError> {
    let columns = export_columns(tabular_only);
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    writer.write_record(&columns)?;
    for row in table.rows() {
        writer.write_record(columns.iter().map(|column| cell(row, column)))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_table_file<P: AsRef<Path>>(
    table: &PerBaseTable,
    path: P,
    tabular_only: bool,
) -> Result<(), QcError> {
    let file = std::fs::File::create(path)?;
    write_table(table, file, tabular_only)
}
