//! Splitting the table into selected and unselected positions.

use crate::{
    metrics::{PerBaseTable, variant_fraction_percent},
    reference::ReferenceFeature,
};
use serde::{Deserialize, Serialize};

/// Half-open `[low, high)` interval over `pos`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRange {
    pub low: u64,
    pub high: u64,
}

impl PositionRange {
    pub fn new(low: u64, high: u64) -> Self {
        Self { low, high }
    }

    #[inline(always)]
    pub fn contains(&self, pos: u64) -> bool {
        self.low <= pos && pos < self.high
    }

    /// Forces `high <= sequence_length` and `low < high`.
    pub fn clamped(&self, sequence_length: u64) -> Self {
        let high = self.high.min(sequence_length);
        let low = if self.low >= high {
            high.saturating_sub(1)
        } else {
            self.low
        };
        Self { low, high }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionCriteria {
    pub range: Option<PositionRange>,
    /// Labels of the reference features to select.
    pub features: Vec<String>,
}

impl SelectionCriteria {
    pub fn from_range(low: u64, high: u64) -> Self {
        Self {
            range: Some(PositionRange::new(low, high)),
            features: vec![],
        }
    }

    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features.extend(features.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_none() && self.features.is_empty()
    }

    /// All intervals of the selection: the numeric range followed by the
    /// bounds of every named, non-`source` feature.
    pub fn intervals(&self, features: &[ReferenceFeature]) -> Vec<PositionRange> {
        let mut ret: Vec<PositionRange> = self.range.iter().copied().collect();
        for name in &self.features {
            let matching: Vec<PositionRange> = features
                .iter()
                .filter(|feature| feature.is_selectable() && feature.name() == Some(name.as_str()))
                .map(|feature| PositionRange::new(feature.start, feature.end))
                .collect();
            if matching.is_empty() {
                log::warn!("selected feature '{name}' is not annotated on the reference");
            }
            ret.extend(matching);
        }
        ret
    }
}

/// Recomputes `is_selected` and the columns that depend on the selection size.
///
/// A position is selected when it lies in any interval of `criteria`. The
/// subpool codon fraction becomes `3 / (selected + 1)`, and
/// `expected_variant_codons` and `variant_fraction_percent` are derived from
/// it again. Every other column is left as it is.
pub fn apply_selection(
    table: &mut PerBaseTable,
    criteria: &SelectionCriteria,
    features: &[ReferenceFeature],
) {
    if table.is_empty() {
        return;
    }
    let intervals = criteria.intervals(features);

    let mut selected = 0usize;
    for row in table.rows_mut() {
        let pos = row.pos();
        row.is_selected = intervals.iter().any(|interval| interval.contains(pos));
        if row.is_selected {
            selected += 1;
        }
    }

    let subpool_codon_fraction = 3.0 / (selected as f64 + 1.0);
    for row in table.rows_mut() {
        row.expected_variant_codons = subpool_codon_fraction * row.n_total as f64;
        row.variant_fraction_percent =
            variant_fraction_percent(row.variant_fraction, subpool_codon_fraction);
    }
    table.set_subpool_codon_fraction(subpool_codon_fraction);
    log::debug!(
        "selected {selected} of {} positions from {} intervals",
        table.len(),
        intervals.len()
    );
}
