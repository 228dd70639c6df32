//! Per-position diversity and quality metrics.
//!
//! [`PerBaseTable::from_positions`] turns raw pileup counts into an enriched
//! table. Ratio columns are `None` wherever their denominator is zero, so
//! nothing infinite or NaN ever reaches the aggregates.

use crate::{
    metric::Metric,
    nucleotide::{BASES, Base},
    per_base::PerBasePosition,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_NOISE_FLOOR: u64 = 3;
pub const UNALIGNED_REF: &str = "-";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Non-maximum base counts below this value do not contribute to
    /// effective entropy.
    pub noise_floor: u64,
    pub reverse_complement: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            noise_floor: DEFAULT_NOISE_FLOOR,
            reverse_complement: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    #[serde(flatten)]
    pub raw: PerBasePosition,
    pub codon_number: u64,
    pub is_selected: bool,
    pub n_variants: u64,
    pub n_indels: u64,
    pub n_total: u64,
    pub variant_fraction: Option<f64>,
    pub variant_fraction_percent: Option<f64>,
    pub indel_fraction: Option<f64>,
    pub indel_substitution_ratio: Option<f64>,
    pub max_variant_base: u64,
    pub entropy: f64,
    pub effective_entropy: f64,
    pub expected_variant_codons: f64,
    pub expected_ref_n: f64,
    pub percent_of_max_entropy: f64,
    pub aligned_ref: String,
    pub alignment_mismatch: u8,
}

impl EnrichedRow {
    #[inline(always)]
    pub fn pos(&self) -> u64 {
        self.raw.pos
    }

    /// Value of a summarized metric column, `None` when missing.
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::NTotal => Some(self.n_total as f64),
            Metric::ReadsAll => Some(self.raw.reads_all as f64),
            Metric::NVariants => Some(self.n_variants as f64),
            Metric::VariantFraction => self.variant_fraction,
            Metric::VariantFractionPercent => self.variant_fraction_percent,
            Metric::IndelFraction => self.indel_fraction,
            Metric::IndelSubstitutionRatio => self.indel_substitution_ratio,
            Metric::MaxVariantBase => Some(self.max_variant_base as f64),
            Metric::Entropy => Some(self.entropy),
            Metric::EffectiveEntropy => Some(self.effective_entropy),
            Metric::PercentOfMaxEntropy => Some(self.percent_of_max_entropy),
            Metric::ExpectedVariantCodons => Some(self.expected_variant_codons),
            Metric::ExpectedRefN => Some(self.expected_ref_n),
            Metric::Insertions => Some(self.raw.insertions as f64),
            Metric::Deletions => Some(self.raw.deletions as f64),
        }
    }

    fn from_position(
        raw: &PerBasePosition,
        subpool_codon_fraction: f64,
        noise_floor: u64,
    ) -> Self {
        let counts = raw.base_counts();
        let n_variants = n_variants(&counts);
        let n_indels = raw.insertions + raw.deletions;
        let n_total: u64 = counts.iter().sum();
        let variant_fraction = safe_ratio(n_variants as f64, raw.reads_all as f64);
        let effective_entropy = effective_entropy(&counts, noise_floor);

        Self {
            raw: raw.clone(),
            codon_number: raw.pos / 3,
            is_selected: true,
            n_variants,
            n_indels,
            n_total,
            variant_fraction,
            variant_fraction_percent: variant_fraction_percent(
                variant_fraction,
                subpool_codon_fraction,
            ),
            indel_fraction: safe_ratio(n_indels as f64, raw.reads_all as f64),
            indel_substitution_ratio: safe_ratio(n_indels as f64, n_variants as f64),
            max_variant_base: max_variant_base(raw),
            entropy: shannon_entropy(&counts),
            effective_entropy,
            expected_variant_codons: subpool_codon_fraction * n_total as f64,
            expected_ref_n: n_total as f64 * (1.0 - subpool_codon_fraction),
            percent_of_max_entropy: effective_entropy / 3f64.ln(),
            aligned_ref: UNALIGNED_REF.to_string(),
            alignment_mismatch: 0,
        }
    }

    /// Maps this row onto the opposite strand of a sequence of `sequence_length`.
    fn reverse_complement(&mut self, sequence_length: u64) {
        let raw = &mut self.raw;
        raw.pos = (sequence_length + 1).saturating_sub(raw.pos);
        raw.ref_base = Base::letter_complement(raw.ref_base);
        std::mem::swap(&mut raw.a, &mut raw.t);
        std::mem::swap(&mut raw.c, &mut raw.g);
        self.codon_number = raw.pos / 3;
    }
}

/// The enriched per-base table plus the quantities its rows were derived from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerBaseTable {
    rows: Vec<EnrichedRow>,
    sequence_length: u64,
    subpool_codon_fraction: f64,
}

impl PerBaseTable {
    pub fn from_positions(positions: &[PerBasePosition], options: &TransformOptions) -> Self {
        let Some(sequence_length) = positions.iter().map(|p| p.pos).max() else {
            return Self::default();
        };
        let subpool_codon_fraction = 1.0 / ((sequence_length / 3) as f64 + 1.0);

        let mut rows: Vec<EnrichedRow> = positions
            .iter()
            .map(|p| EnrichedRow::from_position(p, subpool_codon_fraction, options.noise_floor))
            .collect();

        if options.reverse_complement {
            rows.reverse();
            for row in rows.iter_mut() {
                row.reverse_complement(sequence_length);
            }
        }

        log::debug!(
            "enriched {} positions, sequence length {sequence_length}",
            rows.len()
        );
        Self {
            rows,
            sequence_length,
            subpool_codon_fraction,
        }
    }

    #[inline(always)]
    pub fn rows(&self) -> &[EnrichedRow] {
        &self.rows
    }

    #[inline(always)]
    pub fn rows_mut(&mut self) -> &mut [EnrichedRow] {
        &mut self.rows
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Largest `pos` of the table, 0 when empty.
    #[inline(always)]
    pub fn sequence_length(&self) -> u64 {
        self.sequence_length
    }

    #[inline(always)]
    pub fn subpool_codon_fraction(&self) -> f64 {
        self.subpool_codon_fraction
    }

    pub(crate) fn set_subpool_codon_fraction(&mut self, fraction: f64) {
        self.subpool_codon_fraction = fraction;
    }

    /// The `ref` column concatenated into one sequence.
    pub fn ref_sequence(&self) -> String {
        self.rows.iter().map(|row| row.raw.ref_base).collect()
    }

    pub fn selected_count(&self) -> usize {
        self.rows.iter().filter(|row| row.is_selected).count()
    }
}

/// `numerator / denominator`, or `None` when the quotient is not finite.
#[inline(always)]
pub fn safe_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    let ratio = numerator / denominator;
    ratio.is_finite().then_some(ratio)
}

pub(crate) fn variant_fraction_percent(
    variant_fraction: Option<f64>,
    subpool_codon_fraction: f64,
) -> Option<f64> {
    variant_fraction.and_then(|fraction| safe_ratio((4.0 / 3.0) * fraction, subpool_codon_fraction))
}

/// Index of the first largest count.
#[inline(always)]
fn max_index(counts: &[u64; 4]) -> usize {
    let mut best = 0;
    for (i, count) in counts.iter().enumerate().skip(1) {
        if *count > counts[best] {
            best = i;
        }
    }
    best
}

/// The three counts left after removing one occurrence of the maximum.
fn non_max_counts(counts: &[u64; 4]) -> [u64; 3] {
    let skip = max_index(counts);
    let mut ret = [0; 3];
    for (slot, count) in counts
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .map(|(_, count)| count)
        .enumerate()
    {
        ret[slot] = *count;
    }
    ret
}

pub fn n_variants(counts: &[u64; 4]) -> u64 {
    non_max_counts(counts).iter().sum()
}

/// Natural-log Shannon entropy of the normalized counts; 0 for all-zero input.
pub fn shannon_entropy(counts: &[u64]) -> f64 {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    let entropy: f64 = counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.ln()
        })
        .sum();
    // A single non-zero count yields -0.0
    entropy.max(0.0)
}

pub fn effective_entropy(counts: &[u64; 4], noise_floor: u64) -> f64 {
    let remaining = non_max_counts(counts).map(|count| if count < noise_floor { 0 } else { count });
    shannon_entropy(&remaining)
}

/// Largest count among the bases that differ from the reference base.
pub fn max_variant_base(raw: &PerBasePosition) -> u64 {
    let counts = raw.base_counts();
    let ref_base = Base::from_letter(raw.ref_base);
    BASES
        .iter()
        .filter(|base| Some(**base) != ref_base)
        .map(|base| counts[base.index()])
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn position(pos: u64, ref_base: char, counts: [u64; 4]) -> PerBasePosition {
        let n_total: u64 = counts.iter().sum();
        PerBasePosition {
            pos,
            ref_base,
            reads_all: n_total,
            matches: 0,
            mismatches: 0,
            deletions: 0,
            insertions: 0,
            low_conf: 0,
            a: counts[0],
            c: counts[1],
            g: counts[2],
            t: counts[3],
        }
    }

    /// `len` positions cycling through ACGT, each with a dominant reference
    /// base over background counts below the noise floor.
    pub(crate) fn uniform_positions(len: u64) -> Vec<PerBasePosition> {
        (1..=len)
            .map(|pos| {
                let base = BASES[(pos % 4) as usize];
                let mut counts = [2, 1, 1, 1];
                counts[base.index()] = 90;
                position(pos, base.letter(), counts)
            })
            .collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_example_row() {
        let mut raw = position(10, 'A', [2, 0, 0, 98]);
        raw.reads_all = 100;
        let table = PerBaseTable::from_positions(&[raw], &TransformOptions::default());
        let row = &table.rows()[0];
        assert_eq!(row.n_variants, 2);
        assert_eq!(row.variant_fraction, Some(0.02));
        assert_eq!(row.max_variant_base, 98);
        assert_eq!(row.codon_number, 3);
        assert!(row.is_selected);
        let expected = -(0.02f64 * 0.02f64.ln() + 0.98f64 * 0.98f64.ln());
        assert!(close(row.entropy, expected));
        assert!(row.entropy > 0.0 && row.entropy < 0.2);
        assert_eq!(row.aligned_ref, "-");
        assert_eq!(row.alignment_mismatch, 0);
    }

    #[test]
    fn test_zero_reads_give_missing_ratios() {
        let table = PerBaseTable::from_positions(
            &[position(1, 'A', [0, 0, 0, 0])],
            &TransformOptions::default(),
        );
        let row = &table.rows()[0];
        assert_eq!(row.variant_fraction, None);
        assert_eq!(row.variant_fraction_percent, None);
        assert_eq!(row.indel_fraction, None);
        assert_eq!(row.indel_substitution_ratio, None);
        assert_eq!(row.entropy, 0.0);
        assert_eq!(row.effective_entropy, 0.0);
    }

    #[test]
    fn test_indel_substitution_ratio_needs_variants() {
        let mut raw = position(1, 'G', [0, 0, 50, 0]);
        raw.insertions = 2;
        raw.deletions = 3;
        let table = PerBaseTable::from_positions(&[raw], &TransformOptions::default());
        let row = &table.rows()[0];
        assert_eq!(row.n_indels, 5);
        assert_eq!(row.indel_fraction, Some(0.1));
        assert_eq!(row.indel_substitution_ratio, None);
    }

    #[test]
    fn test_tied_maximum_is_excluded_once() {
        assert_eq!(n_variants(&[10, 10, 1, 0]), 11);
        assert_eq!(non_max_counts(&[10, 10, 1, 0]), [10, 1, 0]);
        assert_eq!(non_max_counts(&[1, 5, 5, 5]), [1, 5, 5]);
    }

    #[test]
    fn test_effective_entropy_applies_noise_floor() {
        // 100 is the maximum; 2 is below the floor and drops out
        assert_eq!(effective_entropy(&[100, 2, 50, 0], 3), 0.0);
        let uniform = effective_entropy(&[100, 20, 20, 20], 3);
        assert!(close(uniform, 3f64.ln()));
        assert!(effective_entropy(&[100, 2, 50, 50], 3) > 0.0);
        assert!(close(effective_entropy(&[100, 2, 50, 50], 1), shannon_entropy(&[2, 50, 50])));
    }

    #[test]
    fn test_entropy_bounds() {
        let table =
            PerBaseTable::from_positions(&uniform_positions(40), &TransformOptions::default());
        for row in table.rows() {
            assert!(row.entropy >= 0.0 && row.entropy <= 4f64.ln() + 1e-12);
            assert!(row.effective_entropy >= 0.0 && row.effective_entropy <= 3f64.ln() + 1e-12);
            assert!(row.percent_of_max_entropy >= 0.0 && row.percent_of_max_entropy <= 1.0 + 1e-12);
        }
        assert!(close(shannon_entropy(&[5, 5, 5, 5]), 4f64.ln()));
    }

    #[test]
    fn test_max_variant_base_ignores_reference() {
        assert_eq!(max_variant_base(&position(1, 'T', [0, 0, 0, 40])), 0);
        assert_eq!(max_variant_base(&position(1, 'C', [7, 90, 9, 1])), 9);
    }

    #[test]
    fn test_subpool_fraction_from_sequence_length() {
        let table =
            PerBaseTable::from_positions(&uniform_positions(30), &TransformOptions::default());
        assert_eq!(table.sequence_length(), 30);
        assert!(close(table.subpool_codon_fraction(), 1.0 / 11.0));
        let row = &table.rows()[0];
        assert!(close(row.expected_variant_codons, row.n_total as f64 / 11.0));
        assert!(close(row.expected_ref_n, row.n_total as f64 * 10.0 / 11.0));
        let vf = row.variant_fraction.unwrap();
        assert!(close(row.variant_fraction_percent.unwrap(), 4.0 / 3.0 * vf * 11.0));
    }

    #[test]
    fn test_reverse_complement() {
        let positions = vec![
            position(1, 'A', [90, 5, 3, 2]),
            position(2, 'C', [1, 80, 10, 9]),
            position(3, 'G', [0, 0, 70, 30]),
        ];
        let forward = PerBaseTable::from_positions(&positions, &TransformOptions::default());
        let options = TransformOptions {
            reverse_complement: true,
            ..Default::default()
        };
        let reverse = PerBaseTable::from_positions(&positions, &options);

        assert_eq!(reverse.ref_sequence(), "CGT");
        let first = &reverse.rows()[0];
        assert_eq!(first.pos(), 1);
        assert_eq!(first.raw.base_counts(), [30, 70, 0, 0]);
        assert_eq!(first.codon_number, 0);
        assert_eq!(reverse.rows()[2].pos(), 3);
        assert_eq!(reverse.rows()[2].raw.base_counts(), [2, 3, 5, 90]);

        // Strand-symmetric metrics carry over unchanged
        for (f, r) in forward.rows().iter().rev().zip(reverse.rows()) {
            assert_eq!(f.n_variants, r.n_variants);
            assert_eq!(f.max_variant_base, r.max_variant_base);
            assert!(close(f.entropy, r.entropy));
        }
    }

    #[test]
    fn test_empty_input() {
        let table = PerBaseTable::from_positions(&[], &TransformOptions::default());
        assert!(table.is_empty());
        assert_eq!(table.sequence_length(), 0);
    }

    #[test]
    fn test_value_matches_fields() {
        let table =
            PerBaseTable::from_positions(&uniform_positions(3), &TransformOptions::default());
        let row = &table.rows()[0];
        assert_eq!(row.value(Metric::NVariants), Some(row.n_variants as f64));
        assert_eq!(row.value(Metric::VariantFraction), row.variant_fraction);
        assert_eq!(row.value(Metric::Entropy), Some(row.entropy));
    }
}
