//! Names and display metadata of the per-base metric columns.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    NTotal,
    ReadsAll,
    NVariants,
    VariantFraction,
    VariantFractionPercent,
    IndelFraction,
    IndelSubstitutionRatio,
    MaxVariantBase,
    Entropy,
    EffectiveEntropy,
    PercentOfMaxEntropy,
    ExpectedVariantCodons,
    ExpectedRefN,
    Insertions,
    Deletions,
}

/// Columns summarized by the aggregator, in output order.
pub const SUMMARY_METRICS: [Metric; 15] = [
    Metric::NTotal,
    Metric::ReadsAll,
    Metric::NVariants,
    Metric::VariantFraction,
    Metric::VariantFractionPercent,
    Metric::IndelFraction,
    Metric::IndelSubstitutionRatio,
    Metric::MaxVariantBase,
    Metric::Entropy,
    Metric::EffectiveEntropy,
    Metric::PercentOfMaxEntropy,
    Metric::ExpectedVariantCodons,
    Metric::ExpectedRefN,
    Metric::Insertions,
    Metric::Deletions,
];

/// Columns compared between the selected and unselected partitions.
pub const TESTED_METRICS: [Metric; 15] = SUMMARY_METRICS;

impl Metric {
    pub fn column_name(&self) -> &'static str {
        match self {
            Metric::NTotal => "n_total",
            Metric::ReadsAll => "reads_all",
            Metric::NVariants => "n_variants",
            Metric::VariantFraction => "variant_fraction",
            Metric::VariantFractionPercent => "variant_fraction_percent",
            Metric::IndelFraction => "indel_fraction",
            Metric::IndelSubstitutionRatio => "indel_substitution_ratio",
            Metric::MaxVariantBase => "max_variant_base",
            Metric::Entropy => "entropy",
            Metric::EffectiveEntropy => "effective_entropy",
            Metric::PercentOfMaxEntropy => "percent_of_max_entropy",
            Metric::ExpectedVariantCodons => "expected_variant_codons",
            Metric::ExpectedRefN => "expected_ref_n",
            Metric::Insertions => "insertions",
            Metric::Deletions => "deletions",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Metric::NTotal => "Total reads",
            Metric::ReadsAll => "Reads per base",
            Metric::NVariants => "Variant reads",
            Metric::VariantFraction => "Variant fraction",
            Metric::VariantFractionPercent => "Variant fraction % expected",
            Metric::IndelFraction => "Indel fraction",
            Metric::IndelSubstitutionRatio => "Indel to substitution ratio",
            Metric::MaxVariantBase => "Max counts non-ref base",
            Metric::Entropy => "Entropy",
            Metric::EffectiveEntropy => "Effective entropy",
            Metric::PercentOfMaxEntropy => "Entropy % max",
            Metric::ExpectedVariantCodons => "Expected variant codons",
            Metric::ExpectedRefN => "Expected reference reads",
            Metric::Insertions => "Insertion count",
            Metric::Deletions => "Deletion count",
        }
    }

    pub fn tooltip(&self) -> &'static str {
        match self {
            Metric::NTotal => "Total number of reads covering each position.",
            Metric::ReadsAll => "Number of reads reported by the pileup at each position.",
            Metric::NVariants => "Number of variant reads at each position.",
            Metric::VariantFraction => "Fraction of variant reads at each position.",
            Metric::VariantFractionPercent => {
                "Fraction of expected variant reads at each position. Values below 1 may suggest that the library contains a large amount of non-mutated sequences."
            }
            Metric::IndelFraction => "Fraction of reads with indels at each position.",
            Metric::IndelSubstitutionRatio => {
                "Ratio of indels to substitutions at each position."
            }
            Metric::MaxVariantBase => "Counts of the most common non-reference base.",
            Metric::Entropy => {
                "Shannon entropy, measuring sequence diversity. Higher values indicate a more even distribution of bases."
            }
            Metric::EffectiveEntropy => {
                "Entropy of non-reference (variant) reads. Excludes the majority base, so it reflects the diversity of the variant library."
            }
            Metric::PercentOfMaxEntropy => {
                "Fraction of maximum possible entropy at position. Values well below 1 indicate lower diversity than expected."
            }
            Metric::ExpectedVariantCodons => {
                "Reads expected to carry a variant codon under uniform mutagenesis of the selection."
            }
            Metric::ExpectedRefN => {
                "Reads expected to carry the reference codon under uniform mutagenesis."
            }
            Metric::Insertions => "Count of insertions at each position.",
            Metric::Deletions => "Count of deletions at each position.",
        }
    }

    /// Plot colour used by the dashboard.
    pub fn color(&self) -> &'static str {
        match self {
            Metric::Entropy => "#009E73",
            Metric::EffectiveEntropy => "#56B4E9",
            Metric::PercentOfMaxEntropy => "#D55E00",
            Metric::NTotal => "#000000",
            Metric::NVariants => "#F0E442",
            Metric::VariantFraction => "#0072B2",
            Metric::VariantFractionPercent => "green",
            Metric::Insertions => "#E69F00",
            Metric::Deletions => "black",
            Metric::IndelFraction => "blue",
            Metric::IndelSubstitutionRatio => "purple",
            Metric::MaxVariantBase => "green",
            Metric::ReadsAll => "#999999",
            Metric::ExpectedVariantCodons => "#CC79A7",
            Metric::ExpectedRefN => "#666666",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.column_name())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SUMMARY_METRICS
            .iter()
            .find(|metric| metric.column_name() == s)
            .copied()
            .ok_or_else(|| format!("Unknown metric column '{s}'"))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MetricInfo {
    pub column: &'static str,
    pub name: &'static str,
    pub tooltip: &'static str,
    pub color: &'static str,
}

pub fn metric_catalog() -> Vec<MetricInfo> {
    SUMMARY_METRICS
        .iter()
        .map(|metric| MetricInfo {
            column: metric.column_name(),
            name: metric.display_name(),
            tooltip: metric.tooltip(),
            color: metric.color(),
        })
        .collect()
}
