//! Mean and standard deviation of the metric columns, per partition.
//!
//! Every summary has a fixed shape: the partition rows it promises are
//! always present and always carry every column of [`SUMMARY_METRICS`], with
//! missing cells where nothing could be computed.

use crate::{
    metric::{Metric, SUMMARY_METRICS},
    metrics::{EnrichedRow, PerBaseTable},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Selected,
    Unselected,
    Full,
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Partition::Selected => "selected",
            Partition::Unselected => "unselected",
            Partition::Full => "full",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

impl MetricSummary {
    /// Mean and sample standard deviation of the defined values.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let values: Vec<f64> = values.into_iter().flatten().collect();
        let Some(mean) = mean(&values) else {
            return Self::default();
        };
        Self {
            mean: Some(mean),
            std: sample_std_dev(&values, mean),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.mean.is_none() && self.std.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub partition: Partition,
    pub metrics: BTreeMap<Metric, MetricSummary>,
}

impl SummaryRow {
    fn from_rows<'a, I>(partition: Partition, rows: I) -> Self
    where
        I: IntoIterator<Item = &'a EnrichedRow> + Clone,
    {
        let metrics = SUMMARY_METRICS
            .iter()
            .map(|metric| {
                let values = rows.clone().into_iter().map(|row| row.value(*metric));
                (*metric, MetricSummary::from_values(values))
            })
            .collect();
        Self { partition, metrics }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTable {
    rows: Vec<SummaryRow>,
}

impl SummaryTable {
    #[inline(always)]
    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn partitions(&self) -> Vec<Partition> {
        self.rows.iter().map(|row| row.partition).collect()
    }

    /// Cell for `partition` and `metric`; missing when the partition is absent.
    pub fn get(&self, partition: Partition, metric: Metric) -> MetricSummary {
        self.rows
            .iter()
            .find(|row| row.partition == partition)
            .and_then(|row| row.metrics.get(&metric))
            .copied()
            .unwrap_or_default()
    }

    #[inline(always)]
    pub fn mean(&self, partition: Partition, metric: Metric) -> Option<f64> {
        self.get(partition, metric).mean
    }

    /// True when no cell holds a value, i.e. nothing has been processed.
    pub fn is_empty(&self) -> bool {
        self.rows
            .iter()
            .all(|row| row.metrics.values().all(MetricSummary::is_missing))
    }

    /// Dashboard text "unselected (selected in selected)" for a split summary.
    ///
    /// Falls back to the selected mean when the unselected partition has no
    /// value, and to `"0"` when the selected mean itself is missing. With
    /// `decimals == 0` the means are truncated to whole numbers, not rounded.
    pub fn headline(&self, metric: Metric, decimals: usize) -> String {
        let Some(selected) = self.mean(Partition::Selected, metric) else {
            return "0".to_string();
        };
        let unselected = self
            .mean(Partition::Unselected, metric)
            .unwrap_or(selected);
        if decimals == 0 {
            return format!(
                "{} ({} in selected)",
                unselected.trunc() as i64,
                selected.trunc() as i64
            );
        }
        format!("{unselected:.decimals$} ({selected:.decimals$} in selected)")
    }
}

/// Split mode: one row each for the selected and unselected positions.
pub fn summarize_split(table: &PerBaseTable) -> SummaryTable {
    let selected = table.rows().iter().filter(|row| row.is_selected);
    let unselected = table.rows().iter().filter(|row| !row.is_selected);
    SummaryTable {
        rows: vec![
            SummaryRow::from_rows(Partition::Selected, selected),
            SummaryRow::from_rows(Partition::Unselected, unselected),
        ],
    }
}

/// Whole mode: a single `full` row ignoring the partition.
pub fn summarize_whole(table: &PerBaseTable) -> SummaryTable {
    SummaryTable {
        rows: vec![SummaryRow::from_rows(Partition::Full, table.rows().iter())],
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn sample_std_dev(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let ss: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metrics::{
            TransformOptions,
            tests::{position, uniform_positions},
        },
        selection::{SelectionCriteria, apply_selection},
    };

    #[test]
    fn test_empty_split_summary_keeps_shape() {
        let summary = summarize_split(&PerBaseTable::default());
        assert_eq!(
            summary.partitions(),
            vec![Partition::Selected, Partition::Unselected]
        );
        for row in summary.rows() {
            assert_eq!(row.metrics.len(), SUMMARY_METRICS.len());
            assert!(row.metrics.values().all(MetricSummary::is_missing));
        }
        assert!(summary.is_empty());
    }

    #[test]
    fn test_empty_whole_summary_keeps_shape() {
        let summary = summarize_whole(&PerBaseTable::default());
        assert_eq!(summary.partitions(), vec![Partition::Full]);
        assert_eq!(summary.rows()[0].metrics.len(), SUMMARY_METRICS.len());
        assert!(summary.is_empty());
    }

    #[test]
    fn test_split_means() {
        let positions = vec![
            position(1, 'A', [10, 0, 0, 0]),
            position(2, 'A', [20, 0, 0, 0]),
            position(3, 'A', [30, 0, 0, 0]),
            position(4, 'A', [40, 0, 0, 0]),
        ];
        let mut table = PerBaseTable::from_positions(&positions, &TransformOptions::default());
        apply_selection(&mut table, &SelectionCriteria::from_range(1, 3), &[]);
        let summary = summarize_split(&table);

        let selected = summary.get(Partition::Selected, Metric::NTotal);
        assert_eq!(selected.mean, Some(15.0));
        assert!((selected.std.unwrap() - 50f64.sqrt()).abs() < 1e-12);
        assert_eq!(summary.mean(Partition::Unselected, Metric::NTotal), Some(35.0));
        assert_eq!(summary.mean(Partition::Full, Metric::NTotal), None);

        let whole = summarize_whole(&table);
        assert_eq!(whole.mean(Partition::Full, Metric::NTotal), Some(25.0));
    }

    #[test]
    fn test_empty_partition_is_present_and_missing() {
        let table =
            PerBaseTable::from_positions(&uniform_positions(12), &TransformOptions::default());
        let summary = summarize_split(&table);
        assert!(summary.mean(Partition::Selected, Metric::Entropy).is_some());
        let unselected = summary.get(Partition::Unselected, Metric::Entropy);
        assert!(unselected.is_missing());
        assert!(!summary.is_empty());
    }

    #[test]
    fn test_missing_values_are_skipped() {
        let positions = vec![
            position(1, 'A', [0, 0, 0, 0]),
            position(2, 'A', [90, 10, 0, 0]),
            position(3, 'A', [80, 20, 0, 0]),
        ];
        let table = PerBaseTable::from_positions(&positions, &TransformOptions::default());
        let whole = summarize_whole(&table);
        let vf = whole.get(Partition::Full, Metric::VariantFraction);
        assert!((vf.mean.unwrap() - 0.15).abs() < 1e-12);
        assert!(vf.std.unwrap().is_finite());

        // Single defined value: a mean but no deviation
        let single = MetricSummary::from_values([None, Some(2.0)]);
        assert_eq!(single.mean, Some(2.0));
        assert_eq!(single.std, None);
    }

    #[test]
    fn test_headline() {
        let positions = vec![
            position(1, 'A', [10, 0, 0, 0]),
            position(2, 'A', [20, 0, 0, 0]),
            position(3, 'A', [30, 0, 0, 0]),
        ];
        let mut table = PerBaseTable::from_positions(&positions, &TransformOptions::default());
        apply_selection(&mut table, &SelectionCriteria::from_range(1, 2), &[]);
        let summary = summarize_split(&table);
        assert_eq!(summary.headline(Metric::ReadsAll, 0), "25 (10 in selected)");

        apply_selection(&mut table, &SelectionCriteria::from_range(0, 10), &[]);
        let summary = summarize_split(&table);
        assert_eq!(summary.headline(Metric::ReadsAll, 2), "20.00 (20.00 in selected)");

        assert_eq!(
            summarize_split(&PerBaseTable::default()).headline(Metric::Entropy, 2),
            "0"
        );
    }

    #[test]
    fn test_whole_number_headline_truncates() {
        let positions = vec![
            position(1, 'A', [992, 0, 0, 0]),
            position(2, 'A', [993, 0, 0, 0]),
            position(3, 'A', [993, 0, 0, 0]),
            position(4, 'A', [990, 0, 0, 0]),
            position(5, 'A', [998, 0, 0, 0]),
        ];
        let mut table = PerBaseTable::from_positions(&positions, &TransformOptions::default());
        // Selected mean 992.5, unselected mean 993.666...
        apply_selection(&mut table, &SelectionCriteria::from_range(1, 3), &[]);
        let summary = summarize_split(&table);
        assert_eq!(summary.mean(Partition::Selected, Metric::ReadsAll), Some(992.5));
        assert_eq!(summary.headline(Metric::ReadsAll, 0), "993 (992 in selected)");
        assert_eq!(summary.headline(Metric::ReadsAll, 1), "993.7 (992.5 in selected)");

        // Unselected mean 992.666..., selected mean 994.0
        apply_selection(&mut table, &SelectionCriteria::from_range(4, 6), &[]);
        let summary = summarize_split(&table);
        assert_eq!(summary.headline(Metric::ReadsAll, 0), "992 (994 in selected)");
    }
}
