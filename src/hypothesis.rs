//! Comparing the selected and unselected positions metric by metric.

use crate::{
    distribution::t_two_tailed_p,
    metric::{Metric, TESTED_METRICS},
    metrics::PerBaseTable,
    summary::SummaryTable,
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const COMPARE_MEANS: &str = "Compare means";
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "Pass"),
            Verdict::Fail => write!(f, "Fail"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WelchTest {
    pub statistic: f64,
    pub p_value: f64,
    pub degrees_of_freedom: f64,
}

/// Welch's unequal-variance two-sample t-test of `x` against `y`.
///
/// `None` when either sample has fewer than two values or both samples have
/// zero variance, since the statistic is undefined then.
pub fn welch_t_test(x: &[f64], y: &[f64]) -> Option<WelchTest> {
    if x.len() < 2 || y.len() < 2 {
        return None;
    }
    let (mean_x, var_x) = mean_and_variance(x);
    let (mean_y, var_y) = mean_and_variance(y);
    let vn_x = var_x / x.len() as f64;
    let vn_y = var_y / y.len() as f64;

    let se = (vn_x + vn_y).sqrt();
    if se == 0.0 || !se.is_finite() {
        return None;
    }
    let statistic = (mean_x - mean_y) / se;
    let degrees_of_freedom = (vn_x + vn_y).powi(2)
        / (vn_x.powi(2) / (x.len() as f64 - 1.0) + vn_y.powi(2) / (y.len() as f64 - 1.0));
    let p_value = t_two_tailed_p(statistic, degrees_of_freedom)?;

    Some(WelchTest {
        statistic,
        p_value,
        degrees_of_freedom,
    })
}

fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (mean, ss / (n - 1.0))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestResultRow {
    pub metric: Metric,
    pub test: String,
    /// Absent when the samples were too small to test.
    pub result: Option<Verdict>,
    pub p_value: Option<f64>,
    pub t_stat: Option<f64>,
}

impl TestResultRow {
    fn compare_means(metric: Metric, test: Option<WelchTest>, significance_level: f64) -> Self {
        let result = test.map(|t| {
            if t.p_value < significance_level {
                Verdict::Pass
            } else {
                Verdict::Fail
            }
        });
        Self {
            metric,
            test: COMPARE_MEANS.to_string(),
            result,
            p_value: test.map(|t| t.p_value),
            t_stat: test.map(|t| t.statistic),
        }
    }
}

/// Runs a Welch t-test on every tested metric, selected against unselected.
///
/// Returns no rows while either summary is empty, which is the state before
/// any data has been processed.
pub fn test_partitions(
    table: &PerBaseTable,
    split_summary: &SummaryTable,
    whole_summary: &SummaryTable,
    significance_level: f64,
) -> Vec<TestResultRow> {
    if split_summary.is_empty() || whole_summary.is_empty() {
        return vec![];
    }

    TESTED_METRICS
        .iter()
        .map(|metric| {
            let (selected, unselected) = partition_values(table, *metric);
            let test = welch_t_test(&selected, &unselected);
            if test.is_none() {
                log::debug!(
                    "{metric}: cannot compare {} selected with {} unselected values",
                    selected.len(),
                    unselected.len()
                );
            }
            TestResultRow::compare_means(*metric, test, significance_level)
        })
        .collect()
}

/// Defined values of `metric`, split into (selected, unselected).
fn partition_values(table: &PerBaseTable, metric: Metric) -> (Vec<f64>, Vec<f64>) {
    let mut selected = vec![];
    let mut unselected = vec![];
    for row in table.rows() {
        let Some(value) = row.value(metric) else {
            continue;
        };
        if row.is_selected {
            selected.push(value);
        } else {
            unselected.push(value);
        }
    }
    (selected, unselected)
}
