//! The state of one QC run and the pipeline that derives every output from it.

use crate::{
    alignment::align_reference,
    error::QcError,
    hypothesis::{DEFAULT_SIGNIFICANCE_LEVEL, TestResultRow, test_partitions},
    metric::Metric,
    metrics::{DEFAULT_NOISE_FLOOR, PerBaseTable, TransformOptions},
    per_base::{PerBasePosition, read_per_base_file},
    reference::Reference,
    selection::{SelectionCriteria, apply_selection},
    summary::{SummaryTable, summarize_split, summarize_whole},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcSettings {
    pub noise_floor: u64,
    pub significance_level: f64,
    pub reverse_complement: bool,
}

impl Default for QcSettings {
    fn default() -> Self {
        Self {
            noise_floor: DEFAULT_NOISE_FLOOR,
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
            reverse_complement: false,
        }
    }
}

impl QcSettings {
    pub fn load_from_path(path: &str) -> Result<Self, QcError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| QcError::String(format!("Could not read settings file '{path}': {e}")))?;
        serde_json::from_str(&text)
            .map_err(|e| QcError::String(format!("Could not parse settings JSON '{path}': {e}")))
    }

    pub fn save_to_path(&self, path: &str) -> Result<(), QcError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)
            .map_err(|e| QcError::String(format!("Could not write settings file '{path}': {e}")))
    }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            noise_floor: self.noise_floor,
            reverse_complement: self.reverse_complement,
        }
    }
}

/// Everything derived from a session's inputs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QcReport {
    pub table: PerBaseTable,
    pub split_summary: SummaryTable,
    pub whole_summary: SummaryTable,
    pub tests: Vec<TestResultRow>,
}

impl QcReport {
    #[inline(always)]
    pub fn headline(&self, metric: Metric, decimals: usize) -> String {
        self.split_summary.headline(metric, decimals)
    }
}

#[derive(Clone, Debug, Default)]
pub struct QcSession {
    settings: QcSettings,
    positions: Vec<PerBasePosition>,
    reference: Option<Reference>,
    selection: SelectionCriteria,
    report: QcReport,
}

impl QcSession {
    pub fn new(settings: QcSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    #[inline(always)]
    pub fn settings(&self) -> &QcSettings {
        &self.settings
    }

    #[inline(always)]
    pub fn reference(&self) -> Option<&Reference> {
        self.reference.as_ref()
    }

    #[inline(always)]
    pub fn selection(&self) -> &SelectionCriteria {
        &self.selection
    }

    #[inline(always)]
    pub fn report(&self) -> &QcReport {
        &self.report
    }

    /// Replaces the per-base data. A rejected file leaves the session without
    /// data, so every output is empty until a valid file is loaded.
    pub fn load_per_base<P: AsRef<Path>>(&mut self, path: P) -> Result<&QcReport, QcError> {
        match read_per_base_file(path) {
            Ok(positions) => Ok(self.set_positions(positions)),
            Err(e) => {
                self.positions.clear();
                self.recompute();
                Err(e)
            }
        }
    }

    pub fn set_positions(&mut self, positions: Vec<PerBasePosition>) -> &QcReport {
        self.positions = positions;
        self.recompute()
    }

    /// Loads a reference file; an unusable file clears the reference.
    pub fn load_reference<P: AsRef<Path>>(&mut self, path: P) -> &QcReport {
        self.set_reference(Reference::load_optional(path))
    }

    pub fn set_reference(&mut self, reference: Option<Reference>) -> &QcReport {
        self.reference = reference;
        self.recompute()
    }

    pub fn set_selection(&mut self, selection: SelectionCriteria) -> &QcReport {
        self.selection = selection;
        self.recompute()
    }

    /// Selection with its range kept inside the loaded sequence.
    pub fn effective_selection(&self, sequence_length: u64) -> SelectionCriteria {
        let mut selection = self.selection.clone();
        if sequence_length > 0 {
            selection.range = selection.range.map(|range| range.clamped(sequence_length));
        }
        selection
    }

    /// Runs the whole pipeline from the raw positions.
    ///
    /// With an empty selection every position stays selected.
    pub fn recompute(&mut self) -> &QcReport {
        let mut table =
            PerBaseTable::from_positions(&self.positions, &self.settings.transform_options());
        align_reference(
            &mut table,
            self.reference.as_ref().map(|reference| reference.sequence()),
        );

        let selection = self.effective_selection(table.sequence_length());
        if !selection.is_empty() {
            let features = self
                .reference
                .as_ref()
                .map(|reference| reference.features())
                .unwrap_or_default();
            apply_selection(&mut table, &selection, features);
        }

        let split_summary = summarize_split(&table);
        let whole_summary = summarize_whole(&table);
        let tests = test_partitions(
            &table,
            &split_summary,
            &whole_summary,
            self.settings.significance_level,
        );
        log::debug!(
            "recomputed report: {} positions, {} selected, {} tests",
            table.len(),
            table.selected_count(),
            tests.len()
        );

        self.report = QcReport {
            table,
            split_summary,
            whole_summary,
            tests,
        };
        &self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{hypothesis::Verdict, metrics::tests::uniform_positions, summary::Partition};
    use tempfile::NamedTempFile;

    #[test]
    fn test_settings_defaults_and_partial_json() {
        let settings: QcSettings = serde_json::from_str(r#"{"noise_floor": 5}"#).unwrap();
        assert_eq!(settings.noise_floor, 5);
        assert_eq!(settings.significance_level, 0.05);
        assert!(!settings.reverse_complement);
    }

    #[test]
    fn test_settings_roundtrip_file() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        let settings = QcSettings {
            noise_floor: 1,
            significance_level: 0.01,
            reverse_complement: true,
        };
        settings.save_to_path(path).unwrap();
        assert_eq!(QcSettings::load_from_path(path).unwrap(), settings);
        assert!(QcSettings::load_from_path("test_files/missing_settings.json").is_err());
    }

    #[test]
    fn test_empty_session_has_empty_outputs() {
        let mut session = QcSession::default();
        let report = session.recompute();
        assert!(report.table.is_empty());
        assert!(report.split_summary.is_empty());
        assert!(report.tests.is_empty());
        assert_eq!(report.headline(Metric::VariantFraction, 2), "0");
    }

    #[test]
    fn test_recompute_after_selection_change() {
        let mut session = QcSession::default();
        session.set_positions(uniform_positions(100));
        assert_eq!(session.report().table.selected_count(), 100);

        let report = session.set_selection(SelectionCriteria::from_range(10, 20));
        assert_eq!(report.table.selected_count(), 10);
        assert!((report.table.subpool_codon_fraction() - 3.0 / 11.0).abs() < 1e-12);
        assert_eq!(
            report.split_summary.partitions(),
            vec![Partition::Selected, Partition::Unselected]
        );
        assert_eq!(report.tests.len(), crate::metric::TESTED_METRICS.len());

        let report = session.set_selection(SelectionCriteria::default());
        assert_eq!(report.table.selected_count(), 100);
    }

    #[test]
    fn test_selection_range_is_clamped() {
        let mut session = QcSession::default();
        session.set_positions(uniform_positions(30));
        let report = session.set_selection(SelectionCriteria::from_range(25, 500));
        // [25, 30) once clamped to the sequence length
        assert_eq!(report.table.selected_count(), 5);
        assert_eq!(session.selection().range.map(|r| r.high), Some(500));
    }

    #[test]
    fn test_missing_columns_clear_the_session() {
        let mut session = QcSession::default();
        session.set_positions(uniform_positions(10));
        let err = session
            .load_per_base("test_files/missing_columns_per_base.tsv")
            .unwrap_err();
        assert!(matches!(err, QcError::MissingColumns(_)));
        assert!(session.report().table.is_empty());
        assert!(session.report().tests.is_empty());
    }

    #[test]
    fn test_feature_selection_from_genbank() {
        let mut session = QcSession::default();
        session.load_per_base("test_files/amplicon_per_base.tsv").unwrap();
        session.load_reference("test_files/amplicon.gb");
        assert!(session.reference().is_some());

        let report = session.set_selection(SelectionCriteria::default().with_features(["tile1"]));
        let selected: Vec<u64> = report
            .table
            .rows()
            .iter()
            .filter(|row| row.is_selected)
            .map(|row| row.pos())
            .collect();
        assert_eq!(selected, (10..20).collect::<Vec<u64>>());
        assert!(report.table.rows().iter().all(|row| row.alignment_mismatch == 0));

        let entropy = report
            .tests
            .iter()
            .find(|row| row.metric == Metric::EffectiveEntropy)
            .unwrap();
        assert_eq!(entropy.result, Some(Verdict::Pass));
    }
}
