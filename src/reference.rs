//! Loading the reference sequence an amplicon was designed against.
//!
//! A reference is either a single-sequence FASTA file or a single-record
//! GenBank file. GenBank features become [`ReferenceFeature`]s that can be
//! used to select positions. Files with zero or several records are rejected
//! as a whole.

use crate::{feature_location::feature_bounds, nucleotide::normalize_sequence};
use bio::io::fasta;
use gb_io::seq::{Feature, Seq};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    error::Error,
    fmt,
    fs::File,
    io::Read,
    path::Path,
};

pub const SOURCE_FEATURE: &str = "source";
pub const LABEL_QUALIFIER: &str = "label";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceFormat {
    Fasta,
    GenBank,
}

impl ReferenceFormat {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "fa" | "fasta" | "fna" => Some(Self::Fasta),
            "gb" | "gbk" | "genbank" => Some(Self::GenBank),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ReferenceError {
    UnknownFormat(String),
    NoRecords,
    MultipleRecords(usize),
    Unparsable(String),
}

impl Error for ReferenceError {}

impl fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReferenceError::UnknownFormat(name) => {
                write!(f, "Unknown reference file type '{name}'")
            }
            ReferenceError::NoRecords => write!(f, "Reference file contains no sequence"),
            ReferenceError::MultipleRecords(n) => write!(
                f,
                "Reference file contains {n} records, only single-record files are supported"
            ),
            ReferenceError::Unparsable(e) => write!(f, "Could not parse reference file: {e}"),
        }
    }
}

/// An annotated interval of the reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceFeature {
    pub kind: String,
    pub qualifiers: HashMap<String, Vec<String>>,
    pub start: u64,
    pub end: u64,
}

impl ReferenceFeature {
    pub fn from_genbank_feature(feature: &Feature) -> Option<Self> {
        let (start, end) = feature_bounds(feature)?;
        let mut qualifiers: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in &feature.qualifiers {
            qualifiers
                .entry(key.to_string())
                .or_default()
                .extend(value.clone());
        }
        Some(Self {
            kind: feature.kind.to_string(),
            qualifiers,
            start,
            end,
        })
    }

    /// First `label` qualifier, the name shown for selection.
    pub fn name(&self) -> Option<&str> {
        self.qualifiers
            .get(LABEL_QUALIFIER)
            .and_then(|values| values.first())
            .map(|s| s.as_str())
    }

    /// Whole-sequence `source` annotations cannot be selected.
    #[inline(always)]
    pub fn is_selectable(&self) -> bool {
        !self.kind.eq_ignore_ascii_case(SOURCE_FEATURE)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    name: Option<String>,
    sequence: String,
    features: Vec<ReferenceFeature>,
}

impl Reference {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        let format = ReferenceFormat::from_path(path)
            .ok_or_else(|| ReferenceError::UnknownFormat(path.display().to_string()))?;
        let file = File::open(path).map_err(|e| ReferenceError::Unparsable(e.to_string()))?;
        Self::from_reader(file, format)
    }

    pub fn from_reader<R: Read>(reader: R, format: ReferenceFormat) -> Result<Self, ReferenceError> {
        match format {
            ReferenceFormat::Fasta => Self::from_fasta(reader),
            ReferenceFormat::GenBank => Self::from_genbank(reader),
        }
    }

    /// Like [`Reference::from_path`], but a rejected file is logged and
    /// treated as no reference at all.
    pub fn load_optional<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        match Self::from_path(path) {
            Ok(reference) => {
                log::info!(
                    "loaded reference '{}' ({} bases, {} features)",
                    path.display(),
                    reference.len(),
                    reference.features.len()
                );
                Some(reference)
            }
            Err(e) => {
                log::warn!("ignoring reference '{}': {e}", path.display());
                None
            }
        }
    }

    fn from_fasta<R: Read>(reader: R) -> Result<Self, ReferenceError> {
        let records = fasta::Reader::new(reader)
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ReferenceError::Unparsable(e.to_string()))?;
        let record = Self::single(records)?;
        Ok(Self {
            name: Some(record.id().to_string()),
            sequence: normalize_sequence(record.seq()),
            features: vec![],
        })
    }

    fn from_genbank<R: Read>(mut reader: R) -> Result<Self, ReferenceError> {
        let mut data = vec![];
        reader
            .read_to_end(&mut data)
            .map_err(|e| ReferenceError::Unparsable(e.to_string()))?;
        let seqs = gb_io::reader::parse_slice(&data)
            .map_err(|e| ReferenceError::Unparsable(e.to_string()))?;
        Ok(Self::from_genbank_seq(Self::single(seqs)?))
    }

    pub fn from_genbank_seq(seq: Seq) -> Self {
        let features = seq
            .features
            .iter()
            .filter_map(ReferenceFeature::from_genbank_feature)
            .collect();
        Self {
            name: seq.name.clone(),
            sequence: normalize_sequence(&seq.seq),
            features,
        }
    }

    fn single<T>(mut records: Vec<T>) -> Result<T, ReferenceError> {
        match records.len() {
            0 => Err(ReferenceError::NoRecords),
            1 => records.pop().ok_or(ReferenceError::NoRecords),
            n => Err(ReferenceError::MultipleRecords(n)),
        }
    }

    #[inline(always)]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline(always)]
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    #[inline(always)]
    pub fn features(&self) -> &[ReferenceFeature] {
        &self.features
    }

    /// Labels of the features that can be selected, in annotation order.
    pub fn selectable_feature_names(&self) -> Vec<String> {
        self.features
            .iter()
            .filter(|feature| feature.is_selectable())
            .filter_map(ReferenceFeature::name)
            .unique()
            .map(str::to_string)
            .collect()
    }
}
