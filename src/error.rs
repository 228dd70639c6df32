use itertools::Itertools;
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum QcError {
    String(String),
    MissingColumns(Vec<String>),
    EmptyInput,
    Io(std::io::Error),
    Csv(csv::Error),
    Serde(serde_json::Error),
}

impl Error for QcError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            QcError::Io(e) => Some(e),
            QcError::Csv(e) => Some(e),
            QcError::Serde(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for QcError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QcError::String(s) => write!(f, "{s}"),
            QcError::MissingColumns(columns) => write!(
                f,
                "Input per-base file is missing required data. Check format. Missing columns: {}",
                columns.iter().join(", ")
            ),
            QcError::EmptyInput => write!(f, "Input per-base file is empty"),
            QcError::Io(e) => write!(f, "I/O error: {e}"),
            QcError::Csv(e) => write!(f, "Could not parse per-base table: {e}"),
            QcError::Serde(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl From<String> for QcError {
    fn from(err: String) -> Self {
        QcError::String(err)
    }
}

impl From<std::io::Error> for QcError {
    fn from(err: std::io::Error) -> Self {
        QcError::Io(err)
    }
}

impl From<csv::Error> for QcError {
    fn from(err: csv::Error) -> Self {
        QcError::Csv(err)
    }
}

impl From<serde_json::Error> for QcError {
    fn from(err: serde_json::Error) -> Self {
        QcError::Serde(err)
    }
}
