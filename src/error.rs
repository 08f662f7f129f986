//! Error types for threshold search.
//!
//! Every failure here is fatal: a malformed table or an invalid configuration
//! aborts the run before (or instead of) producing any artifacts.

use std::path::PathBuf;

use thiserror::Error;

use crate::classes::DamageClass;

/// Malformed or missing data reaching the cost model.
#[derive(Debug, Error)]
pub enum InputError {
    /// A row has no probability or flag for one of the classes.
    #[error("image {image}: missing value for class {class}")]
    MissingValue { image: String, class: DamageClass },

    /// Probability is not a finite, non-negative number.
    #[error("image {image}: invalid probability {value} for class {class}")]
    InvalidProbability {
        image: String,
        class: DamageClass,
        value: String,
    },

    /// Ground-truth flag is something other than 0 or 1.
    #[error("image {image}: invalid ground-truth flag {value:?} for class {class}")]
    InvalidFlag {
        image: String,
        class: DamageClass,
        value: String,
    },

    /// Threshold vector does not carry one component per class.
    #[error("threshold vector has {actual} components, expected {expected}")]
    ThresholdArity { expected: usize, actual: usize },

    /// CSV header lacks a required column.
    #[error("missing column {column:?}")]
    MissingColumn { column: String },

    /// CSV record could not be split into the header's columns.
    #[error("line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    /// Label record whose first token is not a class index.
    #[error("{file}: line {line} does not start with a class index")]
    MalformedLabel { file: String, line: usize },

    /// Join produced no rows to evaluate.
    #[error("evaluation table is empty")]
    EmptyTable,
}

impl InputError {
    pub fn missing_value(image: impl Into<String>, class: DamageClass) -> Self {
        Self::MissingValue {
            image: image.into(),
            class,
        }
    }

    pub fn invalid_probability(image: impl Into<String>, class: DamageClass, value: impl ToString) -> Self {
        Self::InvalidProbability {
            image: image.into(),
            class,
            value: value.to_string(),
        }
    }

    pub fn invalid_flag(image: impl Into<String>, class: DamageClass, value: impl Into<String>) -> Self {
        Self::InvalidFlag {
            image: image.into(),
            class,
            value: value.into(),
        }
    }

    pub fn malformed_row(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            line,
            reason: reason.into(),
        }
    }
}

/// Invalid search hyperparameters, detected before any generation runs.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("population size must be positive")]
    PopulationSize,

    #[error("generation count must be positive")]
    Generations,

    #[error("tournament size {tournament} must be in 1..={population}")]
    TournamentSize { tournament: usize, population: usize },

    #[error("mutation rate {0} outside [0, 1]")]
    MutationRate(f64),

    #[error("mutation sigma {0} must be finite and non-negative")]
    MutationSigma(f64),

    #[error("threshold bounds [{low}, {high}] must satisfy 0 <= low <= high <= 1")]
    Bounds { low: f64, high: f64 },
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("engine thread: {0}")]
    EngineThread(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = InputError::missing_value("a.jpg", DamageClass::D20);
        assert_eq!(err.to_string(), "image a.jpg: missing value for class D20");

        let err = ConfigError::TournamentSize {
            tournament: 5,
            population: 3,
        };
        assert_eq!(err.to_string(), "tournament size 5 must be in 1..=3");
    }

    #[test]
    fn test_wraps_into_crate_error() {
        let err: Error = ConfigError::PopulationSize.into();
        assert!(matches!(err, Error::Config(ConfigError::PopulationSize)));

        let err: Error = InputError::EmptyTable.into();
        assert_eq!(err.to_string(), "evaluation table is empty");
    }
}
