//! Cost-driven per-class confidence thresholds for road damage detection.
//!
//! A detector scores every image for four damage classes. This crate searches
//! for the threshold vector that minimizes the total business cost of the
//! resulting TP/TN/FP/FN outcomes, using a seeded genetic algorithm.

pub mod app_types;
pub mod classes;
pub mod dataset;
pub mod dna;
pub mod driver;
pub mod engine;
pub mod engine_thread;
pub mod error;
pub mod fitness;
pub mod mutation_config;
pub mod report;
pub mod settings;

pub use classes::{DamageClass, CLASS_COUNT};
pub use dna::{Individual, ThresholdVector};
pub use driver::{run_search, run_search_with};
pub use engine::{Engine, GenerationReport, RunHistory, RunOutcome};
pub use error::{ConfigError, Error, InputError, Result};
pub use fitness::{CostModel, CostTable, EvaluationRow, EvaluationTable};
pub use mutation_config::SearchConfig;
pub use report::{BestThresholds, RunArtifacts};
pub use settings::AppSettings;
