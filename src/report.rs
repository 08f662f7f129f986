use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classes::DamageClass;
use crate::engine::{RunHistory, RunOutcome};
use crate::error::{Error, Result};

pub const BEST_THRESHOLDS_FILE: &str = "best_thresholds.json";
pub const COST_HISTORY_FILE: &str = "cost_history.csv";

/// decimals kept for thresholds in the JSON artifact
const THRESHOLD_DECIMALS: i32 = 4;

/// best thresholds keyed by class name, plus their total cost
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BestThresholds {
    pub thresholds: BTreeMap<DamageClass, f64>,
    pub cost: u64,
}

impl BestThresholds {
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        let rounded = outcome.best_thresholds.rounded(THRESHOLD_DECIMALS);
        Self {
            thresholds: DamageClass::ALL.iter().map(|&c| (c, rounded[c.index()])).collect(),
            cost: outcome.best_cost,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// `Generation,Best_Cost` rows, generation counted from 1
pub fn cost_history_csv(history: &RunHistory) -> String {
    let mut out = String::from("Generation,Best_Cost\n");
    for entry in history.entries() {
        // writing into a String cannot fail
        let _ = writeln!(out, "{},{}", entry.generation, entry.best_cost);
    }
    out
}

/// everything a finished run hands to persistence and plotting
#[derive(Clone, Debug, PartialEq)]
pub struct RunArtifacts {
    pub best: BestThresholds,
    pub history: RunHistory,
    pub progress: Vec<String>,
    pub evaluations: u64,
}

impl RunArtifacts {
    pub fn new(outcome: &RunOutcome, progress: Vec<String>) -> Self {
        Self {
            best: BestThresholds::from_outcome(outcome),
            history: outcome.history.clone(),
            progress,
            evaluations: outcome.evaluations,
        }
    }

    /// write `best_thresholds.json` and `cost_history.csv` into `dir` (created if needed)
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let best_path = dir.join(BEST_THRESHOLDS_FILE);
        fs::write(&best_path, self.best.to_json()?).map_err(|e| Error::io(&best_path, e))?;

        let history_path = dir.join(COST_HISTORY_FILE);
        fs::write(&history_path, cost_history_csv(&self.history)).map_err(|e| Error::io(&history_path, e))?;

        info!(dir = %dir.display(), "saved {BEST_THRESHOLDS_FILE} and {COST_HISTORY_FILE}");
        Ok(vec![best_path, history_path])
    }
}
