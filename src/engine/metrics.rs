use std::fmt;

use serde::Serialize;

use crate::dna::ThresholdVector;

/// best-ever cost after one generation (generation counted from 1)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    #[serde(rename = "Generation")]
    pub generation: usize,
    #[serde(rename = "Best_Cost")]
    pub best_cost: u64,
}

/// running minimum of the best cost, one entry per completed generation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunHistory {
    entries: Vec<HistoryEntry>,
}

impl RunHistory {
    pub fn with_capacity(generations: usize) -> Self {
        Self {
            entries: Vec::with_capacity(generations),
        }
    }

    /// append the next generation's best-so-far cost.
    /// the engine only ever feeds a running minimum, so entries never increase.
    pub(crate) fn record(&mut self, best_cost: u64) {
        debug_assert!(self.entries.last().map_or(true, |e| best_cost <= e.best_cost));
        self.entries.push(HistoryEntry {
            generation: self.entries.len() + 1,
            best_cost,
        });
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn best_costs(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().map(|e| e.best_cost)
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }
}

/// what happened in one generation; Display renders the progress line
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationReport {
    pub generation: usize,
    pub generation_best_cost: u64,
    pub best_cost: u64,
    pub best_thresholds: ThresholdVector,
    pub improved: bool,
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Gen {:02} | Best Score: ${:.2} | Thresholds: {:?}",
            self.generation,
            self.best_cost as f64,
            self.best_thresholds.rounded(3)
        )
    }
}

/// final result of a run (or of the completed part of a cancelled run)
#[derive(Clone, Debug, PartialEq)]
pub struct RunOutcome {
    pub best_thresholds: ThresholdVector,
    pub best_cost: u64,
    pub history: RunHistory,
    pub evaluations: u64,
    pub cancelled: bool,
}

impl RunOutcome {
    pub fn generations_completed(&self) -> usize {
        self.history.len()
    }
}
