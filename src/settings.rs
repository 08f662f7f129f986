//! run settings for the threshold tuner
//! persisted as JSON so a tuned setup can be replayed; every field has a default
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::fitness::CostTable;
use crate::mutation_config::SearchConfig;

pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    // genetic algorithm
    pub population_size: usize,
    pub generations: usize,
    pub mutation_rate: f64,
    pub mutation_sigma: f64,
    pub tournament_size: usize,
    pub seed: Option<u64>,
    pub parallel_evaluation: bool,

    // threshold search bounds
    pub threshold_low: f64,
    pub threshold_high: f64,

    // business costs per class and outcome
    pub costs: CostTable,
}

impl Default for AppSettings {
    fn default() -> Self {
        let search = SearchConfig::default();
        Self {
            population_size: search.population_size,
            generations: search.generations,
            mutation_rate: search.mutation_rate,
            mutation_sigma: search.mutation_sigma,
            tournament_size: search.tournament_size,
            seed: search.seed,
            parallel_evaluation: search.parallel_evaluation,
            threshold_low: search.low,
            threshold_high: search.high,
            costs: CostTable::default(),
        }
    }
}

impl AppSettings {
    /// save settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| Error::io(path, e))
    }

    /// load settings from JSON, or return defaults if the file is missing or unparsable
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to parse settings, using defaults");
                    Self::default()
                }
            },
            // file doesn't exist or can't be read - use defaults
            Err(_) => Self::default(),
        }
    }

    /// load settings, failing on a missing or malformed file (for explicitly named files)
    pub fn load_strict(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// convert to SearchConfig for the engine (validated by Engine::new)
    pub fn to_search_config(&self) -> SearchConfig {
        SearchConfig {
            population_size: self.population_size,
            generations: self.generations,
            tournament_size: self.tournament_size,
            mutation_rate: self.mutation_rate,
            mutation_sigma: self.mutation_sigma,
            low: self.threshold_low,
            high: self.threshold_high,
            seed: self.seed,
            parallel_evaluation: self.parallel_evaluation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::DamageClass;
    use crate::fitness::Quadrant;

    #[test]
    fn test_defaults_match_search_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.to_search_config(), SearchConfig::default());
        assert_eq!(settings.costs, CostTable::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SETTINGS_FILE);
        let mut settings = AppSettings {
            population_size: 12,
            seed: Some(99),
            ..Default::default()
        };
        settings.costs.d20.fn_ = 5000;
        settings.save(&path).unwrap();

        let loaded = AppSettings::load(&path);
        assert_eq!(loaded, settings);
        assert_eq!(loaded.costs.cost(DamageClass::D20, Quadrant::FN), 5000);
        assert_eq!(AppSettings::load_strict(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "generations": 5, "mutation_rate": 0.25 }"#).unwrap();
        let loaded = AppSettings::load(&path);
        assert_eq!(loaded.generations, 5);
        assert_eq!(loaded.mutation_rate, 0.25);
        assert_eq!(loaded.population_size, 30);
    }

    #[test]
    fn test_missing_or_broken_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(AppSettings::load(dir.path().join("absent.json")), AppSettings::default());

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert_eq!(AppSettings::load(&broken), AppSettings::default());
        assert!(matches!(AppSettings::load_strict(&broken), Err(Error::Json(_))));
        assert!(matches!(
            AppSettings::load_strict(dir.path().join("absent.json")),
            Err(Error::Io { .. })
        ));
    }
}
