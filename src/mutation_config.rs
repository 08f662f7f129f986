use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// search hyperparameters. immutable once handed to the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub population_size: usize,
    pub generations: usize,
    pub tournament_size: usize,

    // mutation
    pub mutation_rate: f64,   // per-component probability of a gaussian nudge
    pub mutation_sigma: f64,  // std dev of the nudge

    // search bounds for every threshold component
    pub low: f64,
    pub high: f64,

    /// fixed seed for reproducible runs; None draws from OS entropy
    pub seed: Option<u64>,

    /// score the population on the rayon pool (results are identical to sequential)
    pub parallel_evaluation: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            population_size: 30,
            generations: 50,
            tournament_size: 3,
            mutation_rate: 0.1,
            mutation_sigma: 0.1,
            low: 0.0,
            high: 1.0,
            seed: None,
            parallel_evaluation: true,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::PopulationSize);
        }
        if self.generations == 0 {
            return Err(ConfigError::Generations);
        }
        if self.tournament_size == 0 || self.tournament_size > self.population_size {
            return Err(ConfigError::TournamentSize {
                tournament: self.tournament_size,
                population: self.population_size,
            });
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(ConfigError::MutationRate(self.mutation_rate));
        }
        if !self.mutation_sigma.is_finite() || self.mutation_sigma < 0.0 {
            return Err(ConfigError::MutationSigma(self.mutation_sigma));
        }
        if !(0.0 <= self.low && self.low <= self.high && self.high <= 1.0) {
            return Err(ConfigError::Bounds {
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = SearchConfig::default();
        assert_eq!(cfg.population_size, 30);
        assert_eq!(cfg.generations, 50);
        assert_eq!(cfg.tournament_size, 3);
        assert_eq!(cfg.mutation_rate, 0.1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_sizes() {
        let cfg = SearchConfig {
            population_size: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::PopulationSize));

        let cfg = SearchConfig {
            generations: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::Generations));

        let cfg = SearchConfig {
            population_size: 2,
            tournament_size: 3,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::TournamentSize {
                tournament: 3,
                population: 2
            })
        );

        let cfg = SearchConfig {
            tournament_size: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::TournamentSize { .. })));
    }

    #[test]
    fn test_rejects_bad_rates_and_bounds() {
        for rate in [-0.1, 1.01, f64::NAN] {
            let cfg = SearchConfig {
                mutation_rate: rate,
                ..Default::default()
            };
            assert!(matches!(cfg.validate(), Err(ConfigError::MutationRate(_))));
        }

        let cfg = SearchConfig {
            mutation_sigma: -1.0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::MutationSigma(_))));

        let cfg = SearchConfig {
            low: 0.8,
            high: 0.2,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Bounds { .. })));

        let cfg = SearchConfig {
            high: 1.5,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Bounds { .. })));
    }

    #[test]
    fn test_edge_values_accepted() {
        let cfg = SearchConfig {
            population_size: 1,
            generations: 1,
            tournament_size: 1,
            mutation_rate: 1.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
