// Engine module organization
// Each submodule handles a specific aspect of the threshold search

pub mod metrics;
pub mod mutations;
pub mod selection;

use std::sync::Arc;

use rand::SeedableRng;
use rand_distr::Normal;
use rand_pcg::Pcg32;
use rayon::prelude::*;
use tracing::debug;

use crate::dna::{Individual, ThresholdVector};
use crate::error::{ConfigError, InputError, Result};
use crate::fitness::{CostModel, CostTable, EvaluationTable};
use crate::mutation_config::SearchConfig;

pub use metrics::{GenerationReport, HistoryEntry, RunHistory, RunOutcome};

/// population search over threshold vectors.
///
/// Each call to [`Engine::step`] evaluates the current population, updates the
/// best-ever solution and history, then (unless it was the last generation)
/// breeds the next population with the best-ever vector in slot 0.
pub struct Engine {
    pub(self) rng: Pcg32,
    pub(self) cfg: SearchConfig,
    pub(self) noise: Normal<f64>,
    costs: CostTable,
    table: Arc<EvaluationTable>,
    pub population: Vec<Individual>,
    best: Option<Individual>,
    last_report: Option<GenerationReport>,
    pub history: RunHistory,
    pub generation: usize,  // completed generations
    pub evaluations: u64,   // cost model calls so far
}

impl Engine {
    /// validate the configuration and draw the initial population
    pub fn new(cfg: SearchConfig, costs: CostTable, table: Arc<EvaluationTable>) -> Result<Self> {
        profiling::scope!("Engine::new");
        cfg.validate()?;
        if table.is_empty() {
            return Err(InputError::EmptyTable.into());
        }
        let noise = Normal::new(0.0, cfg.mutation_sigma).map_err(|_| ConfigError::MutationSigma(cfg.mutation_sigma))?;

        let mut rng = match cfg.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_os_rng(),
        };
        let population = (0..cfg.population_size)
            .map(|_| Individual::new(ThresholdVector::random(&mut rng, cfg.low, cfg.high)))
            .collect();

        debug!(
            population = cfg.population_size,
            generations = cfg.generations,
            rows = table.len(),
            "engine initialized"
        );

        Ok(Self {
            rng,
            history: RunHistory::with_capacity(cfg.generations),
            cfg,
            noise,
            costs,
            table,
            population,
            best: None,
            last_report: None,
            generation: 0,
            evaluations: 0,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.cfg
    }

    pub fn cost_model(&self) -> CostModel<'_> {
        CostModel::new(&self.costs, &self.table)
    }

    /// best individual seen so far (None before the first generation)
    pub fn best(&self) -> Option<&Individual> {
        self.best.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.generation >= self.cfg.generations
    }

    /// score every individual that has no cost yet.
    /// costs are pure, so the parallel path produces the same numbers as the sequential one.
    pub(self) fn evaluate_population(&mut self) {
        profiling::scope!("evaluate_population");
        let model = CostModel::new(&self.costs, &self.table);
        let pending = self.population.iter().filter(|i| i.cost.is_none()).count() as u64;

        if self.cfg.parallel_evaluation {
            self.population
                .par_iter_mut()
                .filter(|ind| ind.cost.is_none())
                .for_each(|ind| ind.cost = Some(model.evaluate(&ind.thresholds)));
        } else {
            for ind in self.population.iter_mut().filter(|ind| ind.cost.is_none()) {
                ind.cost = Some(model.evaluate(&ind.thresholds));
            }
        }
        self.evaluations += pending;
    }

    /// index and cost of this generation's cheapest individual (first one on ties)
    fn generation_elite(&self) -> (usize, u64) {
        let mut elite = (0, u64::MAX);
        for (i, ind) in self.population.iter().enumerate() {
            let cost = ind.cost_or_max();
            if cost < elite.1 {
                elite = (i, cost);
            }
        }
        elite
    }

    /// run one generation: evaluate, track the elite, and breed the next population.
    /// once the configured generations are done this is a no-op returning the last report.
    pub fn step(&mut self) -> GenerationReport {
        profiling::scope!("step");
        if let Some(last) = self.last_report.filter(|_| self.is_finished()) {
            return last;
        }
        self.evaluate_population();

        let (elite_idx, elite_cost) = self.generation_elite();
        // strict improvement only: on ties the earlier best-ever is kept
        let improved = self.best.as_ref().map_or(true, |b| elite_cost < b.cost_or_max());
        if improved {
            self.best = Some(self.population[elite_idx].clone());
        }
        let best = self.best.clone().unwrap_or_else(|| self.population[elite_idx].clone());

        self.generation += 1;
        self.history.record(best.cost_or_max());

        if improved {
            debug!(
                generation = self.generation,
                cost = elite_cost,
                thresholds = ?best.thresholds.rounded(4),
                "new best thresholds"
            );
        }

        let report = GenerationReport {
            generation: self.generation,
            generation_best_cost: elite_cost,
            best_cost: best.cost_or_max(),
            best_thresholds: best.thresholds,
            improved,
        };

        if !self.is_finished() {
            self.reproduce(best);
        }
        self.last_report = Some(report);
        report
    }

    /// slot 0: best-ever (keeps its cost); the rest: bred children
    fn reproduce(&mut self, elite: Individual) {
        profiling::scope!("reproduce");
        let size = self.cfg.population_size;
        let mut next = Vec::with_capacity(size);
        next.push(elite);
        while next.len() < size {
            let child = self.breed_child();
            next.push(child);
        }
        self.population = next;
    }

    /// run the remaining generations, calling `on_generation` after each one
    pub fn run<F>(&mut self, mut on_generation: F) -> RunOutcome
    where
        F: FnMut(&GenerationReport),
    {
        profiling::scope!("Engine::run");
        if let Some(done) = self.outcome(false).filter(|_| self.is_finished()) {
            return done;
        }
        let mut last = self.step();
        on_generation(&last);
        while !self.is_finished() {
            last = self.step();
            on_generation(&last);
        }
        self.outcome_from(&last, false)
    }

    /// snapshot of the result so far; None before the first generation completes
    pub fn outcome(&self, cancelled: bool) -> Option<RunOutcome> {
        let best = self.best.as_ref()?;
        Some(RunOutcome {
            best_thresholds: best.thresholds,
            best_cost: best.cost_or_max(),
            history: self.history.clone(),
            evaluations: self.evaluations,
            cancelled,
        })
    }

    fn outcome_from(&self, last: &GenerationReport, cancelled: bool) -> RunOutcome {
        RunOutcome {
            best_thresholds: last.best_thresholds,
            best_cost: last.best_cost,
            history: self.history.clone(),
            evaluations: self.evaluations,
            cancelled,
        }
    }
}
