//! One-shot run: build the engine, run it to completion, collect the artifacts.
//!
//! Any failure is returned before a single artifact exists; nothing is retried.

use std::sync::Arc;

use tracing::info;

use crate::engine::{Engine, GenerationReport};
use crate::error::Result;
use crate::fitness::{CostTable, EvaluationTable};
use crate::mutation_config::SearchConfig;
use crate::report::RunArtifacts;

/// run the search once, logging one progress line per generation
pub fn run_search(cfg: SearchConfig, costs: CostTable, table: Arc<EvaluationTable>) -> Result<RunArtifacts> {
    run_search_with(cfg, costs, table, |_| {})
}

/// like [`run_search`], also handing every generation report to `on_generation`
pub fn run_search_with<F>(
    cfg: SearchConfig,
    costs: CostTable,
    table: Arc<EvaluationTable>,
    mut on_generation: F,
) -> Result<RunArtifacts>
where
    F: FnMut(&GenerationReport),
{
    profiling::scope!("run_search");
    let mut engine = Engine::new(cfg, costs, table)?;

    let mut progress = Vec::with_capacity(engine.config().generations);
    let outcome = engine.run(|report| {
        let line = report.to_string();
        info!("{line}");
        progress.push(line);
        on_generation(report);
    });

    info!(
        cost = outcome.best_cost,
        thresholds = ?outcome.best_thresholds.rounded(4),
        evaluations = outcome.evaluations,
        "search finished"
    );
    Ok(RunArtifacts::new(&outcome, progress))
}
