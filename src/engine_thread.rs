use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::app_types::{EngineCommand, EngineUpdate};
use crate::engine::{Engine, RunOutcome};
use crate::error::{Error, Result};
use crate::fitness::{CostTable, EvaluationTable};
use crate::mutation_config::SearchConfig;

/// background search owned by a named "engine" thread.
///
/// One [`EngineUpdate`] is sent per completed generation. The thread exits after
/// the last generation, on [`EngineCommand::Stop`], or when the handle's command
/// side is dropped while paused.
pub struct EngineHandle {
    command_tx: Sender<EngineCommand>,
    update_rx: Receiver<EngineUpdate>,
    thread: JoinHandle<Option<RunOutcome>>,
}

/// validate and build the engine on the caller's thread, then move it into a
/// background thread. `start_running = false` waits for [`EngineCommand::Start`].
pub fn spawn(
    cfg: SearchConfig,
    costs: CostTable,
    table: Arc<EvaluationTable>,
    start_running: bool,
) -> Result<EngineHandle> {
    profiling::scope!("engine_thread::spawn");
    let engine = Engine::new(cfg, costs, table)?;

    let (command_tx, command_rx) = mpsc::channel();
    let (update_tx, update_rx) = mpsc::channel();

    let thread = thread::Builder::new()
        .name("engine".to_owned())
        .spawn(move || engine_loop(engine, command_rx, update_tx, start_running))
        .map_err(|e| Error::EngineThread(e.to_string()))?;

    Ok(EngineHandle {
        command_tx,
        update_rx,
        thread,
    })
}

fn engine_loop(
    mut engine: Engine,
    command_rx: Receiver<EngineCommand>,
    update_tx: Sender<EngineUpdate>,
    mut running: bool,
) -> Option<RunOutcome> {
    loop {
        profiling::scope!("engine_thread_loop");

        // non-blocking while running, blocking while paused
        let command = if running {
            match command_rx.try_recv() {
                Ok(cmd) => Some(cmd),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
            }
        } else {
            match command_rx.recv() {
                Ok(cmd) => Some(cmd),
                Err(_) => break, // nobody left to resume us
            }
        };

        match command {
            Some(EngineCommand::Start) => running = true,
            Some(EngineCommand::Pause) => running = false,
            Some(EngineCommand::Stop) => break,
            None => {}
        }

        if running {
            let report = engine.step();
            let finished = engine.is_finished();
            // receiver may already be gone; the outcome is still returned from join
            let _ = update_tx.send(EngineUpdate {
                report,
                evaluations: engine.evaluations,
                finished,
            });
            if finished {
                break;
            }
        }
    }

    let cancelled = !engine.is_finished();
    if cancelled {
        debug!(generation = engine.generation, "engine thread stopped early");
    }
    engine.outcome(cancelled)
}

impl EngineHandle {
    /// false once the engine thread has exited
    pub fn send(&self, command: EngineCommand) -> bool {
        self.command_tx.send(command).is_ok()
    }

    pub fn start(&self) -> bool {
        self.send(EngineCommand::Start)
    }

    pub fn pause(&self) -> bool {
        self.send(EngineCommand::Pause)
    }

    pub fn stop(&self) -> bool {
        self.send(EngineCommand::Stop)
    }

    /// blocking access to the per-generation stream
    pub fn updates(&self) -> &Receiver<EngineUpdate> {
        &self.update_rx
    }

    /// drain pending updates and keep only the latest
    pub fn poll_latest(&self) -> Option<EngineUpdate> {
        let mut latest = None;
        while let Ok(update) = self.update_rx.try_recv() {
            latest = Some(update);
        }
        latest
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// wait for the thread and return its outcome.
    /// None if it was stopped before completing a generation.
    pub fn join(self) -> Result<Option<RunOutcome>> {
        let Self {
            command_tx,
            update_rx,
            thread,
        } = self;
        // a paused engine sees the disconnect and exits
        drop(command_tx);
        drop(update_rx);
        thread
            .join()
            .map_err(|_| Error::EngineThread("engine thread panicked".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::fitness::EvaluationRow;

    fn table() -> Arc<EvaluationTable> {
        let rows = vec![
            EvaluationRow {
                image: "a.jpg".to_owned(),
                probabilities: [0.9, 0.1, 0.0, 0.3],
                flags: [true, false, false, false],
            },
            EvaluationRow {
                image: "b.jpg".to_owned(),
                probabilities: [0.2, 0.7, 0.6, 0.0],
                flags: [false, true, false, false],
            },
            EvaluationRow {
                image: "c.jpg".to_owned(),
                probabilities: [0.4, 0.0, 0.8, 0.9],
                flags: [false, false, true, true],
            },
        ];
        Arc::new(EvaluationTable::from_rows(rows).unwrap())
    }

    fn cfg(generations: usize) -> SearchConfig {
        SearchConfig {
            population_size: 6,
            generations,
            parallel_evaluation: false,
            ..SearchConfig::default().with_seed(11)
        }
    }

    #[test]
    fn test_runs_to_completion_and_streams_every_generation() {
        let handle = spawn(cfg(8), CostTable::default(), table(), true).unwrap();
        let updates: Vec<EngineUpdate> = handle.updates().iter().collect();
        let outcome = handle.join().unwrap().unwrap();

        assert_eq!(updates.len(), 8);
        assert!(updates.last().unwrap().finished);
        assert!(updates[..7].iter().all(|u| !u.finished));
        assert!(!outcome.cancelled);
        assert_eq!(outcome.best_cost, updates.last().unwrap().report.best_cost);
    }

    #[test]
    fn test_matches_foreground_run() {
        let handle = spawn(cfg(10), CostTable::default(), table(), true).unwrap();
        let background = handle.join().unwrap().unwrap();
        let foreground = Engine::new(cfg(10), CostTable::default(), table()).unwrap().run(|_| {});
        assert_eq!(background, foreground);
    }

    #[test]
    fn test_stop_while_paused_yields_nothing() {
        let handle = spawn(cfg(5), CostTable::default(), table(), false).unwrap();
        assert!(handle.stop());
        assert_eq!(handle.join().unwrap(), None);
    }

    #[test]
    fn test_dropping_paused_handle_exits() {
        let handle = spawn(cfg(5), CostTable::default(), table(), false).unwrap();
        assert_eq!(handle.join().unwrap(), None);
    }

    #[test]
    fn test_poll_latest_keeps_only_newest_update() {
        let handle = spawn(cfg(6), CostTable::default(), table(), true).unwrap();
        while !handle.is_finished() {
            thread::yield_now();
        }
        let latest = handle.poll_latest().unwrap();
        assert_eq!(latest.report.generation, 6);
        assert!(latest.finished);
        // drained
        assert_eq!(handle.poll_latest(), None);

        let outcome = handle.join().unwrap().unwrap();
        assert_eq!(outcome.best_cost, latest.report.best_cost);
    }

    #[test]
    fn test_stop_mid_run_is_cancelled() {
        let handle = spawn(cfg(1_000_000), CostTable::default(), table(), false).unwrap();
        assert!(handle.start());
        let first = handle.updates().recv().unwrap();
        assert_eq!(first.report.generation, 1);
        handle.stop();

        let outcome = handle.join().unwrap().unwrap();
        assert!(outcome.cancelled);
        assert!(outcome.generations_completed() >= 1);
        assert!(outcome.generations_completed() < 1_000_000);
    }

    #[test]
    fn test_invalid_config_fails_before_spawning() {
        let bad = SearchConfig {
            population_size: 0,
            ..cfg(5)
        };
        let err = spawn(bad, CostTable::default(), table(), true).err();
        assert!(matches!(err, Some(Error::Config(ConfigError::PopulationSize))));
    }
}
