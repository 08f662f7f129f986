use crate::engine::GenerationReport;

// messages from the caller to the engine thread
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineCommand {
    Start,
    Pause,
    Stop,
}

// messages from the engine thread to the caller
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineUpdate {
    pub report: GenerationReport,
    pub evaluations: u64,  // cost model calls so far
    pub finished: bool,    // last configured generation done
}
