use thiserror::Error;

use crate::scenario::Phase;

/// Everything a scenario or the harness around it can fail with.
///
/// Only [`TbError::Timeout`] and [`TbError::InvariantViolation`] describe
/// the device misbehaving. The remaining variants are harness or
/// environment faults and point at a broken testbench, not a broken core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TbError {
    /// An awaited event did not happen within its edge budget.
    #[error("expected {expectation} within {edges} clock edges")]
    Timeout { expectation: String, edges: u32 },
    /// A continuously asserted condition was observed false.
    #[error("expected {expectation} on every edge, violated at edge {edge} of {window}")]
    InvariantViolation {
        expectation: String,
        edge: u32,
        window: u32,
    },
    #[error("no signal named {0}")]
    UnknownSignal(String),
    #[error("simulator: {0}")]
    Sim(String),
    #[error("scenario phase can't move from {from} to {to}")]
    PhaseViolation { from: Phase, to: Phase },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("could not write report: {0}")]
    Report(String),
    #[error("task was cancelled before completion")]
    Cancelled,
    #[error("simulation ran out of events at {time_ns}ns before the test completed")]
    Stalled { time_ns: u64 },
    #[error("simulation time limit of {limit_ns}ns reached before the test completed")]
    SimTimeLimit { limit_ns: u64 },
    #[error("{0}")]
    Failed(String),
}

impl TbError {
    /// True for the two failure kinds caused by the device under test.
    pub fn is_device_failure(&self) -> bool {
        matches!(
            self,
            TbError::Timeout { .. } | TbError::InvariantViolation { .. }
        )
    }
}
