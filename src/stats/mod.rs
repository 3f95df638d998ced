//! Benchmark statistics
//!
//! Per-phase kernel results and timings, per-round reports, and the
//! cumulative timing totals a coordinator keeps across rounds.

use crate::distributed::coordinator::Role;
use serde::Serialize;
use std::time::Duration;

/// Scalar results of the sum and max kernels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScalarResults {
    pub sum: f32,
    pub max: f32,
}

impl ScalarResults {
    /// Results over an empty partition
    pub const EMPTY: ScalarResults = ScalarResults {
        sum: 0.0,
        max: f32::NEG_INFINITY,
    };

    /// Combine results from two disjoint partitions
    ///
    /// Sums add and maxima take the larger value.
    pub fn merge(self, other: ScalarResults) -> ScalarResults {
        ScalarResults {
            sum: self.sum + other.sum,
            max: if self.max > other.max { self.max } else { other.max },
        }
    }
}

/// Wall-clock time of each kernel in a phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KernelTimings {
    pub sum: Duration,
    pub max: Duration,
    pub sort: Duration,
}

impl KernelTimings {
    pub fn total(&self) -> Duration {
        self.sum + self.max + self.sort
    }
}

/// What one node computed over its partition in one phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseOutcome {
    pub results: ScalarResults,
    /// Number of elements sorted (sorted output stays local to the node)
    pub sorted_len: usize,
    pub timings: KernelTimings,
}

/// Report for one round
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub round: u32,
    /// Basic phase (server only)
    pub basic: Option<PhaseOutcome>,
    /// Local accelerated-phase computation
    pub accelerated: PhaseOutcome,
    /// Results received from the peer (server only)
    pub peer: Option<ScalarResults>,
    /// Local results merged with the peer's
    pub merged: ScalarResults,
    /// Accelerated phase time, from kernel start to merge
    pub accelerated_elapsed: Duration,
}

/// Cumulative timing across rounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimingTotals {
    pub rounds: u32,
    pub basic: Duration,
    pub accelerated: Duration,
}

impl TimingTotals {
    pub fn record(&mut self, basic: Duration, accelerated: Duration) {
        self.rounds += 1;
        self.basic += basic;
        self.accelerated += accelerated;
    }

    pub fn average_basic(&self) -> Option<Duration> {
        (self.rounds > 0).then(|| self.basic / self.rounds)
    }

    pub fn average_accelerated(&self) -> Option<Duration> {
        (self.rounds > 0).then(|| self.accelerated / self.rounds)
    }

    /// Total basic time over total accelerated time
    pub fn speedup(&self) -> Option<f64> {
        if self.rounds == 0 || self.basic.is_zero() || self.accelerated.is_zero() {
            return None;
        }
        Some(self.basic.as_secs_f64() / self.accelerated.as_secs_f64())
    }
}

/// Everything one node produced over a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub role: Role,
    pub rounds: Vec<RoundReport>,
    pub totals: TimingTotals,
}
