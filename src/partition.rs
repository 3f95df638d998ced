//! Partition planner
//!
//! Decides which slice of the dataset each node processes in a phase.
//!
//! - Basic phase: the server owns `[0, total)`, the client owns nothing
//! - Accelerated phase: the server owns `[0, server_len)` and the client owns
//!   `[server_len, total)`, where `server_len = floor(total × ratio)`
//!
//! The planner is a pure function. The ratio is validated once at startup
//! (see `config::validator::validate_ratio`), not on every call.

use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// Benchmark phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Single node, whole dataset
    Basic,
    /// Dataset split across both nodes
    Accelerated,
}

/// `(start, len)` view into the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Partition {
    pub start: usize,
    pub len: usize,
}

impl Partition {
    pub const EMPTY: Partition = Partition { start: 0, len: 0 };

    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// One past the last element
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

/// Partitions for both nodes in one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartitionPlan {
    pub phase: Phase,
    pub server: Partition,
    pub client: Partition,
}

/// Compute the partitions for `phase`
pub fn plan(total: usize, ratio: f64, phase: Phase) -> PartitionPlan {
    match phase {
        Phase::Basic => PartitionPlan {
            phase,
            server: Partition::new(0, total),
            client: Partition::EMPTY,
        },
        Phase::Accelerated => {
            let server_len = server_share(total, ratio);
            PartitionPlan {
                phase,
                server: Partition::new(0, server_len),
                client: Partition::new(server_len, total - server_len),
            }
        }
    }
}

/// `floor(total × ratio)`, never more than `total`
fn server_share(total: usize, ratio: f64) -> usize {
    let share = (total as f64 * ratio).floor();
    if share <= 0.0 {
        0
    } else {
        (share as usize).min(total)
    }
}
