//! ParDist - two-node parallel/distributed speedup benchmark
//!
//! ParDist measures how much faster a numeric workload runs when it is spread
//! over the cores of one machine and then split between two machines.
//!
//! # Architecture
//!
//! - **Kernels**: `ln(sqrt(x))` transform, lane-grouped sum and max reductions,
//!   adaptive parallel merge sort on a dedicated worker pool
//! - **Partitioning**: server/client split of a fixed-size dataset by ratio
//! - **Distributed mode**: text datagrams over UDP between a server and a client
//! - **Reporting**: per-round results, timing totals, speedup, JSON summary

pub mod config;
pub mod dataset;
pub mod distributed;
pub mod kernel;
pub mod output;
pub mod partition;
pub mod stats;
pub mod util;

// Re-export commonly used types
pub use config::Config;
pub use distributed::{Coordinator, Role};

/// Result type used throughout ParDist
pub type Result<T> = anyhow::Result<T>;
