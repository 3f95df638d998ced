//! Numeric kernels
//!
//! This module holds the three aggregate operations the benchmark measures:
//!
//! - `transform`: the shared `ln(sqrt(x))` mapping and its lane form
//! - `reduce`: lane-grouped parallel sum and max
//! - `sort`: adaptive fork-join merge sort producing an index permutation
//! - `serial`: single-thread reference versions of all three
//!
//! [`KernelPool`] owns the fixed-size worker pool the parallel kernels run
//! on, together with the sort tunables.

pub mod reduce;
pub mod serial;
pub mod sort;
pub mod transform;

pub use sort::SortedPartition;
pub use transform::{transform, LANE_WIDTH, TRANSFORM_FLOOR};

use crate::config::SortTuning;
use anyhow::{Context, Result};

/// Fixed-size worker pool for the parallel kernels
///
/// All parallel work issued through this type runs inside its own rayon
/// pool, never the global one, so the worker count is exactly what was
/// configured.
pub struct KernelPool {
    pool: rayon::ThreadPool,
    workers: usize,
    tuning: SortTuning,
}

impl KernelPool {
    /// Build a pool with `workers` threads
    pub fn new(workers: usize, tuning: SortTuning) -> Result<Self> {
        if workers == 0 {
            anyhow::bail!("Kernel pool needs at least one worker");
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pardist-kernel-{}", i))
            .build()
            .context("Failed to build kernel worker pool")?;

        Ok(Self {
            pool,
            workers,
            tuning,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn tuning(&self) -> &SortTuning {
        &self.tuning
    }

    /// Sum of transformed values
    pub fn reduce_sum(&self, data: &[f32]) -> f32 {
        self.pool.install(|| reduce::sum(data))
    }

    /// Maximum of transformed values (negative infinity when empty)
    pub fn reduce_max(&self, data: &[f32]) -> f32 {
        self.pool.install(|| reduce::max(data))
    }

    /// Sort by transformed value, returning the permutation and sorted values
    pub fn sort_partition(&self, data: &[f32]) -> SortedPartition {
        self.pool
            .install(|| sort::sort_partition(data, &self.tuning, self.workers))
    }
}

impl std::fmt::Debug for KernelPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelPool")
            .field("workers", &self.workers)
            .field("tuning", &self.tuning)
            .finish()
    }
}
