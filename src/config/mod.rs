//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, validation and the
//! operator prompt for the round count.
//!
//! Every field has a default, so an empty TOML file is a valid configuration.
//! The defaults are the reference benchmark constants: 64 subsets ×
//! 2,000,000 elements, an 85/15 server/client split and port 9999.

pub mod cli;
pub mod prompt;
pub mod toml;
pub mod validator;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Complete benchmark configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub kernel: KernelConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Server address the client sends to
    #[serde(default = "default_server_addr")]
    pub server_addr: String,
    /// Well-known server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Interface the server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Local socket address for the client (port 0 picks an ephemeral port)
    #[serde(default = "default_client_bind")]
    pub client_bind: String,
}

fn default_server_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9999
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_client_bind() -> String {
    "0.0.0.0:0".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_addr: default_server_addr(),
            port: default_port(),
            bind_addr: default_bind_addr(),
            client_bind: default_client_bind(),
        }
    }
}

impl NetworkConfig {
    /// `server_addr:port`
    pub fn server_endpoint(&self) -> String {
        format!("{}:{}", self.server_addr, self.port)
    }

    /// `bind_addr:port`
    pub fn bind_endpoint(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Dataset sizing
///
/// Total dataset length is `max_workers × subset_size`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_subset_size")]
    pub subset_size: usize,
}

fn default_max_workers() -> usize {
    64
}

fn default_subset_size() -> usize {
    2_000_000
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            subset_size: default_subset_size(),
        }
    }
}

impl DatasetConfig {
    /// Total number of elements, or `None` on overflow
    pub fn capacity(&self) -> Option<usize> {
        self.max_workers.checked_mul(self.subset_size)
    }
}

/// Data split between the two nodes in the accelerated phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of the dataset the server processes, in (0, 1)
    #[serde(default = "default_server_ratio")]
    pub server_ratio: f64,
}

fn default_server_ratio() -> f64 {
    0.85
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            server_ratio: default_server_ratio(),
        }
    }
}

/// Kernel family used for the basic phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KernelFamily {
    /// Lane-grouped, multi-worker kernels
    #[default]
    Parallel,
    /// Single-thread, single-lane reference kernels
    Serial,
}

impl fmt::Display for KernelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelFamily::Parallel => write!(f, "parallel"),
            KernelFamily::Serial => write!(f, "serial"),
        }
    }
}

/// Kernel configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Worker pool size (defaults to the number of logical CPUs)
    pub workers: Option<usize>,
    /// Kernels used for the single-node basic phase
    #[serde(default)]
    pub basic_kernels: KernelFamily,
    /// Sort tunables
    #[serde(default)]
    pub sort: SortTuning,
}

impl KernelConfig {
    /// Configured worker count, or one per logical CPU
    pub fn worker_threads(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }
}

/// Tunables for the adaptive parallel sorter
///
/// The defaults were tuned empirically on one machine; they affect only the
/// time to sort, never the resulting order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortTuning {
    /// Ranges of at most this many elements are insertion sorted
    #[serde(default = "default_insertion_cutoff")]
    pub insertion_cutoff: usize,
    /// Recursion depth below which halves may run as parallel tasks
    #[serde(default = "default_split_depth_cap")]
    pub split_depth_cap: usize,
    /// Recursion depth below which merges may split into parallel tasks
    #[serde(default = "default_merge_depth_cap")]
    pub merge_depth_cap: usize,
    /// Merges shorter than this run as a plain two-pointer merge
    #[serde(default = "default_merge_min_len")]
    pub merge_min_len: usize,
    /// Ranges above this length are split into parallel tasks.
    /// Defaults to `workers × 2048`, or 32768 with a single worker.
    pub grain_size: Option<usize>,
}

fn default_insertion_cutoff() -> usize {
    32
}

fn default_split_depth_cap() -> usize {
    10
}

fn default_merge_depth_cap() -> usize {
    3
}

fn default_merge_min_len() -> usize {
    8192
}

impl Default for SortTuning {
    fn default() -> Self {
        Self {
            insertion_cutoff: default_insertion_cutoff(),
            split_depth_cap: default_split_depth_cap(),
            merge_depth_cap: default_merge_depth_cap(),
            merge_min_len: default_merge_min_len(),
            grain_size: None,
        }
    }
}

impl SortTuning {
    /// Grain size for a pool of `workers` threads
    pub fn grain_for(&self, workers: usize) -> usize {
        self.grain_size.unwrap_or(if workers > 1 {
            workers * 2048
        } else {
            32768
        })
    }
}

/// Runtime behaviour of the round loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Number of rounds (client side). Prompted for when absent.
    pub rounds: Option<u32>,
    /// Deadline for every wait on the peer. `None` waits forever.
    pub peer_timeout_ms: Option<u64>,
    /// Pause after data generation so the peer can finish its own
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Gap between consecutive result datagrams
    #[serde(default = "default_send_gap_ms")]
    pub send_gap_ms: u64,
    /// Shuffle seed; entropy when absent
    pub seed: Option<u64>,
}

fn default_settle_delay_ms() -> u64 {
    100
}

fn default_send_gap_ms() -> u64 {
    1
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            rounds: None,
            peer_timeout_ms: None,
            settle_delay_ms: default_settle_delay_ms(),
            send_gap_ms: default_send_gap_ms(),
            seed: None,
        }
    }
}

impl RuntimeConfig {
    pub fn peer_timeout(&self) -> Option<Duration> {
        self.peer_timeout_ms.map(Duration::from_millis)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn send_gap(&self) -> Duration {
        Duration::from_millis(self.send_gap_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Write a JSON summary of the run to this path (server side)
    pub json_output: Option<PathBuf>,
}
