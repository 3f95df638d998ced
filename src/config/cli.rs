//! CLI argument parsing using clap

use super::KernelFamily;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Server node: waits for the client, runs the basic phase, merges results
    Server,
    /// Client node: picks the round count and processes its share of the data
    Client,
    /// Both nodes in one process over the loopback interface
    Standalone,
}

/// ParDist - two-node parallel/distributed speedup benchmark
#[derive(Parser, Debug)]
#[command(name = "pardist")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode: server, client, or standalone
    #[arg(long, value_enum, default_value = "standalone")]
    pub mode: ExecutionMode,

    /// TOML configuration file (CLI flags take precedence)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    // === Network Options ===
    /// Server address the client sends to
    #[arg(long)]
    pub server_addr: Option<String>,

    /// Server port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Interface the server binds to
    #[arg(long)]
    pub bind_addr: Option<String>,

    // === Workload Options ===
    /// Number of rounds (client/standalone); prompted for when omitted
    #[arg(short = 'n', long)]
    pub rounds: Option<u32>,

    /// Fraction of the dataset processed by the server, in (0, 1)
    #[arg(short = 'r', long)]
    pub ratio: Option<f64>,

    /// Number of dataset subsets (dataset length = max_workers × subset_size)
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Elements per dataset subset
    #[arg(long)]
    pub subset_size: Option<usize>,

    /// Shuffle seed for reproducible datasets
    #[arg(long)]
    pub seed: Option<u64>,

    // === Kernel Options ===
    /// Kernel worker threads (default: number of logical CPUs)
    #[arg(short = 't', long, env = "PARDIST_THREADS")]
    pub threads: Option<usize>,

    /// Kernels used for the basic phase
    #[arg(long, value_enum)]
    pub basic_kernels: Option<KernelFamily>,

    /// Insertion sort cutoff for the parallel sorter
    #[arg(long)]
    pub insertion_cutoff: Option<usize>,

    /// Maximum recursion depth at which sort halves run in parallel
    #[arg(long)]
    pub split_depth_cap: Option<usize>,

    /// Maximum recursion depth at which merges run in parallel
    #[arg(long)]
    pub merge_depth_cap: Option<usize>,

    /// Minimum merge length for a parallel merge
    #[arg(long)]
    pub merge_min_len: Option<usize>,

    /// Minimum range length for a parallel sort split
    #[arg(long)]
    pub grain_size: Option<usize>,

    // === Runtime Options ===
    /// Give up waiting for the peer after this many milliseconds
    #[arg(long)]
    pub peer_timeout: Option<u64>,

    /// Pause after data generation, in milliseconds
    #[arg(long)]
    pub settle_delay: Option<u64>,

    // === Output Options ===
    /// Write a JSON summary of the run to this file
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Validate configuration and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate combinations that clap cannot express
    pub fn validate(&self) -> Result<()> {
        if let Some(ref path) = self.config {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
        }

        if self.mode == ExecutionMode::Server && self.rounds.is_some() {
            eprintln!("Warning: --rounds is ignored in server mode (the client sends the round count)");
        }

        if self.mode == ExecutionMode::Client && self.json_output.is_some() {
            eprintln!("Warning: --json-output is only written by the server");
        }

        Ok(())
    }
}
