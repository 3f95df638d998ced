//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Build the effective configuration: file (if any) then CLI overrides
pub fn build_config(cli: &Cli) -> Result<Config> {
    let config = match cli.config {
        Some(ref path) => parse_toml_file(path)?,
        None => Config::default(),
    };

    merge_cli_with_config(cli, config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    // Network
    if let Some(ref addr) = cli.server_addr {
        config.network.server_addr = addr.clone();
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if let Some(ref addr) = cli.bind_addr {
        config.network.bind_addr = addr.clone();
    }

    // Dataset and split
    if let Some(max_workers) = cli.max_workers {
        config.dataset.max_workers = max_workers;
    }
    if let Some(subset_size) = cli.subset_size {
        config.dataset.subset_size = subset_size;
    }
    if let Some(ratio) = cli.ratio {
        config.split.server_ratio = ratio;
    }

    // Kernels
    if let Some(threads) = cli.threads {
        config.kernel.workers = Some(threads);
    }
    if let Some(family) = cli.basic_kernels {
        config.kernel.basic_kernels = family;
    }
    let sort = &mut config.kernel.sort;
    if let Some(cutoff) = cli.insertion_cutoff {
        sort.insertion_cutoff = cutoff;
    }
    if let Some(cap) = cli.split_depth_cap {
        sort.split_depth_cap = cap;
    }
    if let Some(cap) = cli.merge_depth_cap {
        sort.merge_depth_cap = cap;
    }
    if let Some(len) = cli.merge_min_len {
        sort.merge_min_len = len;
    }
    if let Some(grain) = cli.grain_size {
        sort.grain_size = Some(grain);
    }

    // Runtime
    if let Some(rounds) = cli.rounds {
        config.runtime.rounds = Some(rounds);
    }
    if let Some(timeout) = cli.peer_timeout {
        config.runtime.peer_timeout_ms = Some(timeout);
    }
    if let Some(delay) = cli.settle_delay {
        config.runtime.settle_delay_ms = delay;
    }
    if let Some(seed) = cli.seed {
        config.runtime.seed = Some(seed);
    }

    // Output
    if let Some(ref path) = cli.json_output {
        config.output.json_output = Some(path.clone());
    }

    Ok(config)
}
