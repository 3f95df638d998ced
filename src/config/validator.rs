//! Configuration validation
//!
//! Runs before any socket is opened or any round starts. Invalid values are
//! rejected, never clamped.

use super::*;
use anyhow::{Context, Result};

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_network(&config.network)?;
    validate_dataset(&config.dataset)?;
    validate_split(&config.split)?;
    validate_kernel(&config.kernel)?;
    validate_runtime(&config.runtime)?;

    Ok(())
}

/// Validate network configuration
pub fn validate_network(network: &NetworkConfig) -> Result<()> {
    if network.server_addr.trim().is_empty() {
        anyhow::bail!("server_addr must not be empty");
    }
    if network.bind_addr.trim().is_empty() {
        anyhow::bail!("bind_addr must not be empty");
    }
    network
        .client_bind
        .parse::<std::net::SocketAddr>()
        .with_context(|| format!("client_bind must be a socket address, got '{}'", network.client_bind))?;

    Ok(())
}

/// Validate dataset sizing
pub fn validate_dataset(dataset: &DatasetConfig) -> Result<()> {
    if dataset.max_workers == 0 {
        anyhow::bail!("dataset.max_workers must be at least 1");
    }
    if dataset.subset_size == 0 {
        anyhow::bail!("dataset.subset_size must be at least 1");
    }
    if dataset.capacity().is_none() {
        anyhow::bail!(
            "dataset size overflows: {} × {}",
            dataset.max_workers,
            dataset.subset_size
        );
    }

    Ok(())
}

/// Validate the server/client split ratio
pub fn validate_split(split: &SplitConfig) -> Result<()> {
    validate_ratio(split.server_ratio)
}

/// The ratio must lie strictly inside (0, 1)
pub fn validate_ratio(ratio: f64) -> Result<()> {
    if !ratio.is_finite() || ratio <= 0.0 || ratio >= 1.0 {
        anyhow::bail!("server_ratio must be strictly between 0 and 1, got {}", ratio);
    }

    Ok(())
}

/// Validate kernel configuration
pub fn validate_kernel(kernel: &KernelConfig) -> Result<()> {
    if let Some(workers) = kernel.workers {
        if workers == 0 {
            anyhow::bail!("kernel.workers must be at least 1");
        }
        if workers > num_cpus::get() {
            eprintln!(
                "Warning: Kernel workers ({}) exceed CPU count ({}). \
                 This may cause context switching overhead.",
                workers,
                num_cpus::get()
            );
        }
    }

    let sort = &kernel.sort;
    if sort.insertion_cutoff == 0 {
        anyhow::bail!("kernel.sort.insertion_cutoff must be at least 1");
    }
    if sort.merge_min_len == 0 {
        anyhow::bail!("kernel.sort.merge_min_len must be at least 1");
    }
    if sort.grain_size == Some(0) {
        anyhow::bail!("kernel.sort.grain_size must be at least 1");
    }

    Ok(())
}

/// Validate runtime configuration
pub fn validate_runtime(runtime: &RuntimeConfig) -> Result<()> {
    if let Some(rounds) = runtime.rounds {
        validate_round_count(rounds)?;
    }
    if runtime.peer_timeout_ms == Some(0) {
        anyhow::bail!("runtime.peer_timeout_ms must be positive (omit it to wait forever)");
    }

    Ok(())
}

/// Largest accepted round count, from the operator or off the wire
pub const MAX_ROUNDS: u32 = 1_000_000;

/// A round count must be positive and at most [`MAX_ROUNDS`]
pub fn validate_round_count(rounds: u32) -> Result<()> {
    if rounds == 0 {
        anyhow::bail!("round count must be a positive integer");
    }
    if rounds > MAX_ROUNDS {
        anyhow::bail!("round count {} exceeds the maximum of {}", rounds, MAX_ROUNDS);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_ratio_bounds() {
        assert!(validate_ratio(0.5).is_ok());
        assert!(validate_ratio(0.85).is_ok());
        assert!(validate_ratio(0.0).is_err());
        assert!(validate_ratio(1.0).is_err());
        assert!(validate_ratio(-0.1).is_err());
        assert!(validate_ratio(1.5).is_err());
        assert!(validate_ratio(f64::NAN).is_err());
    }

    #[test]
    fn test_round_count() {
        assert!(validate_round_count(1).is_ok());
        assert!(validate_round_count(0).is_err());
        assert!(validate_round_count(MAX_ROUNDS).is_ok());
        assert!(validate_round_count(MAX_ROUNDS + 1).is_err());

        let mut config = Config::default();
        config.runtime.rounds = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_dataset_sizes() {
        let mut config = Config::default();
        config.dataset.subset_size = 0;
        assert!(validate_config(&config).is_err());

        config.dataset.subset_size = 2;
        config.dataset.max_workers = usize::MAX;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_sort_tuning() {
        let mut config = Config::default();
        config.kernel.sort.insertion_cutoff = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.kernel.sort.grain_size = Some(0);
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.kernel.workers = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_client_bind_must_parse() {
        let mut config = Config::default();
        config.network.client_bind = "not-an-address".to_string();
        assert!(validate_config(&config).is_err());
    }
}
