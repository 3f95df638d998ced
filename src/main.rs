//! ParDist CLI entry point

use anyhow::{Context, Result};
use pardist::config::cli::{Cli, ExecutionMode};
use pardist::config::{prompt, toml, validator, Config};
use pardist::distributed::{run_standalone, Coordinator};
use pardist::output::json;
use pardist::stats::RunSummary;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    println!("ParDist v{}", env!("CARGO_PKG_VERSION"));
    println!("Two-node parallel/distributed speedup benchmark");
    println!();

    cli.validate()?;

    let config = toml::build_config(&cli)?;
    validator::validate_config(&config).context("Configuration validation failed")?;

    print_configuration(&config, cli.mode);

    if cli.dry_run {
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    let rounds = match cli.mode {
        ExecutionMode::Server => None,
        ExecutionMode::Client | ExecutionMode::Standalone => Some(resolve_rounds(&config)?),
    };

    let config = Arc::new(config);
    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    let summary = runtime.block_on(async {
        match (cli.mode, rounds) {
            (ExecutionMode::Client, Some(rounds)) => {
                Coordinator::client(Arc::clone(&config), rounds).await?.run().await
            }
            (ExecutionMode::Standalone, Some(rounds)) => {
                let (server, _client) = run_standalone(Arc::clone(&config), rounds).await?;
                Ok(server)
            }
            _ => Coordinator::server(Arc::clone(&config)).await?.run().await,
        }
    })?;

    write_json(&config, cli.mode, &summary);
    Ok(())
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

/// Round count from the configuration, or asked for on stdin
fn resolve_rounds(config: &Config) -> Result<u32> {
    if let Some(rounds) = config.runtime.rounds {
        return Ok(rounds);
    }

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    prompt::read_round_count(stdin.lock(), stdout.lock())
}

fn write_json(config: &Config, mode: ExecutionMode, summary: &RunSummary) {
    let Some(ref path) = config.output.json_output else {
        return;
    };
    if mode == ExecutionMode::Client {
        return;
    }

    println!();
    match json::write_summary(path, config, summary) {
        Ok(()) => println!("JSON summary written to: {}", path.display()),
        Err(e) => eprintln!("Warning: Failed to write JSON summary: {:#}", e),
    }
}

/// Print configuration summary
fn print_configuration(config: &Config, mode: ExecutionMode) {
    let total = config
        .dataset
        .capacity()
        .map(|n| n.to_string())
        .unwrap_or_else(|| "overflow".to_string());

    println!("Configuration:");
    println!("  Mode: {:?}", mode);
    println!("  Network:");
    match mode {
        ExecutionMode::Server => println!("    Bind: {}", config.network.bind_endpoint()),
        ExecutionMode::Client => println!("    Server: {}", config.network.server_endpoint()),
        ExecutionMode::Standalone => println!("    Loopback (ephemeral port)"),
    }
    if let Some(timeout) = config.runtime.peer_timeout() {
        println!("    Peer timeout: {:?}", timeout);
    }

    println!("  Dataset:");
    println!(
        "    {} values ({} subsets x {})",
        total, config.dataset.max_workers, config.dataset.subset_size
    );
    println!(
        "    Split: server {:.0}%, client {:.0}%",
        config.split.server_ratio * 100.0,
        (1.0 - config.split.server_ratio) * 100.0
    );
    if let Some(seed) = config.runtime.seed {
        println!("    Seed: {}", seed);
    }

    println!("  Kernels:");
    println!("    Workers: {}", config.kernel.worker_threads());
    println!("    Basic phase: {}", config.kernel.basic_kernels);
    let sort = &config.kernel.sort;
    println!(
        "    Sort: cutoff {}, grain {}, split depth {}, merge depth {}, merge min {}",
        sort.insertion_cutoff,
        sort.grain_for(config.kernel.worker_threads()),
        sort.split_depth_cap,
        sort.merge_depth_cap,
        sort.merge_min_len
    );
}
