//! Per-node round coordinator
//!
//! Drives one node through the benchmark rounds:
//!
//! ```text
//! Init -> AwaitRoundCount -> BasicRun -> AwaitPeerBasicAck -> AccelRun
//!                               ^                                 |
//!                               |                                 v
//!                               +------ (next round) ----- AwaitPeerResults
//!                                                                 |
//!                                                                 v
//!                                                               Done
//! ```
//!
//! The server walks every state. The client has no basic phase of its own:
//! it waits in `AwaitPeerBasicAck` for the server's `BASIC_DONE`, echoes it,
//! computes its accelerated partition and ships the results.
//!
//! Kernel work runs on the blocking pool so the datagram listener keeps
//! draining the socket while a phase computes.

use super::mailbox::{spawn_listener, Mailbox};
use super::protocol::{send_message, Message};
use crate::config::validator::validate_round_count;
use crate::config::{Config, KernelFamily};
use crate::dataset::Dataset;
use crate::kernel::{serial, KernelPool};
use crate::output::text;
use crate::partition::{self, Partition, Phase};
use crate::stats::{KernelTimings, PhaseOutcome, RoundReport, RunSummary, ScalarResults, TimingTotals};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::watch;

/// Which side of the benchmark this node plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Server,
    Client,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Server => f.write_str("Server"),
            Role::Client => f.write_str("Client"),
        }
    }
}

/// Coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Init,
    AwaitRoundCount,
    BasicRun,
    AwaitPeerBasicAck,
    AccelRun,
    AwaitPeerResults,
    Done,
}

/// One node's view of the benchmark
pub struct Coordinator {
    role: Role,
    config: Arc<Config>,
    socket: Arc<UdpSocket>,
    mailbox: Arc<Mailbox>,
    kernels: Arc<KernelPool>,
    /// Checked out while a phase runs on the blocking pool
    dataset: Option<Dataset>,
    state: watch::Sender<RoundState>,
    /// Round count entered on the client
    rounds: Option<u32>,
    /// Static server address (client only)
    server: Option<SocketAddr>,
    totals: TimingTotals,
}

impl Coordinator {
    /// Bind the server socket on the configured endpoint
    pub async fn server(config: Arc<Config>) -> Result<Self> {
        let endpoint = config.network.bind_endpoint();
        let socket = UdpSocket::bind(&endpoint)
            .await
            .with_context(|| format!("Failed to bind server socket on {}", endpoint))?;

        Self::new(Role::Server, config, socket, None, None)
    }

    /// Bind the client socket and resolve the server address
    pub async fn client(config: Arc<Config>, rounds: u32) -> Result<Self> {
        validate_round_count(rounds)?;

        let endpoint = config.network.server_endpoint();
        let candidates: Vec<SocketAddr> = tokio::net::lookup_host(&endpoint)
            .await
            .with_context(|| format!("Failed to resolve server address {}", endpoint))?
            .collect();
        let server = candidates
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| candidates.first())
            .copied()
            .with_context(|| format!("No address found for {}", endpoint))?;

        let socket = UdpSocket::bind(&config.network.client_bind)
            .await
            .with_context(|| format!("Failed to bind client socket on {}", config.network.client_bind))?;

        Self::new(Role::Client, config, socket, Some(rounds), Some(server))
    }

    fn new(
        role: Role,
        config: Arc<Config>,
        socket: UdpSocket,
        rounds: Option<u32>,
        server: Option<SocketAddr>,
    ) -> Result<Self> {
        let capacity = config
            .dataset
            .capacity()
            .context("Dataset size (max_workers * subset_size) overflows")?;
        let kernels = KernelPool::new(config.kernel.worker_threads(), config.kernel.sort.clone())?;
        let dataset = Dataset::new(capacity, config.runtime.seed);
        let (state, _) = watch::channel(RoundState::Init);

        Ok(Self {
            role,
            config,
            socket: Arc::new(socket),
            mailbox: Arc::new(Mailbox::new()),
            kernels: Arc::new(kernels),
            dataset: Some(dataset),
            state,
            rounds,
            server,
            totals: TimingTotals::default(),
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().context("Failed to read local socket address")
    }

    /// Observe state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<RoundState> {
        self.state.subscribe()
    }

    /// Run every round and return what this node measured
    ///
    /// The socket is released when the coordinator is dropped at the end of
    /// the run, on success and on error alike.
    pub async fn run(mut self) -> Result<RunSummary> {
        let listener = spawn_listener(Arc::clone(&self.socket), Arc::clone(&self.mailbox));

        let result = match self.role {
            Role::Server => self.run_server().await,
            Role::Client => self.run_client().await,
        };

        listener.abort();
        self.set_state(RoundState::Done);
        result
    }

    async fn run_server(&mut self) -> Result<RunSummary> {
        println!("[Server] Listening on {}", self.local_addr()?);
        println!("[Server] Waiting for the client to send the round count...");

        self.set_state(RoundState::AwaitRoundCount);
        let (rounds, peer) = self
            .mailbox
            .wait_for("round count", None, |state| state.session())
            .await?;
        text::print_session_start(self.role, rounds, peer);

        let total = self.total_len()?;
        let ratio = self.config.split.server_ratio;
        let basic_family = self.config.kernel.basic_kernels;
        let mut reports = Vec::new();

        for round in 1..=rounds {
            text::print_round_header(round, rounds);

            self.set_state(RoundState::BasicRun);
            let basic_plan = partition::plan(total, ratio, Phase::Basic);
            self.regenerate(basic_plan.server).await?;
            let basic = self.compute(basic_family).await?;
            text::print_basic_phase(&basic, basic_family);

            // Everything the client sends for this round is triggered by
            // this BASIC_DONE, so older and duplicated signals stay below it.
            let baseline = self.mailbox.snapshot().baseline();
            send_message(&self.socket, peer, &Message::BasicDone).await?;
            self.set_state(RoundState::AwaitPeerBasicAck);
            self.mailbox
                .wait_for("basic phase acknowledgment", self.peer_timeout(), |state| {
                    state.basic_done_since(&baseline).then_some(())
                })
                .await?;

            self.set_state(RoundState::AccelRun);
            let accel_plan = partition::plan(total, ratio, Phase::Accelerated);
            println!(
                "[Server] Accelerated split: server {} ({} values), client {} ({} values)",
                accel_plan.server, accel_plan.server.len, accel_plan.client, accel_plan.client.len
            );
            self.regenerate(accel_plan.server).await?;
            tokio::time::sleep(self.config.runtime.settle_delay()).await;

            let started = Instant::now();
            let local = self.compute(KernelFamily::Parallel).await?;
            text::print_local_results(self.role, &local);

            self.set_state(RoundState::AwaitPeerResults);
            let peer_results = self
                .mailbox
                .wait_for("client results", self.peer_timeout(), |state| {
                    state.results_since(&baseline)
                })
                .await?;
            let merged = local.results.merge(peer_results);
            let elapsed = started.elapsed();

            self.totals.record(basic.timings.total(), elapsed);
            let report = RoundReport {
                round,
                basic: Some(basic),
                accelerated: local,
                peer: Some(peer_results),
                merged,
                accelerated_elapsed: elapsed,
            };
            text::print_accelerated_phase(self.role, &report);
            reports.push(report);
        }

        text::print_summary(self.role, &self.totals);

        Ok(RunSummary {
            role: self.role,
            rounds: reports,
            totals: self.totals,
        })
    }

    async fn run_client(&mut self) -> Result<RunSummary> {
        let rounds = self.rounds.context("Client started without a round count")?;
        let server = self.server.context("Client started without a server address")?;

        self.set_state(RoundState::AwaitRoundCount);
        let mut baseline = self.mailbox.snapshot().baseline();
        send_message(&self.socket, server, &Message::RunTimes(rounds)).await?;
        println!("[Client] Sent round count {} to {}", rounds, server);
        tokio::time::sleep(self.config.runtime.settle_delay()).await;
        text::print_session_start(self.role, rounds, server);

        let total = self.total_len()?;
        let ratio = self.config.split.server_ratio;
        let mut reports = Vec::new();

        for round in 1..=rounds {
            text::print_round_header(round, rounds);
            println!("[Client] Waiting for the server basic phase...");

            self.set_state(RoundState::AwaitPeerBasicAck);
            self.mailbox
                .wait_for("server basic phase", self.peer_timeout(), |state| {
                    state.basic_done_since(&baseline).then_some(())
                })
                .await?;
            send_message(&self.socket, server, &Message::BasicDone).await?;

            self.set_state(RoundState::AccelRun);
            let plan = partition::plan(total, ratio, Phase::Accelerated);
            self.regenerate(plan.client).await?;
            tokio::time::sleep(self.config.runtime.settle_delay()).await;

            let started = Instant::now();
            let local = self.compute(KernelFamily::Parallel).await?;
            let elapsed = started.elapsed();
            text::print_local_results(self.role, &local);

            // The next BASIC_DONE only follows these results.
            baseline = self.mailbox.snapshot().baseline();
            self.send_results(server, local.results).await?;

            // The client has no basic phase; only its accelerated time counts.
            self.totals.record(Duration::ZERO, elapsed);
            let report = RoundReport {
                round,
                basic: None,
                accelerated: local,
                peer: None,
                merged: local.results,
                accelerated_elapsed: elapsed,
            };
            text::print_accelerated_phase(self.role, &report);
            reports.push(report);
        }

        text::print_summary(self.role, &self.totals);

        Ok(RunSummary {
            role: self.role,
            rounds: reports,
            totals: self.totals,
        })
    }

    /// Ship results as three datagrams, spaced by the send gap
    async fn send_results(&self, server: SocketAddr, results: ScalarResults) -> Result<()> {
        let gap = self.config.runtime.send_gap();

        send_message(&self.socket, server, &Message::ResultSum(results.sum)).await?;
        tokio::time::sleep(gap).await;
        send_message(&self.socket, server, &Message::ResultMax(results.max)).await?;
        tokio::time::sleep(gap).await;
        send_message(&self.socket, server, &Message::ResultsReady).await?;

        println!("[Client] Results sent to server");
        Ok(())
    }

    async fn regenerate(&mut self, partition: Partition) -> Result<()> {
        self.with_dataset(move |dataset, _| dataset.regenerate(partition))
            .await?
            .with_context(|| format!("Failed to regenerate partition {}", partition))?;

        println!("[{}] Data initialized and shuffled for {}", self.role, partition);
        Ok(())
    }

    async fn compute(&mut self, family: KernelFamily) -> Result<PhaseOutcome> {
        self.with_dataset(move |dataset, kernels| run_kernels(dataset.values(), kernels, family))
            .await
    }

    /// Run `job` against the dataset on the blocking pool
    async fn with_dataset<F, R>(&mut self, job: F) -> Result<R>
    where
        F: FnOnce(&mut Dataset, &KernelPool) -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut dataset = self
            .dataset
            .take()
            .context("Dataset is already in use by another phase")?;
        let kernels = Arc::clone(&self.kernels);

        let (dataset, output) = tokio::task::spawn_blocking(move || {
            let output = job(&mut dataset, &kernels);
            (dataset, output)
        })
        .await
        .context("Kernel task panicked")?;

        self.dataset = Some(dataset);
        Ok(output)
    }

    fn total_len(&self) -> Result<usize> {
        self.config
            .dataset
            .capacity()
            .context("Dataset size (max_workers * subset_size) overflows")
    }

    fn peer_timeout(&self) -> Option<Duration> {
        self.config.runtime.peer_timeout()
    }

    fn set_state(&self, next: RoundState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            log::debug!("[{}] {:?} -> {:?}", self.role, previous, next);
        }
    }
}

/// Time the sum, max and sort kernels over `data`
pub fn run_kernels(data: &[f32], kernels: &KernelPool, family: KernelFamily) -> PhaseOutcome {
    let started = Instant::now();
    let sum = match family {
        KernelFamily::Parallel => kernels.reduce_sum(data),
        KernelFamily::Serial => serial::sum(data),
    };
    let sum_time = started.elapsed();

    let started = Instant::now();
    let max = match family {
        KernelFamily::Parallel => kernels.reduce_max(data),
        KernelFamily::Serial => serial::max(data),
    };
    let max_time = started.elapsed();

    let started = Instant::now();
    let sorted = match family {
        KernelFamily::Parallel => kernels.sort_partition(data),
        KernelFamily::Serial => serial::sort(data),
    };
    let sort_time = started.elapsed();

    log::debug!(
        "{} kernels over {} values: sum {:?}, max {:?}, sort {:?}",
        family,
        data.len(),
        sum_time,
        max_time,
        sort_time
    );

    PhaseOutcome {
        results: ScalarResults { sum, max },
        sorted_len: sorted.len(),
        timings: KernelTimings {
            sum: sum_time,
            max: max_time,
            sort: sort_time,
        },
    }
}

/// Run server and client in one process over loopback
///
/// The server binds an ephemeral loopback port and the client is pointed at
/// it, so the configured port is ignored.
pub async fn run_standalone(config: Arc<Config>, rounds: u32) -> Result<(RunSummary, RunSummary)> {
    let mut server_config = (*config).clone();
    server_config.network.bind_addr = "127.0.0.1".to_string();
    server_config.network.port = 0;
    let server = Coordinator::server(Arc::new(server_config)).await?;
    let server_addr = server.local_addr()?;

    let mut client_config = (*config).clone();
    client_config.network.server_addr = server_addr.ip().to_string();
    client_config.network.port = server_addr.port();
    client_config.network.client_bind = "127.0.0.1:0".to_string();
    if let Some(seed) = client_config.runtime.seed {
        client_config.runtime.seed = Some(seed.wrapping_add(1));
    }
    let client = Coordinator::client(Arc::new(client_config), rounds).await?;

    println!("Standalone mode: server on {}, client on {}", server_addr, client.local_addr()?);

    tokio::try_join!(server.run(), client.run())
}
