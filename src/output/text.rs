//! Human-readable console output

use crate::config::KernelFamily;
use crate::distributed::coordinator::Role;
use crate::stats::{KernelTimings, PhaseOutcome, RoundReport, TimingTotals};
use crate::util::time::{format_duration, format_speedup};
use std::net::SocketAddr;

const BANNER: &str = "═══════════════════════════════════════════════════════════";

/// Announce the agreed round count and peer
pub fn print_session_start(role: Role, rounds: u32, peer: SocketAddr) {
    println!();
    println!("[{}] Peer {} - {} round(s)", role, peer, rounds);
}

pub fn print_round_header(round: u32, rounds: u32) {
    println!();
    println!("--- Round {}/{} ---", round, rounds);
}

/// Server's single-node phase over the whole dataset
pub fn print_basic_phase(outcome: &PhaseOutcome, family: KernelFamily) {
    println!("[Server] Basic phase ({} kernels, {} values):", family, outcome.sorted_len);
    println!("  Sum:    {}", outcome.results.sum);
    println!("  Max:    {}", outcome.results.max);
    print_timings(&outcome.timings);
}

/// Results of this node's share of the accelerated phase
pub fn print_local_results(role: Role, outcome: &PhaseOutcome) {
    println!(
        "[{}] Local results over {} values: sum {}, max {}",
        role, outcome.sorted_len, outcome.results.sum, outcome.results.max
    );
    print_timings(&outcome.timings);
}

pub fn print_accelerated_phase(role: Role, report: &RoundReport) {
    println!("[{}] Accelerated phase, round {}:", role, report.round);
    if let Some(peer) = report.peer {
        println!("  Peer:   sum {}, max {}", peer.sum, peer.max);
    }
    println!("  Sum:    {}", report.merged.sum);
    println!("  Max:    {}", report.merged.max);
    println!("  Time:   {}", format_duration(report.accelerated_elapsed));

    if let Some(basic) = report.basic {
        let basic_time = basic.timings.total();
        let speedup = (!basic_time.is_zero() && !report.accelerated_elapsed.is_zero())
            .then(|| basic_time.as_secs_f64() / report.accelerated_elapsed.as_secs_f64());
        println!("  Basic:  {}", format_duration(basic_time));
        println!("  Speedup: {}", format_speedup(speedup));
    }
}

fn print_timings(timings: &KernelTimings) {
    println!(
        "  Timing: sum {}, max {}, sort {} (total {})",
        format_duration(timings.sum),
        format_duration(timings.max),
        format_duration(timings.sort),
        format_duration(timings.total())
    );
}

/// Totals and averages over every round
pub fn print_summary(role: Role, totals: &TimingTotals) {
    println!();
    println!("{}", BANNER);
    println!("                    {} SUMMARY", role.to_string().to_uppercase());
    println!("{}", BANNER);
    println!();
    println!("Rounds:           {}", totals.rounds);

    if role == Role::Server {
        println!("Basic total:      {}", format_duration(totals.basic));
        if let Some(avg) = totals.average_basic() {
            println!("Basic average:    {}", format_duration(avg));
        }
    }
    println!("Accelerated total:   {}", format_duration(totals.accelerated));
    if let Some(avg) = totals.average_accelerated() {
        println!("Accelerated average: {}", format_duration(avg));
    }
    if role == Role::Server {
        println!();
        println!("Speedup:          {}", format_speedup(totals.speedup()));
    }

    println!();
    println!("{}", BANNER);
}
