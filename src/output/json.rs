//! JSON output formatting
//!
//! One document per run: the effective configuration, a timestamp, each
//! round's results and timings, and the totals with the overall speedup.

use crate::config::Config;
use crate::distributed::coordinator::Role;
use crate::stats::{PhaseOutcome, RoundReport, RunSummary, ScalarResults};
use crate::util::time::millis;
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct JsonPhase {
    pub results: ScalarResults,
    pub values: usize,
    pub sum_ms: f64,
    pub max_ms: f64,
    pub sort_ms: f64,
    pub total_ms: f64,
}

impl From<&PhaseOutcome> for JsonPhase {
    fn from(outcome: &PhaseOutcome) -> Self {
        Self {
            results: outcome.results,
            values: outcome.sorted_len,
            sum_ms: millis(outcome.timings.sum),
            max_ms: millis(outcome.timings.max),
            sort_ms: millis(outcome.timings.sort),
            total_ms: millis(outcome.timings.total()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRound {
    pub round: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic: Option<JsonPhase>,
    pub accelerated: JsonPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<ScalarResults>,
    pub merged: ScalarResults,
    pub accelerated_ms: f64,
}

impl From<&RoundReport> for JsonRound {
    fn from(report: &RoundReport) -> Self {
        Self {
            round: report.round,
            basic: report.basic.as_ref().map(JsonPhase::from),
            accelerated: JsonPhase::from(&report.accelerated),
            peer: report.peer,
            merged: report.merged,
            accelerated_ms: millis(report.accelerated_elapsed),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonTotals {
    pub rounds: u32,
    pub basic_ms: f64,
    pub accelerated_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speedup: Option<f64>,
}

/// Top-level JSON document
#[derive(Debug, Serialize)]
pub struct JsonSummary<'a> {
    pub version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub role: Role,
    pub config: &'a Config,
    pub rounds: Vec<JsonRound>,
    pub totals: JsonTotals,
}

pub fn build_summary<'a>(config: &'a Config, summary: &RunSummary) -> JsonSummary<'a> {
    let totals = &summary.totals;
    JsonSummary {
        version: env!("CARGO_PKG_VERSION"),
        generated_at: Utc::now(),
        role: summary.role,
        config,
        rounds: summary.rounds.iter().map(JsonRound::from).collect(),
        totals: JsonTotals {
            rounds: totals.rounds,
            basic_ms: millis(totals.basic),
            accelerated_ms: millis(totals.accelerated),
            speedup: totals.speedup(),
        },
    }
}

/// Write the run summary to `path` as pretty-printed JSON
pub fn write_summary(path: &Path, config: &Config, summary: &RunSummary) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create JSON output directory: {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create JSON output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &build_summary(config, summary))
        .with_context(|| format!("Failed to write JSON output: {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush JSON output: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{KernelTimings, TimingTotals};
    use std::time::Duration;

    fn outcome(sum: f32, max: f32, millis: u64) -> PhaseOutcome {
        PhaseOutcome {
            results: ScalarResults { sum, max },
            sorted_len: 16,
            timings: KernelTimings {
                sum: Duration::from_millis(millis),
                max: Duration::from_millis(millis),
                sort: Duration::from_millis(millis),
            },
        }
    }

    fn server_summary() -> RunSummary {
        let mut totals = TimingTotals::default();
        totals.record(Duration::from_millis(30), Duration::from_millis(10));
        RunSummary {
            role: Role::Server,
            rounds: vec![RoundReport {
                round: 1,
                basic: Some(outcome(20.0, 1.5, 10)),
                accelerated: outcome(8.0, 1.0, 2),
                peer: Some(ScalarResults { sum: 12.0, max: 1.5 }),
                merged: ScalarResults { sum: 20.0, max: 1.5 },
                accelerated_elapsed: Duration::from_millis(10),
            }],
            totals,
        }
    }

    #[test]
    fn test_write_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("summary.json");
        let config = Config::default();

        write_summary(&path, &config, &server_summary()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["role"], "server");
        assert_eq!(value["rounds"][0]["round"], 1);
        assert_eq!(value["rounds"][0]["merged"]["sum"], 20.0);
        assert_eq!(value["rounds"][0]["basic"]["total_ms"], 30.0);
        assert!((value["totals"]["speedup"].as_f64().unwrap() - 3.0).abs() < 1e-9);
        assert_eq!(value["config"]["network"]["port"], 9999);
    }

    #[test]
    fn test_client_rounds_omit_server_fields() {
        let report = RoundReport {
            round: 2,
            basic: None,
            accelerated: outcome(4.0, 1.0, 1),
            peer: None,
            merged: ScalarResults { sum: 4.0, max: 1.0 },
            accelerated_elapsed: Duration::from_millis(3),
        };

        let value = serde_json::to_value(JsonRound::from(&report)).unwrap();
        assert!(value.get("basic").is_none());
        assert!(value.get("peer").is_none());
        assert_eq!(value["accelerated_ms"], 3.0);
    }
}
