//! Per-run simulation results and their JSON export.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::link::LinkStats;
use crate::utils::now_ms;

/// Everything one run measured.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub run: usize,
    pub symbols: usize,
    pub symbol_size: usize,
    pub rate: u64,
    pub user_resets: Vec<f64>,
    pub measured_resets: Vec<f64>,
    pub user_downtimes: Vec<f64>,
    pub measured_downtimes: Vec<f64>,
    pub latency: f64,
    /// Packets absorbed by the sink, indexed by relay id.
    pub rx_packets: Vec<u64>,
    /// Payloads sent by the source followed by each relay.
    pub transmissions: Vec<u64>,
    /// Counters of the links in use when the run ended.
    pub links: Vec<LinkStats>,
}

/// Column-oriented results of all runs; entry `i` of every vector belongs to
/// run `i`. Times are in seconds.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SimulationReport {
    #[serde(rename = "Run")]
    pub run: Vec<usize>,
    #[serde(rename = "Symbols")]
    pub symbols: Vec<usize>,
    #[serde(rename = "SymbolSize")]
    pub symbol_size: Vec<usize>,
    #[serde(rename = "Rate")]
    pub rate: Vec<u64>,
    #[serde(rename = "UserResets[s]")]
    pub user_resets: Vec<Vec<f64>>,
    #[serde(rename = "MeasuredResets[s]")]
    pub measured_resets: Vec<Vec<f64>>,
    #[serde(rename = "UserDowntimes[s]")]
    pub user_downtimes: Vec<Vec<f64>>,
    #[serde(rename = "MeasuredDowntimes[s]")]
    pub measured_downtimes: Vec<Vec<f64>>,
    #[serde(rename = "Latency[s]")]
    pub latency: Vec<f64>,
    #[serde(rename = "RxPackets")]
    pub rx_packets: Vec<Vec<u64>>,
    #[serde(rename = "Transmissions")]
    pub transmissions: Vec<Vec<u64>>,
    #[serde(rename = "Links")]
    pub links: Vec<Vec<LinkStats>>,
}

impl SimulationReport {
    pub fn record(&mut self, outcome: RunOutcome) {
        self.run.push(outcome.run);
        self.symbols.push(outcome.symbols);
        self.symbol_size.push(outcome.symbol_size);
        self.rate.push(outcome.rate);
        self.user_resets.push(outcome.user_resets);
        self.measured_resets.push(outcome.measured_resets);
        self.user_downtimes.push(outcome.user_downtimes);
        self.measured_downtimes.push(outcome.measured_downtimes);
        self.latency.push(outcome.latency);
        self.rx_packets.push(outcome.rx_packets);
        self.transmissions.push(outcome.transmissions);
        self.links.push(outcome.links);
    }

    pub fn runs(&self) -> usize {
        self.run.len()
    }

    /// Mean decoding latency over all runs, in seconds.
    pub fn mean_latency(&self) -> Option<f64> {
        if self.latency.is_empty() {
            return None;
        }
        Some(self.latency.iter().sum::<f64>() / self.latency.len() as f64)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize report")
    }

    /// Write the report to `<dir>/<unix-seconds>_simm.json`, returning the path.
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("create output directory {}", dir.display()))?;
        let path = dir.join(format!("{}_simm.json", now_ms() / 1000));
        fs::write(&path, self.to_json()?)
            .with_context(|| format!("write report {}", path.display()))?;
        info!("report written to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(run: usize, latency: f64) -> RunOutcome {
        RunOutcome {
            run,
            symbols: 10,
            symbol_size: 100,
            rate: 5000,
            user_resets: vec![0.5, 0.0, 0.0],
            measured_resets: vec![0.5, 0.0, 0.0],
            user_downtimes: vec![0.1, 0.0, 0.0],
            measured_downtimes: vec![0.1, 0.0, 0.0],
            latency,
            rx_packets: vec![4, 3, 5],
            transmissions: vec![30, 10, 9, 11],
            links: vec![LinkStats::default(); 6],
        }
    }

    #[test]
    fn test_record_keeps_columns_aligned() {
        let mut report = SimulationReport::default();
        report.record(outcome(0, 1.0));
        report.record(outcome(1, 3.0));

        assert_eq!(report.runs(), 2);
        assert_eq!(report.run, vec![0, 1]);
        assert_eq!(report.rx_packets.len(), 2);
        assert_eq!(report.links[1].len(), 6);
        assert_eq!(report.mean_latency(), Some(2.0));
        assert_eq!(SimulationReport::default().mean_latency(), None);
    }

    #[test]
    fn test_json_field_names() {
        let mut report = SimulationReport::default();
        report.record(outcome(0, 1.25));
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["Run"][0], 0);
        assert_eq!(value["SymbolSize"][0], 100);
        assert_eq!(value["Latency[s]"][0], 1.25);
        assert_eq!(value["UserResets[s]"][0][0], 0.5);
        assert_eq!(value["RxPackets"][0][2], 5);
        assert_eq!(value["Links"][0][0]["dropped"], 0);
    }

    #[test]
    fn test_write_json_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("reports");
        let mut report = SimulationReport::default();
        report.record(outcome(0, 0.75));

        let path = report.write_json(&nested).unwrap();
        assert!(path.starts_with(&nested));
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .ends_with("_simm.json")
        );

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["Latency[s]"][0], 0.75);
    }
}
