//! Drives the public simulator API the way the binary does.

use std::time::Duration;

use mpath_sim::config::{LINK_COUNT, SimConfig};
use mpath_sim::{Simulator, SimulationReport};

#[tokio::test(start_paused = true)]
async fn test_simulation_writes_report() {
    let output = tempfile::tempdir().unwrap();
    let config = SimConfig {
        symbols: 6,
        symbol_size: 64,
        rate: 50_000,
        losses: vec![0.2, 0.0, 0.0, 0.2, 0.1, 0.1],
        delays: vec![Duration::from_millis(10); LINK_COUNT],
        resets: vec![Duration::ZERO, Duration::from_millis(5), Duration::ZERO],
        downtimes: vec![Duration::ZERO, Duration::from_millis(5), Duration::ZERO],
        seed: Some(99),
        output_dir: Some(output.path().to_path_buf()),
        ..Default::default()
    };

    let mut simulator = Simulator::new(config).unwrap();
    let report: SimulationReport = simulator.run().await.unwrap();
    assert_eq!(report.runs(), 1);

    let dir = simulator.config().output_dir.clone().unwrap();
    let path = report.write_json(&dir).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["Symbols"][0], 6);
    assert_eq!(json["RxPackets"][0].as_array().unwrap().len(), 3);
    assert!(json["Latency[s]"][0].as_f64().unwrap() > 0.0);
}
