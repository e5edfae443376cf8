//! The diamond topology.
//!
//! One source sends to three relays over links `0`, `2` and `4`; relay `i`
//! forwards to the sink over link `2i + 1`. Relays with a configured reset
//! time are reset once per run and come back after their downtime.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::codec::{CodeParams, factories};
use crate::config::{LINK_COUNT, RELAY_COUNT, SimConfig};
use crate::link::Link;
use crate::node::{Exit, Node};
use crate::packet::NodeId;
use crate::reconfigure::{Reconfiguration, RelayPath};
use crate::report::{RunOutcome, SimulationReport};
use crate::utils::as_secs;

/// Origin tag of the source's packets.
pub const SOURCE_ID: NodeId = 0xFF;

/// Origin tag of the sink (it never sends).
pub const SINK_ID: NodeId = 0xFE;

/// Result of comparing the decoded block with the source block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeCheck {
    Match,
    Mismatch { first_difference: usize },
}

impl DecodeCheck {
    pub fn compare(expected: &[u8], decoded: &[u8]) -> Self {
        match expected.iter().zip(decoded).position(|(a, b)| a != b) {
            Some(first_difference) => DecodeCheck::Mismatch { first_difference },
            None if expected.len() != decoded.len() => DecodeCheck::Mismatch {
                first_difference: expected.len().min(decoded.len()),
            },
            None => DecodeCheck::Match,
        }
    }
}

pub struct Simulator {
    config: SimConfig,
    encoders: rlnc::EncoderFactory,
    decoders: rlnc::DecoderFactory,
    rng: StdRng,
}

impl Simulator {
    /// Normalize `config` and build the codec factories for it.
    pub fn new(mut config: SimConfig) -> Result<Self> {
        config.normalize().context("invalid simulation config")?;
        let params = CodeParams::new(config.field, config.symbols, config.symbol_size)
            .context("invalid code parameters")?;
        let (encoders, decoders) = factories(params);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Ok(Self {
            config,
            encoders,
            decoders,
            rng,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Run every configured repetition and collect the results.
    pub async fn run(&mut self) -> Result<SimulationReport> {
        let mut report = SimulationReport::default();
        for run in 0..self.config.runs {
            let outcome = self
                .run_once(run)
                .await
                .with_context(|| format!("run {run}"))?;
            info!(
                "run {}: decoded in {:.3}s, sink received {:?}",
                run, outcome.latency, outcome.rx_packets
            );
            report.record(outcome);
        }
        Ok(report)
    }

    /// One run over a freshly built topology.
    pub async fn run_once(&mut self, run: usize) -> Result<RunOutcome> {
        let config = &self.config;
        let node_config = config.node_config();

        let mut links = Vec::with_capacity(LINK_COUNT);
        for idx in 0..LINK_COUNT {
            let link = Link::with_config(config.link_config(idx)?)?;
            link.start();
            links.push(link);
        }

        let source = Node::source(SOURCE_ID, &self.encoders, node_config.clone())?;
        let mut block = vec![0u8; source.block_size().await];
        self.rng.fill(block.as_mut_slice());
        source.set_constant_symbols(&block).await?;

        let sink = Node::sink(SINK_ID, &self.decoders, node_config.clone())?;
        sink.register_upstream(source.completion())?;

        let mut relays = Vec::with_capacity(RELAY_COUNT);
        for i in 0..RELAY_COUNT {
            let relay = Node::relay(i as NodeId, &self.decoders, node_config.clone())?;
            let (input, output) = (&links[2 * i], &links[2 * i + 1]);
            source.attach_output(input.clone()).await?;
            relay.attach_input(input).await?;
            relay.attach_output(output.clone()).await?;
            sink.attach_input(output).await?;
            sink.register_upstream(relay.completion())?;
            relays.push(relay);
        }

        let receiver = tokio::spawn(sink.clone().run());
        for relay in &relays {
            tokio::spawn(relay.clone().run());
        }
        let start = Instant::now();
        tokio::spawn(source.clone().run());

        let mut reconfigurators: Vec<JoinHandle<Result<Option<Reconfiguration>>>> =
            Vec::with_capacity(RELAY_COUNT);
        for (i, relay) in relays.iter().enumerate() {
            let path = RelayPath {
                upstream: source.clone(),
                relay: relay.clone(),
                downstream: sink.clone(),
                input: config.link_config(2 * i)?,
                output: config.link_config(2 * i + 1)?,
            };
            let decoders = self.decoders.clone();
            let (reset_after, downtime) = (config.resets[i], config.downtimes[i]);
            reconfigurators.push(tokio::spawn(async move {
                path.reconfigure(&decoders, reset_after, downtime).await
            }));
        }

        let exit = receiver.await.context("sink task failed")?;
        let latency = start.elapsed().as_secs_f64();
        if exit != Exit::Completed {
            bail!("sink stopped without completing: {exit:?}");
        }

        let mut measured_resets = vec![0.0; RELAY_COUNT];
        let mut measured_downtimes = vec![0.0; RELAY_COUNT];
        for (i, handle) in reconfigurators.into_iter().enumerate() {
            let Some(done) = handle.await.context("reconfigurator task failed")?? else {
                continue;
            };
            measured_resets[i] = done.measured_reset.as_secs_f64();
            measured_downtimes[i] = done.measured_downtime.as_secs_f64();
            let (input, output) = done.links;
            links[2 * i] = input;
            links[2 * i + 1] = output;
        }

        match DecodeCheck::compare(&block, &sink.data().await) {
            DecodeCheck::Match => debug!("run {}: data decoded correctly", run),
            DecodeCheck::Mismatch { first_difference } => {
                bail!("decoded data differs from the source at byte {first_difference}")
            }
        }

        Ok(RunOutcome {
            run,
            symbols: config.symbols,
            symbol_size: config.symbol_size,
            rate: config.rate,
            user_resets: as_secs(&config.resets),
            measured_resets,
            user_downtimes: as_secs(&config.downtimes),
            measured_downtimes,
            latency,
            rx_packets: rx_by_relay(&sink),
            transmissions: std::iter::once(&source)
                .chain(&relays)
                .map(|node| node.transmissions())
                .collect(),
            links: links.iter().map(|link| link.stats()).collect(),
        })
    }
}

fn rx_by_relay(sink: &Arc<Node>) -> Vec<u64> {
    let counts = sink.rx_counts();
    (0..RELAY_COUNT)
        .map(|i| counts.get(&(i as NodeId)).copied().unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_check() {
        assert_eq!(DecodeCheck::compare(b"abcd", b"abcd"), DecodeCheck::Match);
        assert_eq!(
            DecodeCheck::compare(b"abcd", b"abXd"),
            DecodeCheck::Mismatch {
                first_difference: 2
            }
        );
        assert_eq!(
            DecodeCheck::compare(b"abcd", b"abc"),
            DecodeCheck::Mismatch {
                first_difference: 3
            }
        );
    }

    #[test]
    fn test_new_rejects_zero_symbols() {
        let config = SimConfig {
            symbols: 0,
            ..Default::default()
        };
        assert!(Simulator::new(config).is_err());
    }
}
