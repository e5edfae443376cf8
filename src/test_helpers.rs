#![cfg(any(test, feature = "test-internals"))]
#![allow(dead_code)] // Allow unused helpers - they're used by library tests but not binary tests

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;

use crate::codec::{CodeParams, Field, factories};
use crate::config::{LinkConfig, NodeConfig};
use crate::link::Link;
use crate::node::Node;
use crate::packet::{NodeId, Packet};
use crate::simulator::{SINK_ID, SOURCE_ID};

/// Binary8 encoder and decoder factories.
pub fn test_factories(symbols: usize, symbol_size: usize) -> (rlnc::EncoderFactory, rlnc::DecoderFactory) {
    let params = CodeParams::new(Field::Binary8, symbols, symbol_size).unwrap();
    factories(params)
}

/// Deterministic pseudo-random block of `len` bytes.
pub fn random_block(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut block = vec![0u8; len];
    rng.fill(block.as_mut_slice());
    block
}

/// A fast node config so paused-clock tests need few virtual seconds.
pub fn fast_node_config() -> NodeConfig {
    NodeConfig::new(1_000_000).unwrap()
}

/// Started link with the given parameters and a fixed seed.
pub fn started_link(label: &str, loss_prob: f64, delay: Duration, seed: u64) -> Arc<Link> {
    let config = LinkConfig::new(loss_prob, delay)
        .unwrap()
        .with_label(label)
        .with_seed(seed);
    let link = Link::with_config(config).unwrap();
    link.start();
    link
}

/// Started lossless zero-delay link.
pub fn lossless_link(label: &str) -> Arc<Link> {
    started_link(label, 0.0, Duration::ZERO, 0)
}

/// Source holding `block`, built from the given factory.
pub async fn source_with_block(
    factory: &rlnc::EncoderFactory,
    config: NodeConfig,
    block: &[u8],
) -> Arc<Node> {
    let source = Node::source(SOURCE_ID, factory, config).unwrap();
    source.set_constant_symbols(block).await.unwrap();
    source
}

pub fn sink(factory: &rlnc::DecoderFactory, config: NodeConfig) -> Arc<Node> {
    Node::sink(SINK_ID, factory, config).unwrap()
}

pub fn packet(byte: u8, origin: NodeId) -> Packet {
    Packet::tagged(vec![byte; 4], origin)
}

/// Receive everything until the channel closes.
pub async fn collect(mut rx: mpsc::Receiver<Packet>) -> Vec<Packet> {
    let mut packets = Vec::new();
    while let Some(packet) = rx.recv().await {
        packets.push(packet);
    }
    packets
}

/// `count` coded payloads of `block`, as a source would send them.
pub fn coded_payloads(factory: &rlnc::EncoderFactory, block: &[u8], count: usize) -> Vec<Vec<u8>> {
    let mut encoder = factory.build();
    encoder.set_const_symbols(block).unwrap();
    (0..count)
        .map(|_| {
            let mut payload = vec![0u8; encoder.payload_size()];
            let written = encoder.write_payload(&mut payload).unwrap();
            payload.truncate(written);
            payload
        })
        .collect()
}

/// Poll `node` until its codec reaches `rank`.
pub async fn wait_for_rank(node: &Node, rank: usize) {
    while node.rank().await < rank {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}
