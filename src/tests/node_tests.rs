#![cfg(test)]

use std::sync::Arc;

use tokio::time::{Duration, timeout};

use crate::codec::CodecError;
use crate::error::NodeError;
use crate::node::{Exit, Node, Role};
use crate::packet::Packet;
use crate::signal::Signal;
use crate::test_helpers::{
    coded_payloads, fast_node_config, lossless_link, random_block, sink, started_link,
    test_factories,
};

#[tokio::test(start_paused = true)]
async fn test_sink_fires_completion_exactly_once() {
    let (encoders, decoders) = test_factories(4, 16);
    let block = random_block(64, 1);
    let sink = sink(&decoders, fast_node_config());
    let producers: Vec<Arc<Signal>> = (0..3).map(|_| Arc::new(Signal::new())).collect();
    for signal in &producers {
        sink.register_upstream(signal.clone()).unwrap();
    }

    let link = lossless_link("burst");
    sink.attach_input(&link).await.unwrap();
    // Far more payloads than needed, so most arrive after completion
    for payload in coded_payloads(&encoders, &block, 40) {
        link.submit(Packet::tagged(payload, 0)).await.unwrap();
    }
    link.close();

    let exit = timeout(Duration::from_secs(5), sink.clone().run())
        .await
        .unwrap();
    assert_eq!(exit, Exit::Completed);
    assert!(producers.iter().all(|s| s.is_fired()));
    assert!(sink.completion().is_fired());
    assert!(sink.is_complete().await);
    assert_eq!(sink.data().await, block);

    let absorbed = sink.rx_counts()[&0];
    assert!((4..40).contains(&absorbed), "absorbed {absorbed}");
}

#[tokio::test(start_paused = true)]
async fn test_sink_waits_for_new_inputs_before_completion() {
    let (encoders, decoders) = test_factories(4, 8);
    let block = random_block(32, 2);
    let payloads = coded_payloads(&encoders, &block, 12);
    let sink = sink(&decoders, fast_node_config());

    let first = lossless_link("before-downtime");
    sink.attach_input(&first).await.unwrap();
    first.submit(Packet::tagged(payloads[0].clone(), 1)).await.unwrap();
    first.close();

    let running = tokio::spawn(sink.clone().run());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!running.is_finished(), "sink must survive a closed intake");

    let second = lossless_link("after-downtime");
    sink.attach_input(&second).await.unwrap();
    for payload in &payloads[1..] {
        second.submit(Packet::tagged(payload.clone(), 1)).await.unwrap();
    }
    second.close();

    let exit = timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit, Exit::Completed);
    assert_eq!(sink.data().await, block);
    assert_eq!(sink.fanin().epochs(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_source_without_block_sends_nothing() {
    let (encoders, _) = test_factories(4, 8);
    let source = Node::source(0xFF, &encoders, fast_node_config()).unwrap();
    let output = lossless_link("idle");
    source.attach_output(output.clone()).await.unwrap();

    let running = tokio::spawn(source.clone().run());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(source.transmissions(), 0);

    source.completion().fire();
    let exit = timeout(Duration::from_secs(1), running)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit, Exit::Completed);
    assert!(output.is_closed());
    assert_eq!(source.output_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_source_paces_payloads() {
    let (encoders, _) = test_factories(4, 95);
    let source = Node::source(
        0xFF,
        &encoders,
        crate::config::NodeConfig::new(1000).unwrap(),
    )
    .unwrap();
    source
        .set_constant_symbols(&random_block(380, 3))
        .await
        .unwrap();
    let output = lossless_link("paced");
    let mut received = output.take_output().unwrap();
    source.attach_output(output).await.unwrap();

    // 4 + 95 + 1 tagged bytes at 1000 B/s: one payload every 100ms
    let running = tokio::spawn(source.clone().run());
    tokio::time::sleep(Duration::from_millis(1050)).await;
    source.completion().fire();
    running.await.unwrap();

    assert_eq!(source.transmissions(), 10);
    let packet = received.recv().await.unwrap();
    assert_eq!(packet.origin(), 0xFF);
    assert_eq!(packet.payload().len(), 99);
}

#[tokio::test(start_paused = true)]
async fn test_pruned_output_is_closed() {
    let (encoders, _) = test_factories(2, 8);
    let source = Node::source(0xFF, &encoders, fast_node_config()).unwrap();
    source
        .set_constant_symbols(&random_block(16, 4))
        .await
        .unwrap();
    let kept = lossless_link("kept");
    let gone = lossless_link("gone");
    source.attach_output(kept.clone()).await.unwrap();
    source.attach_output(gone.clone()).await.unwrap();
    gone.detach_destination();

    let running = tokio::spawn(source.clone().run());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(gone.is_closed());
    assert!(!kept.is_closed());
    assert_eq!(source.output_count().await, 1);

    source.completion().fire();
    running.await.unwrap();
    assert!(kept.is_closed());
}

#[tokio::test]
async fn test_attach_output_after_completion_closes_link() {
    let (encoders, _) = test_factories(2, 8);
    let source = Node::source(0xFF, &encoders, fast_node_config()).unwrap();
    source.completion().fire();

    let late = lossless_link("late");
    source.attach_output(late.clone()).await.unwrap();
    assert!(late.is_closed());
    assert_eq!(source.output_count().await, 0);
}

#[tokio::test]
async fn test_role_checks() {
    let (encoders, decoders) = test_factories(2, 8);
    let source = Node::source(0xFF, &encoders, fast_node_config()).unwrap();
    let relay = Node::relay(0, &decoders, fast_node_config()).unwrap();
    let sink = sink(&decoders, fast_node_config());

    assert!(matches!(
        source.attach_input(&lossless_link("a")).await,
        Err(NodeError::WrongRole {
            role: Role::Source,
            ..
        })
    ));
    assert!(matches!(
        sink.attach_output(lossless_link("b")).await,
        Err(NodeError::WrongRole { role: Role::Sink, .. })
    ));
    assert!(matches!(
        relay.register_upstream(Arc::new(Signal::new())),
        Err(NodeError::WrongRole {
            role: Role::Relay,
            ..
        })
    ));
    assert!(matches!(
        source.reset(&decoders).await,
        Err(NodeError::WrongRole {
            operation: "reset",
            ..
        })
    ));
    assert!(matches!(
        sink.set_constant_symbols(&[0; 16]).await,
        Err(NodeError::WrongRole { .. })
    ));
}

#[tokio::test]
async fn test_constant_symbols_must_fill_block() {
    let (encoders, _) = test_factories(2, 8);
    let source = Node::source(0xFF, &encoders, fast_node_config()).unwrap();
    assert!(matches!(
        source.set_constant_symbols(&[1; 15]).await,
        Err(NodeError::Codec(CodecError::BlockSize {
            expected: 16,
            actual: 15
        }))
    ));
    assert_eq!(source.rank().await, 0);
    source.set_constant_symbols(&[1; 16]).await.unwrap();
    assert_eq!(source.rank().await, 2);
}

#[test]
fn test_labels() {
    let (encoders, decoders) = test_factories(2, 8);
    let relay = Node::relay(2, &decoders, fast_node_config()).unwrap();
    assert_eq!(relay.label(), "relay2");
    assert_eq!(relay.role(), Role::Relay);
    let source = Node::source(0xFF, &encoders, fast_node_config()).unwrap();
    assert_eq!(source.label(), "source255");
    assert!(Node::source(0, &encoders, crate::config::NodeConfig {
        rate: 0,
        intake_capacity: 1,
    })
    .is_err());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_producers_complete_sink_once() {
    let (encoders, decoders) = test_factories(6, 16);
    let block = random_block(96, 8);
    let sink = sink(&decoders, fast_node_config());
    let producers: Vec<Arc<Signal>> = (0..3).map(|_| Arc::new(Signal::new())).collect();
    for signal in &producers {
        sink.register_upstream(signal.clone()).unwrap();
    }

    let links: Vec<_> = (0..3)
        .map(|i| started_link(&format!("path{i}"), 0.0, Duration::from_millis(1), i))
        .collect();
    for link in &links {
        sink.attach_input(link).await.unwrap();
    }
    let receiver = tokio::spawn(sink.clone().run());

    // Each producer sends bursts of five until its payloads run out, so
    // bursts keep arriving long after the sink has completed
    let feeders: Vec<_> = links
        .iter()
        .enumerate()
        .map(|(origin, link)| {
            let link = link.clone();
            let payloads = coded_payloads(&encoders, &block, 30);
            tokio::spawn(async move {
                for burst in payloads.chunks(5) {
                    for payload in burst {
                        link.submit(Packet::tagged(payload.clone(), origin as u8))
                            .await
                            .unwrap();
                    }
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
                link.close();
            })
        })
        .collect();

    let exit = timeout(Duration::from_secs(5), receiver)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit, Exit::Completed);
    for feeder in feeders {
        feeder.await.unwrap();
    }

    // A second fire would have panicked inside the sink task
    assert!(producers.iter().all(|s| s.is_fired()));
    assert!(sink.completion().is_fired());
    assert_eq!(sink.data().await, block);
    assert_eq!(sink.fanin().live_inputs(), 0);
    assert_eq!(sink.fanin().epochs(), 1);
    assert!(links.iter().all(|link| link.is_closed()));

    let absorbed: u64 = sink.rx_counts().values().sum();
    assert!((6..90).contains(&absorbed), "absorbed {absorbed}");
}
