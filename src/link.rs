//! Lossy, delayed, one-directional channel.
//!
//! A link owns a bounded inbound queue that producers [`Link::submit`] into,
//! and a bounded outbound queue whose receiver is handed to exactly one
//! consumer through [`Link::take_output`]. [`Link::process_packets`] moves
//! packets between the two: each packet is dropped with the configured
//! probability, otherwise delivered after the configured delay by its own
//! timer task. Deliveries are independent, so arrival order is not promised.
//!
//! The outbound queue closes exactly once, after the inbound queue has been
//! closed and every scheduled delivery has finished.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, trace};

use crate::config::LinkConfig;
use crate::error::{ConfigError, LinkError};
use crate::packet::Packet;

/// Point-in-time copy of a link's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    /// Packets that survived the loss draw.
    pub received: u64,
    /// Packets placed on the outbound queue.
    pub delivered: u64,
    /// Packets lost to the loss draw.
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

pub struct Link {
    config: LinkConfig,
    inbound_tx: Mutex<Option<mpsc::Sender<Packet>>>,
    inbound_rx: Mutex<Option<mpsc::Receiver<Packet>>>,
    outbound_tx: Mutex<Option<mpsc::Sender<Packet>>>,
    outbound_rx: Mutex<Option<mpsc::Receiver<Packet>>>,
    counters: Arc<Counters>,
    destination_present: AtomicBool,
}

impl Link {
    /// Link with the given loss probability and delay and default queues.
    pub fn new(loss_prob: f64, delay: Duration) -> Result<Arc<Self>, ConfigError> {
        Self::with_config(LinkConfig::new(loss_prob, delay)?)
    }

    pub fn with_config(config: LinkConfig) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        let (inbound_tx, inbound_rx) = mpsc::channel(config.queue_capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(config.queue_capacity);
        Ok(Arc::new(Self {
            config,
            inbound_tx: Mutex::new(Some(inbound_tx)),
            inbound_rx: Mutex::new(Some(inbound_rx)),
            outbound_tx: Mutex::new(Some(outbound_tx)),
            outbound_rx: Mutex::new(Some(outbound_rx)),
            counters: Arc::new(Counters::default()),
            destination_present: AtomicBool::new(true),
        }))
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Spawn [`Link::process_packets`] on the current runtime.
    pub fn start(self: &Arc<Self>) -> JoinHandle<Result<(), LinkError>> {
        let link = self.clone();
        tokio::spawn(async move { link.process_packets().await })
    }

    /// Queue a packet for transmission, waiting while the inbound queue is full.
    pub async fn submit(&self, packet: Packet) -> Result<(), LinkError> {
        let sender = self
            .inbound_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(LinkError::Closed)?;
        sender.send(packet).await.map_err(|_| LinkError::Closed)
    }

    /// Close the inbound queue. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        let sender = self
            .inbound_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_some() {
            debug!("{}: inbound closed", self.config.label);
        }
        sender.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.inbound_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Hand out the receiving end of the outbound queue (once).
    pub fn take_output(&self) -> Option<mpsc::Receiver<Packet>> {
        self.outbound_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Whether the node at the far end still wants packets from this link.
    pub fn destination_present(&self) -> bool {
        self.destination_present.load(Ordering::Acquire)
    }

    /// Mark the far end as gone; the producer prunes the link on its next pass.
    pub fn detach_destination(&self) {
        self.destination_present.store(false, Ordering::Release);
    }

    pub fn stats(&self) -> LinkStats {
        LinkStats {
            received: self.counters.received.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Move packets from the inbound to the outbound queue until the inbound
    /// queue is closed and drained, then close the outbound queue.
    pub async fn process_packets(&self) -> Result<(), LinkError> {
        let mut inbound = self
            .inbound_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(LinkError::AlreadyStarted)?;
        let outbound = self
            .outbound_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(LinkError::AlreadyStarted)?;

        let label = self.config.label.clone();
        let delay = self.config.delay;
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        // Bounds the number of deliveries waiting out their delay
        let in_flight = Arc::new(Semaphore::new(self.config.queue_capacity));
        let mut deliveries = JoinSet::new();

        while let Some(packet) = inbound.recv().await {
            if rng.random::<f64>() < self.config.loss_prob {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                trace!("{}: packet lost", label);
                continue;
            }
            self.counters.received.fetch_add(1, Ordering::Relaxed);

            let Ok(permit) = in_flight.clone().acquire_owned().await else {
                break;
            };
            let outbound = outbound.clone();
            let counters = self.counters.clone();
            let label = label.clone();
            deliveries.spawn(async move {
                let _permit = permit;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if outbound.send(packet).await.is_ok() {
                    counters.delivered.fetch_add(1, Ordering::Relaxed);
                } else {
                    trace!("{}: output receiver gone; packet discarded", label);
                }
            });

            while deliveries.try_join_next().is_some() {}
        }

        while deliveries.join_next().await.is_some() {}
        drop(outbound);
        debug!("{}: drained, closing output", label);
        Ok(())
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("label", &self.config.label)
            .field("loss_prob", &self.config.loss_prob)
            .field("delay", &self.config.delay)
            .field("stats", &self.stats())
            .finish()
    }
}
