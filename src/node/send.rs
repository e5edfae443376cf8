use std::sync::Arc;
use std::sync::atomic::Ordering;

use smallvec::SmallVec;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::{Exit, Node};
use crate::link::Link;
use crate::packet::Packet;
use crate::signal::Signal;

impl Node {
    /// Pace coded payloads onto the outputs until completion or until
    /// `reset`, the reset signal current when the node was started, fires.
    pub(super) async fn send_loop(&self, reset: Arc<Signal>) -> Exit {
        let payload_size = self.core.lock().await.codec.payload_size();
        let period = self.config.pacing_interval(payload_size + 1);
        debug!("{}: sending a payload every {:?}", self.label, period);

        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.completion.wait() => {
                    let outputs = std::mem::take(&mut self.core.lock().await.outputs);
                    for output in &outputs {
                        output.close();
                    }
                    info!("{}: got done signal, closed {} outputs", self.label, outputs.len());
                    return Exit::Completed;
                }
                _ = reset.wait() => {
                    debug!("{}: send loop stopped by reset", self.label);
                    return Exit::Reset;
                }
                _ = ticker.tick() => {
                    self.send_payloads().await;
                }
            }
        }
    }

    /// One pacing tick: a fresh payload for every live output.
    ///
    /// The output list is rebuilt in the same pass: links whose destination
    /// is gone are closed and left out, the rest keep their order.
    pub(super) async fn send_payloads(&self) {
        let batch: SmallVec<[(Arc<Link>, Packet); 4]> = {
            let mut core = self.core.lock().await;
            if core.codec.rank() == 0 {
                return;
            }
            let payload_size = core.codec.payload_size();
            let outputs = std::mem::take(&mut core.outputs);
            let mut batch = SmallVec::new();

            for link in outputs {
                if !link.destination_present() {
                    link.close();
                    debug!("{}: pruned output {}", self.label, link.label());
                    continue;
                }
                let mut payload = vec![0u8; payload_size];
                match core.codec.write_payload(&mut payload) {
                    Ok(written) => {
                        payload.truncate(written);
                        batch.push((link.clone(), Packet::tagged(payload, self.id)));
                    }
                    Err(err) => warn!("{}: could not code payload: {}", self.label, err),
                }
                core.outputs.push(link);
            }
            batch
        };

        for (link, packet) in batch {
            match link.submit(packet).await {
                Ok(()) => {
                    self.transmissions.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => trace!("{}: {} not sent: {}", self.label, link.label(), err),
            }
        }
    }
}
