use std::sync::atomic::Ordering;
use std::sync::{Arc, PoisonError};

use tracing::{debug, info, warn};

use super::{Exit, Node};
use crate::codec::NodeCodec;
use crate::packet::Packet;

impl Node {
    /// Start the relay ingest task unless one is already draining the intake.
    pub(super) fn ensure_ingest(self: &Arc<Self>) {
        if self.ingest_running.swap(true, Ordering::AcqRel) {
            return;
        }
        let node = self.clone();
        tokio::spawn(async move {
            node.ingest_loop().await;
            node.ingest_running.store(false, Ordering::Release);
        });
    }

    /// Relay ingest: feed every arriving payload into the current decoder.
    ///
    /// Survives resets (the decoder is swapped under the same mutex) and
    /// intake epochs. Ends once the completion signal has fired and the
    /// current intake has drained.
    async fn ingest_loop(&self) {
        loop {
            let mut intake = tokio::select! {
                biased;
                _ = self.completion.wait() => break,
                intake = self.fanin.next_intake() => intake,
            };
            while let Some(packet) = intake.recv().await {
                self.absorb(&packet).await;
            }
            debug!("{}: intake drained", self.label);
        }
        debug!("{}: ingest stopped", self.label);
    }

    /// Feed one payload to the decoder. Returns whether decoding is complete.
    async fn absorb(&self, packet: &Packet) -> bool {
        let complete = {
            let mut core = self.core.lock().await;
            let NodeCodec::Decoder(decoder) = &mut core.codec else {
                return false;
            };
            if let Err(err) = decoder.read_payload(packet.payload()) {
                warn!("{}: discarding payload: {}", self.label, err);
            }
            decoder.is_complete()
        };
        self.count_rx(packet.origin());
        complete
    }

    /// Sink: decode until complete, then fire every upstream completion
    /// signal once and keep draining (discarding) until the intake closes.
    pub(super) async fn receive_loop(&self) -> Exit {
        let mut completed = false;
        loop {
            let mut intake = self.fanin.next_intake().await;
            while let Some(packet) = intake.recv().await {
                if completed {
                    continue;
                }
                if self.absorb(&packet).await {
                    completed = true;
                    self.signal_upstream();
                    info!("{}: decoder is complete", self.label);
                }
            }
            if completed {
                debug!("{}: intake exhausted", self.label);
                return Exit::Completed;
            }
            debug!("{}: intake closed before completion, waiting for inputs", self.label);
        }
    }

    fn signal_upstream(&self) {
        let upstream = std::mem::take(
            &mut *self
                .upstream
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for signal in &upstream {
            signal.fire();
        }
        self.completion.fire();
    }
}
