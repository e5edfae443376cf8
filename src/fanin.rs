//! Fan-in of several link outputs into one node intake.
//!
//! Every attached link gets a merging task that forwards its outbound queue
//! into the shared intake queue. The intake queue closes when the last live
//! input closes. Attaching again after that opens a new intake queue (a new
//! epoch); epochs are handed to the consumer in order, so packets still
//! buffered in an older epoch are never discarded.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Notify, mpsc};
use tracing::debug;

use crate::error::LinkError;
use crate::link::Link;
use crate::packet::Packet;

#[derive(Default)]
struct FanInState {
    sender: Option<mpsc::Sender<Packet>>,
    intakes: VecDeque<mpsc::Receiver<Packet>>,
    live: usize,
    epochs: u64,
}

pub struct FanIn {
    label: String,
    capacity: usize,
    state: Arc<Mutex<FanInState>>,
    ready: Notify,
}

impl FanIn {
    pub fn new(label: impl Into<String>, capacity: usize) -> Self {
        Self {
            label: label.into(),
            capacity,
            state: Arc::new(Mutex::new(FanInState::default())),
            ready: Notify::new(),
        }
    }

    /// Start forwarding `link`'s output into the intake.
    pub fn attach(&self, link: &Link) -> Result<(), LinkError> {
        let mut output = link.take_output().ok_or(LinkError::OutputTaken)?;

        let (forward, opened) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.live += 1;
            match &state.sender {
                Some(tx) => (tx.clone(), false),
                None => {
                    let (tx, rx) = mpsc::channel(self.capacity);
                    state.sender = Some(tx.clone());
                    state.intakes.push_back(rx);
                    state.epochs += 1;
                    (tx, true)
                }
            }
        };
        if opened {
            debug!("{}: intake opened", self.label);
            self.ready.notify_waiters();
        }

        let state = self.state.clone();
        let label = self.label.clone();
        let input = link.label().to_string();
        tokio::spawn(async move {
            while let Some(packet) = output.recv().await {
                // Keep draining even without a consumer so the link can close
                let _ = forward.send(packet).await;
            }
            drop(forward);

            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            state.live -= 1;
            debug!("{}: input {} closed, {} live", label, input, state.live);
            if state.live == 0 {
                state.sender = None;
                debug!("{}: all inputs closed, intake closing", label);
            }
        });
        Ok(())
    }

    /// Wait for the next intake queue. Each queue is handed out once.
    pub async fn next_intake(&self) -> mpsc::Receiver<Packet> {
        loop {
            let notified = self.ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(intake) = self
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .intakes
                .pop_front()
            {
                return intake;
            }
            notified.await;
        }
    }

    /// Inputs whose merging task is still forwarding.
    pub fn live_inputs(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .live
    }

    /// Number of intake queues opened so far.
    pub fn epochs(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .epochs
    }
}
