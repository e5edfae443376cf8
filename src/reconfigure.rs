//! Relay reset with downtime.
//!
//! The orchestration side of a dynamic topology: after a relay has run for a
//! while it is reset, rewired to fresh links, kept detached from its
//! neighbours for the downtime, then attached and restarted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::codec::{CodecFactory, SymbolDecoder};
use crate::config::LinkConfig;
use crate::link::Link;
use crate::node::Node;

/// A relay between one upstream and one downstream node.
pub struct RelayPath {
    pub upstream: Arc<Node>,
    pub relay: Arc<Node>,
    pub downstream: Arc<Node>,
    /// Config of the upstream -> relay link that replaces the old one.
    pub input: LinkConfig,
    /// Config of the relay -> downstream link that replaces the old one.
    pub output: LinkConfig,
}

/// What one reconfiguration actually took.
#[derive(Clone, Debug)]
pub struct Reconfiguration {
    /// Time from the call until the reset happened.
    pub measured_reset: Duration,
    /// Time from the reset until the relay was running again.
    pub measured_downtime: Duration,
    /// The replacement links (input, output).
    pub links: (Arc<Link>, Arc<Link>),
}

impl RelayPath {
    /// Wait `reset_after`, reset the relay, rewire it with fresh links, wait
    /// `downtime`, then attach the links to its neighbours and restart it.
    ///
    /// Returns `None` without touching anything when `reset_after` is zero or
    /// the relay completes first. A completion during the downtime cuts the
    /// downtime short so the relay can close its new links.
    pub async fn reconfigure<F>(
        &self,
        factory: &F,
        reset_after: Duration,
        downtime: Duration,
    ) -> Result<Option<Reconfiguration>>
    where
        F: CodecFactory,
        F::Codec: SymbolDecoder,
    {
        if reset_after.is_zero() {
            return Ok(None);
        }

        let completion = self.relay.completion();
        let started = Instant::now();
        tokio::select! {
            _ = completion.wait() => {
                debug!("{}: completed before its reset", self.relay.label());
                return Ok(None);
            }
            _ = tokio::time::sleep(reset_after) => {}
        }
        let reset_at = Instant::now();
        let measured_reset = reset_at - started;

        info!("{}: resetting", self.relay.label());
        self.relay.reset(factory).await.context("reset relay")?;

        let input = Link::with_config(self.input.clone()).context("build input link")?;
        input.start();
        let output = Link::with_config(self.output.clone()).context("build output link")?;
        output.start();

        self.relay
            .attach_input(&input)
            .await
            .context("attach relay input")?;
        self.relay
            .attach_output(output.clone())
            .await
            .context("attach relay output")?;

        tokio::select! {
            _ = completion.wait() => {
                debug!("{}: completed during downtime", self.relay.label());
            }
            _ = tokio::time::sleep(downtime) => {}
        }

        self.downstream
            .attach_input(&output)
            .await
            .context("attach downstream input")?;
        self.upstream
            .attach_output(input.clone())
            .await
            .context("attach upstream output")?;
        tokio::spawn(self.relay.clone().run());

        let measured_downtime = reset_at.elapsed();
        info!(
            "{}: back online after {:?}",
            self.relay.label(),
            measured_downtime
        );
        Ok(Some(Reconfiguration {
            measured_reset,
            measured_downtime,
            links: (input, output),
        }))
    }
}
