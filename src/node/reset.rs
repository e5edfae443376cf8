use std::sync::{Arc, PoisonError};

use tracing::info;

use super::{Node, Role};
use crate::codec::{CodecFactory, NodeCodec, SymbolDecoder};
use crate::error::NodeError;
use crate::signal::Signal;

impl Node {
    /// Reset a relay: stop its send loop, detach every link and replace its
    /// decoder with a fresh one from `factory`.
    ///
    /// Inputs are only marked as having no destination; their producers
    /// close and prune them on their next tick. Outputs are closed here.
    /// Packets already merged into the intake are fed to the new decoder.
    ///
    /// Afterwards the caller attaches new links and calls [`Node::run`]
    /// again. Waits for the codec mutex, so it must not be called while
    /// that mutex is held by the caller.
    pub async fn reset<F>(&self, factory: &F) -> Result<(), NodeError>
    where
        F: CodecFactory,
        F::Codec: SymbolDecoder,
    {
        self.require(&[Role::Relay], "reset")?;
        let mut core = self.core.lock().await;

        let fired = std::mem::replace(
            &mut *self
                .reset_signal
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
            Arc::new(Signal::new()),
        );
        fired.fire();

        for input in core.inputs.drain(..) {
            input.detach_destination();
        }
        let outputs = std::mem::take(&mut core.outputs);
        for output in &outputs {
            output.close();
        }

        let retired = std::mem::replace(
            &mut core.codec,
            NodeCodec::Decoder(Box::new(factory.build())),
        );
        drop(retired);

        info!(
            "{}: reset, closed {} outputs, fresh decoder installed",
            self.label,
            outputs.len()
        );
        Ok(())
    }
}
