//! Source, relay and sink nodes.
//!
//! A node owns one codec behind a per-node mutex, a list of output links it
//! paces coded payloads onto, and a [`FanIn`] merging its input links.
//!
//! - A **source** encodes from a constant block and sends on every tick.
//! - A **relay** absorbs whatever arrives into a decoder and recodes from it
//!   on its own ticks. It can be [`Node::reset`] while running.
//! - A **sink** decodes until complete, then fires the completion signal of
//!   every producer registered with [`Node::register_upstream`].

mod ingest;
mod reset;
mod send;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rustc_hash::FxHashMap;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::codec::{CodecFactory, NodeCodec, SymbolDecoder, SymbolEncoder};
use crate::config::NodeConfig;
use crate::error::{ConfigError, NodeError};
use crate::fanin::FanIn;
use crate::link::Link;
use crate::packet::NodeId;
use crate::signal::Signal;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Source,
    Relay,
    Sink,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Source => write!(f, "source"),
            Role::Relay => write!(f, "relay"),
            Role::Sink => write!(f, "sink"),
        }
    }
}

/// Why [`Node::run`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    /// The completion signal fired (or, for a sink, decoding finished).
    Completed,
    /// The relay was reset; its outputs were left to the reset.
    Reset,
}

/// State guarded by the node's codec mutex.
pub(crate) struct NodeCore {
    pub(crate) codec: NodeCodec,
    pub(crate) inputs: Vec<Arc<Link>>,
    pub(crate) outputs: Vec<Arc<Link>>,
}

pub struct Node {
    id: NodeId,
    role: Role,
    label: String,
    config: NodeConfig,
    core: AsyncMutex<NodeCore>,
    fanin: FanIn,
    transmissions: AtomicU64,
    rx_counts: Mutex<FxHashMap<NodeId, u64>>,
    completion: Arc<Signal>,
    reset_signal: Mutex<Arc<Signal>>,
    upstream: Mutex<Vec<Arc<Signal>>>,
    ingest_running: AtomicBool,
}

impl Node {
    /// Source node encoding with a codec built by `factory`.
    pub fn source<F>(id: NodeId, factory: &F, config: NodeConfig) -> Result<Arc<Self>, ConfigError>
    where
        F: CodecFactory,
        F::Codec: SymbolEncoder,
    {
        let codec = NodeCodec::Encoder(Box::new(factory.build()));
        Self::new(id, Role::Source, codec, config)
    }

    /// Relay node recoding with a decoder built by `factory`.
    pub fn relay<F>(id: NodeId, factory: &F, config: NodeConfig) -> Result<Arc<Self>, ConfigError>
    where
        F: CodecFactory,
        F::Codec: SymbolDecoder,
    {
        let codec = NodeCodec::Decoder(Box::new(factory.build()));
        Self::new(id, Role::Relay, codec, config)
    }

    /// Sink node decoding with a decoder built by `factory`.
    pub fn sink<F>(id: NodeId, factory: &F, config: NodeConfig) -> Result<Arc<Self>, ConfigError>
    where
        F: CodecFactory,
        F::Codec: SymbolDecoder,
    {
        let codec = NodeCodec::Decoder(Box::new(factory.build()));
        Self::new(id, Role::Sink, codec, config)
    }

    fn new(
        id: NodeId,
        role: Role,
        codec: NodeCodec,
        config: NodeConfig,
    ) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        let label = format!("{role}{id}");
        Ok(Arc::new(Self {
            id,
            role,
            fanin: FanIn::new(label.clone(), config.intake_capacity),
            label,
            config,
            core: AsyncMutex::new(NodeCore {
                codec,
                inputs: Vec::new(),
                outputs: Vec::new(),
            }),
            transmissions: AtomicU64::new(0),
            rx_counts: Mutex::new(FxHashMap::default()),
            completion: Arc::new(Signal::new()),
            reset_signal: Mutex::new(Arc::new(Signal::new())),
            upstream: Mutex::new(Vec::new()),
            ingest_running: AtomicBool::new(false),
        }))
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Signal that stops this node's send loop once fired.
    pub fn completion(&self) -> Arc<Signal> {
        self.completion.clone()
    }

    /// Register a producer's completion signal with a sink. Every registered
    /// signal fires exactly once when decoding completes.
    pub fn register_upstream(&self, signal: Arc<Signal>) -> Result<(), NodeError> {
        self.require(&[Role::Sink], "register_upstream")?;
        self.upstream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(signal);
        Ok(())
    }

    /// Merge `link`'s output into this node's intake.
    pub async fn attach_input(&self, link: &Arc<Link>) -> Result<(), NodeError> {
        self.require(&[Role::Relay, Role::Sink], "attach_input")?;
        let mut core = self.core.lock().await;
        self.fanin.attach(link)?;
        core.inputs.push(link.clone());
        debug!("{}: input {} attached", self.label, link.label());
        Ok(())
    }

    /// Add `link` to the links this node sends on.
    ///
    /// A node whose completion signal has already fired sends nothing more,
    /// so the link is closed straight away instead.
    pub async fn attach_output(&self, link: Arc<Link>) -> Result<(), NodeError> {
        self.require(&[Role::Source, Role::Relay], "attach_output")?;
        let mut core = self.core.lock().await;
        if self.completion.is_fired() {
            link.close();
            debug!("{}: already complete, closed output {}", self.label, link.label());
            return Ok(());
        }
        debug!("{}: output {} attached", self.label, link.label());
        core.outputs.push(link);
        Ok(())
    }

    /// Install the source block. `data` must be exactly one block long.
    pub async fn set_constant_symbols(&self, data: &[u8]) -> Result<(), NodeError> {
        let mut core = self.core.lock().await;
        match &mut core.codec {
            NodeCodec::Encoder(encoder) => Ok(encoder.set_const_symbols(data)?),
            NodeCodec::Decoder(_) => Err(NodeError::WrongRole {
                role: self.role,
                operation: "set_constant_symbols",
            }),
        }
    }

    /// Run the node until it completes or, for a relay, until it is reset.
    ///
    /// Sources and relays run their send loop; a relay also starts its
    /// ingest task if it is not already running. Sinks run their receive
    /// loop. A relay may be run again after a reset.
    ///
    /// The reset signal is taken when `run` is called, not when the returned
    /// future is first polled, so a reset in between still stops this run.
    pub fn run(self: Arc<Self>) -> impl Future<Output = Exit> + Send + 'static {
        let reset = self.current_reset_signal();
        async move {
            match self.role {
                Role::Source => self.send_loop(reset).await,
                Role::Relay => {
                    self.ensure_ingest();
                    self.send_loop(reset).await
                }
                Role::Sink => self.receive_loop().await,
            }
        }
    }

    pub async fn rank(&self) -> usize {
        self.core.lock().await.codec.rank()
    }

    pub async fn is_complete(&self) -> bool {
        self.core.lock().await.codec.is_complete()
    }

    pub async fn block_size(&self) -> usize {
        self.core.lock().await.codec.block_size()
    }

    /// Copy of the node's data buffer (source block, or decoded block).
    pub async fn data(&self) -> Vec<u8> {
        self.core.lock().await.codec.block().to_vec()
    }

    pub async fn input_count(&self) -> usize {
        self.core.lock().await.inputs.len()
    }

    pub async fn output_count(&self) -> usize {
        self.core.lock().await.outputs.len()
    }

    /// Payloads successfully submitted to output links.
    pub fn transmissions(&self) -> u64 {
        self.transmissions.load(Ordering::Relaxed)
    }

    /// Payloads absorbed so far, keyed by origin tag.
    pub fn rx_counts(&self) -> FxHashMap<NodeId, u64> {
        self.rx_counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn fanin(&self) -> &FanIn {
        &self.fanin
    }

    fn require(&self, roles: &[Role], operation: &'static str) -> Result<(), NodeError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(NodeError::WrongRole {
                role: self.role,
                operation,
            })
        }
    }

    fn count_rx(&self, origin: NodeId) {
        *self
            .rx_counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(origin)
            .or_insert(0) += 1;
    }

    fn current_reset_signal(&self) -> Arc<Signal> {
        self.reset_signal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("label", &self.label)
            .field("rate", &self.config.rate)
            .field("transmissions", &self.transmissions())
            .finish()
    }
}
