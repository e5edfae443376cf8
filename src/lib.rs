//! Multipath network coding relay simulator
//!
//! This library simulates random linear network coding over a small
//! multipath topology. Lossy, delayed [`Link`]s connect [`Node`]s that encode
//! (source), recode (relay) or decode (sink) with a pluggable codec; relays
//! can be reset and rewired while a simulation runs.

// Use mimalloc as the global allocator for tests (non-Windows only)
#[cfg(not(windows))]
#[cfg(test)]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod codec;
pub mod config;
pub mod error;
pub mod fanin;
pub mod link;
pub mod node;
pub mod packet;
pub mod reconfigure;
pub mod report;
pub mod signal;
pub mod simulator;
pub mod utils;

// Test helpers module - available when test-internals feature is enabled
#[cfg(any(test, feature = "test-internals"))]
pub mod test_helpers;

#[cfg(test)]
pub mod tests;

// Re-export commonly used items
pub use config::{LinkConfig, NodeConfig, SimConfig};
pub use error::{ConfigError, LinkError, NodeError};
pub use fanin::FanIn;
pub use link::{Link, LinkStats};
pub use node::{Exit, Node, Role};
pub use packet::{NodeId, Packet};
pub use reconfigure::{Reconfiguration, RelayPath};
pub use report::{RunOutcome, SimulationReport};
pub use signal::Signal;
pub use simulator::{DecodeCheck, Simulator};
pub use utils::now_ms;
