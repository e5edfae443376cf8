//! Simulation configuration.
//!
//! Link and node parameters are explicit values handed to each constructor;
//! nothing here is process-global. `SimConfig` collects the parameters of a
//! whole diamond-topology run and is what the CLI builds.

use std::path::PathBuf;
use std::time::Duration;

use rlnc::Field;
use tracing::warn;

use crate::error::ConfigError;

/// Default capacity of every bounded queue (link inbound/outbound, node intake).
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Default send rate in bytes per second.
pub const DEFAULT_RATE: u64 = 5000;

/// Links in the diamond topology: source -> relay i -> sink for three relays.
pub const LINK_COUNT: usize = 6;

/// Relays in the diamond topology.
pub const RELAY_COUNT: usize = 3;

/// Parameters of one [`crate::Link`].
#[derive(Clone, Debug)]
pub struct LinkConfig {
    /// Used as the prefix of every log line the link emits.
    pub label: String,
    pub loss_prob: f64,
    pub delay: Duration,
    pub queue_capacity: usize,
    /// Fixed RNG seed for a reproducible loss pattern.
    pub seed: Option<u64>,
}

impl LinkConfig {
    pub fn new(loss_prob: f64, delay: Duration) -> Result<Self, ConfigError> {
        let config = Self {
            label: "link".to_string(),
            loss_prob,
            delay,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            seed: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.loss_prob) {
            return Err(ConfigError::InvalidLossProbability(self.loss_prob));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        Ok(())
    }
}

/// Parameters of one [`crate::Node`].
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Send pacing in bytes per second.
    pub rate: u64,
    /// Capacity of the merged intake queue.
    pub intake_capacity: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            intake_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl NodeConfig {
    pub fn new(rate: u64) -> Result<Self, ConfigError> {
        let config = Self {
            rate,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate == 0 {
            return Err(ConfigError::ZeroRate);
        }
        if self.intake_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        Ok(())
    }

    /// Time between two payloads of `payload_size` bytes at this rate.
    ///
    /// Never zero, so it can drive a tokio interval.
    pub fn pacing_interval(&self, payload_size: usize) -> Duration {
        let secs = payload_size as f64 / self.rate.max(1) as f64;
        Duration::from_secs_f64(secs).max(Duration::from_micros(1))
    }
}

/// Everything one diamond-topology simulation needs.
#[derive(Clone, Debug)]
pub struct SimConfig {
    pub field: Field,
    pub symbols: usize,
    pub symbol_size: usize,
    pub rate: u64,
    /// Loss probability of each of the [`LINK_COUNT`] links.
    pub losses: Vec<f64>,
    /// Propagation delay of each of the [`LINK_COUNT`] links.
    pub delays: Vec<Duration>,
    /// Time before each relay is reset; zero disables the reset.
    pub resets: Vec<Duration>,
    /// How long each relay stays detached after its reset.
    pub downtimes: Vec<Duration>,
    pub runs: usize,
    pub queue_capacity: usize,
    pub seed: Option<u64>,
    /// Directory the JSON report is written to; `None` skips writing.
    pub output_dir: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            field: Field::Binary8,
            symbols: 40,
            symbol_size: 1000,
            rate: DEFAULT_RATE,
            losses: vec![0.0; LINK_COUNT],
            delays: vec![Duration::ZERO; LINK_COUNT],
            resets: vec![Duration::ZERO; RELAY_COUNT],
            downtimes: vec![Duration::ZERO; RELAY_COUNT],
            runs: 1,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            seed: None,
            output_dir: None,
        }
    }
}

impl SimConfig {
    /// Replace every per-link and per-relay list of the wrong length by
    /// zeros, warning about each, then validate the remaining values.
    pub fn normalize(&mut self) -> Result<(), ConfigError> {
        fix_len(&mut self.losses, LINK_COUNT, "losses", 0.0);
        fix_len(&mut self.delays, LINK_COUNT, "delays", Duration::ZERO);
        fix_len(&mut self.resets, RELAY_COUNT, "resets", Duration::ZERO);
        fix_len(&mut self.downtimes, RELAY_COUNT, "downtimes", Duration::ZERO);

        if let Some(&bad) = self.losses.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(ConfigError::InvalidLossProbability(bad));
        }
        if self.rate == 0 {
            return Err(ConfigError::ZeroRate);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        Ok(())
    }

    /// Config of link `idx`, labelled `link{idx}`.
    pub fn link_config(&self, idx: usize) -> Result<LinkConfig, ConfigError> {
        let mut config = LinkConfig::new(self.losses[idx], self.delays[idx])?
            .with_label(format!("link{idx}"))
            .with_queue_capacity(self.queue_capacity);
        if let Some(seed) = self.seed {
            config = config.with_seed(seed.wrapping_add(idx as u64));
        }
        config.validate()?;
        Ok(config)
    }

    pub fn node_config(&self) -> NodeConfig {
        NodeConfig {
            rate: self.rate,
            intake_capacity: self.queue_capacity,
        }
    }
}

fn fix_len<T: Clone>(values: &mut Vec<T>, len: usize, name: &str, default: T) {
    if values.len() != len {
        warn!(
            "flag {}: expected {} values, got {}; defaulting all to zero",
            name,
            len,
            values.len()
        );
        *values = vec![default; len];
    }
}

/// Parse a duration such as `50ms`, `2s`, `1m30s`, `1h` or a bare `0`.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(s).map_err(|_| ConfigError::InvalidDuration(s.to_string()))
}
