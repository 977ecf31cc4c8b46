//! Harness constants and invoker configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::InvokeError;

/// Receive limit stamped into every client request.
pub const CLIENT_RECEIVE_LIMIT: u32 = 1024 * 1024;

/// Receive limit reference servers enforce; padding targets are relative to it.
pub const SERVER_RECEIVE_LIMIT: u32 = 200 * 1024;

/// Stand-in for TLS material until the real certificates are generated.
pub const PLACEHOLDER: &[u8] = b"PLACEHOLDER";

/// Default bound on connection establishment for outbound calls.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Framing of request and result records on the invoker's streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum WireCodec {
    /// One JSON document per line.
    Json,
    /// Four-byte big-endian length followed by a JSON body.
    #[default]
    LengthPrefixed,
}

/// Settings of one invocation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvokerConfig {
    /// Maximum number of calls in flight.
    pub parallelism: usize,
    pub codec: WireCodec,
    pub connect_timeout_ms: u64,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            codec: WireCodec::default(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl InvokerConfig {
    /// Load a configuration from JSON; absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    #[must_use]
    pub fn with_codec(mut self, codec: WireCodec) -> Self {
        self.codec = codec;
        self
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), InvokeError> {
        if self.parallelism == 0 {
            return Err(InvokeError::InvalidConfig(
                "parallelism must be at least 1".to_string(),
            ));
        }
        if self.parallelism > Semaphore::MAX_PERMITS {
            return Err(InvokeError::InvalidConfig(format!(
                "parallelism {} exceeds the limit of {}",
                self.parallelism,
                Semaphore::MAX_PERMITS
            )));
        }
        if self.connect_timeout_ms == 0 {
            return Err(InvokeError::InvalidConfig(
                "connect timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Four calls per available core.
#[must_use]
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map_or(1, NonZeroUsize::get)
        .saturating_mul(4)
}
