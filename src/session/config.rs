//! Session configuration.

use std::time::Duration;

use crate::codec::rangefinder_angles;
use crate::core::ConfigError;
use crate::core::constants::{
    DEFAULT_DRIVE_TIMEOUT, DEFAULT_HOST, DEFAULT_IDENTIFIER, DEFAULT_IDENTIFY_TIMEOUT,
    DEFAULT_PORT, DEFAULT_RECV_BUFFER_SIZE, MIN_RECV_BUFFER_SIZE, RANGEFINDER_COUNT,
};

/// Settings for one session, fixed once the session starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Race server host name or address.
    pub host: String,

    /// Race server UDP port.
    pub port: u16,

    /// Bot identifier placed in front of the init group.
    pub identifier: String,

    /// Decoded tick on which the meta restart command is sent once
    /// instead of asking the policy. `None` means unlimited.
    pub max_steps: Option<u64>,

    /// Receive timeout while waiting for the identification acknowledgment.
    pub identify_timeout: Duration,

    /// Receive timeout while driving.
    pub drive_timeout: Duration,

    /// Re-sends of the init message allowed after the first one.
    /// `None` retries forever.
    pub max_identify_retries: Option<u32>,

    /// Rangefinder angles announced in the init message, in degrees.
    pub rangefinder_angles: [f64; RANGEFINDER_COUNT],

    /// Receive buffer size in bytes.
    pub recv_buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            identifier: DEFAULT_IDENTIFIER.to_string(),
            max_steps: None,
            identify_timeout: DEFAULT_IDENTIFY_TIMEOUT,
            drive_timeout: DEFAULT_DRIVE_TIMEOUT,
            max_identify_retries: None,
            rangefinder_angles: rangefinder_angles(),
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
        }
    }
}

impl SessionConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Check that the configuration can drive a session.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.identifier.is_empty()
            || self
                .identifier
                .chars()
                .any(|c| c.is_whitespace() || c == '(' || c == ')')
        {
            return Err(ConfigError::InvalidIdentifier(self.identifier.clone()));
        }
        if self.identify_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("identify"));
        }
        if self.drive_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("drive"));
        }
        if self.recv_buffer_size < MIN_RECV_BUFFER_SIZE {
            return Err(ConfigError::BufferTooSmall(self.recv_buffer_size));
        }
        Ok(())
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug, Clone, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the bot identifier.
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.config.identifier = identifier.into();
        self
    }

    /// Set the step limit; `0` means unlimited.
    pub fn max_steps(mut self, steps: u64) -> Self {
        self.config.max_steps = (steps > 0).then_some(steps);
        self
    }

    /// Set the identification receive timeout.
    pub fn identify_timeout(mut self, timeout: Duration) -> Self {
        self.config.identify_timeout = timeout;
        self
    }

    /// Set the driving receive timeout.
    pub fn drive_timeout(mut self, timeout: Duration) -> Self {
        self.config.drive_timeout = timeout;
        self
    }

    /// Bound the number of init re-sends.
    pub fn max_identify_retries(mut self, retries: u32) -> Self {
        self.config.max_identify_retries = Some(retries);
        self
    }

    /// Retry identification forever.
    pub fn unbounded_identify_retries(mut self) -> Self {
        self.config.max_identify_retries = None;
        self
    }

    /// Announce a custom rangefinder layout.
    pub fn rangefinder_angles(mut self, angles: [f64; RANGEFINDER_COUNT]) -> Self {
        self.config.rangefinder_angles = angles;
        self
    }

    /// Set the receive buffer size.
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.config.recv_buffer_size = size;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<SessionConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
