//! Session error types.

use thiserror::Error;

use super::TerminationReason;
use crate::core::ConfigError;
use crate::transport::TransportError;

/// Fatal session errors.
///
/// Recoverable per-tick problems (decode, policy and sink errors, receive
/// timeouts while driving) never surface here; they are logged and counted.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Identification retries were exhausted.
    #[error("no identification acknowledgment after {attempts} attempts")]
    ConnectionFailed {
        /// Init messages sent.
        attempts: u32,
    },

    /// The transport failed; it is not retried.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The session has already run.
    #[error("session already terminated")]
    Closed,
}

impl SessionError {
    /// Termination reason reported for this error.
    pub fn reason(&self) -> TerminationReason {
        TerminationReason::ConnectionFailed
    }
}
