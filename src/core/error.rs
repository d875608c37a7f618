//! Error types for the SCR client.

use thiserror::Error;

/// Errors that can occur when decoding a telemetry message.
///
/// All of these are recoverable: the session skips the tick and keeps going.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The datagram carried no bytes.
    #[error("empty message")]
    Empty,

    /// The datagram is not valid ASCII/UTF-8 text.
    #[error("message is not valid text")]
    InvalidUtf8,

    /// A required group is absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A required group is present but its values cannot be used.
    #[error("malformed field: {0}")]
    MalformedField(&'static str),
}

/// Errors a control policy may report instead of a command.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyError {
    /// The policy could not produce a decision.
    #[error("policy failed: {0}")]
    Failed(String),

    /// An input the policy depends on is NaN or infinite.
    #[error("non-finite input: {0}")]
    NonFiniteInput(&'static str),
}

/// Errors raised by a telemetry sink.
///
/// The session logs these and carries on.
#[derive(Debug, Error)]
pub enum SinkError {
    /// I/O error writing the sink's backing store.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization error.
    #[cfg(feature = "csv-sink")]
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Invalid session configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The bot identifier is empty or would corrupt the init message.
    #[error("invalid identifier {0:?}: must be non-empty and contain no whitespace or parentheses")]
    InvalidIdentifier(String),

    /// The server host is empty.
    #[error("server host must not be empty")]
    EmptyHost,

    /// Port 0 cannot address a server.
    #[error("server port must be non-zero")]
    InvalidPort,

    /// A receive timeout of zero would spin the loop.
    #[error("{0} timeout must be non-zero")]
    ZeroTimeout(&'static str),

    /// The receive buffer cannot hold a message.
    #[error("receive buffer of {0} bytes is too small")]
    BufferTooSmall(usize),
}

/// Top-level SCR client errors.
#[derive(Debug, Error)]
pub enum ScrError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session error.
    #[cfg(feature = "session")]
    #[error("session error: {0}")]
    Session(#[from] crate::session::SessionError),

    /// Telemetry sink error.
    #[error("telemetry error: {0}")]
    Sink(#[from] SinkError),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
