//! Transport layer error types.
//!
//! Every error here is fatal to the session that sees it: a socket that
//! failed once is not retried.

use std::io;

use thiserror::Error;

/// Transport layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error (socket operations).
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The server host name could not be resolved.
    #[error("cannot resolve {host}:{port}: {source}")]
    Resolve {
        /// Host that was looked up.
        host: String,
        /// Port that was looked up.
        port: u16,
        /// Resolver error.
        source: io::Error,
    },

    /// The server host resolved to no address.
    #[error("{host} resolved to no address")]
    NoAddress {
        /// Host that was looked up.
        host: String,
    },
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
