//! SCR client - Transport Layer
//!
//! Datagram plumbing between the session state machine and the race server:
//!
//! - **Transport seam**: the [`Transport`] trait, one datagram in, one out
//! - **UDP sockets**: [`UdpTransport`] over tokio, bound to a single server
//! - **Errors**: [`TransportError`], always fatal to the session
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Session State Machine            │
//! ├─────────────────────────────────────────┤
//! │         Transport Layer                 │  ← This module
//! │   send, bounded receive, peer filter    │
//! ├─────────────────────────────────────────┤
//! │              UDP                        │
//! └─────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::time::Duration;

mod error;
#[cfg(test)]
pub(crate) mod mock;
mod socket;

pub use error::*;
pub use socket::*;

/// Outcome of a bounded receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A datagram from the server.
    Datagram(Vec<u8>),
    /// Nothing arrived before the timeout.
    TimedOut,
}

/// A bidirectional datagram channel to one race server.
///
/// A session owns its transport exclusively and drops it when it terminates.
pub trait Transport: Send {
    /// Send one datagram to the server.
    ///
    /// Any error is treated as fatal by the caller.
    fn send(&mut self, datagram: &[u8]) -> impl Future<Output = TransportResult<()>> + Send;

    /// Wait up to `timeout` for one datagram from the server.
    ///
    /// A timeout is not an error. Implementations absorb transient
    /// conditions themselves (the UDP transport skips stray peers and ICMP
    /// reset/refused reports); any error returned is treated as fatal by the
    /// caller in both the identifying and driving phases.
    fn recv(&mut self, timeout: Duration)
    -> impl Future<Output = TransportResult<Received>> + Send;
}
