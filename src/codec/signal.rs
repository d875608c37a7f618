//! Server control signals embedded in datagrams.

use crate::core::constants::{IDENTIFIED_MARKER, RESTART_MARKER, SHUTDOWN_MARKER};

/// Out-of-band signal carried by a server datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerSignal {
    /// The race is over; the client should disconnect.
    Shutdown,
    /// The episode was restarted; the client should re-identify.
    Restart,
    /// The init message was accepted.
    Identified,
}

impl ServerSignal {
    /// Find the signal in a datagram, if any.
    ///
    /// Precedence is shutdown, then restart, then identified.
    pub fn detect(datagram: &[u8]) -> Option<Self> {
        if contains(datagram, SHUTDOWN_MARKER) {
            Some(Self::Shutdown)
        } else if contains(datagram, RESTART_MARKER) {
            Some(Self::Restart)
        } else if contains(datagram, IDENTIFIED_MARKER) {
            Some(Self::Identified)
        } else {
            None
        }
    }
}

fn contains(haystack: &[u8], marker: &str) -> bool {
    let needle = marker.as_bytes();
    haystack.len() >= needle.len() && haystack.windows(needle.len()).any(|w| w == needle)
}
