//! Session phases, termination reasons and counters.

use std::fmt;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Created, nothing sent yet.
    Disconnected,
    /// Sending init messages and waiting for the acknowledgment.
    Identifying,
    /// Exchanging telemetry and commands.
    Driving,
    /// Finished; the transport has been released.
    Terminated(TerminationReason),
}

impl SessionPhase {
    /// Check if the session has finished.
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}

/// Why a session ended.
///
/// Reaching the step limit is not a reason: after the limit the session asks
/// the server to restart and keeps running until the server answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationReason {
    /// The server sent the shutdown marker.
    ServerShutdown,
    /// The server sent the restart marker; a new episode may follow.
    ServerRestart,
    /// The caller cancelled the session.
    Cancelled,
    /// Identification never succeeded, or the transport failed.
    ConnectionFailed,
}

impl TerminationReason {
    /// Check if the server ended the session on its own terms.
    pub fn is_graceful(&self) -> bool {
        matches!(self, Self::ServerShutdown | Self::ServerRestart)
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ServerShutdown => "server shutdown",
            Self::ServerRestart => "server restart",
            Self::Cancelled => "cancelled",
            Self::ConnectionFailed => "connection failed",
        };
        f.write_str(name)
    }
}

/// Counters kept by a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Init messages sent.
    pub init_sent: u64,
    /// Telemetry messages decoded.
    pub ticks: u64,
    /// Control commands sent.
    pub commands_sent: u64,
    /// Step-limit meta commands sent.
    pub restart_requests: u64,
    /// Receives that timed out, in either phase.
    pub timeouts: u64,
    /// Datagrams that failed to decode.
    pub decode_errors: u64,
    /// Ticks on which the policy failed.
    pub policy_errors: u64,
    /// Ticks on which the telemetry sink failed.
    pub sink_errors: u64,
}

impl SessionStats {
    /// Add another session's counters to these.
    pub fn merge(&mut self, other: &SessionStats) {
        self.init_sent += other.init_sent;
        self.ticks += other.ticks;
        self.commands_sent += other.commands_sent;
        self.restart_requests += other.restart_requests;
        self.timeouts += other.timeouts;
        self.decode_errors += other.decode_errors;
        self.policy_errors += other.policy_errors;
        self.sink_errors += other.sink_errors;
    }
}
