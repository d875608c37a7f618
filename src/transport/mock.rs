//! Scripted in-memory transport for state machine tests.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Received, Transport, TransportError, TransportResult};
use crate::core::constants::SHUTDOWN_MARKER;

/// One scripted receive outcome.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Deliver this datagram.
    Reply(Vec<u8>),
    /// Report a timeout immediately.
    Timeout,
    /// Sleep for the full receive timeout, then report a timeout.
    Stall,
    /// Fail the receive with an I/O error.
    Fail,
}

impl Step {
    pub(crate) fn reply(data: impl AsRef<[u8]>) -> Self {
        Self::Reply(data.as_ref().to_vec())
    }
}

/// Datagrams sent through a [`ScriptedTransport`], shared with the test.
pub(crate) type SentLog = Arc<Mutex<Vec<Vec<u8>>>>;

/// Transport that replays a fixed script and records what was sent.
///
/// Once the script runs out every receive returns the shutdown marker, so a
/// session under test always terminates.
#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    script: VecDeque<Step>,
    sent: SentLog,
    fail_send_at: Option<usize>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: script.into_iter().collect(),
            sent: SentLog::default(),
            fail_send_at: None,
        }
    }

    /// Fail the `n`th send (zero based) and every send after it.
    pub(crate) fn fail_send_at(mut self, n: usize) -> Self {
        self.fail_send_at = Some(n);
        self
    }

    /// Handle on the sent datagrams that outlives the transport.
    pub(crate) fn sent_log(&self) -> SentLog {
        Arc::clone(&self.sent)
    }
}

impl Transport for ScriptedTransport {
    async fn send(&mut self, datagram: &[u8]) -> TransportResult<()> {
        let mut sent = self.sent.lock().unwrap();
        if self.fail_send_at.is_some_and(|n| sent.len() >= n) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted send failure").into());
        }
        sent.push(datagram.to_vec());
        Ok(())
    }

    async fn recv(&mut self, timeout: Duration) -> TransportResult<Received> {
        match self.script.pop_front() {
            Some(Step::Reply(data)) => Ok(Received::Datagram(data)),
            Some(Step::Timeout) => Ok(Received::TimedOut),
            Some(Step::Stall) => {
                tokio::time::sleep(timeout).await;
                Ok(Received::TimedOut)
            }
            Some(Step::Fail) => Err(TransportError::Io(io::Error::other(
                "scripted receive failure",
            ))),
            None => Ok(Received::Datagram(SHUTDOWN_MARKER.as_bytes().to_vec())),
        }
    }
}

/// Copy of everything sent so far, as strings.
pub(crate) fn sent_strings(log: &SentLog) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .map(|d| String::from_utf8_lossy(d).into_owned())
        .collect()
}
