//! The per-episode session state machine.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{SessionConfig, SessionError, SessionPhase, SessionStats, TerminationReason};
use crate::codec::{SensorSnapshot, ServerSignal, encode_init, encode_restart_request};
use crate::core::{Policy, TelemetrySink};
use crate::transport::{Received, Transport, UdpTransport, UdpTransportBuilder};

/// One identify-and-drive episode against a race server.
///
/// The session owns its transport and step counter exclusively. It moves
/// `Disconnected → Identifying → Driving → Terminated` and runs exactly once.
///
/// # Example
///
/// ```ignore
/// use scr_client::prelude::*;
///
/// let config = SessionConfig::builder().port(3001).build()?;
/// let mut session = Session::connect(config).await?;
/// let mut policy = HeuristicPolicy::default();
/// let reason = session.run(&mut policy, None).await?;
/// ```
#[derive(Debug)]
pub struct Session<T: Transport> {
    config: SessionConfig,
    /// Dropped on termination.
    transport: Option<T>,
    phase: SessionPhase,
    steps: u64,
    stats: SessionStats,
    cancel: CancellationToken,
}

impl Session<UdpTransport> {
    /// Validate the configuration, resolve the server and bind a UDP socket.
    pub async fn connect(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let transport = UdpTransportBuilder::new()
            .recv_buffer_size(config.recv_buffer_size)
            .connect(&config.host, config.port)
            .await?;
        debug!(server = %transport.server_addr(), id = %config.identifier, "session ready");
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> Session<T> {
    /// Create a session over an existing transport.
    pub fn with_transport(config: SessionConfig, transport: T) -> Self {
        Self {
            config,
            transport: Some(transport),
            phase: SessionPhase::Disconnected,
            steps: 0,
            stats: SessionStats::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the session when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Get the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Telemetry messages decoded so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Get the session counters.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Get the configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get the transport, unless the session has terminated.
    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    /// Identify with the server, then drive until the session terminates.
    ///
    /// Returns the termination reason for graceful endings and cancellation.
    /// Fatal conditions return an error whose [`SessionError::reason`] is
    /// `ConnectionFailed`. Either way the transport is released and the
    /// phase becomes `Terminated`.
    pub async fn run<P>(
        &mut self,
        policy: &mut P,
        mut sink: Option<&mut dyn TelemetrySink>,
    ) -> Result<TerminationReason, SessionError>
    where
        P: Policy + ?Sized,
    {
        if self.phase != SessionPhase::Disconnected {
            return Err(SessionError::Closed);
        }

        let result = self.drive(policy, &mut sink).await;
        let reason = match &result {
            Ok(reason) => *reason,
            Err(err) => {
                warn!(%err, "session failed");
                err.reason()
            }
        };
        self.terminate(reason);
        result
    }

    async fn drive<P>(
        &mut self,
        policy: &mut P,
        sink: &mut Option<&mut dyn TelemetrySink>,
    ) -> Result<TerminationReason, SessionError>
    where
        P: Policy + ?Sized,
    {
        self.phase = SessionPhase::Identifying;
        if let Some(reason) = self.identify().await? {
            return Ok(reason);
        }

        loop {
            let Some(received) = self.receive(self.config.drive_timeout).await? else {
                return Ok(TerminationReason::Cancelled);
            };
            match received {
                Received::TimedOut => {
                    self.stats.timeouts += 1;
                    debug!(step = self.steps, "no telemetry within timeout");
                }
                Received::Datagram(data) => {
                    if let Some(reason) = self.tick(&data, policy, sink).await? {
                        return Ok(reason);
                    }
                }
            }
        }
    }

    /// Send init until acknowledged. `Some` means the session ended early.
    async fn identify(&mut self) -> Result<Option<TerminationReason>, SessionError> {
        let init = encode_init(&self.config.identifier, &self.config.rangefinder_angles);
        let mut attempts: u32 = 0;

        loop {
            if let Some(max_retries) = self.config.max_identify_retries {
                if attempts > max_retries {
                    return Err(SessionError::ConnectionFailed { attempts });
                }
            }

            self.send(&init).await?;
            attempts += 1;
            self.stats.init_sent += 1;
            trace!(attempt = attempts, "init sent");

            let Some(received) = self.receive(self.config.identify_timeout).await? else {
                return Ok(Some(TerminationReason::Cancelled));
            };
            match received {
                Received::TimedOut => {
                    self.stats.timeouts += 1;
                    debug!(attempt = attempts, "no acknowledgment, sending init again");
                }
                Received::Datagram(data) => match ServerSignal::detect(&data) {
                    Some(ServerSignal::Identified) => {
                        info!(attempts, id = %self.config.identifier, "identified by server");
                        self.phase = SessionPhase::Driving;
                        return Ok(None);
                    }
                    Some(ServerSignal::Shutdown) => {
                        return Ok(Some(TerminationReason::ServerShutdown));
                    }
                    Some(ServerSignal::Restart) | None => {
                        debug!(
                            attempt = attempts,
                            len = data.len(),
                            "unexpected reply while identifying, sending init again"
                        );
                    }
                },
            }
        }
    }

    /// Handle one datagram while driving. `Some` means the session ended.
    async fn tick<P>(
        &mut self,
        data: &[u8],
        policy: &mut P,
        sink: &mut Option<&mut dyn TelemetrySink>,
    ) -> Result<Option<TerminationReason>, SessionError>
    where
        P: Policy + ?Sized,
    {
        match ServerSignal::detect(data) {
            Some(ServerSignal::Shutdown) => return Ok(Some(TerminationReason::ServerShutdown)),
            Some(ServerSignal::Restart) => return Ok(Some(TerminationReason::ServerRestart)),
            Some(ServerSignal::Identified) => {
                debug!("ignoring repeated acknowledgment");
                return Ok(None);
            }
            None => {}
        }

        let snapshot = match SensorSnapshot::decode(data) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.stats.decode_errors += 1;
                warn!(%err, len = data.len(), "skipping undecodable telemetry");
                return Ok(None);
            }
        };
        self.steps += 1;
        self.stats.ticks += 1;

        let command = if self.config.max_steps.is_some_and(|max| self.steps == max) {
            debug!(step = self.steps, "step limit reached, asking server to restart");
            self.send(&encode_restart_request()).await?;
            self.stats.restart_requests += 1;
            None
        } else {
            match policy.decide(&snapshot) {
                Ok(command) => {
                    let command = command.clamped();
                    self.send(&command.encode()).await?;
                    self.stats.commands_sent += 1;
                    trace!(step = self.steps, %command, "command sent");
                    Some(command)
                }
                Err(err) => {
                    self.stats.policy_errors += 1;
                    warn!(%err, step = self.steps, "policy failed, no reply this tick");
                    None
                }
            }
        };

        if let Some(sink) = sink.as_mut() {
            if let Err(err) = sink.record(&snapshot, command.as_ref()) {
                self.stats.sink_errors += 1;
                warn!(%err, step = self.steps, "telemetry sink failed");
            }
        }
        Ok(None)
    }

    async fn send(&mut self, datagram: &[u8]) -> Result<(), SessionError> {
        let transport = self.transport.as_mut().ok_or(SessionError::Closed)?;
        transport.send(datagram).await?;
        Ok(())
    }

    /// Bounded receive that also watches for cancellation. `None` means
    /// cancelled.
    async fn receive(&mut self, timeout: Duration) -> Result<Option<Received>, SessionError> {
        let transport = self.transport.as_mut().ok_or(SessionError::Closed)?;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Ok(None),
            received = transport.recv(timeout) => Ok(Some(received?)),
        }
    }

    fn terminate(&mut self, reason: TerminationReason) {
        self.transport = None;
        self.phase = SessionPhase::Terminated(reason);
        info!(%reason, steps = self.steps, "session terminated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ControlCommand, SAMPLE_TELEMETRY};
    use crate::core::constants::{IDENTIFIED_MARKER, RESTART_MARKER, SHUTDOWN_MARKER};
    use crate::core::{PolicyError, SinkError};
    use crate::transport::mock::{ScriptedTransport, SentLog, Step, sent_strings};

    const SAMPLE_REPLY: &str = "(steer 0.004)(accel 1.000)(gear 1)";

    fn config() -> SessionConfig {
        SessionConfig::builder()
            .identify_timeout(Duration::from_millis(50))
            .drive_timeout(Duration::from_millis(50))
            .build()
            .unwrap()
    }

    fn session(
        config: SessionConfig,
        transport: ScriptedTransport,
    ) -> (Session<ScriptedTransport>, SentLog) {
        let sent = transport.sent_log();
        (Session::with_transport(config, transport), sent)
    }

    fn follow_angle(snapshot: &SensorSnapshot) -> Result<ControlCommand, PolicyError> {
        Ok(ControlCommand {
            steer: snapshot.angle,
            accel: 1.0,
            gear: snapshot.gear,
            ..ControlCommand::default()
        })
    }

    fn init_count(sent: &[String]) -> usize {
        sent.iter().filter(|s| s.starts_with("SCR(init ")).count()
    }

    #[tokio::test]
    async fn test_identify_after_timeouts() {
        let script = [
            Step::Timeout,
            Step::Timeout,
            Step::Timeout,
            Step::reply(IDENTIFIED_MARKER),
            Step::reply(SAMPLE_TELEMETRY),
        ];
        let (mut session, sent) = session(config(), ScriptedTransport::new(script));

        let reason = session.run(&mut follow_angle, None).await.unwrap();

        let sent = sent_strings(&sent);
        assert_eq!(reason, TerminationReason::ServerShutdown);
        assert_eq!(init_count(&sent), 4);
        assert_eq!(sent.last().map(String::as_str), Some(SAMPLE_REPLY));
        assert_eq!(session.stats().init_sent, 4);
        assert_eq!(session.stats().timeouts, 3);
    }

    #[tokio::test]
    async fn test_init_message_format() {
        let script = [Step::reply(IDENTIFIED_MARKER)];
        let config = SessionConfig::builder().identifier("bot3").build().unwrap();
        let (mut session, sent) = session(config, ScriptedTransport::new(script));

        session.run(&mut follow_angle, None).await.unwrap();

        assert_eq!(
            sent_strings(&sent),
            vec!["bot3(init -90 -75 -60 -45 -30 -20 -15 -10 -5 0 5 10 15 20 30 45 60 75 90)"]
        );
    }

    #[tokio::test]
    async fn test_unexpected_reply_while_identifying() {
        let script = [
            Step::reply(SAMPLE_TELEMETRY),
            Step::reply(RESTART_MARKER),
            Step::reply(IDENTIFIED_MARKER),
        ];
        let (mut session, sent) = session(config(), ScriptedTransport::new(script));

        session.run(&mut follow_angle, None).await.unwrap();

        assert_eq!(init_count(&sent_strings(&sent)), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let config = SessionConfig::builder()
            .identify_timeout(Duration::from_millis(10))
            .max_identify_retries(2)
            .build()
            .unwrap();
        let script = [Step::Timeout, Step::Timeout, Step::Timeout, Step::Timeout];
        let (mut session, sent) = session(config, ScriptedTransport::new(script));

        let err = session.run(&mut follow_angle, None).await.unwrap_err();

        assert!(matches!(err, SessionError::ConnectionFailed { attempts: 3 }));
        assert_eq!(init_count(&sent_strings(&sent)), 3);
        assert_eq!(
            session.phase(),
            SessionPhase::Terminated(TerminationReason::ConnectionFailed)
        );
        assert!(session.transport().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_while_identifying() {
        let script = [Step::Timeout, Step::reply(SHUTDOWN_MARKER)];
        let (mut session, _sent) = session(config(), ScriptedTransport::new(script));

        let reason = session.run(&mut follow_angle, None).await.unwrap();
        assert_eq!(reason, TerminationReason::ServerShutdown);
        assert_eq!(session.steps(), 0);
    }

    #[tokio::test]
    async fn test_send_failure_is_fatal() {
        let transport = ScriptedTransport::new([Step::Timeout]).fail_send_at(0);
        let (mut session, sent) = session(config(), transport);

        let err = session.run(&mut follow_angle, None).await.unwrap_err();

        assert!(matches!(err, SessionError::Transport(_)));
        assert!(sent_strings(&sent).is_empty());
        assert_eq!(session.stats().init_sent, 0);
        assert_eq!(
            session.phase(),
            SessionPhase::Terminated(TerminationReason::ConnectionFailed)
        );
    }

    #[tokio::test]
    async fn test_send_failure_while_driving_is_fatal() {
        let script = [
            Step::reply(IDENTIFIED_MARKER),
            Step::reply(SAMPLE_TELEMETRY),
            Step::reply(SAMPLE_TELEMETRY),
        ];
        let transport = ScriptedTransport::new(script).fail_send_at(1);
        let (mut session, _sent) = session(config(), transport);

        let err = session.run(&mut follow_angle, None).await.unwrap_err();

        assert!(matches!(err, SessionError::Transport(_)));
        assert_eq!(session.steps(), 1);
        assert_eq!(session.stats().commands_sent, 0);
    }

    #[tokio::test]
    async fn test_receive_failure_is_fatal() {
        let script = [Step::reply(IDENTIFIED_MARKER), Step::Fail];
        let (mut session, _sent) = session(config(), ScriptedTransport::new(script));

        let err = session.run(&mut follow_angle, None).await.unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
        assert_eq!(err.reason(), TerminationReason::ConnectionFailed);
    }

    #[tokio::test]
    async fn test_malformed_then_valid() {
        let script = [
            Step::reply(IDENTIFIED_MARKER),
            Step::reply("(angle 0.1)(track 1 2 3)"),
            Step::reply(SAMPLE_TELEMETRY),
        ];
        let (mut session, sent) = session(config(), ScriptedTransport::new(script));

        let reason = session.run(&mut follow_angle, None).await.unwrap();

        let sent = sent_strings(&sent);
        assert_eq!(reason, TerminationReason::ServerShutdown);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1], SAMPLE_REPLY);
        assert_eq!(session.stats().decode_errors, 1);
        assert_eq!(session.stats().commands_sent, 1);
        assert_eq!(session.steps(), 1);
    }

    #[tokio::test]
    async fn test_empty_datagram_is_skipped() {
        let script = [
            Step::reply(IDENTIFIED_MARKER),
            Step::reply(""),
            Step::reply(SAMPLE_TELEMETRY),
        ];
        let (mut session, sent) = session(config(), ScriptedTransport::new(script));

        session.run(&mut follow_angle, None).await.unwrap();

        assert_eq!(sent_strings(&sent).len(), 2);
        assert_eq!(session.stats().decode_errors, 1);
    }

    #[tokio::test]
    async fn test_drive_timeouts_send_nothing() {
        let script = [
            Step::reply(IDENTIFIED_MARKER),
            Step::Timeout,
            Step::Timeout,
            Step::reply(SAMPLE_TELEMETRY),
        ];
        let (mut session, sent) = session(config(), ScriptedTransport::new(script));

        session.run(&mut follow_angle, None).await.unwrap();

        assert_eq!(sent_strings(&sent).len(), 2);
        assert_eq!(session.stats().timeouts, 2);
    }

    #[tokio::test]
    async fn test_shutdown_beats_restart() {
        let both = format!("{RESTART_MARKER}{SHUTDOWN_MARKER}");
        let script = [Step::reply(IDENTIFIED_MARKER), Step::reply(both)];
        let (mut session, _sent) = session(config(), ScriptedTransport::new(script));

        let reason = session.run(&mut follow_angle, None).await.unwrap();
        assert_eq!(reason, TerminationReason::ServerShutdown);
    }

    #[tokio::test]
    async fn test_restart_terminates_episode() {
        let script = [
            Step::reply(IDENTIFIED_MARKER),
            Step::reply(SAMPLE_TELEMETRY),
            Step::reply(RESTART_MARKER),
            Step::reply(SAMPLE_TELEMETRY),
        ];
        let (mut session, sent) = session(config(), ScriptedTransport::new(script));

        let reason = session.run(&mut follow_angle, None).await.unwrap();

        assert_eq!(reason, TerminationReason::ServerRestart);
        assert_eq!(
            session.phase(),
            SessionPhase::Terminated(TerminationReason::ServerRestart)
        );
        assert!(session.transport().is_none());
        assert_eq!(sent_strings(&sent).len(), 2);
    }

    #[tokio::test]
    async fn test_step_limit_sends_meta() {
        let config = SessionConfig::builder().max_steps(2).build().unwrap();
        let script = [
            Step::reply(IDENTIFIED_MARKER),
            Step::reply(SAMPLE_TELEMETRY),
            Step::reply(SAMPLE_TELEMETRY),
            Step::reply(SAMPLE_TELEMETRY),
        ];
        let (mut session, sent) = session(config, ScriptedTransport::new(script));
        let mut decisions = 0;
        let mut policy = |snapshot: &SensorSnapshot| {
            decisions += 1;
            follow_angle(snapshot)
        };

        let reason = session.run(&mut policy, None).await.unwrap();

        let sent = sent_strings(&sent);
        assert_eq!(reason, TerminationReason::ServerShutdown);
        // meta goes out once, on the tick that reaches the limit
        assert_eq!(&sent[1..], [SAMPLE_REPLY, "(meta 1)", SAMPLE_REPLY]);
        assert_eq!(decisions, 2);
        assert_eq!(session.stats().restart_requests, 1);
        assert_eq!(session.stats().commands_sent, 2);
        assert_eq!(session.steps(), 3);
    }

    #[tokio::test]
    async fn test_policy_error_skips_reply() {
        let script = [
            Step::reply(IDENTIFIED_MARKER),
            Step::reply(SAMPLE_TELEMETRY),
            Step::reply(SAMPLE_TELEMETRY),
        ];
        let (mut session, sent) = session(config(), ScriptedTransport::new(script));
        let mut calls = 0;
        let mut flaky = |snapshot: &SensorSnapshot| {
            calls += 1;
            if calls == 1 {
                Err(PolicyError::Failed("model not loaded".into()))
            } else {
                follow_angle(snapshot)
            }
        };
        let mut recorded = Vec::new();
        let mut sink = |_: &SensorSnapshot, command: Option<&ControlCommand>| -> Result<(), SinkError> {
            recorded.push(command.copied());
            Ok(())
        };

        let reason = session.run(&mut flaky, Some(&mut sink)).await.unwrap();

        assert_eq!(reason, TerminationReason::ServerShutdown);
        assert_eq!(sent_strings(&sent).len(), 2);
        assert_eq!(session.stats().policy_errors, 1);
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0], None);
        assert!(recorded[1].is_some());
    }

    #[tokio::test]
    async fn test_sink_sees_clamped_command() {
        let script = [Step::reply(IDENTIFIED_MARKER), Step::reply(SAMPLE_TELEMETRY)];
        let (mut session, _sent) = session(config(), ScriptedTransport::new(script));
        let mut wild = |_: &SensorSnapshot| -> Result<ControlCommand, PolicyError> {
            Ok(ControlCommand {
                steer: 3.0,
                accel: -1.0,
                ..ControlCommand::default()
            })
        };
        let mut recorded = Vec::new();
        let mut sink =
            |snapshot: &SensorSnapshot, command: Option<&ControlCommand>| -> Result<(), SinkError> {
            recorded.push((snapshot.rpm, command.copied()));
            Ok(())
        };

        session.run(&mut wild, Some(&mut sink)).await.unwrap();

        let (rpm, command) = recorded[0];
        let command = command.unwrap();
        assert_eq!(rpm, 942.478);
        assert_eq!(command.steer, 1.0);
        assert_eq!(command.accel, 0.0);
    }

    #[tokio::test]
    async fn test_sink_errors_are_swallowed() {
        let script = [
            Step::reply(IDENTIFIED_MARKER),
            Step::reply(SAMPLE_TELEMETRY),
            Step::reply(SAMPLE_TELEMETRY),
        ];
        let (mut session, sent) = session(config(), ScriptedTransport::new(script));
        let mut broken = |_: &SensorSnapshot, _: Option<&ControlCommand>| -> Result<(), SinkError> {
            Err(SinkError::Io(std::io::Error::other("disk full")))
        };

        let reason = session.run(&mut follow_angle, Some(&mut broken)).await.unwrap();

        assert_eq!(reason, TerminationReason::ServerShutdown);
        assert_eq!(sent_strings(&sent).len(), 3);
        assert_eq!(session.stats().sink_errors, 2);
    }

    #[tokio::test]
    async fn test_cancel_while_blocked() {
        let config = SessionConfig::builder()
            .identify_timeout(Duration::from_secs(30))
            .build()
            .unwrap();
        let token = CancellationToken::new();
        let transport = ScriptedTransport::new([Step::Stall]);
        let mut session = Session::with_transport(config, transport).with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let reason = tokio::time::timeout(
            Duration::from_secs(5),
            session.run(&mut follow_angle, None),
        )
        .await
        .unwrap()
        .unwrap();
        canceller.await.unwrap();

        assert_eq!(reason, TerminationReason::Cancelled);
        assert_eq!(
            session.phase(),
            SessionPhase::Terminated(TerminationReason::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_cancel_while_driving() {
        let token = CancellationToken::new();
        let script = [
            Step::reply(IDENTIFIED_MARKER),
            Step::reply(SAMPLE_TELEMETRY),
            Step::reply(SAMPLE_TELEMETRY),
        ];
        let transport = ScriptedTransport::new(script);
        let mut session = Session::with_transport(config(), transport).with_cancellation(token.clone());
        let mut policy = |snapshot: &SensorSnapshot| {
            token.cancel();
            follow_angle(snapshot)
        };

        let reason = session.run(&mut policy, None).await.unwrap();

        assert_eq!(reason, TerminationReason::Cancelled);
        assert_eq!(session.steps(), 1);
    }

    #[tokio::test]
    async fn test_runs_once() {
        let (mut session, _sent) = session(config(), ScriptedTransport::new([]));

        session.run(&mut follow_angle, None).await.unwrap();
        let err = session.run(&mut follow_angle, None).await.unwrap_err();
        assert!(matches!(err, SessionError::Closed));
    }

    #[tokio::test]
    async fn test_dyn_policy() {
        let script = [Step::reply(IDENTIFIED_MARKER), Step::reply(SAMPLE_TELEMETRY)];
        let (mut session, sent) = session(config(), ScriptedTransport::new(script));
        let mut boxed: Box<dyn Policy> = Box::new(follow_angle);

        session.run(boxed.as_mut(), None).await.unwrap();
        assert_eq!(sent_strings(&sent)[1], SAMPLE_REPLY);
    }
}
