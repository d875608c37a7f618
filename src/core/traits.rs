//! Collaborator traits for the SCR client.
//!
//! The session drives two collaborators it does not implement itself: the
//! control [`Policy`] that turns a snapshot into a command, and the
//! [`TelemetrySink`] that persists what happened on each tick.

use super::error::{PolicyError, SinkError};
use crate::codec::{ControlCommand, SensorSnapshot};

/// Decision capability invoked once per decoded tick.
///
/// Implementations are interchangeable variants (rule-based, learned model,
/// human input) chosen when the session is built. Any memory a variant needs
/// across ticks, such as the previous RPM for gear hysteresis, lives inside
/// the implementing type and is never inspected by the session.
///
/// # Requirements
///
/// - `decide` SHOULD return quickly: it gates the reply for the current tick
/// - an `Err` skips the reply for this tick only; the session keeps driving
/// - the returned command does not need to be clamped, encoding clamps it
///
/// # Example
///
/// ```ignore
/// struct FullThrottle;
///
/// impl Policy for FullThrottle {
///     fn decide(&mut self, snapshot: &SensorSnapshot) -> Result<ControlCommand, PolicyError> {
///         Ok(ControlCommand {
///             steer: snapshot.angle,
///             accel: 1.0,
///             gear: snapshot.gear,
///             ..ControlCommand::default()
///         })
///     }
/// }
/// ```
pub trait Policy: Send {
    /// Produce the command for this tick.
    fn decide(&mut self, snapshot: &SensorSnapshot) -> Result<ControlCommand, PolicyError>;
}

impl<F> Policy for F
where
    F: FnMut(&SensorSnapshot) -> Result<ControlCommand, PolicyError> + Send,
{
    fn decide(&mut self, snapshot: &SensorSnapshot) -> Result<ControlCommand, PolicyError> {
        self(snapshot)
    }
}

/// Per-tick telemetry receiver.
///
/// Called once for every decoded snapshot. `command` is the command sent on
/// that tick, or `None` when nothing from the policy was sent (policy error or
/// step-limit meta command).
///
/// The contract is fire-and-forget: errors are logged by the session and
/// never affect the drive loop. Implementations MUST return within a short,
/// bounded time; any queuing is the sink's own business.
pub trait TelemetrySink: Send {
    /// Record one tick.
    fn record(
        &mut self,
        snapshot: &SensorSnapshot,
        command: Option<&ControlCommand>,
    ) -> Result<(), SinkError>;
}

impl<F> TelemetrySink for F
where
    F: FnMut(&SensorSnapshot, Option<&ControlCommand>) -> Result<(), SinkError> + Send,
{
    fn record(
        &mut self,
        snapshot: &SensorSnapshot,
        command: Option<&ControlCommand>,
    ) -> Result<(), SinkError> {
        self(snapshot, command)
    }
}
