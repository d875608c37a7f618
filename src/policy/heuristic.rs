//! Rule-based driver.

use super::gear::{DEFAULT_DOWNSHIFT_RPM, DEFAULT_UPSHIFT_RPM, GearShifter};
use crate::codec::{ControlCommand, SensorSnapshot};
use crate::core::{Policy, PolicyError};

/// Tuning for [`HeuristicPolicy`].
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicConfig {
    /// Weight of the lateral track position against the heading angle.
    pub track_pos_gain: f64,
    /// Overall steering gain.
    pub steer_sensitivity: f64,
    /// Largest steering change between two ticks.
    pub max_steer_change: f64,
    /// Longitudinal speed to hold, same units as `speedX`.
    pub target_speed: f64,
    /// Throttle added per tick below the target speed.
    pub accel_step: f64,
    /// Brake applied at or above the target speed.
    pub coast_brake: f64,
    /// RPM above which a rising engine shifts up.
    pub upshift_rpm: f64,
    /// RPM below which a falling engine shifts down.
    pub downshift_rpm: f64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            track_pos_gain: 0.3,
            steer_sensitivity: 0.2,
            max_steer_change: 0.1,
            target_speed: 100.0,
            accel_step: 0.1,
            coast_brake: 0.1,
            upshift_rpm: DEFAULT_UPSHIFT_RPM,
            downshift_rpm: DEFAULT_DOWNSHIFT_RPM,
        }
    }
}

/// Follows the track axis, holds a target speed and shifts on RPM.
///
/// Keeps the previous steering and throttle outputs and a [`GearShifter`]
/// between ticks; build a fresh one per episode.
#[derive(Debug, Clone)]
pub struct HeuristicPolicy {
    config: HeuristicConfig,
    shifter: GearShifter,
    steer: f64,
    accel: f64,
}

impl Default for HeuristicPolicy {
    fn default() -> Self {
        Self::new(HeuristicConfig::default())
    }
}

impl HeuristicPolicy {
    /// Create a policy with the given tuning.
    pub fn new(config: HeuristicConfig) -> Self {
        let shifter = GearShifter::new(config.upshift_rpm, config.downshift_rpm);
        Self {
            config,
            shifter,
            steer: 0.0,
            accel: 0.0,
        }
    }

    /// Get the tuning.
    pub fn config(&self) -> &HeuristicConfig {
        &self.config
    }

    fn steer(&mut self, snapshot: &SensorSnapshot) -> f64 {
        let target = (snapshot.angle - snapshot.track_position * self.config.track_pos_gain)
            * self.config.steer_sensitivity;
        let limit = self.config.max_steer_change.abs();
        self.steer = target.clamp(self.steer - limit, self.steer + limit);
        self.steer
    }

    /// Returns (accel, brake).
    fn speed(&mut self, snapshot: &SensorSnapshot) -> (f64, f64) {
        if snapshot.speed_x < self.config.target_speed {
            self.accel = (self.accel + self.config.accel_step).min(1.0);
            (self.accel, 0.0)
        } else {
            self.accel = 0.0;
            (0.0, self.config.coast_brake)
        }
    }
}

impl Policy for HeuristicPolicy {
    fn decide(&mut self, snapshot: &SensorSnapshot) -> Result<ControlCommand, PolicyError> {
        check_finite("angle", snapshot.angle)?;
        check_finite("trackPos", snapshot.track_position)?;
        check_finite("speedX", snapshot.speed_x)?;
        check_finite("rpm", snapshot.rpm)?;

        let steer = self.steer(snapshot);
        let gear = self.shifter.next_gear(snapshot.gear, snapshot.rpm);
        let (accel, brake) = self.speed(snapshot);

        Ok(ControlCommand {
            steer,
            accel,
            brake,
            gear,
            ..ControlCommand::default()
        })
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), PolicyError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PolicyError::NonFiniteInput(field))
    }
}
