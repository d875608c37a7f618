//! RPM hysteresis gear selection.

use crate::core::constants::{MAX_GEAR, MIN_DRIVE_GEAR};

/// Default RPM above which a rising engine shifts up.
pub const DEFAULT_UPSHIFT_RPM: f64 = 7000.0;

/// Default RPM below which a falling engine shifts down.
pub const DEFAULT_DOWNSHIFT_RPM: f64 = 3000.0;

/// Automatic gearbox driven by RPM and its trend.
///
/// Shifts up when the RPM is rising (or on the first sample) and above the
/// upshift threshold, and down when it is not rising and below the downshift
/// threshold. The previous sample is private to each shifter.
#[derive(Debug, Clone, PartialEq)]
pub struct GearShifter {
    upshift_rpm: f64,
    downshift_rpm: f64,
    prev_rpm: Option<f64>,
}

impl Default for GearShifter {
    fn default() -> Self {
        Self::new(DEFAULT_UPSHIFT_RPM, DEFAULT_DOWNSHIFT_RPM)
    }
}

impl GearShifter {
    /// Create a shifter with custom thresholds.
    pub fn new(upshift_rpm: f64, downshift_rpm: f64) -> Self {
        Self {
            upshift_rpm,
            downshift_rpm,
            prev_rpm: None,
        }
    }

    /// Pick the gear for this tick and remember `rpm`.
    pub fn next_gear(&mut self, gear: i32, rpm: f64) -> i32 {
        let rising = self.prev_rpm.is_none_or(|prev| rpm > prev);
        self.prev_rpm = Some(rpm);

        let gear = if rising && rpm > self.upshift_rpm {
            gear + 1
        } else if !rising && rpm < self.downshift_rpm {
            gear - 1
        } else {
            gear
        };
        gear.clamp(MIN_DRIVE_GEAR, MAX_GEAR)
    }

    /// Forget the previous RPM sample.
    pub fn reset(&mut self) {
        self.prev_rpm = None;
    }

    /// Get the previous RPM sample.
    pub fn prev_rpm(&self) -> Option<f64> {
        self.prev_rpm
    }
}
