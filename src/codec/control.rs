//! Control command encoding.
//!
//! Wire format:
//! ```text
//! (steer V)(accel V)[(brake V)](gear N)[(clutch V)][(focus N)][(meta N)]
//! ```
//! Floats use three decimals. Bracketed groups are only written when their
//! value is non-zero.

use std::fmt;

use crate::core::constants::{MAX_FOCUS_DEG, MAX_GEAR, META_RESTART, MIN_DRIVE_GEAR, MIN_WIRE_GEAR};

/// Command sent back to the server for one tick.
///
/// Values may be out of range; encoding clamps them. Policies following the
/// default contract keep `gear` within [1, 6].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlCommand {
    /// Steering in [-1, 1], positive turns left.
    pub steer: f64,
    /// Throttle in [0, 1].
    pub accel: f64,
    /// Brake in [0, 1].
    pub brake: f64,
    /// Gear in [-1, 6]; -1 is reverse, 0 neutral.
    pub gear: i32,
    /// Clutch in [0, 1].
    pub clutch: f64,
    /// Focus direction in degrees, [-90, 90].
    pub focus: i32,
    /// Meta command, 1 asks the server to restart the episode.
    pub meta: i32,
}

impl Default for ControlCommand {
    fn default() -> Self {
        Self {
            steer: 0.0,
            accel: 0.0,
            brake: 0.0,
            gear: MIN_DRIVE_GEAR,
            clutch: 0.0,
            focus: 0,
            meta: 0,
        }
    }
}

impl ControlCommand {
    /// Copy of this command with every field clamped to its wire range.
    ///
    /// NaN floats become 0.
    pub fn clamped(&self) -> Self {
        Self {
            steer: clamp_float(self.steer, -1.0, 1.0),
            accel: clamp_float(self.accel, 0.0, 1.0),
            brake: clamp_float(self.brake, 0.0, 1.0),
            gear: self.gear.clamp(MIN_WIRE_GEAR, MAX_GEAR),
            clutch: clamp_float(self.clutch, 0.0, 1.0),
            focus: self.focus.clamp(-MAX_FOCUS_DEG, MAX_FOCUS_DEG),
            meta: self.meta.clamp(0, META_RESTART),
        }
    }

    /// Encode to wire format, clamping first.
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

/// Writes the clamped wire form.
impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.clamped();
        write!(f, "(steer {:.3})(accel {:.3})", c.steer, c.accel)?;
        if c.brake != 0.0 {
            write!(f, "(brake {:.3})", c.brake)?;
        }
        write!(f, "(gear {})", c.gear)?;
        if c.clutch != 0.0 {
            write!(f, "(clutch {:.3})", c.clutch)?;
        }
        if c.focus != 0 {
            write!(f, "(focus {})", c.focus)?;
        }
        if c.meta != 0 {
            write!(f, "(meta {})", c.meta)?;
        }
        Ok(())
    }
}

/// The fixed message that asks the server to end the current episode.
pub fn encode_restart_request() -> Vec<u8> {
    format!("(meta {META_RESTART})").into_bytes()
}

fn clamp_float(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    let clamped = value.clamp(min, max);
    // avoid "-0.000" on the wire
    if clamped == 0.0 { 0.0 } else { clamped }
}
