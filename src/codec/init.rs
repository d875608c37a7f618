//! Identification message and rangefinder layout.

use crate::core::constants::{
    INNER_BAND_EDGE_DEG, INNER_BAND_STEP_DEG, OUTER_BAND_SENSORS, OUTER_BAND_STEP_DEG,
    RANGEFINDER_COUNT,
};

/// Default rangefinder angles in degrees.
///
/// Five sensors per side every 15 degrees from +-90, four per side every 5
/// degrees from +-20, and one straight ahead:
/// `[-90 -75 -60 -45 -30 -20 -15 -10 -5 0 5 10 15 20 30 45 60 75 90]`.
pub fn rangefinder_angles() -> [f64; RANGEFINDER_COUNT] {
    let mut angles = [0.0; RANGEFINDER_COUNT];
    let last = RANGEFINDER_COUNT - 1;

    for i in 0..OUTER_BAND_SENSORS {
        let offset = i as f64 * OUTER_BAND_STEP_DEG;
        angles[i] = -90.0 + offset;
        angles[last - i] = 90.0 - offset;
    }
    for i in OUTER_BAND_SENSORS..last / 2 {
        let offset = (i - OUTER_BAND_SENSORS) as f64 * INNER_BAND_STEP_DEG;
        angles[i] = -INNER_BAND_EDGE_DEG + offset;
        angles[last - i] = INNER_BAND_EDGE_DEG - offset;
    }
    angles
}

/// Encode `<identifier>(init a0 .. a18)`.
pub fn encode_init(identifier: &str, angles: &[f64; RANGEFINDER_COUNT]) -> Vec<u8> {
    let mut msg = String::with_capacity(identifier.len() + 8 + RANGEFINDER_COUNT * 4);
    msg.push_str(identifier);
    msg.push_str("(init");
    for angle in angles {
        msg.push(' ');
        msg.push_str(&angle.to_string());
    }
    msg.push(')');
    msg.into_bytes()
}
