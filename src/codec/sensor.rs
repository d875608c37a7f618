//! Sensor telemetry decoding.
//!
//! Wire format (one datagram, groups in any order):
//! ```text
//! (angle V)(track v0 .. v18)(speedX V)(speedY V)(speedZ V)(trackPos V)(rpm V)(gear V)
//! [(damage V)(fuel V)(curLapTime V)(lastLapTime V)(distFromStart V)(distRaced V)
//!  (racePos V)(z V)(opponents v0 .. v35)(wheelSpinVel v0 .. v3)(focus v0 .. v4)]
//! ```

use super::group::GroupIndex;
use crate::core::DecodeError;
use crate::core::constants::{
    FOCUS_SENSOR_COUNT, MAX_GEAR, MIN_DRIVE_GEAR, OPPONENT_SENSOR_COUNT, RANGEFINDER_COUNT,
    WHEEL_COUNT,
};

/// Group keys of the telemetry message.
pub mod keys {
    /// Heading relative to the track axis (rad).
    pub const ANGLE: &str = "angle";
    /// Track-edge rangefinders (m).
    pub const TRACK: &str = "track";
    /// Longitudinal speed (m/s).
    pub const SPEED_X: &str = "speedX";
    /// Lateral speed (m/s).
    pub const SPEED_Y: &str = "speedY";
    /// Vertical speed (m/s).
    pub const SPEED_Z: &str = "speedZ";
    /// Lateral position, 0 = center, +-1 = edges.
    pub const TRACK_POS: &str = "trackPos";
    /// Engine speed.
    pub const RPM: &str = "rpm";
    /// Current gear.
    pub const GEAR: &str = "gear";
    /// Accumulated damage points.
    pub const DAMAGE: &str = "damage";
    /// Fuel left (l).
    pub const FUEL: &str = "fuel";
    /// Current lap time (s).
    pub const CUR_LAP_TIME: &str = "curLapTime";
    /// Previous lap time (s).
    pub const LAST_LAP_TIME: &str = "lastLapTime";
    /// Distance from the start line along the track (m).
    pub const DIST_FROM_START: &str = "distFromStart";
    /// Distance covered since the race start (m).
    pub const DIST_RACED: &str = "distRaced";
    /// Race position.
    pub const RACE_POS: &str = "racePos";
    /// Height of the car above the track (m).
    pub const Z: &str = "z";
    /// Opponent proximity sensors (m).
    pub const OPPONENTS: &str = "opponents";
    /// Wheel spin velocities (rad/s).
    pub const WHEEL_SPIN_VEL: &str = "wheelSpinVel";
    /// Focus rangefinders (m).
    pub const FOCUS: &str = "focus";
}

/// Decoded telemetry for a single tick.
///
/// The fields outside [`extended`](Self::extended) are what a
/// [`Policy`](crate::core::Policy) may rely on.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSnapshot {
    /// Heading relative to the track axis, radians.
    pub angle: f64,
    /// Distance to the track edge along each rangefinder, meters.
    pub track_edges: [f64; RANGEFINDER_COUNT],
    /// Longitudinal velocity, m/s.
    pub speed_x: f64,
    /// Lateral velocity, m/s.
    pub speed_y: f64,
    /// Vertical velocity, m/s.
    pub speed_z: f64,
    /// Lateral position: 0 on the axis, +-1 on the edges, beyond when off-track.
    pub track_position: f64,
    /// Engine RPM.
    pub rpm: f64,
    /// Gear, always within [1, 6].
    pub gear: i32,
    /// Optional pass-through readings.
    pub extended: ExtendedSensors,
}

/// Optional telemetry groups, carried for telemetry sinks.
///
/// An absent or unparsable group is `None`; it never fails the decode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtendedSensors {
    /// Damage points.
    pub damage: Option<f64>,
    /// Fuel left, liters.
    pub fuel: Option<f64>,
    /// Current lap time, seconds.
    pub cur_lap_time: Option<f64>,
    /// Previous lap time, seconds.
    pub last_lap_time: Option<f64>,
    /// Distance from the start line, meters.
    pub dist_from_start: Option<f64>,
    /// Distance raced, meters.
    pub dist_raced: Option<f64>,
    /// Race position (1 = leading).
    pub race_position: Option<u32>,
    /// Height above the track, meters.
    pub z: Option<f64>,
    /// Opponent sensors, 36 values.
    pub opponents: Option<Vec<f64>>,
    /// Wheel spin velocities, one per wheel.
    pub wheel_spin_velocity: Option<Vec<f64>>,
    /// Focus sensors, 5 values.
    pub focus: Option<Vec<f64>>,
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self {
            angle: 0.0,
            track_edges: [0.0; RANGEFINDER_COUNT],
            speed_x: 0.0,
            speed_y: 0.0,
            speed_z: 0.0,
            track_position: 0.0,
            rpm: 0.0,
            gear: MIN_DRIVE_GEAR,
            extended: ExtendedSensors::default(),
        }
    }
}

impl SensorSnapshot {
    /// Decode a telemetry datagram.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.is_empty() {
            return Err(DecodeError::Empty);
        }
        let text = std::str::from_utf8(data).map_err(|_| DecodeError::InvalidUtf8)?;
        Self::decode_str(text)
    }

    /// Decode a telemetry message that is already text.
    pub fn decode_str(text: &str) -> Result<Self, DecodeError> {
        let text = text.trim_end_matches('\0');
        if text.trim().is_empty() {
            return Err(DecodeError::Empty);
        }
        let index = GroupIndex::new(text);

        Ok(Self {
            angle: scalar(&index, keys::ANGLE)?,
            track_edges: track_edges(&index)?,
            speed_x: scalar(&index, keys::SPEED_X)?,
            speed_y: scalar(&index, keys::SPEED_Y)?,
            speed_z: scalar(&index, keys::SPEED_Z)?,
            track_position: scalar(&index, keys::TRACK_POS)?,
            rpm: scalar(&index, keys::RPM)?,
            gear: normalize_gear(scalar(&index, keys::GEAR)?),
            extended: ExtendedSensors::from_index(&index),
        })
    }

    /// Magnitude of the velocity vector, m/s.
    pub fn speed(&self) -> f64 {
        (self.speed_x.powi(2) + self.speed_y.powi(2) + self.speed_z.powi(2)).sqrt()
    }

    /// Whether the car is outside the track edges.
    pub fn is_off_track(&self) -> bool {
        self.track_position.abs() > 1.0
    }
}

impl ExtendedSensors {
    fn from_index(index: &GroupIndex<'_>) -> Self {
        Self {
            damage: optional_scalar(index, keys::DAMAGE),
            fuel: optional_scalar(index, keys::FUEL),
            cur_lap_time: optional_scalar(index, keys::CUR_LAP_TIME),
            last_lap_time: optional_scalar(index, keys::LAST_LAP_TIME),
            dist_from_start: optional_scalar(index, keys::DIST_FROM_START),
            dist_raced: optional_scalar(index, keys::DIST_RACED),
            race_position: optional_scalar(index, keys::RACE_POS)
                .filter(|pos| pos.is_finite() && *pos >= 0.0)
                .map(|pos| pos as u32),
            z: optional_scalar(index, keys::Z),
            opponents: optional_array(index, keys::OPPONENTS, OPPONENT_SENSOR_COUNT),
            wheel_spin_velocity: optional_array(index, keys::WHEEL_SPIN_VEL, WHEEL_COUNT),
            focus: optional_array(index, keys::FOCUS, FOCUS_SENSOR_COUNT),
        }
    }
}

/// Clamp a raw server gear (-1 reverse, 0 neutral, >6 bogus) into [1, 6].
pub fn normalize_gear(raw: f64) -> i32 {
    (raw.trunc() as i32).clamp(MIN_DRIVE_GEAR, MAX_GEAR)
}

fn scalar(index: &GroupIndex<'_>, key: &'static str) -> Result<f64, DecodeError> {
    let values = index.get(key).ok_or(DecodeError::MissingField(key))?;
    let mut tokens = values.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(token), None) => parse_number(token).ok_or(DecodeError::MalformedField(key)),
        _ => Err(DecodeError::MalformedField(key)),
    }
}

fn track_edges(index: &GroupIndex<'_>) -> Result<[f64; RANGEFINDER_COUNT], DecodeError> {
    let key = keys::TRACK;
    let values = index.get(key).ok_or(DecodeError::MissingField(key))?;
    let mut edges = [0.0; RANGEFINDER_COUNT];
    let mut count = 0;
    for token in values.split_whitespace() {
        if count == RANGEFINDER_COUNT {
            return Err(DecodeError::MalformedField(key));
        }
        edges[count] = parse_number(token).ok_or(DecodeError::MalformedField(key))?;
        count += 1;
    }
    if count != RANGEFINDER_COUNT {
        return Err(DecodeError::MalformedField(key));
    }
    Ok(edges)
}

fn optional_scalar(index: &GroupIndex<'_>, key: &str) -> Option<f64> {
    let mut tokens = index.get(key)?.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(token), None) => parse_number(token),
        _ => None,
    }
}

/// A pass-through array is only kept when it carries exactly `len` numbers.
fn optional_array(index: &GroupIndex<'_>, key: &str, len: usize) -> Option<Vec<f64>> {
    index
        .get(key)?
        .split_whitespace()
        .map(parse_number)
        .collect::<Option<Vec<_>>>()
        .filter(|values| values.len() == len)
}

fn parse_number(token: &str) -> Option<f64> {
    token.parse::<f64>().ok()
}

/// A complete telemetry message as the server sends it.
#[cfg(test)]
pub(crate) const SAMPLE_TELEMETRY: &str = "(angle 0.00397532)(curLapTime -0.982)(damage 0)\
(distFromStart 2043.43)(distRaced 0)(fuel 94)(gear 0)(lastLapTime 0)\
(opponents 200 200 200 200 200 200 200 200 200 200 200 200 200 200 200 200 200 200 200 200 \
200 200 200 200 200 200 200 200 200 200 200 200 200 200 200 200)(racePos 1)(rpm 942.478)\
(speedX -0.0133766)(speedY 0.00142569)(speedZ -0.000290394)\
(track 4.00001 4.14025 4.61887 5.65685 8.00001 10.3528 11.5238 13.0942 15.2027 16.5 \
18.1083 21.0938 25.8484 34.2929 31.9999 16.2681 12.9413 11.3307 10.9999)\
(trackPos 0.333332)(wheelSpinVel 0 0 0 0)(z 0.345263)(focus -1 -1 -1 -1 -1)";
