//! Protocol constants for the SCR client.
//!
//! Values in the wire sections are fixed by the simulator server and MUST NOT
//! be changed. Defaults in the session sections may be overridden through
//! [`SessionConfig`](crate::session::SessionConfig).

use std::time::Duration;

// =============================================================================
// SERVER SIGNALS
// =============================================================================

/// Substring the server sends once it has accepted an init message.
pub const IDENTIFIED_MARKER: &str = "***identified***";

/// Substring the server sends when the race is over.
pub const SHUTDOWN_MARKER: &str = "***shutdown***";

/// Substring the server sends when the episode is restarted.
pub const RESTART_MARKER: &str = "***restart***";

// =============================================================================
// SENSOR LAYOUT
// =============================================================================

/// Number of track-edge rangefinders.
pub const RANGEFINDER_COUNT: usize = 19;

/// Number of opponent proximity sensors.
pub const OPPONENT_SENSOR_COUNT: usize = 36;

/// Number of wheels reporting spin velocity.
pub const WHEEL_COUNT: usize = 4;

/// Number of focus rangefinders.
pub const FOCUS_SENSOR_COUNT: usize = 5;

/// Rangefinders per side in the outer (coarse) band.
pub const OUTER_BAND_SENSORS: usize = 5;

/// Angular spacing of the outer band, in degrees.
pub const OUTER_BAND_STEP_DEG: f64 = 15.0;

/// Angular spacing of the inner band, in degrees.
pub const INNER_BAND_STEP_DEG: f64 = 5.0;

/// Angle where the inner band starts, in degrees.
pub const INNER_BAND_EDGE_DEG: f64 = 20.0;

// =============================================================================
// CONTROL RANGES
// =============================================================================

/// Lowest gear presented to and accepted from a policy.
pub const MIN_DRIVE_GEAR: i32 = 1;

/// Highest gear of the simulated gearbox.
pub const MAX_GEAR: i32 = 6;

/// Lowest gear the wire format carries (reverse).
pub const MIN_WIRE_GEAR: i32 = -1;

/// Focus request range, in degrees either side of the car axis.
pub const MAX_FOCUS_DEG: i32 = 90;

/// Meta value asking the server to end the episode.
pub const META_RESTART: i32 = 1;

// =============================================================================
// SESSION DEFAULTS
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default server port of the first car slot.
pub const DEFAULT_PORT: u16 = 3001;

/// Default bot identifier sent in front of the init group.
pub const DEFAULT_IDENTIFIER: &str = "SCR";

/// How long to wait for the identification acknowledgment per attempt.
pub const DEFAULT_IDENTIFY_TIMEOUT: Duration = Duration::from_secs(1);

/// How long to wait for telemetry before logging an idle tick.
pub const DEFAULT_DRIVE_TIMEOUT: Duration = Duration::from_millis(100);

/// Default receive buffer size.
///
/// A full telemetry message with all optional groups stays well below this.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 4096;

/// Smallest receive buffer a session accepts.
pub const MIN_RECV_BUFFER_SIZE: usize = 512;

// =============================================================================
// TELEMETRY
// =============================================================================

/// Default minimum spacing between two telemetry rows.
pub const DEFAULT_TELEMETRY_INTERVAL: Duration = Duration::from_millis(50);
