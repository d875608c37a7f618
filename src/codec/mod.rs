//! SCR message codec.
//!
//! Pure, stateless translation between datagrams and typed values:
//!
//! - **Telemetry decoding**: [`SensorSnapshot::decode`] for server messages
//! - **Command encoding**: [`ControlCommand::encode`], clamping every field
//! - **Identification**: [`encode_init`] with the [`rangefinder_angles`] table
//! - **Signals**: [`ServerSignal::detect`] for acknowledgment, restart, shutdown
//!
//! Every message is a flat ASCII string of `(key value...)` groups, see
//! [`group`] for the scanner rules.
//!
//! ```text
//!  client                                server
//!    │  SCR(init -90 -75 ... 75 90)        │
//!    │ ──────────────────────────────────▶ │
//!    │  ***identified***                   │
//!    │ ◀────────────────────────────────── │
//!    │  (angle ..)(track ..)(speedX ..)..  │
//!    │ ◀────────────────────────────────── │
//!    │  (steer ..)(accel ..)(gear ..)      │
//!    │ ──────────────────────────────────▶ │
//! ```
//!
//! The codec holds no state and is safe to share between sessions.

mod control;
pub mod group;
mod init;
mod sensor;
mod signal;

pub use control::{ControlCommand, encode_restart_request};
pub use init::{encode_init, rangefinder_angles};
pub use sensor::{ExtendedSensors, SensorSnapshot, keys, normalize_gear};
pub use signal::ServerSignal;

#[cfg(test)]
pub(crate) use sensor::SAMPLE_TELEMETRY;
