//! # SCR client
//!
//! Client library for the **S**imulated **C**ar **R**acing server protocol, the
//! UDP interface a racing simulator exposes to autonomous drivers.
//!
//! The server pushes one telemetry datagram per simulation tick; the client
//! answers each with one control command. This crate provides:
//!
//! - **Codec**: order-independent telemetry decoding, clamping command encoding
//! - **Session**: the `Disconnected → Identifying → Driving → Terminated` machine
//! - **Policies**: a pluggable [`Policy`] seam plus a rule-based driver
//! - **Telemetry**: a fire-and-forget [`TelemetrySink`] seam plus a CSV log
//!
//! ## Feature Flags
//!
//! - `session` (default): tokio UDP transport, session state machine, episodes
//! - `csv-sink` (default): CSV telemetry sink
//! - `cli`: the `scr-client` binary
//!
//! ## Modules
//!
//! - [`core`]: Constants, error types and collaborator traits (always included)
//! - [`codec`]: Wire format (always included)
//! - [`policy`]: Control policy variants (always included)
//! - [`telemetry`]: Telemetry sinks
//! - [`transport`]: UDP transport (requires `session` feature)
//! - [`session`]: Session state machine (requires `session` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use scr_client::prelude::*;
//!
//! let telemetry = "(angle 0.1)(track 7 7 7 7 7 7 7 7 7 7 7 7 7 7 7 7 7 7 7)\
//!                  (speedX 42)(speedY 0)(speedZ 0)(trackPos -0.2)(rpm 5200)(gear 2)";
//! let snapshot = SensorSnapshot::decode(telemetry.as_bytes()).unwrap();
//!
//! let mut policy = HeuristicPolicy::default();
//! let command = policy.decide(&snapshot).unwrap();
//!
//! let reply = String::from_utf8(command.encode()).unwrap();
//! assert!(reply.starts_with("(steer "));
//! assert!(reply.contains("(gear 2)"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Wire codec (always included)
pub mod codec;

// Policy variants (always included)
pub mod policy;

// Telemetry sinks (CSV sink is feature-gated inside)
pub mod telemetry;

// Transport layer (feature-gated)
#[cfg(feature = "session")]
#[cfg_attr(docsrs, doc(cfg(feature = "session")))]
pub mod transport;

// Session layer (feature-gated)
#[cfg(feature = "session")]
#[cfg_attr(docsrs, doc(cfg(feature = "session")))]
pub mod session;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core traits and types
    pub use crate::core::*;

    // Codec and policies
    pub use crate::codec::{ControlCommand, ExtendedSensors, SensorSnapshot, ServerSignal};
    pub use crate::policy::{GearShifter, HeuristicConfig, HeuristicPolicy};

    // Telemetry sinks (when enabled)
    #[cfg(feature = "csv-sink")]
    pub use crate::telemetry::CsvTelemetrySink;

    // Session types (when enabled)
    #[cfg(feature = "session")]
    pub use crate::session::{
        EpisodeRunner, EpisodeSummary, Session, SessionConfig, SessionConfigBuilder, SessionError,
        SessionPhase, SessionStats, TerminationReason,
    };

    #[cfg(feature = "session")]
    pub use crate::transport::{Transport, TransportError, UdpTransport};
}

// Re-export commonly used items at crate root
pub use crate::codec::{ControlCommand, SensorSnapshot};
pub use crate::core::{DecodeError, Policy, PolicyError, ScrError, SinkError, TelemetrySink};

#[cfg(feature = "session")]
pub use crate::session::{Session, SessionConfig, SessionError, TerminationReason};
