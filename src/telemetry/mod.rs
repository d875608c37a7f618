//! Telemetry sinks.
//!
//! A sink receives every decoded snapshot together with the command sent on
//! that tick. Sessions treat sinks as fire-and-forget: a failing sink is
//! logged and never stops the drive loop.
//!
//! - [`CsvTelemetrySink`]: throttled CSV log (requires `csv-sink` feature)

#[cfg(feature = "csv-sink")]
mod csv;

#[cfg(feature = "csv-sink")]
pub use self::csv::CsvTelemetrySink;
