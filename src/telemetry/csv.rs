//! CSV telemetry sink.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::debug;

use crate::codec::{ControlCommand, SensorSnapshot};
use crate::core::constants::DEFAULT_TELEMETRY_INTERVAL;
use crate::core::{SinkError, TelemetrySink};

/// Log a progress line every this many rows.
const PROGRESS_EVERY: u64 = 100;

/// One CSV line. Command columns are empty on ticks without a command.
#[derive(Debug, Serialize)]
struct Row<'a> {
    timestamp: f64,
    angle: f64,
    track: &'a str,
    #[serde(rename = "speedX")]
    speed_x: f64,
    #[serde(rename = "speedY")]
    speed_y: f64,
    #[serde(rename = "speedZ")]
    speed_z: f64,
    speed: f64,
    #[serde(rename = "trackPos")]
    track_position: f64,
    rpm: f64,
    gear: i32,
    damage: Option<f64>,
    fuel: Option<f64>,
    #[serde(rename = "curLapTime")]
    cur_lap_time: Option<f64>,
    #[serde(rename = "lastLapTime")]
    last_lap_time: Option<f64>,
    #[serde(rename = "distFromStart")]
    dist_from_start: Option<f64>,
    #[serde(rename = "distRaced")]
    dist_raced: Option<f64>,
    #[serde(rename = "racePos")]
    race_position: Option<u32>,
    z: Option<f64>,
    steer: Option<f64>,
    accel: Option<f64>,
    brake: Option<f64>,
    #[serde(rename = "ctrlGear")]
    ctrl_gear: Option<i32>,
    clutch: Option<f64>,
    meta: Option<i32>,
}

/// Writes one CSV row per recorded tick, at most one per `min_interval`.
///
/// Rows are flushed as they are written so a crash loses at most the tick
/// in flight.
pub struct CsvTelemetrySink<W: Write> {
    writer: csv::Writer<W>,
    min_interval: Duration,
    last_row: Option<Instant>,
    rows_written: u64,
}

impl CsvTelemetrySink<File> {
    /// Create (or truncate) the CSV file at `path`, creating parent
    /// directories as needed.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        debug!(path = %path.display(), "telemetry log created");
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> CsvTelemetrySink<W> {
    /// Write CSV to any writer.
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            min_interval: DEFAULT_TELEMETRY_INTERVAL,
            last_row: None,
            rows_written: 0,
        }
    }

    /// Set the minimum spacing between rows; zero records every tick.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Rows written so far, header excluded.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|err| SinkError::Io(err.into_error()))
    }

    fn due(&self, now: Instant) -> bool {
        self.last_row
            .is_none_or(|last| now.duration_since(last) >= self.min_interval)
    }
}

impl<W: Write + Send> TelemetrySink for CsvTelemetrySink<W> {
    fn record(
        &mut self,
        snapshot: &SensorSnapshot,
        command: Option<&ControlCommand>,
    ) -> Result<(), SinkError> {
        let now = Instant::now();
        if !self.due(now) {
            return Ok(());
        }

        let track = snapshot
            .track_edges
            .iter()
            .map(f64::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        let ext = &snapshot.extended;
        let row = Row {
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs_f64(),
            angle: snapshot.angle,
            track: &track,
            speed_x: snapshot.speed_x,
            speed_y: snapshot.speed_y,
            speed_z: snapshot.speed_z,
            speed: snapshot.speed(),
            track_position: snapshot.track_position,
            rpm: snapshot.rpm,
            gear: snapshot.gear,
            damage: ext.damage,
            fuel: ext.fuel,
            cur_lap_time: ext.cur_lap_time,
            last_lap_time: ext.last_lap_time,
            dist_from_start: ext.dist_from_start,
            dist_raced: ext.dist_raced,
            race_position: ext.race_position,
            z: ext.z,
            steer: command.map(|c| c.steer),
            accel: command.map(|c| c.accel),
            brake: command.map(|c| c.brake),
            ctrl_gear: command.map(|c| c.gear),
            clutch: command.map(|c| c.clutch),
            meta: command.map(|c| c.meta),
        };

        self.writer.serialize(&row)?;
        self.writer.flush()?;
        self.last_row = Some(now);
        self.rows_written += 1;
        if self.rows_written % PROGRESS_EVERY == 0 {
            debug!(rows = self.rows_written, "telemetry rows written");
        }
        Ok(())
    }
}
