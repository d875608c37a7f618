//! SCR racing client.
//!
//! Connects to a race server, identifies, and drives with the rule-based
//! policy, restarting on server request until the episode budget is spent.
//! Telemetry goes to a CSV file unless `--no-telemetry` is given.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use scr_client::prelude::*;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Autonomous driver for the SCR racing server.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Race server host.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Race server port.
    #[arg(short, long, default_value_t = 3001)]
    port: u16,

    /// Bot identifier sent with the init message.
    #[arg(long = "id", default_value = "SCR")]
    identifier: String,

    /// Episodes to run; 0 runs until the server shuts down.
    #[arg(long, default_value_t = 1)]
    max_episodes: u32,

    /// Ticks per episode before asking for a restart; 0 is unlimited.
    #[arg(long, default_value_t = 0)]
    max_steps: u64,

    /// Wait per identification attempt, milliseconds.
    #[arg(long, default_value_t = 1000)]
    identify_timeout_ms: u64,

    /// Wait for telemetry while driving, milliseconds.
    #[arg(long, default_value_t = 100)]
    drive_timeout_ms: u64,

    /// Init re-sends before giving up; retries forever when omitted.
    #[arg(long)]
    max_identify_retries: Option<u32>,

    /// CSV telemetry log.
    #[arg(long, default_value = "telemetry_log.csv")]
    logfile: PathBuf,

    /// Minimum spacing between telemetry rows, milliseconds.
    #[arg(long, default_value_t = 50)]
    log_interval_ms: u64,

    /// Do not write a telemetry log.
    #[arg(long)]
    no_telemetry: bool,

    /// Speed the driver holds.
    #[arg(long, default_value_t = 100.0)]
    target_speed: f64,

    /// RPM above which a rising engine shifts up.
    #[arg(long, default_value_t = 7000.0)]
    upshift_rpm: f64,

    /// RPM below which a falling engine shifts down.
    #[arg(long, default_value_t = 3000.0)]
    downshift_rpm: f64,
}

impl Cli {
    fn session_config(&self) -> Result<SessionConfig, ScrError> {
        let mut builder = SessionConfig::builder()
            .host(self.host.clone())
            .port(self.port)
            .identifier(self.identifier.clone())
            .max_steps(self.max_steps)
            .identify_timeout(Duration::from_millis(self.identify_timeout_ms))
            .drive_timeout(Duration::from_millis(self.drive_timeout_ms));
        if let Some(retries) = self.max_identify_retries {
            builder = builder.max_identify_retries(retries);
        }
        Ok(builder.build()?)
    }

    fn heuristic_config(&self) -> HeuristicConfig {
        HeuristicConfig {
            target_speed: self.target_speed,
            upshift_rpm: self.upshift_rpm,
            downshift_rpm: self.downshift_rpm,
            ..HeuristicConfig::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scr_client=info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(summary) => {
            info!(
                episodes = summary.episodes,
                steps = summary.total_steps,
                commands = summary.stats.commands_sent,
                decode_errors = summary.stats.decode_errors,
                reason = ?summary.last_reason,
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "scr-client failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<EpisodeSummary, ScrError> {
    let config = cli.session_config()?;
    let tuning = cli.heuristic_config();

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupted, stopping");
                on_ctrl_c.cancel();
            }
            Err(err) => warn!(%err, "cannot listen for ctrl-c"),
        }
    });

    let mut csv_sink = if cli.no_telemetry {
        None
    } else {
        let sink = CsvTelemetrySink::create(&cli.logfile)?
            .with_min_interval(Duration::from_millis(cli.log_interval_ms));
        info!(path = %cli.logfile.display(), "logging telemetry");
        Some(sink)
    };

    info!(
        host = %config.host,
        port = config.port,
        id = %config.identifier,
        "scr-client v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut runner = EpisodeRunner::new(config, move || HeuristicPolicy::new(tuning.clone()))
        .max_episodes(cli.max_episodes)
        .with_cancellation(cancel);
    let sink = csv_sink
        .as_mut()
        .map(|sink| sink as &mut dyn TelemetrySink);

    Ok(runner.run(sink).await?)
}
