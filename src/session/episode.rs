//! Multi-episode driver.
//!
//! A server restart ends a [`Session`]; the runner answers it by opening a
//! fresh transport and a fresh policy and identifying again.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{Session, SessionConfig, SessionError, SessionStats, TerminationReason};
use crate::core::{Policy, TelemetrySink};
use crate::transport::{Transport, UdpTransport};

/// Outcome of an [`EpisodeRunner`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeSummary {
    /// Episodes started.
    pub episodes: u32,
    /// Telemetry messages decoded over all episodes.
    pub total_steps: u64,
    /// Termination reason of the last episode.
    pub last_reason: Option<TerminationReason>,
    /// Counters summed over all episodes.
    pub stats: SessionStats,
}

/// Runs sessions back to back while the server keeps restarting.
///
/// Every episode gets a new policy from `make_policy`, so policy memory such
/// as the previous RPM never leaks across an episode boundary.
pub struct EpisodeRunner<F> {
    config: SessionConfig,
    max_episodes: Option<u32>,
    make_policy: F,
    cancel: CancellationToken,
}

impl<F, P> EpisodeRunner<F>
where
    F: FnMut() -> P,
    P: Policy,
{
    /// Create a runner with no episode limit.
    pub fn new(config: SessionConfig, make_policy: F) -> Self {
        Self {
            config,
            max_episodes: None,
            make_policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop after `episodes` episodes; `0` means no limit.
    pub fn max_episodes(mut self, episodes: u32) -> Self {
        self.max_episodes = (episodes > 0).then_some(episodes);
        self
    }

    /// Stop when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run episodes over UDP.
    pub async fn run(
        &mut self,
        sink: Option<&mut dyn TelemetrySink>,
    ) -> Result<EpisodeSummary, SessionError> {
        self.run_with(Session::<UdpTransport>::connect, sink).await
    }

    /// Run episodes, opening each session with `connect`.
    ///
    /// Stops after a shutdown, a cancellation, a fatal error or when the
    /// episode budget is spent. Only a server restart starts another episode.
    pub async fn run_with<T, C, Fut>(
        &mut self,
        mut connect: C,
        mut sink: Option<&mut dyn TelemetrySink>,
    ) -> Result<EpisodeSummary, SessionError>
    where
        T: Transport,
        C: FnMut(SessionConfig) -> Fut,
        Fut: Future<Output = Result<Session<T>, SessionError>>,
    {
        let mut summary = EpisodeSummary::default();

        loop {
            if self.cancel.is_cancelled() {
                summary.last_reason = Some(TerminationReason::Cancelled);
                break;
            }

            let mut session = connect(self.config.clone())
                .await?
                .with_cancellation(self.cancel.clone());
            let mut policy = (self.make_policy)();
            summary.episodes += 1;
            info!(episode = summary.episodes, "starting episode");

            let episode_sink: Option<&mut dyn TelemetrySink> = match sink {
                Some(ref mut sink) => Some(&mut **sink),
                None => None,
            };
            let result = session.run(&mut policy, episode_sink).await;
            summary.total_steps += session.steps();
            summary.stats.merge(session.stats());
            let reason = result?;
            summary.last_reason = Some(reason);
            info!(
                episode = summary.episodes,
                %reason,
                steps = session.steps(),
                "episode finished"
            );

            if reason != TerminationReason::ServerRestart {
                break;
            }
            if self.max_episodes.is_some_and(|max| summary.episodes >= max) {
                info!(episodes = summary.episodes, "episode budget spent");
                break;
            }
        }

        Ok(summary)
    }
}
