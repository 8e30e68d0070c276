//! # Scale Polling Loop
//!
//! This module provides the [`Poller`], which drives a [`ScaleSession`] forever and
//! decides, per failure, whether to simply skip a cycle or to rebuild the link.
//!
//! The loop has two states. In [`LinkState::Disconnected`] it keeps trying to open
//! the port, waiting the recovery delay after each failed attempt. In
//! [`LinkState::Connected`] it polls the scale every retry delay:
//!
//! - a protocol violation skips the cycle and leaves the reading untouched;
//! - a link error waits the recovery delay, reopens the port and keeps polling.
//!   The reopen is optimistic: the next poll shows whether it worked.

use crate::error::{ProtocolViolation, ScaleError};
use crate::scale::frame::ScaleStatus;
use crate::scale::serial::duration_ms;
use crate::scale::serial::ScaleTransport;
use crate::scale::session::ScaleSession;
use crate::scale::units::WeightUnit;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Timing and presentation settings of the polling loop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Delay between polls, and after a skipped cycle.
    #[serde(with = "duration_ms")]
    pub retry_delay: Duration,
    /// Delay before reopening the port after a link error.
    #[serde(with = "duration_ms")]
    pub recovery_delay: Duration,
    /// Unit readings are reported in.
    pub unit: WeightUnit,
    pub decimal_places: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        PollerConfig {
            retry_delay: Duration::from_millis(300),
            recovery_delay: Duration::from_secs(5),
            unit: WeightUnit::Grams,
            decimal_places: 1,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LinkState {
    Disconnected,
    Connected,
}

/// A reading ready for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightReport {
    pub weight: Decimal,
    pub unit: WeightUnit,
    pub status: ScaleStatus,
}

impl fmt::Display for WeightReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.weight, self.unit, self.status)
    }
}

/// What a single poll cycle did.
#[derive(Debug)]
pub enum PollOutcome {
    /// The port was opened; polling starts next cycle.
    Connected,
    /// Opening the port failed or it did not report open.
    ConnectFailed(Option<ScaleError>),
    /// A frame was decoded and committed.
    Reading(WeightReport),
    /// The response was invalid; nothing was committed.
    Skipped(ProtocolViolation),
    /// The channel failed; the port will be reopened after the recovery delay.
    LinkLost(ScaleError),
}

/// Counters kept across the lifetime of a poller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub connect_attempts: u64,
    pub readings: u64,
    pub skipped: u64,
    pub recoveries: u64,
}

/// Drives a scale session according to the link recovery policy.
pub struct Poller<T: ScaleTransport> {
    session: ScaleSession<T>,
    config: PollerConfig,
    state: LinkState,
    stats: PollStats,
}

impl<T: ScaleTransport> Poller<T> {
    pub fn new(session: ScaleSession<T>, config: PollerConfig) -> Self {
        Poller {
            session,
            config,
            state: LinkState::Disconnected,
            stats: PollStats::default(),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    pub fn session(&self) -> &ScaleSession<T> {
        &self.session
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Performs the action of one cycle without waiting afterwards.
    pub async fn poll_once(&mut self) -> PollOutcome {
        match self.state {
            LinkState::Disconnected => {
                self.stats.connect_attempts += 1;
                match self.session.initialize().await {
                    Ok(true) => {
                        self.state = LinkState::Connected;
                        log::info!("Process is started.");
                        PollOutcome::Connected
                    }
                    Ok(false) => PollOutcome::ConnectFailed(None),
                    Err(e) => PollOutcome::ConnectFailed(Some(e)),
                }
            }
            LinkState::Connected => match self.session.update().await {
                Ok(_) => {
                    self.stats.readings += 1;
                    PollOutcome::Reading(self.report())
                }
                Err(ScaleError::Protocol(violation)) => {
                    self.stats.skipped += 1;
                    PollOutcome::Skipped(violation)
                }
                Err(e) => {
                    log::warn!("Link lost, reconnecting in {:?}", self.config.recovery_delay);
                    PollOutcome::LinkLost(e)
                }
            },
        }
    }

    /// Waits the delay `outcome` calls for, and reopens the port after a lost link.
    pub async fn settle(&mut self, outcome: &PollOutcome) {
        match outcome {
            PollOutcome::Connected => {}
            PollOutcome::ConnectFailed(_) => tokio::time::sleep(self.config.recovery_delay).await,
            PollOutcome::Reading(_) | PollOutcome::Skipped(_) => {
                tokio::time::sleep(self.config.retry_delay).await
            }
            PollOutcome::LinkLost(_) => {
                tokio::time::sleep(self.config.recovery_delay).await;
                self.stats.recoveries += 1;
                self.session.reinitialize().await;
            }
        }
    }

    /// One full cycle: act, then wait as the outcome requires.
    pub async fn cycle(&mut self) -> PollOutcome {
        let outcome = self.poll_once().await;
        self.settle(&outcome).await;
        outcome
    }

    /// Keeps trying to open the port until it reports open.
    pub async fn connect(&mut self) {
        log::info!("Starting...");
        while self.state == LinkState::Disconnected {
            self.cycle().await;
        }
    }

    /// Polls forever, handing every committed reading to `on_report` before waiting.
    ///
    /// Never returns; stop it by dropping the future.
    pub async fn run<F: FnMut(&WeightReport)>(&mut self, mut on_report: F) {
        loop {
            let outcome = self.poll_once().await;
            if let PollOutcome::Reading(report) = &outcome {
                on_report(report);
            }
            self.settle(&outcome).await;
        }
    }

    fn report(&self) -> WeightReport {
        WeightReport {
            weight: self
                .session
                .weight(self.config.unit, self.config.decimal_places),
            unit: self.config.unit,
            status: self.session.status(),
        }
    }
}
