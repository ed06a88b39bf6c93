use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::monitor::{Monitor, PassReport};
use crate::scraper::Fetch;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerStats {
    pub passes_run: u64,
    pub readings_recorded: u64,
    pub failed_checks: u64,
    pub alerts_sent: u64,
    pub started_at: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
}

impl SchedulerStats {
    fn new() -> Self {
        Self {
            passes_run: 0,
            readings_recorded: 0,
            failed_checks: 0,
            alerts_sent: 0,
            started_at: Utc::now(),
            last_run: None,
        }
    }

    fn record(&mut self, report: &PassReport) {
        self.passes_run += 1;
        self.readings_recorded += report.recorded() as u64;
        self.failed_checks += report.failed() as u64;
        self.alerts_sent += report.alerts_sent() as u64;
        self.last_run = Some(Utc::now());
    }

    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }
}

/// Runs monitoring passes on a fixed cadence.
pub struct PriceScheduler<F: Fetch> {
    monitor: Arc<Monitor<F>>,
    interval: Duration,
}

impl<F: Fetch> PriceScheduler<F> {
    pub fn new(monitor: Arc<Monitor<F>>, interval: Duration) -> Self {
        Self { monitor, interval }
    }

    pub fn from_config(monitor: Arc<Monitor<F>>, config: &AppConfig) -> Self {
        Self::new(monitor, config.check_interval())
    }

    /// Run one pass now and then one per interval until `cancel` fires.
    ///
    /// A pass that is already running finishes its current item and stops.
    pub async fn run(&self, cancel: CancellationToken) -> SchedulerStats {
        let mut stats = SchedulerStats::new();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Price scheduler started, checking every {:?}", self.interval);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let report = self.monitor.run_pass(&cancel).await;
            stats.record(&report);

            if report.cancelled {
                break;
            }
            tracing::debug!("Next check in {:?}", self.interval);
        }

        tracing::info!(
            "Price scheduler stopped after {} pass(es), {} alert(s)",
            stats.passes_run,
            stats.alerts_sent
        );
        stats
    }
}
