use std::any::Any;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use futures_util::FutureExt;
use notification_services::Notifier;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

use crate::alert_state::AlertedSet;
use crate::availability::AvailabilityEvaluator;
use crate::availability_client::AvailabilitySource;
use crate::config::{AlertPolicy, WatchConfig};
use crate::scan_types::ScanError;

/// Outcome of a single poll cycle
#[derive(Debug, Clone)]
pub struct PollSummary {
    /// 1-based poll number
    pub poll: u64,
    /// Spots returned by the upstream
    pub spots_scanned: usize,
    /// Spots bookable for the whole stay
    pub available: usize,
    /// Notifications attempted this cycle
    pub alerts_attempted: usize,
    /// When the cycle finished
    pub checked_at: DateTime<Utc>,
}

impl PollSummary {
    /// Whether any spot was bookable.
    pub fn found(&self) -> bool {
        self.available > 0
    }
}

/// Timing and alerting settings for the poll loop
#[derive(Debug, Clone)]
pub struct ScanExecutorConfig {
    /// Time between poll starts (default: 5 minutes)
    pub poll_interval: Duration,

    /// Check-in date quoted in alert messages
    pub arrival: NaiveDate,

    /// Re-alert behaviour for spots that close again
    pub alert_policy: AlertPolicy,
}

impl ScanExecutorConfig {
    /// Executor settings taken from the watch config.
    pub fn from_watch_config(config: &WatchConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            arrival: config.arrival,
            alert_policy: config.alert_policy,
        }
    }
}

/// Poll loop: fetch, evaluate, alert once per newly open spot, sleep.
pub struct ScanExecutor {
    source: Arc<dyn AvailabilitySource>,
    notifier: Arc<dyn Notifier>,
    evaluator: AvailabilityEvaluator,

    /// Names already alerted, owned by the loop alone
    alerted: AlertedSet,

    poll_count: u64,
    config: ScanExecutorConfig,
}

impl ScanExecutor {
    /// Executor for the stay described by `config`.
    pub fn new(
        config: &WatchConfig,
        source: Arc<dyn AvailabilitySource>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ScanError> {
        let evaluator = AvailabilityEvaluator::new(config.stay_window()?);
        Ok(Self::with_evaluator(
            evaluator,
            source,
            notifier,
            ScanExecutorConfig::from_watch_config(config),
        ))
    }

    /// Executor with an explicit evaluator.
    pub fn with_evaluator(
        evaluator: AvailabilityEvaluator,
        source: Arc<dyn AvailabilitySource>,
        notifier: Arc<dyn Notifier>,
        config: ScanExecutorConfig,
    ) -> Self {
        Self {
            source,
            notifier,
            evaluator,
            alerted: AlertedSet::new(config.alert_policy),
            poll_count: 0,
            config,
        }
    }

    /// Spots alerted so far.
    pub fn alerted(&self) -> &AlertedSet {
        &self.alerted
    }

    /// Polls started so far.
    pub fn poll_count(&self) -> u64 {
        self.poll_count
    }

    /// Poll on every interval tick until `shutdown` resolves.
    ///
    /// The first poll runs immediately. A cycle that panics is logged and the
    /// loop waits for the next tick as usual.
    pub async fn start<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting availability watch, polling every {}s",
            self.config.poll_interval.as_secs()
        );

        let mut poll_interval = interval(self.config.poll_interval);
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping after {} polls", self.poll_count);
                    break;
                }
                _ = poll_interval.tick() => {
                    if let Err(panic) = AssertUnwindSafe(self.poll_once()).catch_unwind().await {
                        error!(
                            "Poll {} aborted: {}",
                            self.poll_count,
                            panic_message(panic.as_ref())
                        );
                    }
                }
            }
        }
    }

    /// Run one fetch → evaluate → alert cycle.
    pub async fn poll_once(&mut self) -> PollSummary {
        self.poll_count += 1;

        let spots = self.source.fetch_spots().await;
        let verdicts: Vec<(String, bool)> = spots
            .iter()
            .map(|spot| (spot.display_name(), self.evaluator.is_available(spot)))
            .collect();

        // A name is only closed when no entry carrying it is open this poll.
        let open_names: HashSet<&str> = verdicts
            .iter()
            .filter(|(_, open)| *open)
            .map(|(name, _)| name.as_str())
            .collect();

        for (name, _) in verdicts.iter().filter(|(_, open)| !*open) {
            if !open_names.contains(name.as_str()) && self.alerted.observe_closed(name) {
                info!("{} is no longer available, will alert again", name);
            }
        }

        let mut alerts_attempted = 0;
        for (name, _) in verdicts.iter().filter(|(_, open)| *open) {
            // Marked before sending so a failed delivery is never retried.
            if !self.alerted.mark_alerted(name) {
                debug!("Already alerted for {}", name);
                continue;
            }

            self.dispatch_alert(name).await;
            alerts_attempted += 1;
            info!("🔔 Alert sent for {}", name);
        }

        let summary = PollSummary {
            poll: self.poll_count,
            spots_scanned: spots.len(),
            available: verdicts.iter().filter(|(_, open)| *open).count(),
            alerts_attempted,
            checked_at: Utc::now(),
        };

        info!(
            "Poll {}: {} ({} spots scanned) at {}",
            summary.poll,
            if summary.found() {
                "FOUND availability"
            } else {
                "none"
            },
            summary.spots_scanned,
            summary.checked_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        summary
    }

    /// Best-effort send; failures are logged and dropped.
    async fn dispatch_alert(&self, name: &str) {
        let message = format!(
            "{} just opened for {}!",
            name,
            self.config.arrival.format("%Y-%m-%d")
        );

        if let Err(e) = self.notifier.send(&message).await {
            error!("Failed to send notification for {}: {}", name, e);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
