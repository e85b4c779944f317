use std::sync::Arc;

use campground_scan::{AvailabilityClient, ScanError, ScanExecutor, WatchConfig};
use notification_services::PushoverNotifier;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Owns the background poll task and its shutdown signal
pub struct ScanManager {
    config: WatchConfig,
    executor_handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<watch::Sender<bool>>,
}

impl ScanManager {
    /// Create a new scan manager
    pub fn new(config: WatchConfig) -> Self {
        Self {
            config,
            executor_handle: None,
            shutdown_tx: None,
        }
    }

    /// Build the client, notifier and executor, then start polling in the background
    pub fn start(&mut self) -> Result<(), ScanError> {
        info!("Starting scan execution system");

        let client = Arc::new(AvailabilityClient::new(&self.config)?);

        let notifier = Arc::new(
            PushoverNotifier::new(self.config.notification.clone())
                .map_err(|e| ScanError::ConfigError(e.to_string()))?,
        );

        let mut executor = ScanExecutor::new(&self.config, client, notifier)?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            executor
                .start(async move {
                    // A dropped sender also ends the loop.
                    let _ = shutdown_rx.wait_for(|stop| *stop).await;
                })
                .await;
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.executor_handle = Some(handle);

        info!("Scan execution system started successfully");
        Ok(())
    }

    /// Signal the poll loop and wait for the current cycle to finish
    pub async fn stop(&mut self) {
        info!("Stopping scan execution system");

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(true);
        }

        if let Some(handle) = self.executor_handle.take() {
            if let Err(e) = handle.await {
                error!("Scan executor task failed: {}", e);
            }
        }

        info!("Scan execution system stopped");
    }

    /// Whether the poll task is still running
    pub fn is_running(&self) -> bool {
        self.executor_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for ScanManager {
    fn drop(&mut self) {
        if let Some(handle) = self.executor_handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campground_scan::{Identifier, parse_date};
    use notification_services::PushoverConfig;

    fn config() -> WatchConfig {
        let mut config = WatchConfig::new(
            Identifier::from("201"),
            parse_date("2025-06-28").unwrap(),
            parse_date("2025-06-29").unwrap(),
            PushoverConfig::new("user", "token"),
        );
        // Nothing listens here, so every poll is an empty cycle.
        config.api_url = "http://127.0.0.1:9/api/availability".to_string();
        config.notification.api_url = "http://127.0.0.1:9/1/messages.json".to_string();
        config
    }

    #[tokio::test]
    async fn test_start_then_stop() {
        let mut manager = ScanManager::new(config());
        assert!(!manager.is_running());

        manager.start().unwrap();
        assert!(manager.is_running());

        manager.stop().await;
        assert!(!manager.is_running());
    }

    #[tokio::test]
    async fn test_invalid_dates_refuse_to_start() {
        let mut config = config();
        config.departure = config.arrival;

        let mut manager = ScanManager::new(config);
        assert!(matches!(manager.start(), Err(ScanError::InvalidDateRange)));
        assert!(!manager.is_running());
    }
}
