//! Entry point for the campsite watcher.
//! Loads settings from the environment and polls until Ctrl-C or SIGTERM.

use campground_scan::WatchConfig;

mod scan_manager;
use scan_manager::ScanManager;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    log::info!("🚀 Starting campsite watcher...");

    let config = match WatchConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Failed to load configuration: {}", e);
            log::error!("💡 PUSHOVER_USER and PUSHOVER_TOKEN must be set (a .env file works)");
            std::process::exit(1);
        }
    };

    log::info!(
        "🏕️ Watching location {} for {} to {} ({:?} request, every {}s)",
        config.location_id,
        config.arrival,
        config.departure,
        config.request_style,
        config.poll_interval_secs
    );
    log::info!("🌐 Availability endpoint: {}", config.api_url);

    let mut manager = ScanManager::new(config);
    if let Err(e) = manager.start() {
        log::error!("❌ Failed to start watcher: {}", e);
        std::process::exit(1);
    }

    shutdown_signal().await;

    manager.stop().await;
    log::info!("👋 Campsite watcher stopped");
}

/// Resolve on Ctrl-C or SIGTERM.
///
/// A listener that cannot be installed never resolves, so the watcher keeps
/// polling instead of exiting at startup.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("🛑 Interrupt received, shutting down"),
            Err(e) => {
                log::error!("❌ Unable to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                log::info!("🛑 SIGTERM received, shutting down");
            }
            Err(e) => {
                log::error!("❌ Unable to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
