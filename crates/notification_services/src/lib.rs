//! # Notification Services
//!
//! This crate delivers push notifications for the campsite watcher.
//! It includes the `Notifier` seam used by the poll loop and a Pushover implementation.

/// Notifier trait and the Pushover client.
pub mod service;
/// Types and configuration used by notification services.
pub mod types;

pub use service::{Notifier, PushoverNotifier};
pub use types::{NotificationError, PushoverConfig};
