//! # Campground Scan
//!
//! This crate watches one campground location for a fixed stay and raises an
//! alert the first time each spot opens up. It covers the availability request,
//! response parsing, the availability rules, and the poll loop that ties them together.

/// Shared types: identifiers, stay window, spot records and errors
mod scan_types;
pub use scan_types::*;

/// Watch configuration loaded at startup
mod config;
pub use config::*;

/// Rules deciding whether a spot is bookable for the stay
mod availability;
pub use availability::*;

/// HTTP client for the spot-availability API
mod availability_client;
pub use availability_client::*;

/// Record of spots already alerted
mod alert_state;
pub use alert_state::*;

/// Poll loop driving fetch, evaluation and alerts
mod executor;
pub use executor::*;
