use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

/// Status string the upstream uses for a bookable night or spot.
pub const AVAILABLE_STATUS: &str = "Available";

/// Identifier the upstream sends either as a string or as an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Identifier {
    /// Numeric form, e.g. `201`
    Number(i64),
    /// String form, e.g. `"201"`
    Text(String),
}

impl Identifier {
    /// Read an identifier from a JSON value, ignoring any other JSON type.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            // Floats and ids past i64 keep their JSON text.
            Value::Number(n) => Some(
                n.as_i64()
                    .map(Identifier::Number)
                    .unwrap_or_else(|| Identifier::Text(n.to_string())),
            ),
            Value::String(s) if !s.is_empty() => Some(Identifier::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Number(n) => write!(f, "{}", n),
            Identifier::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Identifier::Number(value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::Text(value.to_string())
    }
}

/// The stay being watched: check-in through check-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StayWindow {
    arrival: NaiveDate,
    departure: NaiveDate,
}

impl StayWindow {
    /// Departure must fall after arrival.
    pub fn new(arrival: NaiveDate, departure: NaiveDate) -> Result<Self, ScanError> {
        if departure <= arrival {
            return Err(ScanError::InvalidDateRange);
        }
        Ok(Self { arrival, departure })
    }

    /// Check-in date
    pub fn arrival(&self) -> NaiveDate {
        self.arrival
    }

    /// Check-out date
    pub fn departure(&self) -> NaiveDate {
        self.departure
    }

    /// Every night that has to be bookable, arrival inclusive, departure exclusive.
    pub fn nights(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.arrival
            .iter_days()
            .take_while(move |date| *date < self.departure)
    }

    /// Whether a date reported by the upstream falls inside arrival..=departure.
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.arrival && date <= self.departure
    }
}

/// One spot entry from an availability response.
///
/// Built leniently: a field with an unexpected JSON type is treated as absent,
/// so a malformed entry evaluates as unavailable instead of failing the poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpotRecord {
    /// `id` or `spotId`
    pub id: Option<Identifier>,
    /// Display name, when the upstream sends one
    pub name: Option<String>,
    /// `isSpotAvailable` flag
    pub is_spot_available: Option<bool>,
    /// Single `availability` status string
    pub availability: Option<String>,
    /// Per-date `availabilities` map of date key to status
    pub availabilities: Option<BTreeMap<String, String>>,
}

impl SpotRecord {
    /// Convert one raw upstream entry.
    pub fn from_value(value: &Value) -> Self {
        let id = value
            .get("id")
            .and_then(Identifier::from_value)
            .or_else(|| value.get("spotId").and_then(Identifier::from_value));

        let name = value
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        // Non-string statuses keep their JSON text and never match the sentinel.
        let availabilities = value
            .get("availabilities")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .map(|(date, status)| {
                        let status = match status {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (date.clone(), status)
                    })
                    .collect()
            });

        Self {
            id,
            name,
            is_spot_available: value.get("isSpotAvailable").and_then(Value::as_bool),
            availability: value
                .get("availability")
                .and_then(Value::as_str)
                .map(str::to_string),
            availabilities,
        }
    }

    /// Name used in alerts and as the de-duplication key.
    pub fn display_name(&self) -> String {
        match (&self.name, &self.id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => format!("Spot {}", id),
            (None, None) => "Spot unknown".to_string(),
        }
    }
}

/// Errors raised while talking to the availability API or loading settings.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limited by external API
    #[error("Rate limited by external API")]
    RateLimited,

    /// Authentication failed with external service
    #[error("Authentication failed with external service")]
    AuthenticationFailed,

    /// Non-success status or other upstream failure
    #[error("API error: {0}")]
    ApiError(String),

    /// Response was not JSON, usually a login or maintenance page
    #[error("Expected JSON but got '{content_type}': {snippet}")]
    NotJson {
        /// Declared content type, empty when missing
        content_type: String,
        /// Start of the response body
        snippet: String,
    },

    /// Data format error
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// Invalid date range
    #[error("Invalid date range: departure date must be after arrival date")]
    InvalidDateRange,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// First `max` characters of `text`, for log lines.
pub(crate) fn snippet(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
