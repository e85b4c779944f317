use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use notification_services::PushoverConfig;
use validator::{Validate, ValidationError};

use crate::scan_types::{Identifier, ScanError, StayWindow};

/// Tenant availability endpoint the watcher was first written against.
pub const DEFAULT_API_URL: &str =
    "https://pa2wh3n7xa.execute-api.us-east-1.amazonaws.com/prod/v1/tenant/illinois/Spot/availability";

/// Eldon Hazlet
pub const DEFAULT_LOCATION_ID: &str = "201";

/// Seconds between polls (5 minutes)
pub const DEFAULT_POLL_SECONDS: u64 = 300;

/// Seconds before an availability request is abandoned
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 20;

/// Browser-like headers the tenant API expects.
pub const DEFAULT_HEADERS: [(&str, &str); 4] = [
    ("User-Agent", "Mozilla/5.0 (campsite-watcher)"),
    ("Accept", "application/json"),
    ("Origin", "https://camp.exploremoreil.com"),
    ("Referer", "https://camp.exploremoreil.com/"),
];

/// How the availability request is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestStyle {
    /// `GET` with `locationId`, `startDate`, `endDate` query parameters
    Get,
    /// `POST` with the tenant JSON body
    #[default]
    Post,
}

impl RequestStyle {
    /// Date format the upstream expects for this style.
    pub fn date_format(&self) -> &'static str {
        match self {
            RequestStyle::Get => "%Y-%m-%d",
            RequestStyle::Post => "%m/%d/%Y",
        }
    }
}

impl FromStr for RequestStyle {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "get" => Ok(RequestStyle::Get),
            "post" => Ok(RequestStyle::Post),
            other => Err(ScanError::ConfigError(format!(
                "Unknown request style '{}', expected 'get' or 'post'",
                other
            ))),
        }
    }
}

/// Whether a spot that closes again may alert a second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertPolicy {
    /// Alert once per spot for the lifetime of the process
    #[default]
    Once,
    /// Forget a spot once a poll sees it unavailable again
    Rearm,
}

impl FromStr for AlertPolicy {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" => Ok(AlertPolicy::Once),
            "rearm" => Ok(AlertPolicy::Rearm),
            other => Err(ScanError::ConfigError(format!(
                "Unknown alert policy '{}', expected 'once' or 'rearm'",
                other
            ))),
        }
    }
}

/// Everything the watcher needs, fixed for the life of the process.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_stay_dates"))]
pub struct WatchConfig {
    /// Campground location at the tenant
    pub location_id: Identifier,

    /// Check-in date
    pub arrival: NaiveDate,

    /// Check-out date
    pub departure: NaiveDate,

    /// Seconds between polls
    #[validate(range(min = 1, message = "Poll interval must be at least one second"))]
    pub poll_interval_secs: u64,

    /// Seconds before an availability request times out
    #[validate(range(min = 1, message = "Request timeout must be at least one second"))]
    pub timeout_secs: u64,

    /// Availability endpoint
    #[validate(url(message = "Availability API URL must be a valid URL"))]
    pub api_url: String,

    /// GET or POST request shape
    pub request_style: RequestStyle,

    /// Headers sent with every availability request
    pub headers: Vec<(String, String)>,

    /// Re-alert behaviour
    pub alert_policy: AlertPolicy,

    /// Push notification settings
    #[validate(nested)]
    pub notification: PushoverConfig,
}

impl WatchConfig {
    /// Build a config with the default endpoint, headers and timings.
    pub fn new(
        location_id: Identifier,
        arrival: NaiveDate,
        departure: NaiveDate,
        notification: PushoverConfig,
    ) -> Self {
        Self {
            location_id,
            arrival,
            departure,
            poll_interval_secs: DEFAULT_POLL_SECONDS,
            timeout_secs: DEFAULT_TIMEOUT_SECONDS,
            api_url: DEFAULT_API_URL.to_string(),
            request_style: RequestStyle::default(),
            headers: DEFAULT_HEADERS
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            alert_policy: AlertPolicy::default(),
            notification,
        }
    }

    /// Load settings from the environment and validate them.
    ///
    /// Only `PUSHOVER_USER` and `PUSHOVER_TOKEN` are required; every `WATCH_*`
    /// variable falls back to the built-in default.
    pub fn from_env() -> Result<Self, ScanError> {
        let notification =
            PushoverConfig::from_env().map_err(|e| ScanError::ConfigError(e.to_string()))?;

        let location_id = Identifier::Text(
            env::var("WATCH_LOCATION_ID").unwrap_or_else(|_| DEFAULT_LOCATION_ID.to_string()),
        );
        let arrival = env_date("WATCH_ARRIVAL", "2025-06-28")?;
        let departure = env_date("WATCH_DEPARTURE", "2025-06-29")?;

        let mut config = Self::new(location_id, arrival, departure, notification);

        config.poll_interval_secs = env_parse("WATCH_POLL_SECONDS", DEFAULT_POLL_SECONDS)?;
        config.timeout_secs = env_parse("WATCH_TIMEOUT_SECONDS", DEFAULT_TIMEOUT_SECONDS)?;
        config.request_style = env_parse("WATCH_REQUEST_STYLE", RequestStyle::default())?;
        config.alert_policy = env_parse("WATCH_ALERT_POLICY", AlertPolicy::default())?;
        if let Ok(api_url) = env::var("WATCH_API_URL") {
            config.api_url = api_url;
        }

        config.check()?;
        Ok(config)
    }

    /// Run the validation rules, flattening failures into one message.
    pub fn check(&self) -> Result<(), ScanError> {
        self.validate()
            .map_err(|e| ScanError::ConfigError(e.to_string()))
    }

    /// The stay this config watches.
    pub fn stay_window(&self) -> Result<StayWindow, ScanError> {
        StayWindow::new(self.arrival, self.departure)
    }

    /// Time between polls.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Request timeout for the availability call.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Schema-level check that the stay has at least one night.
fn validate_stay_dates(config: &WatchConfig) -> Result<(), ValidationError> {
    if config.departure <= config.arrival {
        return Err(ValidationError::new("invalid_date_range")
            .with_message("Departure date must be after arrival date".into()));
    }
    Ok(())
}

/// Parse `YYYY-MM-DD` or the tenant's `MM/DD/YYYY`.
pub fn parse_date(value: &str) -> Result<NaiveDate, ScanError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .map_err(|_| ScanError::ConfigError(format!("Invalid date '{}'", value)))
}

fn env_date(key: &str, default: &str) -> Result<NaiveDate, ScanError> {
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    parse_date(&value).map_err(|e| ScanError::ConfigError(format!("{}: {}", key, e)))
}

fn env_parse<T>(key: &str, default: T) -> Result<T, ScanError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| ScanError::ConfigError(format!("{}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WatchConfig {
        WatchConfig::new(
            Identifier::from("201"),
            parse_date("2025-06-28").unwrap(),
            parse_date("2025-06-29").unwrap(),
            PushoverConfig::new("user", "token"),
        )
    }

    #[test]
    fn test_defaults_validate() {
        let config = sample();
        assert!(config.check().is_ok());
        assert_eq!(config.request_style, RequestStyle::Post);
        assert_eq!(config.alert_policy, AlertPolicy::Once);
        assert_eq!(config.poll_interval(), Duration::from_secs(300));
        assert_eq!(config.headers.len(), 4);
    }

    #[test]
    fn test_inverted_dates_rejected() {
        let mut config = sample();
        config.departure = config.arrival;
        assert!(matches!(config.check(), Err(ScanError::ConfigError(_))));
        assert!(config.stay_window().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = sample();
        config.poll_interval_secs = 0;
        assert!(config.check().is_err());
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let mut config = sample();
        config.notification.api_token.clear();
        assert!(config.check().is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 6, 28).unwrap();
        assert_eq!(parse_date("2025-06-28").unwrap(), expected);
        assert_eq!(parse_date("06/28/2025").unwrap(), expected);
        assert!(parse_date("28.06.2025").is_err());
    }

    const ENV_KEYS: [&str; 12] = [
        "PUSHOVER_USER",
        "PUSHOVER_TOKEN",
        "PUSHOVER_TITLE",
        "PUSHOVER_API_URL",
        "WATCH_LOCATION_ID",
        "WATCH_ARRIVAL",
        "WATCH_DEPARTURE",
        "WATCH_POLL_SECONDS",
        "WATCH_TIMEOUT_SECONDS",
        "WATCH_REQUEST_STYLE",
        "WATCH_ALERT_POLICY",
        "WATCH_API_URL",
    ];

    fn set(key: &str, value: &str) {
        // SAFETY: this is the only test in the crate that touches the environment.
        unsafe { env::set_var(key, value) }
    }

    fn unset(key: &str) {
        // SAFETY: see `set`.
        unsafe { env::remove_var(key) }
    }

    // One test so nothing else in this binary reads these variables concurrently.
    #[test]
    fn test_from_env() {
        ENV_KEYS.iter().for_each(|key| unset(key));

        assert!(matches!(WatchConfig::from_env(), Err(ScanError::ConfigError(_))));
        set("PUSHOVER_USER", "user");
        assert!(matches!(WatchConfig::from_env(), Err(ScanError::ConfigError(_))));
        unset("PUSHOVER_USER");
        set("PUSHOVER_TOKEN", "token");
        assert!(matches!(WatchConfig::from_env(), Err(ScanError::ConfigError(_))));
        set("PUSHOVER_USER", "user");

        let config = WatchConfig::from_env().unwrap();
        assert_eq!(config.location_id, Identifier::from(DEFAULT_LOCATION_ID));
        assert_eq!(config.arrival, NaiveDate::from_ymd_opt(2025, 6, 28).unwrap());
        assert_eq!(config.departure, NaiveDate::from_ymd_opt(2025, 6, 29).unwrap());
        assert_eq!(config.poll_interval_secs, DEFAULT_POLL_SECONDS);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECONDS);
        assert_eq!(config.request_style, RequestStyle::Post);
        assert_eq!(config.alert_policy, AlertPolicy::Once);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.notification.user_key, "user");
        assert_eq!(config.notification.api_token, "token");

        set("WATCH_REQUEST_STYLE", "get");
        set("WATCH_ALERT_POLICY", "rearm");
        set("WATCH_POLL_SECONDS", "60");
        set("WATCH_ARRIVAL", "07/04/2025");
        set("WATCH_DEPARTURE", "2025-07-06");
        let config = WatchConfig::from_env().unwrap();
        assert_eq!(config.request_style, RequestStyle::Get);
        assert_eq!(config.alert_policy, AlertPolicy::Rearm);
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.stay_window().unwrap().nights().count(), 2);
        ENV_KEYS[4..].iter().for_each(|key| unset(key));

        for (key, value) in [
            ("WATCH_REQUEST_STYLE", "put"),
            ("WATCH_ALERT_POLICY", "never"),
            ("WATCH_POLL_SECONDS", "abc"),
            ("WATCH_POLL_SECONDS", "0"),
            ("WATCH_DEPARTURE", "2025-06-28"),
        ] {
            set(key, value);
            assert!(
                matches!(WatchConfig::from_env(), Err(ScanError::ConfigError(_))),
                "{}={} should be rejected",
                key,
                value
            );
            unset(key);
        }

        ENV_KEYS.iter().for_each(|key| unset(key));
    }

    #[test]
    fn test_request_style_and_policy_parse() {
        assert_eq!("GET".parse::<RequestStyle>().unwrap(), RequestStyle::Get);
        assert_eq!(" post ".parse::<RequestStyle>().unwrap(), RequestStyle::Post);
        assert!("put".parse::<RequestStyle>().is_err());

        assert_eq!("rearm".parse::<AlertPolicy>().unwrap(), AlertPolicy::Rearm);
        assert_eq!("Once".parse::<AlertPolicy>().unwrap(), AlertPolicy::Once);
        assert!("never".parse::<AlertPolicy>().is_err());
    }
}
