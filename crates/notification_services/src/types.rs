use validator::Validate;

/// Default Pushover message endpoint.
pub const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

/// Default title shown on every availability push.
pub const DEFAULT_TITLE: &str = "ExploreMoreIL site open!";

/// Errors raised while delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// The request never produced a response (connect failure, timeout, DNS).
    #[error("Notification transport error: {0}")]
    Transport(String),

    /// The push service answered with a non-success status.
    #[error("Notification rejected with HTTP {status}: {body}")]
    Rejected {
        /// HTTP status returned by the push service.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// Missing or invalid notification settings.
    #[error("Notification configuration error: {0}")]
    Config(String),
}

/// Credentials and endpoint for the Pushover service.
#[derive(Debug, Clone, Validate)]
pub struct PushoverConfig {
    /// Recipient user key (`PUSHOVER_USER`)
    #[validate(length(min = 1, message = "Pushover user key is required"))]
    pub user_key: String,

    /// Application API token (`PUSHOVER_TOKEN`)
    #[validate(length(min = 1, message = "Pushover API token is required"))]
    pub api_token: String,

    /// Title attached to every message
    #[validate(length(min = 1, message = "Notification title must not be empty"))]
    pub title: String,

    /// Message endpoint, overridable for staging
    #[validate(url(message = "Pushover API URL must be a valid URL"))]
    pub api_url: String,
}

impl PushoverConfig {
    /// Build a config with the default title and endpoint.
    pub fn new(user_key: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            user_key: user_key.into(),
            api_token: api_token.into(),
            title: DEFAULT_TITLE.to_string(),
            api_url: PUSHOVER_API_URL.to_string(),
        }
    }

    /// Read the Pushover settings from the environment.
    ///
    /// `PUSHOVER_USER` and `PUSHOVER_TOKEN` are required; `PUSHOVER_TITLE` and
    /// `PUSHOVER_API_URL` fall back to the defaults.
    pub fn from_env() -> Result<Self, NotificationError> {
        let user_key = std::env::var("PUSHOVER_USER").map_err(|_| {
            NotificationError::Config("PUSHOVER_USER environment variable not set".to_string())
        })?;

        let api_token = std::env::var("PUSHOVER_TOKEN").map_err(|_| {
            NotificationError::Config("PUSHOVER_TOKEN environment variable not set".to_string())
        })?;

        let mut config = Self::new(user_key, api_token);

        if let Ok(title) = std::env::var("PUSHOVER_TITLE") {
            config.title = title;
        }
        if let Ok(api_url) = std::env::var("PUSHOVER_API_URL") {
            config.api_url = api_url;
        }

        Ok(config)
    }
}
