use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::types::*;

/// How long a push request may take before it counts as a transport failure.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest response body kept in a `Rejected` error.
const MAX_BODY_CHARS: usize = 200;

/// One-way delivery of an availability message.
///
/// Implementations report failures through the returned error; callers in the
/// poll loop log and drop them.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `message` to the configured recipient.
    async fn send(&self, message: &str) -> Result<(), NotificationError>;
}

/// Pushover push-notification client.
#[derive(Debug, Clone)]
pub struct PushoverNotifier {
    client: Client,
    config: PushoverConfig,
}

impl PushoverNotifier {
    /// Creates a notifier with a bounded request timeout.
    pub fn new(config: PushoverConfig) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| NotificationError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn send(&self, message: &str) -> Result<(), NotificationError> {
        log::debug!("📲 Sending Pushover message: {}", message);

        let form = [
            ("token", self.config.api_token.as_str()),
            ("user", self.config.user_key.as_str()),
            ("title", self.config.title.as_str()),
            ("message", message),
        ];

        let response = self
            .client
            .post(&self.config.api_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(MAX_BODY_CHARS).collect(),
            });
        }

        log::info!("📲 Pushover accepted message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let mut config = PushoverConfig::new("user", "token");
        // Nothing listens on the discard port locally.
        config.api_url = "http://127.0.0.1:9/1/messages.json".to_string();

        let notifier = PushoverNotifier::new(config).unwrap();
        let result = notifier.send("Site A just opened").await;

        assert!(matches!(result, Err(NotificationError::Transport(_))));
    }
}
