use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::{RequestStyle, WatchConfig};
use crate::scan_types::{Identifier, ScanError, SpotRecord, StayWindow, snippet};

/// How much of an unexpected body ends up in the logs.
const SNIPPET_CHARS: usize = 120;

/// Anything that can produce the current spot list.
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    /// Current spots, or an empty list when the poll yielded no usable data.
    async fn fetch_spots(&self) -> Vec<SpotRecord>;
}

/// Client for the tenant spot-availability API
pub struct AvailabilityClient {
    client: Client,
    api_url: String,
    location_id: Identifier,
    window: StayWindow,
    request_style: RequestStyle,
}

/// JSON body for the POST flavour of the availability endpoint.
///
/// Filtering stays client-side so spots that are still booked come back too.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    /// Campground location at the tenant
    pub location_id: Identifier,
    /// Check-in date, `MM/DD/YYYY`
    pub start_date: String,
    /// Check-out date, `MM/DD/YYYY`
    pub end_date: String,
    /// Always null
    pub lock_code: Option<String>,
    /// Always null
    pub selected_spot_types: Option<Vec<String>>,
    /// Always null
    pub selected_product_classifications: Option<Vec<String>>,
    /// Always null
    pub selected_attributes: Option<Vec<String>>,
    /// Always null
    pub selected_spot_id: Option<Identifier>,
    /// Always false so booked spots are returned too
    pub only_show_available: bool,
}

impl AvailabilityClient {
    /// Create a client with the configured headers and timeout.
    pub fn new(config: &WatchConfig) -> Result<Self, ScanError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ScanError::ConfigError(format!("Invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ScanError::ConfigError(format!("Invalid header value {}: {}", value, e)))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ScanError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            location_id: config.location_id.clone(),
            window: config.stay_window()?,
            request_style: config.request_style,
        })
    }

    /// Body sent for `RequestStyle::Post`.
    pub fn request_body(&self) -> AvailabilityRequest {
        let (start_date, end_date) = self.formatted_dates();
        AvailabilityRequest {
            location_id: self.location_id.clone(),
            start_date,
            end_date,
            lock_code: None,
            selected_spot_types: None,
            selected_product_classifications: None,
            selected_attributes: None,
            selected_spot_id: None,
            only_show_available: false,
        }
    }

    fn formatted_dates(&self) -> (String, String) {
        let format = self.request_style.date_format();
        (
            self.window.arrival().format(format).to_string(),
            self.window.departure().format(format).to_string(),
        )
    }

    fn build_request(&self) -> RequestBuilder {
        match self.request_style {
            RequestStyle::Get => {
                let (start_date, end_date) = self.formatted_dates();
                let params = [
                    ("locationId", self.location_id.to_string()),
                    ("startDate", start_date),
                    ("endDate", end_date),
                ];
                self.client.get(&self.api_url).query(&params)
            }
            RequestStyle::Post => self.client.post(&self.api_url).json(&self.request_body()),
        }
    }

    /// Fetch the spot list, surfacing every failure as a `ScanError`.
    pub async fn get_spot_availability(&self) -> Result<Vec<SpotRecord>, ScanError> {
        debug!(
            "Fetching availability for location {} from {} to {}",
            self.location_id,
            self.window.arrival(),
            self.window.departure()
        );

        let response = self
            .build_request()
            .send()
            .await
            .map_err(|e| ScanError::Network(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        debug!("API response status: {}", status);

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| ScanError::Network(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            warn!(
                "API request failed with status {}: {}",
                status,
                snippet(&body, SNIPPET_CHARS)
            );
            return match status.as_u16() {
                429 => Err(ScanError::RateLimited),
                401 | 403 => Err(ScanError::AuthenticationFailed),
                _ => Err(ScanError::ApiError(format!("HTTP {}", status))),
            };
        }

        parse_spot_payload(content_type.as_deref(), &body)
    }
}

#[async_trait]
impl AvailabilitySource for AvailabilityClient {
    async fn fetch_spots(&self) -> Vec<SpotRecord> {
        match self.get_spot_availability().await {
            Ok(spots) => spots,
            Err(e) => {
                error!("Availability fetch failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Validate and unpack a successful availability response.
///
/// The spot list comes from the first non-empty array under `spots` or `data`.
pub fn parse_spot_payload(
    content_type: Option<&str>,
    body: &str,
) -> Result<Vec<SpotRecord>, ScanError> {
    let content_type = content_type.unwrap_or_default();
    if !content_type.to_ascii_lowercase().contains("json") {
        return Err(ScanError::NotJson {
            content_type: content_type.to_string(),
            snippet: snippet(body, SNIPPET_CHARS),
        });
    }

    let payload: Value = serde_json::from_str(body)
        .map_err(|e| ScanError::DataFormat(format!("JSON decode failed: {}", e)))?;

    let object = payload.as_object().ok_or_else(|| {
        ScanError::DataFormat(format!(
            "Expected a JSON object, got: {}",
            snippet(body, SNIPPET_CHARS)
        ))
    })?;

    let spots = ["spots", "data"]
        .iter()
        .filter_map(|key| object.get(*key).and_then(Value::as_array))
        .find(|entries| !entries.is_empty())
        .map(|entries| entries.iter().map(SpotRecord::from_value).collect())
        .unwrap_or_default();

    Ok(spots)
}
