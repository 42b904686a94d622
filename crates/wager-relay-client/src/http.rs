//! reqwest-backed action client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use wager_relay_core::{
    ActionProfile, ActionResult, WagerPayload,
    profile::ProfileError,
    traits::{ActionClient, ActionError},
};

/// Client construction error.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("Invalid profile: {0}")]
    Profile(#[from] ProfileError),
    #[error("Invalid header {name}: {reason}")]
    Header { name: String, reason: String },
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Action client posting to the profile's endpoint with its fixed headers.
#[derive(Debug, Clone)]
pub struct HttpActionClient {
    http: reqwest::Client,
    url: String,
}

impl HttpActionClient {
    /// Build a client for `profile`.
    ///
    /// Headers are validated once here, so every later request reuses them.
    ///
    /// # Errors
    /// Returns error if the profile is invalid or a header cannot be encoded.
    pub fn new(profile: &ActionProfile) -> Result<Self, ClientBuildError> {
        profile.validate()?;
        let http = reqwest::Client::builder()
            .default_headers(header_map(profile)?)
            .build()?;
        Ok(Self {
            http,
            url: profile.url.clone(),
        })
    }
}

fn header_map(profile: &ActionProfile) -> Result<HeaderMap, ClientBuildError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &profile.headers {
        let invalid = |reason: String| ClientBuildError::Header {
            name: name.clone(),
            reason,
        };
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

#[async_trait]
impl ActionClient for HttpActionClient {
    async fn perform(&self, payload: &WagerPayload) -> Result<ActionResult, ActionError> {
        let response = self
            .http
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| ActionError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, url = %self.url, "Action rejected");
            return Err(ActionError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ActionError::MalformedResponse(e.to_string()))?;
        ActionResult::from_response(body)
    }
}
