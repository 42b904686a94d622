//! Wire protocol for the control endpoints.

use serde::{Deserialize, Serialize};
use wager_relay_core::{TenantId, tenant::TenantIdError};

pub const BOT_STARTED: &str = "Bot started successfully!";
pub const BOT_DISCONNECTED: &str = "Bot disconnected successfully!";

/// Body of `start_bot` and `disconnect_bot`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControlRequest {
    #[serde(default)]
    pub bot_token: Option<String>,
}

impl ControlRequest {
    /// Build a request for `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            bot_token: Some(token.into()),
        }
    }

    /// The tenant this request targets.
    ///
    /// # Errors
    /// Returns error if the token is missing or blank.
    pub fn tenant(&self) -> Result<TenantId, TenantIdError> {
        TenantId::parse(self.bot_token.as_deref().unwrap_or_default())
    }
}

/// Response body: either `{"message": ..}` or `{"error": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlResponse {
    Message { message: String },
    Error { error: String },
}

impl ControlResponse {
    #[must_use]
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message {
            message: text.into(),
        }
    }

    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self::Error { error: text.into() }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub connections: usize,
    pub running: usize,
}
