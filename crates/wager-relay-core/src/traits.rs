//! Collaborator traits for actions, logging and messaging.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{ActionResult, ActionSummary, ChatId, IncomingCommand, TenantId, WagerPayload};

/// Remote action failure.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Remote returned status {0}")]
    Status(u16),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Trait for the remote action API.
///
/// One call is one outbound request; implementations must not retry.
#[async_trait]
pub trait ActionClient: Send + Sync {
    /// Issue a single action with the given payload.
    async fn perform(&self, payload: &WagerPayload) -> Result<ActionResult, ActionError>;
}

/// Result log error.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Trait for the append-only result logs.
#[async_trait]
pub trait ResultLog: Send + Sync {
    /// Append the full result as one line to the raw store.
    async fn record_raw(&self, result: &ActionResult) -> Result<(), LogError>;

    /// Append one summary line to the summary store.
    async fn record_summary(&self, summary: &ActionSummary) -> Result<(), LogError>;
}

/// Notification error.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// Outgoing half of one tenant's messaging connection.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a text message to a chat.
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), NotifyError>;

    /// Stop receiving commands and release the connection.
    async fn shutdown(&self);
}

/// Connection setup error.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Invalid bot token: {0}")]
    InvalidToken(String),
    #[error("Connection setup failed: {0}")]
    Setup(String),
}

/// Opens messaging connections for tenants.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect as `tenant`, forwarding parsed commands into `commands`.
    async fn connect(
        &self,
        tenant: &TenantId,
        commands: mpsc::Sender<IncomingCommand>,
    ) -> Result<Arc<dyn Messenger>, ConnectError>;
}
