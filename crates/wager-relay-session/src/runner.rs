//! The per-tenant action loop.

use std::sync::Arc;

use tokio::task::JoinHandle;
use wager_relay_core::{
    ActionProfile, ActionResult, ChatId, TenantId,
    command::{failure_message, progress_message},
    profile::ProfileError,
    traits::{ActionClient, ActionError, LogError, Messenger, ResultLog},
};

use crate::registry::{RunnerHandle, SessionRegistry};

/// Requests between two progress notifications.
pub const DEFAULT_PROGRESS_EVERY: u64 = 100;

/// Error that ends a runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error("Log append failed: {0}")]
    Log(#[from] LogError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Runner tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Emit a progress notification every this many requests. Zero disables them.
    pub progress_every: u64,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

/// Collaborators shared by every runner a controller spawns.
#[derive(Clone)]
pub struct RunnerContext {
    pub profile: Arc<ActionProfile>,
    pub client: Arc<dyn ActionClient>,
    pub log: Arc<dyn ResultLog>,
    pub registry: Arc<SessionRegistry>,
    pub settings: RunnerSettings,
}

/// Runner lifecycle.
///
/// `Idle -> Running -> Stopping -> Stopped`, or `Running -> Errored -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Running,
    Stopping,
    Errored,
    Stopped,
}

/// What a finished runner did.
#[derive(Debug)]
pub struct RunReport {
    /// Actions that completed, including their log appends.
    pub requests: u64,
    /// Result of the last completed action.
    pub last_result: Option<ActionResult>,
    /// The error that ended the loop, if any.
    pub error: Option<RunnerError>,
    /// State the loop left through: `Stopping` or `Errored`.
    pub exit: RunnerState,
}

/// Drives one tenant's action loop until stopped or failed.
pub struct SessionRunner {
    ctx: RunnerContext,
    tenant: TenantId,
    chat_id: ChatId,
    messenger: Arc<dyn Messenger>,
    handle: RunnerHandle,
    state: RunnerState,
    requests: u64,
}

impl SessionRunner {
    /// Create a runner for a slot already acquired in the registry.
    #[must_use]
    pub fn new(
        ctx: RunnerContext,
        tenant: TenantId,
        chat_id: ChatId,
        messenger: Arc<dyn Messenger>,
        handle: RunnerHandle,
    ) -> Self {
        Self {
            ctx,
            tenant,
            chat_id,
            messenger,
            handle,
            state: RunnerState::Idle,
            requests: 0,
        }
    }

    /// Run on its own task.
    pub fn spawn(self) -> JoinHandle<RunReport> {
        tokio::spawn(self.run())
    }

    /// Run the loop to completion.
    ///
    /// Each iteration finishes its remote call and both log appends before
    /// the running flag is checked. On exit the registry entry is released.
    pub async fn run(mut self) -> RunReport {
        self.transition(RunnerState::Running);
        let mut last_result = None;

        let error = loop {
            match self.cycle().await {
                Ok(result) => {
                    last_result = Some(result);
                }
                Err(e) => break Some(e),
            }

            if !self.handle.is_running() {
                self.transition(RunnerState::Stopping);
                break None;
            }
            tokio::task::yield_now().await;
        };

        if let Some(e) = &error {
            self.transition(RunnerState::Errored);
            tracing::warn!(tenant = %self.tenant, requests = self.requests, error = %e, "Runner failed");
            self.notify(&failure_message(e)).await;
        }

        let exit = self.state;
        self.handle.stop();
        self.ctx.registry.release(&self.tenant, self.handle.id()).await;
        self.transition(RunnerState::Stopped);
        tracing::info!(tenant = %self.tenant, requests = self.requests, "Runner finished");

        RunReport {
            requests: self.requests,
            last_result,
            error,
            exit,
        }
    }

    async fn cycle(&mut self) -> Result<ActionResult, RunnerError> {
        let payload = self
            .ctx
            .profile
            .variant(self.requests)
            .ok_or(ProfileError::NoPayloads)?;
        let result = self.ctx.client.perform(payload).await?;
        self.requests += 1;

        self.ctx.log.record_raw(&result).await?;
        self.ctx.log.record_summary(&result.summarize()).await?;

        if self.requests.checked_rem(self.ctx.settings.progress_every) == Some(0) {
            let message = progress_message(self.requests, &result);
            tracing::info!(tenant = %self.tenant, "{message}");
            self.notify(&message).await;
        }
        Ok(result)
    }

    async fn notify(&self, text: &str) {
        if let Err(e) = self.messenger.send_message(self.chat_id, text).await {
            tracing::warn!(tenant = %self.tenant, chat = %self.chat_id, error = %e, "Notification dropped");
        }
    }

    fn transition(&mut self, next: RunnerState) {
        tracing::debug!(tenant = %self.tenant, from = ?self.state, to = ?next, "Runner state");
        self.state = next;
    }
}
