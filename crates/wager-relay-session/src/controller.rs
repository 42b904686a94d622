//! Session controller: the lifecycle exposed to external triggers.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use wager_relay_core::{
    ChatId, Command, IncomingCommand, TenantId,
    command::{ALREADY_RUNNING, GREETING, NOTHING_TO_STOP, STARTING, STOPPING},
    traits::{ConnectError, Connector, Messenger},
};

use crate::{
    registry::{RegistryError, RunnerHandle, SessionRegistry},
    runner::{RunnerContext, SessionRunner},
};

/// Buffered commands per connection.
const COMMAND_BUFFER: usize = 32;

/// Session controller error.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("No active bot found with this token")]
    NotFound,
    #[error("Bot is not connected")]
    NotConnected,
    #[error("Session already running")]
    AlreadyRunning,
    #[error(transparent)]
    Construction(#[from] ConnectError),
}

impl From<RegistryError> for ControllerError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyRunning => Self::AlreadyRunning,
        }
    }
}

/// Acknowledgement for an accepted start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartAck {
    /// Id of the runner that was spawned.
    pub runner_id: Uuid,
}

/// Acknowledgement for a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAck {
    /// The running flag was cleared; the runner drains on its own.
    Stopping,
    NothingToStop,
}

/// Lifecycle snapshot for one tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub connected: bool,
    pub running: bool,
}

/// Live messaging connection.
struct Connection {
    messenger: Arc<dyn Messenger>,
    cancel: CancellationToken,
}

/// Coordinates connections, the registry and runners.
///
/// Create, start and disconnect for one tenant are serialized by a
/// per-tenant lock; different tenants never wait on each other.
pub struct SessionController {
    ctx: RunnerContext,
    connector: Arc<dyn Connector>,
    connections: RwLock<HashMap<TenantId, Connection>>,
    tenant_locks: Mutex<HashMap<TenantId, Arc<Mutex<()>>>>,
}

impl SessionController {
    /// Create a controller over `ctx.registry`.
    #[must_use]
    pub fn new(ctx: RunnerContext, connector: Arc<dyn Connector>) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            connector,
            connections: RwLock::new(HashMap::new()),
            tenant_locks: Mutex::new(HashMap::new()),
        })
    }

    /// The registry runners are tracked in.
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.ctx.registry
    }

    async fn tenant_lock(&self, tenant: &TenantId) -> Arc<Mutex<()>> {
        let mut locks = self.tenant_locks.lock().await;
        Arc::clone(locks.entry(tenant.clone()).or_default())
    }

    /// Drop the lock entry of an unconnected tenant nobody else is waiting on.
    ///
    /// Called with the tenant lock held, so `lock` is the map's current entry.
    async fn prune_tenant_lock(&self, tenant: &TenantId, lock: &Arc<Mutex<()>>) {
        if self.connections.read().await.contains_key(tenant) {
            return;
        }
        let mut locks = self.tenant_locks.lock().await;
        // The map's copy and the caller's.
        if Arc::strong_count(lock) == 2 {
            locks.remove(tenant);
        }
    }

    /// Open a fresh connection for `tenant`, replacing any existing one.
    ///
    /// An existing connection is fully torn down first (its runner stopped
    /// and its entry removed). If the new connection cannot be built the
    /// tenant is left with no connection and no registry entry.
    ///
    /// # Errors
    /// Returns `ControllerError::Construction` if the connector fails.
    pub async fn create_and_start(self: &Arc<Self>, tenant: TenantId) -> Result<(), ControllerError> {
        let lock = self.tenant_lock(&tenant).await;
        let _guard = lock.lock().await;

        if self.teardown(&tenant).await {
            tracing::info!(tenant = %tenant, "Replacing existing connection");
        }

        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let messenger = match self.connector.connect(&tenant, tx).await {
            Ok(messenger) => messenger,
            Err(e) => {
                self.prune_tenant_lock(&tenant, &lock).await;
                return Err(e.into());
            }
        };
        let cancel = CancellationToken::new();

        tokio::spawn(Self::dispatch(
            Arc::downgrade(self),
            tenant.clone(),
            Arc::clone(&messenger),
            rx,
            cancel.clone(),
        ));

        self.connections
            .write()
            .await
            .insert(tenant.clone(), Connection { messenger, cancel });
        tracing::info!(tenant = %tenant, "Connection established");
        Ok(())
    }

    /// Spawn a runner for `tenant` reporting to `chat_id`.
    ///
    /// Returns as soon as the runner task is spawned.
    ///
    /// # Errors
    /// Returns `NotConnected` without a connection, `AlreadyRunning` if a
    /// live runner exists.
    pub async fn start(&self, tenant: &TenantId, chat_id: ChatId) -> Result<StartAck, ControllerError> {
        let lock = self.tenant_lock(tenant).await;
        let _guard = lock.lock().await;

        match self.admit(tenant).await {
            Ok((handle, messenger)) => Ok(self.launch(tenant, chat_id, messenger, handle)),
            Err(e) => {
                self.prune_tenant_lock(tenant, &lock).await;
                Err(e)
            }
        }
    }

    /// Claim the runner slot of a connected tenant. Caller must hold the tenant lock.
    async fn admit(&self, tenant: &TenantId) -> Result<(RunnerHandle, Arc<dyn Messenger>), ControllerError> {
        let messenger = self
            .connections
            .read()
            .await
            .get(tenant)
            .map(|c| Arc::clone(&c.messenger))
            .ok_or(ControllerError::NotConnected)?;

        let handle = self.ctx.registry.try_acquire(tenant).await?;
        Ok((handle, messenger))
    }

    fn launch(
        &self,
        tenant: &TenantId,
        chat_id: ChatId,
        messenger: Arc<dyn Messenger>,
        handle: RunnerHandle,
    ) -> StartAck {
        let runner_id = handle.id();
        SessionRunner::new(self.ctx.clone(), tenant.clone(), chat_id, messenger, handle).spawn();

        tracing::info!(tenant = %tenant, chat = %chat_id, runner = %runner_id, "Runner spawned");
        StartAck { runner_id }
    }

    /// Clear the running flag for `tenant` without waiting for the runner.
    pub async fn stop(&self, tenant: &TenantId) -> StopAck {
        if self.ctx.registry.stop(tenant).await {
            tracing::info!(tenant = %tenant, "Stop requested");
            StopAck::Stopping
        } else {
            StopAck::NothingToStop
        }
    }

    /// Stop any runner and tear down the connection for `tenant`.
    ///
    /// # Errors
    /// Returns `ControllerError::NotFound` if nothing was connected.
    pub async fn disconnect(&self, tenant: &TenantId) -> Result<(), ControllerError> {
        let lock = self.tenant_lock(tenant).await;
        let _guard = lock.lock().await;

        let found = self.teardown(tenant).await;
        self.prune_tenant_lock(tenant, &lock).await;
        if found {
            Ok(())
        } else {
            Err(ControllerError::NotFound)
        }
    }

    /// Disconnect every tenant.
    pub async fn shutdown_all(&self) {
        let tenants: Vec<TenantId> = self.connections.read().await.keys().cloned().collect();
        for tenant in tenants {
            // A concurrent disconnect may have won the race.
            let _ = self.disconnect(&tenant).await;
        }
    }

    /// Connection and runner state for `tenant`.
    pub async fn status(&self, tenant: &TenantId) -> SessionStatus {
        SessionStatus {
            connected: self.connections.read().await.contains_key(tenant),
            running: self.ctx.registry.is_running(tenant).await,
        }
    }

    /// Number of open connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Number of live runners.
    pub async fn running_count(&self) -> usize {
        self.ctx.registry.running_count().await
    }

    /// Caller must hold the tenant lock.
    async fn teardown(&self, tenant: &TenantId) -> bool {
        let Some(connection) = self.connections.write().await.remove(tenant) else {
            return false;
        };
        self.ctx.registry.remove(tenant).await;
        connection.cancel.cancel();
        connection.messenger.shutdown().await;
        tracing::info!(tenant = %tenant, "Connection torn down");
        true
    }

    async fn dispatch(
        controller: Weak<Self>,
        tenant: TenantId,
        messenger: Arc<dyn Messenger>,
        mut commands: mpsc::Receiver<IncomingCommand>,
        cancel: CancellationToken,
    ) {
        loop {
            let incoming = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                incoming = commands.recv() => incoming,
            };
            let (Some(incoming), Some(controller)) = (incoming, controller.upgrade()) else {
                break;
            };
            controller
                .handle_command(&tenant, messenger.as_ref(), &cancel, incoming)
                .await;
        }
        tracing::debug!(tenant = %tenant, "Command dispatch ended");
    }

    async fn handle_command(
        &self,
        tenant: &TenantId,
        messenger: &dyn Messenger,
        cancel: &CancellationToken,
        incoming: IncomingCommand,
    ) {
        let chat_id = incoming.chat_id;
        let text = match incoming.command {
            Command::Greet => GREETING,
            Command::Run => {
                let lock = self.tenant_lock(tenant).await;
                let _guard = lock.lock().await;
                // Torn down while waiting; a replacement connection has its own dispatcher.
                if cancel.is_cancelled() {
                    return;
                }
                match self.admit(tenant).await {
                    Ok((handle, runner_messenger)) => {
                        // Acknowledge before the first action can report anything.
                        Self::reply(tenant, messenger, chat_id, STARTING).await;
                        self.launch(tenant, chat_id, runner_messenger, handle);
                        return;
                    }
                    Err(ControllerError::AlreadyRunning) => ALREADY_RUNNING,
                    Err(e) => {
                        tracing::warn!(tenant = %tenant, error = %e, "Run command dropped");
                        return;
                    }
                }
            }
            Command::Stop => match self.stop(tenant).await {
                StopAck::Stopping => STOPPING,
                StopAck::NothingToStop => NOTHING_TO_STOP,
            },
        };

        Self::reply(tenant, messenger, chat_id, text).await;
    }

    async fn reply(tenant: &TenantId, messenger: &dyn Messenger, chat_id: ChatId, text: &str) {
        if let Err(e) = messenger.send_message(chat_id, text).await {
            tracing::warn!(tenant = %tenant, error = %e, "Reply dropped");
        }
    }
}
