//! Process-wide table of live runners.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use wager_relay_core::TenantId;

/// Registry error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Session already running")]
    AlreadyRunning,
}

/// Handle to one runner instance.
///
/// The token is the running flag: it starts live and can only be
/// cancelled. Starting again always mints a new handle.
#[derive(Debug, Clone)]
pub struct RunnerHandle {
    id: Uuid,
    token: CancellationToken,
}

impl RunnerHandle {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            token: CancellationToken::new(),
        }
    }

    /// Unique id of this runner instance.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the runner has not been asked to stop.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Clear the running flag.
    pub fn stop(&self) {
        self.token.cancel();
    }
}

/// Table mapping each tenant to its live runner handle.
///
/// Every mutation happens under one write lock, so an acquire can never
/// interleave with a stop or release for the same tenant.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    entries: RwLock<HashMap<TenantId, RunnerHandle>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the runner slot for `tenant`.
    ///
    /// A slot whose handle is already stopping is handed over to the new
    /// runner; the draining runner's later `release` leaves it alone.
    ///
    /// # Errors
    /// Returns `RegistryError::AlreadyRunning` if a live runner holds the slot.
    pub async fn try_acquire(&self, tenant: &TenantId) -> Result<RunnerHandle, RegistryError> {
        let mut entries = self.entries.write().await;
        if entries.get(tenant).is_some_and(RunnerHandle::is_running) {
            return Err(RegistryError::AlreadyRunning);
        }
        let handle = RunnerHandle::new();
        entries.insert(tenant.clone(), handle.clone());
        Ok(handle)
    }

    /// Drop the entry for `tenant` if it still belongs to runner `id`.
    ///
    /// Returns whether an entry was removed.
    pub async fn release(&self, tenant: &TenantId, id: Uuid) -> bool {
        let mut entries = self.entries.write().await;
        if entries.get(tenant).is_some_and(|h| h.id == id) {
            entries.remove(tenant);
            true
        } else {
            false
        }
    }

    /// Current handle for `tenant`, live or stopping.
    pub async fn lookup(&self, tenant: &TenantId) -> Option<RunnerHandle> {
        self.entries.read().await.get(tenant).cloned()
    }

    /// Clear the running flag of the live runner for `tenant`.
    ///
    /// Returns `false` if there was no live runner.
    pub async fn stop(&self, tenant: &TenantId) -> bool {
        let entries = self.entries.write().await;
        match entries.get(tenant) {
            Some(handle) if handle.is_running() => {
                handle.stop();
                true
            }
            _ => false,
        }
    }

    /// Stop and drop whatever entry `tenant` has.
    ///
    /// Returns whether an entry existed.
    pub async fn remove(&self, tenant: &TenantId) -> bool {
        let removed = self.entries.write().await.remove(tenant);
        removed.inspect(RunnerHandle::stop).is_some()
    }

    /// Whether `tenant` has a live runner.
    pub async fn is_running(&self, tenant: &TenantId) -> bool {
        self.entries
            .read()
            .await
            .get(tenant)
            .is_some_and(RunnerHandle::is_running)
    }

    /// Number of live runners.
    pub async fn running_count(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|h| h.is_running())
            .count()
    }

    /// Number of entries, including stopping runners not yet reaped.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the registry has no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
