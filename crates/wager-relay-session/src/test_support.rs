//! Fakes shared by the session tests.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{Semaphore, mpsc};
use wager_relay_core::{
    ActionResult, ActionSummary, ChatId, IncomingCommand, TenantId, WagerPayload,
    traits::{
        ActionClient, ActionError, ConnectError, Connector, LogError, Messenger, NotifyError,
        ResultLog,
    },
};

use crate::registry::RunnerHandle;

/// Poll an async condition until it holds, failing the test after five seconds.
macro_rules! wait_until {
    ($cond:expr) => {
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while !($cond) {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .expect(concat!("timed out waiting for ", stringify!($cond)))
    };
}
pub(crate) use wait_until;

pub fn tenant(token: &str) -> TenantId {
    TenantId::parse(token).unwrap()
}

/// Result whose balance equals the call number.
fn numbered_result(n: u64) -> ActionResult {
    ActionResult::from_response(json!({
        "user": { "real_balance": n as f64 },
        "dice": { "is_win": n % 2 == 0 },
        "call": n
    }))
    .unwrap()
}

/// Client that answers instantly, optionally failing or stopping its runner at a call.
#[derive(Default)]
pub struct ScriptedClient {
    calls: AtomicU64,
    fail_at: Option<u64>,
    stop_at: Option<u64>,
    handle: Mutex<Option<RunnerHandle>>,
    payloads: Mutex<Vec<WagerPayload>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`-th call (1-based) with a transport error.
    pub fn failing_at(mut self, n: u64) -> Self {
        self.fail_at = Some(n);
        self
    }

    /// Clear the running flag during the `n`-th call.
    pub fn stopping_at(mut self, n: u64) -> Self {
        self.stop_at = Some(n);
        self
    }

    /// Handle whose flag `stopping_at` clears.
    pub fn stop_after_calls(&self, handle: RunnerHandle) {
        *self.handle.lock().unwrap() = Some(handle);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<WagerPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionClient for ScriptedClient {
    async fn perform(&self, payload: &WagerPayload) -> Result<ActionResult, ActionError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.payloads.lock().unwrap().push(payload.clone());

        if self.fail_at == Some(n) {
            return Err(ActionError::Request("connection reset".to_string()));
        }
        if self.stop_at.is_some_and(|limit| n >= limit) {
            if let Some(handle) = self.handle.lock().unwrap().as_ref() {
                handle.stop();
            }
        }
        Ok(numbered_result(n))
    }
}

/// Client whose calls block until the test opens the gate.
pub struct GatedClient {
    gate: Semaphore,
    calls: AtomicU64,
}

impl GatedClient {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            calls: AtomicU64::new(0),
        }
    }

    /// Let `n` more calls complete.
    pub fn open(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActionClient for GatedClient {
    async fn perform(&self, _payload: &WagerPayload) -> Result<ActionResult, ActionError> {
        self.gate
            .acquire()
            .await
            .map_err(|e| ActionError::Request(e.to_string()))?
            .forget();
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(numbered_result(n))
    }
}

/// Log that refuses every append.
pub struct FailingLog;

#[async_trait]
impl ResultLog for FailingLog {
    async fn record_raw(&self, _result: &ActionResult) -> Result<(), LogError> {
        Err(LogError::Io(std::io::Error::other("disk full")))
    }

    async fn record_summary(&self, _summary: &ActionSummary) -> Result<(), LogError> {
        Err(LogError::Io(std::io::Error::other("disk full")))
    }
}

/// Messenger that keeps everything it is asked to send.
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(ChatId, String)>>,
    shut_down: AtomicBool,
}

impl RecordingMessenger {
    pub fn messages(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}

/// One connection handed out by `FakeConnector`.
#[derive(Clone)]
pub struct FakeConnection {
    pub messenger: Arc<RecordingMessenger>,
    pub commands: mpsc::Sender<IncomingCommand>,
}

/// Connector that records every connection it opens.
#[derive(Default)]
pub struct FakeConnector {
    failing: AtomicBool,
    opened: Mutex<Vec<(TenantId, FakeConnection)>>,
}

impl FakeConnector {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Most recent connection opened for `tenant`.
    pub fn latest(&self, tenant: &TenantId) -> Option<FakeConnection> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(t, _)| t == tenant)
            .map(|(_, c)| c.clone())
    }

    pub fn opened(&self) -> usize {
        self.opened.lock().unwrap().len()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        tenant: &TenantId,
        commands: mpsc::Sender<IncomingCommand>,
    ) -> Result<Arc<dyn Messenger>, ConnectError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ConnectError::InvalidToken("Unauthorized".to_string()));
        }
        let messenger = Arc::new(RecordingMessenger::default());
        self.opened.lock().unwrap().push((
            tenant.clone(),
            FakeConnection {
                messenger: Arc::clone(&messenger),
                commands,
            },
        ));
        Ok(messenger)
    }
}
