//! In-process push service.
//!
//! Behaves like a well-mannered remote: ids are minted on creation, object ids
//! on the first save, channel writes are idempotent and channel names are
//! validated server-side. Used by the stdio host and by tests, which can
//! script failures, add latency, or hold every remote call behind a gate.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use beacon_config::Credentials;
use beacon_types::{InstallationId, InstallationRecord, ObjectId, RemoteError};
use tokio::sync::watch;
use uuid::Uuid;

use crate::service::{ProviderInit, PushService, RemoteFut};

const NOT_INITIALIZED: &str = "push provider is not initialized";

/// Remote operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    Initialize,
    Save,
    Subscribe,
    Unsubscribe,
}

/// The two remote writes that edit the channel set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelEdit {
    Insert,
    Remove,
}

impl ChannelEdit {
    fn op(self) -> RemoteOp {
        match self {
            Self::Insert => RemoteOp::Subscribe,
            Self::Remove => RemoteOp::Unsubscribe,
        }
    }
}

/// How many times each operation was invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub initialize: usize,
    pub current_installation: usize,
    pub save: usize,
    pub subscribe: usize,
    pub unsubscribe: usize,
}

#[derive(Default)]
struct State {
    credentials: Option<Credentials>,
    local: Option<InstallationRecord>,
    remote: Option<InstallationRecord>,
    calls: CallCounts,
    failures: HashMap<RemoteOp, String>,
}

/// Holds remote calls until opened.
#[derive(Debug, Clone)]
pub struct Gate {
    tx: watch::Sender<bool>,
}

impl Gate {
    pub fn open(&self) {
        self.tx.send_replace(true);
    }
}

pub struct MemoryPushService {
    state: Mutex<State>,
    latency: Option<Duration>,
    gate: Option<watch::Receiver<bool>>,
}

impl Default for MemoryPushService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPushService {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            latency: None,
            gate: None,
        }
    }

    /// Start as if some earlier caller already initialized the provider.
    #[must_use]
    pub fn preinitialized(self) -> Self {
        self.lock().credentials = Some(Credentials::new("preinitialized", "preinitialized"));
        self
    }

    /// Delay every remote write by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Hold every remote write until the returned gate is opened.
    #[must_use]
    pub fn gated(mut self) -> (Self, Gate) {
        let (tx, rx) = watch::channel(false);
        self.gate = Some(rx);
        (self, Gate { tx })
    }

    /// Make the next call of `op` fail with `message`.
    pub fn fail_next(&self, op: RemoteOp, message: impl Into<String>) {
        self.lock().failures.insert(op, message.into());
    }

    #[must_use]
    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    /// The record as last acknowledged by the "server".
    #[must_use]
    pub fn remote_record(&self) -> Option<InstallationRecord> {
        self.lock().remote.clone()
    }

    /// Credentials the provider was initialized with.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        self.lock().credentials.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn round_trip(&self) {
        if let Some(gate) = &self.gate {
            let mut rx = gate.clone();
            // Sender dropped means the gate can never open; let the call through.
            let _ = rx.wait_for(|open| *open).await;
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Count the call, then apply any scripted failure and the init check.
    fn admit(&self, op: RemoteOp) -> Result<(), RemoteError> {
        let mut state = self.lock();
        match op {
            RemoteOp::Initialize => state.calls.initialize += 1,
            RemoteOp::Save => state.calls.save += 1,
            RemoteOp::Subscribe => state.calls.subscribe += 1,
            RemoteOp::Unsubscribe => state.calls.unsubscribe += 1,
        }
        if let Some(message) = state.failures.remove(&op) {
            return Err(RemoteError::new(message));
        }
        if op != RemoteOp::Initialize && state.credentials.is_none() {
            return Err(RemoteError::new(NOT_INITIALIZED));
        }
        Ok(())
    }

    /// Acknowledge `record`: assign an object id if needed and store it.
    fn persist(&self, mut record: InstallationRecord) -> InstallationRecord {
        let mut state = self.lock();
        if let Some(existing) = state
            .remote
            .as_ref()
            .filter(|r| r.installation_id() == record.installation_id())
            .and_then(InstallationRecord::object_id)
        {
            record.acknowledge(existing.clone());
        }
        if !record.is_saved() {
            record.acknowledge(new_object_id());
        }
        state.remote = Some(record.clone());
        state.local = Some(record.clone());
        record
    }

    async fn write_channel(
        &self,
        edit: ChannelEdit,
        record: &InstallationRecord,
        channel: &str,
    ) -> Result<InstallationRecord, RemoteError> {
        self.round_trip().await;
        self.admit(edit.op())?;
        validate_channel(channel)?;
        let mut updated = record.clone();
        match edit {
            ChannelEdit::Insert => {
                updated.channels_mut().insert(channel);
            }
            ChannelEdit::Remove => {
                updated.channels_mut().remove(channel);
            }
        }
        Ok(self.persist(updated))
    }
}

impl PushService for MemoryPushService {
    fn is_initialized(&self) -> bool {
        self.lock().credentials.is_some()
    }

    fn initialize(&self, credentials: &Credentials) -> Result<ProviderInit, RemoteError> {
        self.admit(RemoteOp::Initialize)?;
        let mut state = self.lock();
        if state.credentials.is_some() {
            return Ok(ProviderInit::AlreadyInitialized);
        }
        state.credentials = Some(credentials.clone());
        Ok(ProviderInit::Initialized)
    }

    fn current_installation(&self) -> Result<InstallationRecord, RemoteError> {
        let mut state = self.lock();
        state.calls.current_installation += 1;
        if state.credentials.is_none() {
            return Err(RemoteError::new(NOT_INITIALIZED));
        }
        let record = state
            .local
            .get_or_insert_with(|| {
                InstallationRecord::new(InstallationId::new(Uuid::new_v4().to_string()))
            })
            .clone();
        Ok(record)
    }

    fn save<'a>(&'a self, record: &'a InstallationRecord) -> RemoteFut<'a, InstallationRecord> {
        Box::pin(async move {
            self.round_trip().await;
            self.admit(RemoteOp::Save)?;
            Ok(self.persist(record.clone()))
        })
    }

    fn subscribe<'a>(
        &'a self,
        record: &'a InstallationRecord,
        channel: &'a str,
    ) -> RemoteFut<'a, InstallationRecord> {
        Box::pin(self.write_channel(ChannelEdit::Insert, record, channel))
    }

    fn unsubscribe<'a>(
        &'a self,
        record: &'a InstallationRecord,
        channel: &'a str,
    ) -> RemoteFut<'a, InstallationRecord> {
        Box::pin(self.write_channel(ChannelEdit::Remove, record, channel))
    }
}

fn new_object_id() -> ObjectId {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(10);
    ObjectId::new(id)
}

/// Empty is the broadcast channel. Anything else starts with a letter and
/// continues with letters, digits, `_` or `-`.
fn validate_channel(channel: &str) -> Result<(), RemoteError> {
    let mut chars = channel.chars();
    let valid = match chars.next() {
        None => true,
        Some(first) => {
            first.is_ascii_alphabetic()
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
    };
    if valid {
        Ok(())
    } else {
        Err(RemoteError::new(format!(
            "invalid channel name '{channel}': must start with a letter and contain only letters, numbers, '_' or '-'"
        )))
    }
}
