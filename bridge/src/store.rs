//! Identity store: sole owner of the current installation record.
//!
//! Two locks. The write lock is held from snapshot to commit across the
//! remote call, so writes are linearized and a failed write leaves the
//! previously committed record in place. The record slot itself sits behind
//! a short-lived lock taken only to read or commit, so local reads never
//! wait on a remote write in flight. Reads observe committed state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use beacon_config::{ConfigLookup, Credentials};
use beacon_types::{InstallationId, InstallationRecord, ObjectId, RemoteError};
use tokio::sync::{Mutex as WriteLock, MutexGuard as WriteGuard};

use crate::service::{ProviderInit, PushService};
use crate::{BridgeError, InitError};

pub struct IdentityStore {
    service: Arc<dyn PushService>,
    config: Arc<dyn ConfigLookup>,
    writes: WriteLock<()>,
    record: Mutex<Option<InstallationRecord>>,
}

impl IdentityStore {
    pub fn new(service: Arc<dyn PushService>, config: Arc<dyn ConfigLookup>) -> Self {
        Self {
            service,
            config,
            writes: WriteLock::new(()),
            record: Mutex::new(None),
        }
    }

    pub(crate) fn service(&self) -> &dyn PushService {
        self.service.as_ref()
    }

    /// Bring the provider up and make sure the installation is saved remotely.
    ///
    /// Credentials are only read when the provider is not yet initialized.
    /// The save runs on every call, including repeat calls, so a record that
    /// exists locally but was never acknowledged gets pushed.
    pub async fn initialize(&self) -> Result<InstallationId, InitError> {
        if self.service.is_initialized() {
            tracing::debug!("Push provider is already initialized");
        } else {
            let credentials = Credentials::from_lookup(self.config.as_ref())?;
            tracing::info!(app_id = %credentials.app_id(), "Initializing push provider");
            match self
                .service
                .initialize(&credentials)
                .map_err(InitError::Provider)?
            {
                ProviderInit::Initialized => {}
                ProviderInit::AlreadyInitialized => {
                    tracing::debug!("Push provider was initialized concurrently");
                }
            }
        }

        let txn = self.begin().await;
        let record = txn.current().map_err(InitError::Provider)?;
        match self.service.save(&record).await {
            Ok(saved) => {
                let id = saved.installation_id().clone();
                txn.commit(saved);
                tracing::info!(installation_id = %id, "Installation saved");
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Installation save failed");
                Err(InitError::Save(e))
            }
        }
    }

    /// The current installation id. Local only, never touches the network.
    pub fn installation_id(&self) -> Result<InstallationId, BridgeError> {
        self.snapshot()
            .map(|record| record.installation_id().clone())
    }

    /// The server object id, `None` until the first acknowledged save.
    pub fn object_id(&self) -> Result<Option<ObjectId>, BridgeError> {
        self.snapshot().map(|record| record.object_id().cloned())
    }

    /// Copy of the committed record, creating it locally if needed.
    ///
    /// Does not wait for writes in flight.
    pub fn snapshot(&self) -> Result<InstallationRecord, BridgeError> {
        self.load_or_create().map_err(BridgeError::NoInstallation)
    }

    /// Take the write lock for a read-modify-write.
    pub(crate) async fn begin(&self) -> RecordTxn<'_> {
        RecordTxn {
            _write: self.writes.lock().await,
            store: self,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<InstallationRecord>> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_or_create(&self) -> Result<InstallationRecord, RemoteError> {
        let mut slot = self.slot();
        if let Some(record) = slot.as_ref() {
            return Ok(record.clone());
        }
        let record = self.service.current_installation()?;
        tracing::debug!(installation_id = %record.installation_id(), "Installation record created");
        *slot = Some(record.clone());
        Ok(record)
    }
}

/// Write lock held for one read-modify-write. Dropping without `commit`
/// keeps the old record.
pub(crate) struct RecordTxn<'a> {
    _write: WriteGuard<'a, ()>,
    store: &'a IdentityStore,
}

impl RecordTxn<'_> {
    /// Committed record, fetched or created through the provider on first use.
    pub(crate) fn current(&self) -> Result<InstallationRecord, RemoteError> {
        self.store.load_or_create()
    }

    pub(crate) fn commit(self, record: InstallationRecord) {
        *self.store.slot() = Some(record);
    }
}
