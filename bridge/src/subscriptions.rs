//! Channel subscriptions on the current installation.

use std::sync::Arc;

use beacon_types::{ChannelSet, InstallationRecord, RemoteError};

use crate::service::PushService;
use crate::store::IdentityStore;
use crate::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelWrite {
    Subscribe,
    Unsubscribe,
}

impl ChannelWrite {
    fn label(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
        }
    }
}

pub struct SubscriptionManager {
    store: Arc<IdentityStore>,
    /// Surface remote write failures instead of reporting success.
    strict: bool,
}

impl SubscriptionManager {
    #[must_use]
    pub fn new(store: Arc<IdentityStore>, strict: bool) -> Self {
        Self { store, strict }
    }

    /// Channels on the committed record, in insertion order. Writes still in
    /// flight are not visible.
    pub fn subscriptions(&self) -> Result<ChannelSet, BridgeError> {
        self.store
            .snapshot()
            .map(|record| record.channels().clone())
    }

    pub async fn subscribe(&self, channel: &str) -> Result<(), BridgeError> {
        self.write(ChannelWrite::Subscribe, channel).await
    }

    pub async fn unsubscribe(&self, channel: &str) -> Result<(), BridgeError> {
        self.write(ChannelWrite::Unsubscribe, channel).await
    }

    async fn write(&self, op: ChannelWrite, channel: &str) -> Result<(), BridgeError> {
        match self.apply(op, channel).await {
            Ok(record) => {
                tracing::debug!(
                    op = op.label(),
                    channel = %channel,
                    channels = record.channels().len(),
                    "Channel write acknowledged"
                );
                Ok(())
            }
            Err(e) if self.strict => {
                tracing::warn!(op = op.label(), channel = %channel, error = %e, "Channel write failed");
                Err(e.into())
            }
            Err(e) => {
                tracing::warn!(
                    op = op.label(),
                    channel = %channel,
                    error = %e,
                    "Channel write failed; reporting success (strict_subscriptions = false)"
                );
                Ok(())
            }
        }
    }

    /// Read-modify-write under the record lock. Only an acknowledged record
    /// is committed.
    async fn apply(
        &self,
        op: ChannelWrite,
        channel: &str,
    ) -> Result<InstallationRecord, RemoteError> {
        let txn = self.store.begin().await;
        let record = txn.current()?;
        let service: &dyn PushService = self.store.service();
        let acknowledged = match op {
            ChannelWrite::Subscribe => service.subscribe(&record, channel).await?,
            ChannelWrite::Unsubscribe => service.unsubscribe(&record, channel).await?,
        };
        txn.commit(acknowledged.clone());
        Ok(acknowledged)
    }
}
