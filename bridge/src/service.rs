//! The remote push service, as seen by the bridge.
//!
//! The bridge never talks to the network itself. Everything it knows about
//! installations comes through a [`PushService`] implementation supplied by
//! the host.

use std::future::Future;
use std::pin::Pin;

use beacon_config::Credentials;
use beacon_types::{InstallationRecord, RemoteError};

/// Future returned by remote operations.
pub type RemoteFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteError>> + Send + 'a>>;

/// Non-error outcomes of provider initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderInit {
    /// This call set the provider up.
    Initialized,
    /// Someone else got there first. Not a failure.
    AlreadyInitialized,
}

/// External identity/push provider.
///
/// Write operations receive a snapshot of the record and resolve to the record
/// as the service acknowledged it. The caller decides whether to adopt it;
/// implementations must not assume their result was committed.
pub trait PushService: Send + Sync {
    /// Whether the provider has already been set up in this process.
    fn is_initialized(&self) -> bool;

    fn initialize(&self, credentials: &Credentials) -> Result<ProviderInit, RemoteError>;

    /// Local fetch-or-create of the current installation. No network.
    ///
    /// Fails when the provider is not initialized and cannot create a record.
    fn current_installation(&self) -> Result<InstallationRecord, RemoteError>;

    fn save<'a>(&'a self, record: &'a InstallationRecord) -> RemoteFut<'a, InstallationRecord>;

    /// Add `channel` to the record's channels. Subscribing twice succeeds.
    fn subscribe<'a>(
        &'a self,
        record: &'a InstallationRecord,
        channel: &'a str,
    ) -> RemoteFut<'a, InstallationRecord>;

    /// Remove `channel` from the record's channels. Absent channels succeed.
    fn unsubscribe<'a>(
        &'a self,
        record: &'a InstallationRecord,
        channel: &'a str,
    ) -> RemoteFut<'a, InstallationRecord>;
}
