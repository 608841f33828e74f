//! Bridge dispatcher: the public entry point.
//!
//! A host hands over `(action, args, callback)` from its own thread.
//! `execute` decodes the request, schedules it on the [`TaskRunner`] and
//! returns immediately. Argument errors are reported on the callback before
//! anything is scheduled. Unknown actions are given back untouched so an
//! outer router can try another handler.

use std::sync::Arc;

use beacon_config::{BridgeOptions, ConfigLookup};
use beacon_types::{Action, ObjectId, Payload};
use serde_json::Value;

use crate::callback::{CompletionCallback, Reply};
use crate::runner::TaskRunner;
use crate::service::PushService;
use crate::store::IdentityStore;
use crate::subscriptions::SubscriptionManager;

/// Outcome of offering a request to the dispatcher.
#[derive(Debug)]
#[must_use]
pub enum Dispatch {
    /// The callback has fired or will fire exactly once.
    Handled,
    /// Not an action this bridge serves. The callback was not touched.
    NotHandled(CompletionCallback),
}

impl Dispatch {
    #[must_use]
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled)
    }
}

pub struct BridgeDispatcher {
    runner: TaskRunner,
    identity: Arc<IdentityStore>,
    subscriptions: Arc<SubscriptionManager>,
}

impl BridgeDispatcher {
    pub fn new(
        runner: TaskRunner,
        service: Arc<dyn PushService>,
        config: Arc<dyn ConfigLookup>,
        options: BridgeOptions,
    ) -> Self {
        let identity = Arc::new(IdentityStore::new(service, config));
        let subscriptions = Arc::new(SubscriptionManager::new(
            identity.clone(),
            options.strict_subscriptions,
        ));
        Self {
            runner,
            identity,
            subscriptions,
        }
    }

    /// Decode and schedule one request. Never blocks on the remote service.
    pub fn execute(&self, action: &str, args: &[Value], callback: CompletionCallback) -> Dispatch {
        match Action::decode(action, args) {
            Ok(Some(decoded)) => {
                self.schedule(decoded, callback);
                Dispatch::Handled
            }
            Ok(None) => {
                tracing::debug!(action = %action, "Action not handled by bridge");
                Dispatch::NotHandled(callback)
            }
            Err(e) => {
                tracing::warn!(action = %action, error = %e, "Rejected malformed call");
                callback.fail(e.into());
                Dispatch::Handled
            }
        }
    }

    /// Schedule an already decoded action.
    pub fn schedule(&self, action: Action, callback: CompletionCallback) {
        let name = action.name();
        let identity = self.identity.clone();
        let subscriptions = self.subscriptions.clone();
        let task = self.runner.run(name, callback, async move {
            perform(action, &identity, &subscriptions).await
        });
        tracing::debug!(task = task.value(), action = %name, "Scheduled");
    }
}

async fn perform(
    action: Action,
    identity: &IdentityStore,
    subscriptions: &SubscriptionManager,
) -> Reply {
    match action {
        Action::Initialize => {
            let id = identity.initialize().await?;
            Ok(Payload::Text(id.into_inner()))
        }
        Action::GetInstallationId => {
            let id = identity.installation_id()?;
            Ok(Payload::Text(id.into_inner()))
        }
        Action::GetInstallationObjectId => {
            let object_id = identity.object_id()?;
            Ok(Payload::from(object_id.map(ObjectId::into_inner)))
        }
        Action::GetSubscriptions => {
            let channels = subscriptions.subscriptions()?;
            Ok(Payload::Text(channels.render()))
        }
        Action::Subscribe { channel } => {
            subscriptions.subscribe(&channel).await?;
            Ok(Payload::Empty)
        }
        Action::Unsubscribe { channel } => {
            subscriptions.unsubscribe(&channel).await?;
            Ok(Payload::Empty)
        }
    }
}
