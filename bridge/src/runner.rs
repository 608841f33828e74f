//! Off-caller task execution.
//!
//! `run` hands work to the tokio runtime and returns at once. The spawned task
//! awaits the work and completes the request's callback with its result. No
//! ordering is promised between tasks; anything that touches the installation
//! record serializes through the identity store.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use beacon_types::ActionName;
use tokio::runtime::{Handle, TryCurrentError};

use crate::callback::{CompletionCallback, Reply};

/// Identifier for log correlation. Unique per runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct TaskRunner {
    handle: Handle,
    next_id: Arc<AtomicU64>,
}

impl TaskRunner {
    /// Run tasks on the runtime behind `handle`. The caller does not need to
    /// be inside that runtime.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Run tasks on the runtime the caller is currently inside.
    pub fn current() -> Result<Self, TryCurrentError> {
        Handle::try_current().map(Self::new)
    }

    /// Spawn `work`; its result completes `callback` exactly once.
    pub fn run<F>(&self, action: ActionName, callback: CompletionCallback, work: F) -> TaskId
    where
        F: Future<Output = Reply> + Send + 'static,
    {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let task = id.0;
        self.handle.spawn(async move {
            tracing::debug!(task, action = %action, "Task started");
            let reply = work.await;
            match &reply {
                Ok(_) => tracing::debug!(task, action = %action, "Task succeeded"),
                Err(e) => tracing::debug!(task, action = %action, error = %e, "Task failed"),
            }
            callback.complete(reply);
        });
        id
    }
}
