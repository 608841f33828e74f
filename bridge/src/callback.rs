//! Single-use completion sink.
//!
//! Every request gets exactly one [`CompletionCallback`]. Completing it
//! consumes it, so a second completion does not type-check. A callback that
//! is dropped unfired (panicked task, runtime shut down) reports
//! [`BridgeError::Abandoned`] instead of going silent.

use std::fmt;

use beacon_types::Payload;
use tokio::sync::oneshot;

use crate::BridgeError;

/// Terminal outcome of one request.
pub type Reply = Result<Payload, BridgeError>;

type Sink = Box<dyn FnOnce(Reply) + Send>;

pub struct CompletionCallback {
    sink: Option<Sink>,
}

impl CompletionCallback {
    pub fn new(sink: impl FnOnce(Reply) + Send + 'static) -> Self {
        Self {
            sink: Some(Box::new(sink)),
        }
    }

    /// A callback whose reply is delivered through a oneshot channel.
    #[must_use]
    pub fn channel() -> (Self, oneshot::Receiver<Reply>) {
        let (tx, rx) = oneshot::channel();
        let callback = Self::new(move |reply| {
            // Receiver gone means nobody is waiting; nothing to do.
            let _ = tx.send(reply);
        });
        (callback, rx)
    }

    pub fn succeed(self, payload: Payload) {
        self.complete(Ok(payload));
    }

    pub fn fail(self, error: BridgeError) {
        self.complete(Err(error));
    }

    pub fn complete(mut self, reply: Reply) {
        if let Some(sink) = self.sink.take() {
            sink(reply);
        }
    }

    /// Discard without firing. Only for a router that answers a request it
    /// could not place through some other channel.
    pub fn disarm(mut self) {
        self.sink = None;
    }
}

impl Drop for CompletionCallback {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.take() {
            tracing::warn!("Completion callback dropped unfired; reporting abandoned");
            sink(Err(BridgeError::Abandoned));
        }
    }
}

impl fmt::Debug for CompletionCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionCallback")
            .field("pending", &self.sink.is_some())
            .finish()
    }
}
