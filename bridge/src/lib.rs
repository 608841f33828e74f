//! Installation identity and push channel bridge.
//!
//! # Architecture
//!
//! ```text
//! host thread ──execute(action, args, callback)──▶ BridgeDispatcher
//!                                                      │ decode (sync errors reply here)
//!                                                      ▼
//!                                                  TaskRunner ── tokio task
//!                                                      │
//!                               ┌──────────────────────┴───────────────┐
//!                               ▼                                      ▼
//!                         IdentityStore ◀──────────────── SubscriptionManager
//!                               │  (write lock + record slot)
//!                               ▼
//!                          PushService (host supplied)
//! ```
//!
//! Each request owns one [`CompletionCallback`]. It fires exactly once: with
//! the task's result, with a decode error before scheduling, or with
//! [`BridgeError::Abandoned`] if the task dies without answering. A remote
//! call that never resolves leaves its callback pending; no timeouts are
//! applied.

mod callback;
mod dispatcher;
mod error;
pub mod memory;
mod runner;
mod service;
mod store;
mod subscriptions;

pub use callback::{CompletionCallback, Reply};
pub use dispatcher::{BridgeDispatcher, Dispatch};
pub use error::{BridgeError, InitError};
pub use runner::{TaskId, TaskRunner};
pub use service::{ProviderInit, PushService, RemoteFut};
pub use store::IdentityStore;
pub use subscriptions::SubscriptionManager;

pub use beacon_config;
pub use beacon_types;
