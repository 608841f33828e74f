//! Beacon host - drives the bridge over stdin/stdout.
//!
//! # Architecture
//!
//! ```text
//! stdin ─▶ main thread: parse line ─▶ BridgeDispatcher::execute ─▶ tokio workers
//!                                                                      │
//! stdout ◀─ writer task ◀──────────── mpsc ◀──────── completion callbacks
//! ```
//!
//! The main thread plays the single caller thread of an embedding host: it
//! never waits on a request. Replies are written as they complete, so their
//! order on stdout is completion order. On EOF the process waits for every
//! outstanding reply, then exits.

mod protocol;

use std::io::{self, BufRead};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use beacon_bridge::memory::MemoryPushService;
use beacon_bridge::{BridgeDispatcher, CompletionCallback, Dispatch, TaskRunner};
use beacon_config::BeaconConfig;

use crate::protocol::{Request, Response};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn load_config() -> BeaconConfig {
    match BeaconConfig::load() {
        Ok(Some(config)) => {
            if let Some(path) = BeaconConfig::path() {
                tracing::info!(path = %path.display(), "Loaded config");
            }
            config
        }
        Ok(None) => {
            tracing::warn!("No config file found; initialize will report missing credentials");
            BeaconConfig::default()
        }
        Err(e) => {
            tracing::error!("{e}");
            BeaconConfig::default()
        }
    }
}

async fn write_replies(mut rx: mpsc::UnboundedReceiver<Response>) -> io::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(response) = rx.recv().await {
        stdout.write_all(response.to_line().as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

fn handle_line(bridge: &BridgeDispatcher, line: &str, replies: &mpsc::UnboundedSender<Response>) {
    let request = match Request::parse(line) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed request line");
            let _ = replies.send(Response::malformed(&e));
            return;
        }
    };

    let id = request.id.clone();
    let tx = replies.clone();
    let callback = CompletionCallback::new(move |reply| {
        // Writer gone means stdout is closed; nothing left to report to.
        let _ = tx.send(Response::from_reply(id, reply));
    });

    match bridge.execute(&request.action, &request.args, callback) {
        Dispatch::Handled => {}
        Dispatch::NotHandled(callback) => {
            // Nothing else to route to in this host.
            callback.disarm();
            let _ = replies.send(Response::NotHandled { id: request.id });
        }
    }
}

fn main() -> Result<()> {
    init_tracing();

    let config = load_config();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("beacon-worker")
        .build()
        .context("building tokio runtime")?;

    let options = config.bridge();
    let bridge = BridgeDispatcher::new(
        TaskRunner::new(runtime.handle().clone()),
        Arc::new(MemoryPushService::new()),
        Arc::new(config),
        options,
    );

    let (replies, rx) = mpsc::unbounded_channel();
    let writer = runtime.spawn(write_replies(rx));

    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        handle_line(&bridge, &line, &replies);
    }

    // Outstanding callbacks hold their own senders; the writer finishes once
    // the last of them has fired.
    drop(replies);
    runtime
        .block_on(writer)
        .context("reply writer panicked")?
        .context("writing replies")?;

    Ok(())
}
