//! Viewer session registry and reload fan-out.
//!
//! The hub owns the set of connected viewers and decides when the server
//! has outlived its use: once at least one viewer has connected and the
//! set later drains to zero for a full grace period, the hub signals done.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Message pushed to every viewer when the file changes.
pub(crate) const RELOAD_MESSAGE: &str = "reload";

/// How long an empty registry must stay empty before the hub signals done.
/// Must exceed the client's 1 s reconnect delay so a reload-triggered
/// reconnect does not read as the last viewer leaving.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Registry of connected viewer sessions.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Clone)]
pub(crate) struct ReloadHub {
    inner: Arc<Mutex<HubState>>,
    done: CancellationToken,
}

struct HubState {
    sessions: HashMap<Uuid, mpsc::UnboundedSender<&'static str>>,
    /// Set on the first register and never cleared. A server that has
    /// never had a viewer must not shut down over an empty registry.
    ever_connected: bool,
    /// Latch so the done signal is raised at most once.
    shutdown_signaled: bool,
}

impl ReloadHub {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubState {
                sessions: HashMap::new(),
                ever_connected: false,
                shutdown_signaled: false,
            })),
            done: CancellationToken::new(),
        }
    }

    /// Completes once every viewer has disconnected and stayed away for
    /// the grace period.
    pub(crate) async fn drained(&self) {
        self.done.cancelled().await;
    }

    /// Add a session and return its registry id.
    pub(crate) fn register(&self, sender: mpsc::UnboundedSender<&'static str>) -> Uuid {
        let id = Uuid::new_v4();
        let mut state = self.inner.lock().unwrap();
        state.sessions.insert(id, sender);
        state.ever_connected = true;
        tracing::debug!(session = %id, viewers = state.sessions.len(), "Viewer connected");
        id
    }

    /// Remove a session.
    ///
    /// When the last viewer leaves, arms the grace timer that may signal
    /// done.
    pub(crate) fn unregister(&self, id: Uuid) {
        let drained = {
            let mut state = self.inner.lock().unwrap();
            state.sessions.remove(&id);
            tracing::debug!(session = %id, viewers = state.sessions.len(), "Viewer disconnected");
            state.ever_connected && state.sessions.is_empty()
        };

        if drained {
            self.arm_shutdown_timer();
        }
    }

    /// Send the reload message to every registered session.
    ///
    /// Sessions whose channel is gone are removed in the same pass; a dead
    /// session never blocks delivery to the rest. Never fails.
    pub(crate) fn broadcast(&self) {
        let drained = {
            let mut state = self.inner.lock().unwrap();
            let dead: Vec<Uuid> = state
                .sessions
                .iter()
                .filter(|(_, sender)| sender.send(RELOAD_MESSAGE).is_err())
                .map(|(id, _)| *id)
                .collect();
            for id in &dead {
                state.sessions.remove(id);
                tracing::warn!(session = %id, "Dropping unreachable viewer");
            }
            !dead.is_empty() && state.ever_connected && state.sessions.is_empty()
        };

        if drained {
            self.arm_shutdown_timer();
        }
    }

    /// After the grace period, signal done if the registry is still empty.
    /// A viewer that reconnects within the grace period disarms this.
    fn arm_shutdown_timer(&self) {
        let hub = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(SHUTDOWN_GRACE).await;

            let signal = {
                let mut state = hub.inner.lock().unwrap();
                if state.ever_connected && state.sessions.is_empty() && !state.shutdown_signaled {
                    state.shutdown_signaled = true;
                    true
                } else {
                    false
                }
            };

            if signal {
                tracing::info!("All browser clients disconnected, shutting down...");
                hub.done.cancel();
            }
        });
    }
}
