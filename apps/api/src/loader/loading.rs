//! Process-wide loading-state notifications.
//!
//! Every load emits a `Start` event before its first tier and an `End` event
//! once it has an outcome. Presentation layers aggregate these into a single
//! indicator through the pending count.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::ResourceKind;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingPhase {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadingEvent {
    pub key: ResourceKind,
    pub phase: LoadingPhase,
    /// Pending loads right after this event was applied.
    pub pending: usize,
}

pub struct LoadingBus {
    tx: broadcast::Sender<LoadingEvent>,
    pending: AtomicUsize,
}

impl Default for LoadingBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadingBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            pending: AtomicUsize::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LoadingEvent> {
        self.tx.subscribe()
    }

    /// Logs every loading transition until the bus is dropped.
    pub fn spawn_event_log(&self) -> JoinHandle<()> {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => debug!(
                        "loading {} {:?}, {} pending",
                        event.key, event.phase, event.pending
                    ),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("loading event log fell behind, skipped {skipped} events")
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Marks `key` as loading until the returned guard is dropped.
    pub fn begin(self: &Arc<Self>, key: ResourceKind) -> LoadingGuard {
        let pending = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        self.publish(key, LoadingPhase::Start, pending);
        LoadingGuard {
            bus: Arc::clone(self),
            key,
        }
    }

    fn end(&self, key: ResourceKind) {
        // Saturates at zero.
        let previous = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_sub(1))
            })
            .unwrap_or(0);
        self.publish(key, LoadingPhase::End, previous.saturating_sub(1));
    }

    fn publish(&self, key: ResourceKind, phase: LoadingPhase, pending: usize) {
        trace!("loading {key} {phase:?} (pending {pending})");
        // No subscribers is fine.
        let _ = self.tx.send(LoadingEvent {
            key,
            phase,
            pending,
        });
    }
}

/// Emits the `End` event on drop, whether the load succeeded, failed, or was
/// cancelled.
pub struct LoadingGuard {
    bus: Arc<LoadingBus>,
    key: ResourceKind,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.bus.end(self.key);
    }
}
