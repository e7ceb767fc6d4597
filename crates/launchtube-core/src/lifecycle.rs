//! Process lifecycle events.
//!
//! Managers announce process exits over a bounded channel instead of bare
//! callbacks. Each launch gets its own [`ExitNotifier`]; the notifier sends
//! at most one event no matter how many paths observe the exit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// The managed browser process is gone (user quit, crash, or close()).
    BrowserExited { pid: Option<u32> },
    /// The external player finished its last playlist item.
    PlayerExited { item_id: Option<String> },
}

pub type LifecycleSender = mpsc::Sender<LifecycleEvent>;
pub type LifecycleReceiver = mpsc::Receiver<LifecycleEvent>;

pub fn channel(capacity: usize) -> (LifecycleSender, LifecycleReceiver) {
    mpsc::channel(capacity)
}

/// Sends one lifecycle event, exactly once, for one launched process.
pub struct ExitNotifier {
    tx: Option<LifecycleSender>,
    fired: AtomicBool,
}

impl ExitNotifier {
    pub fn new(tx: Option<LifecycleSender>) -> Arc<Self> {
        Arc::new(Self {
            tx,
            fired: AtomicBool::new(false),
        })
    }

    /// Deliver the event. Later calls are ignored; a full or closed channel
    /// drops the event with a warning rather than blocking an exit path.
    pub fn notify(&self, event: LifecycleEvent) {
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(tx) = &self.tx {
            if let Err(e) = tx.try_send(event) {
                tracing::warn!("lifecycle event dropped: {}", e);
            }
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}
