use movetrack_core::tracker::Tracker;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Tracker>,
    pub event_tx: broadcast::Sender<()>,
}

impl AppState {
    pub fn new(tracker: Tracker) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            tracker: Arc::new(tracker),
            event_tx: tx,
        }
    }

    /// Tell `/stream` subscribers that something changed. Having no
    /// subscribers is not an error.
    pub fn notify_update(&self) {
        let _ = self.event_tx.send(());
    }
}
