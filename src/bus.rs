use crate::session::{SessionId, SessionState};
use tokio::sync::broadcast;

/// A session state change, as published to observers
#[derive(Clone, Debug)]
pub struct SessionUpdate {
    pub session_id: SessionId,
    pub state: SessionState,
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionUpdate>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.tx.subscribe()
    }

    /// Returns the number of receivers reached; zero receivers is not an error here.
    pub fn publish(&self, update: SessionUpdate) -> usize {
        self.tx.send(update).unwrap_or(0)
    }
}
