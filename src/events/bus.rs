//! In-process fan-out of store mutations.
//!
//! The store holds the bus as an `Arc<dyn EventEmitter>`. Watchers either take
//! the raw [`broadcast::Receiver`] or a [`ProjectEvents`] stream narrowed to
//! one project's history.

use super::{CrudEvent, EventEmitter};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

/// Channel capacity used when the config does not set `events.capacity`
pub const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast channel of [`CrudEvent`]s. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CrudEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CrudEvent> {
        self.sender.subscribe()
    }

    /// Events whose `project_id` is `project_id`
    pub fn subscribe_project(&self, project_id: impl Into<String>) -> ProjectEvents {
        ProjectEvents {
            project_id: project_id.into(),
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventEmitter for EventBus {
    fn emit(&self, event: CrudEvent) {
        let entity = event.entity_type;
        let action = event.action;
        let project_id = event.project_id.clone().unwrap_or_default();
        // send only fails when nobody listens
        if let Ok(n) = self.sender.send(event) {
            debug!(
                entity_type = %entity,
                action = ?action,
                project_id = %project_id,
                subscribers = n,
                "store event emitted"
            );
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Subscription to one project's mutations
#[derive(Debug)]
pub struct ProjectEvents {
    project_id: String,
    receiver: broadcast::Receiver<CrudEvent>,
}

impl ProjectEvents {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Next event of this project, or `None` once every sender is gone.
    ///
    /// A watcher that falls more than the channel capacity behind skips the
    /// overwritten events and resumes with the oldest one still buffered.
    pub async fn recv(&mut self) -> Option<CrudEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.project_id.as_deref() == Some(self.project_id.as_str()) => {
                    return Some(event)
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(project_id = %self.project_id, skipped, "project watcher lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
