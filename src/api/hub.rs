//! Observer registry and event fan-out
//!
//! Each observer owns an unbounded queue drained by its transport task.
//! Fan-out copies the sender list under the lock and sends outside it, so
//! registration and removal never wait on delivery and a slow observer only
//! grows its own queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};

use crate::api::types::{BroadcastEvent, OutboundMessage};

/// Registration handle of one observer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Receiving side handed to the transport
#[derive(Debug)]
pub struct Observer {
    pub id: ObserverId,
    pub receiver: UnboundedReceiver<OutboundMessage>,
}

/// Live observer set
#[derive(Debug, Default)]
pub struct BroadcastHub {
    next_id: AtomicU64,
    observers: Mutex<HashMap<ObserverId, UnboundedSender<OutboundMessage>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ObserverId, UnboundedSender<OutboundMessage>>> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add an observer; it receives every event broadcast from now on
    pub fn register(&self) -> Observer {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (sender, receiver) = mpsc::unbounded_channel();
        let count = {
            let mut observers = self.lock();
            observers.insert(id, sender);
            observers.len()
        };
        info!(observer = id.value(), observers = count, "observer connected");
        Observer { id, receiver }
    }

    /// Drop an observer after its transport closed
    pub fn remove(&self, id: ObserverId) -> bool {
        let (removed, count) = {
            let mut observers = self.lock();
            let removed = observers.remove(&id).is_some();
            (removed, observers.len())
        };
        if removed {
            info!(observer = id.value(), observers = count, "observer disconnected");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue an event for one observer; false if it is gone or closed
    pub fn send_to(&self, id: ObserverId, event: &BroadcastEvent) -> bool {
        let sender = self.lock().get(&id).cloned();
        match (sender, Self::encode(event)) {
            (Some(sender), Some(message)) => Self::deliver(id, &sender, message),
            _ => false,
        }
    }

    /// Queue an event for every live observer; returns how many accepted it
    pub fn broadcast(&self, event: &BroadcastEvent) -> usize {
        let Some(message) = Self::encode(event) else {
            return 0;
        };
        let targets: Vec<(ObserverId, UnboundedSender<OutboundMessage>)> = self
            .lock()
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();

        targets
            .iter()
            .filter(|(id, sender)| Self::deliver(*id, sender, message.clone()))
            .count()
    }

    fn encode(event: &BroadcastEvent) -> Option<OutboundMessage> {
        match event.to_message() {
            Ok(message) => Some(message),
            Err(e) => {
                error!(error = %e, "failed to encode event");
                None
            }
        }
    }

    /// A closed queue means the transport is shutting down; skipping it is not an error
    fn deliver(id: ObserverId, sender: &UnboundedSender<OutboundMessage>, message: OutboundMessage) -> bool {
        match sender.send(message) {
            Ok(()) => true,
            Err(_) => {
                debug!(observer = id.value(), "observer not ready, event skipped");
                false
            }
        }
    }
}
