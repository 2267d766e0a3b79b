//! Change notification stream
//!
//! Publish-subscribe over a tokio broadcast channel. Subscribers that lag
//! behind lose the oldest events; the drive never blocks on a slow consumer.

use std::sync::{Mutex, PoisonError};

use fsaccess_protocol::{ChangeEvent, ChangeType, ContentModel};
use tokio::sync::broadcast;

pub struct ChangeBus {
    sender: Mutex<Option<broadcast::Sender<ChangeEvent>>>,
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Subscribe to future events
    ///
    /// After [`ChangeBus::close`] the returned receiver is already closed.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    /// Deliver an event to current subscribers; returns how many received it
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            return 0;
        };
        tracing::debug!(change = ?event.change_type, "Publishing change event");
        sender.send(event).unwrap_or(0)
    }

    pub fn created(&self, model: ContentModel) -> usize {
        self.publish(ChangeEvent {
            change_type: ChangeType::New,
            old_value: None,
            new_value: Some(model),
        })
    }

    pub fn saved(&self, model: ContentModel) -> usize {
        self.publish(ChangeEvent {
            change_type: ChangeType::Save,
            old_value: None,
            new_value: Some(model),
        })
    }

    pub fn deleted(&self, model: ContentModel) -> usize {
        self.publish(ChangeEvent {
            change_type: ChangeType::Delete,
            old_value: Some(model),
            new_value: None,
        })
    }

    pub fn renamed(&self, old: ContentModel, new: ContentModel) -> usize {
        self.publish(ChangeEvent {
            change_type: ChangeType::Rename,
            old_value: Some(old),
            new_value: Some(new),
        })
    }

    /// Drop the sender so every subscriber observes the stream ending
    pub fn close(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}
