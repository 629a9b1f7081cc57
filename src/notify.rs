use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for committed events, one channel per space. Presentation
/// layers subscribe to re-render availability as bookings land.
pub struct NotifyHub {
    channels: DashMap<String, broadcast::Sender<Event>>,
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to notifications for a space. Creates the channel if needed.
    pub fn subscribe(&self, space_name: &str) -> broadcast::Receiver<Event> {
        let sender = self
            .channels
            .entry(space_name.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, space_name: &str, event: &Event) {
        if let Some(sender) = self.channels.get(space_name) {
            let _ = sender.send(event.clone());
        }
    }

    /// Remove a channel (when the space is deleted).
    pub fn remove(&self, space_name: &str) {
        self.channels.remove(space_name);
    }
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}
