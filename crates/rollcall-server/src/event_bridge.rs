use std::sync::Arc;

use rollcall_core::RealtimeEvent;
use tokio::sync::broadcast;

use crate::client::ClientRegistry;

/// Subscribes to the attendance event broadcast and forwards events
/// to every connected WebSocket client.
pub struct EventBridge {
    registry: Arc<ClientRegistry>,
}

impl EventBridge {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Start the bridge. Spawns a task that reads from the broadcast channel,
    /// serializes each event once and fans it out.
    pub fn start(&self, mut rx: broadcast::Receiver<RealtimeEvent>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(&self.registry);

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let Some(json) = serialize_event(&event) else {
                            tracing::warn!(event_type = event.event_type(), "Failed to serialize event");
                            continue;
                        };
                        let delivered = registry.broadcast(&json);
                        tracing::debug!(event_type = event.event_type(), delivered, "Broadcast event");
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Event bridge lagged, dropped events");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bridge channel closed");
                        break;
                    }
                }
            }
        })
    }
}

/// Create an event bridge wired to a broadcast channel.
pub fn create_bridge(
    registry: Arc<ClientRegistry>,
    rx: broadcast::Receiver<RealtimeEvent>,
) -> tokio::task::JoinHandle<()> {
    let bridge = EventBridge::new(registry);
    bridge.start(rx)
}

pub fn serialize_event(event: &RealtimeEvent) -> Option<String> {
    serde_json::to_string(event).ok()
}
