//! Publishes domain events to the log and, when configured, to NATS.

use crate::domain::events::VenteEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    /// Events are published after the change is committed; a failed publish
    /// is logged and does not undo the change.
    pub async fn publish(&self, events: Vec<VenteEvent>) {
        for event in events {
            tracing::info!(subject = event.subject(), ?event, "vente event");
            let Some(client) = &self.nats else { continue };
            match serde_json::to_vec(&event) {
                Ok(payload) => {
                    if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
                        tracing::warn!(subject = event.subject(), error = %e, "failed to publish vente event");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to serialize vente event"),
            }
        }
    }
}
