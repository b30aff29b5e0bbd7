use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::models::{AssetId, LocationType, PlacementId};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when nobody listens.
    /// Used after a remote side effect has already happened.
    pub async fn publish(&self, event: Event) {
        if let Err(err) = self.send(event).await {
            warn!(error = %err, "dropping placement event");
        }
    }
}

// Define the various events that can occur around asset placements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    PlacementCreated {
        asset_id: AssetId,
        location_type: LocationType,
        placement_id: PlacementId,
    },
    PlacementUpdated {
        asset_id: AssetId,
        location_type: LocationType,
        placement_id: PlacementId,
    },
    PlacementDeleted {
        location_type: LocationType,
        placement_id: PlacementId,
    },
    AssetRemovedFromLocation {
        asset_id: AssetId,
        location_type: LocationType,
    },
    AssetRelocated {
        asset_id: AssetId,
        from: LocationType,
        to: LocationType,
        placement_id: PlacementId,
    },
    RelocationCancelled {
        asset_id: AssetId,
    },
    RelocationFailed {
        asset_id: AssetId,
        partially_moved: bool,
        reason: String,
    },
}

impl Event {
    pub fn asset_id(&self) -> Option<AssetId> {
        match self {
            Event::PlacementDeleted { .. } => None,
            Event::PlacementCreated { asset_id, .. }
            | Event::PlacementUpdated { asset_id, .. }
            | Event::AssetRemovedFromLocation { asset_id, .. }
            | Event::AssetRelocated { asset_id, .. }
            | Event::RelocationCancelled { asset_id }
            | Event::RelocationFailed { asset_id, .. } => Some(*asset_id),
        }
    }
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::RelocationFailed {
                asset_id,
                partially_moved: true,
                reason,
            } => {
                warn!(
                    asset_id,
                    reason = %reason,
                    "asset left without a placement; manual re-placement required"
                );
            }
            Event::RelocationFailed {
                asset_id, reason, ..
            } => {
                warn!(asset_id, reason = %reason, "relocation failed");
            }
            _ => info!(asset_id = ?event.asset_id(), "Received event: {:?}", event),
        }
    }

    info!("Event processing loop stopped");
}
