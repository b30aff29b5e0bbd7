use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    models::PlacementTarget,
    relocation::{RelocationCoordinator, SubmissionOutcome},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Places an asset, moving it away from its current location after
/// confirmation when needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlacementCommand {
    #[serde(flatten)]
    pub target: PlacementTarget,
}

impl CreatePlacementCommand {
    pub fn new(target: PlacementTarget) -> Self {
        Self { target }
    }
}

#[async_trait::async_trait]
impl Command for CreatePlacementCommand {
    type Result = SubmissionOutcome;

    #[instrument(skip(self, coordinator, event_sender), fields(asset_id = self.target.asset_id()))]
    async fn execute(
        &self,
        coordinator: Arc<RelocationCoordinator>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let asset_id = self.target.asset_id();

        let outcome = match coordinator.submit_placement(self.target.clone()).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "placement submission failed");
                if let Some(asset_id) = err.asset_id() {
                    event_sender
                        .publish(Event::RelocationFailed {
                            asset_id,
                            partially_moved: err.is_partial_move(),
                            reason: err.to_string(),
                        })
                        .await;
                }
                return Err(err.into());
            }
        };

        self.log_and_trigger_events(&event_sender, &outcome).await;
        info!(asset_id, cancelled = outcome.is_cancelled(), "placement submission finished");
        Ok(outcome)
    }
}

impl CreatePlacementCommand {
    async fn log_and_trigger_events(&self, event_sender: &EventSender, outcome: &SubmissionOutcome) {
        let asset_id = self.target.asset_id();
        match outcome {
            SubmissionOutcome::Created {
                placement,
                location_type,
                ..
            } => {
                event_sender
                    .publish(Event::PlacementCreated {
                        asset_id,
                        location_type: *location_type,
                        placement_id: placement.id,
                    })
                    .await;
            }
            SubmissionOutcome::Relocated {
                placement,
                location_type,
                previous,
            } => {
                if let Some(from) = previous.location_type {
                    event_sender
                        .publish(Event::AssetRemovedFromLocation {
                            asset_id,
                            location_type: from,
                        })
                        .await;
                    event_sender
                        .publish(Event::AssetRelocated {
                            asset_id,
                            from,
                            to: *location_type,
                            placement_id: placement.id,
                        })
                        .await;
                }
                event_sender
                    .publish(Event::PlacementCreated {
                        asset_id,
                        location_type: *location_type,
                        placement_id: placement.id,
                    })
                    .await;
            }
            SubmissionOutcome::Cancelled { .. } => {
                event_sender
                    .publish(Event::RelocationCancelled { asset_id })
                    .await;
            }
        }
    }
}
