use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{LocationType, Placement, PlacementPayload},
    relocation::RelocationCoordinator,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use validator::Validate;

/// Edits an existing placement record in place. Never checks or moves.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlacementCommand {
    pub location_type: LocationType,
    #[validate(range(min = 1))]
    pub placement_id: i64,
    #[validate]
    pub payload: PlacementPayload,
}

#[async_trait::async_trait]
impl Command for UpdatePlacementCommand {
    type Result = Placement;

    #[instrument(skip(self, coordinator, event_sender), fields(placement_id = self.placement_id))]
    async fn execute(
        &self,
        coordinator: Arc<RelocationCoordinator>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        let placement = coordinator
            .submit_update(self.location_type, self.placement_id, self.payload.clone())
            .await?;

        event_sender
            .publish(Event::PlacementUpdated {
                asset_id: placement.asset_id,
                location_type: self.location_type,
                placement_id: placement.id,
            })
            .await;

        Ok(placement)
    }
}
