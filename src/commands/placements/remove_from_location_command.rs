use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{LocationType},
    relocation::RelocationCoordinator,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use validator::Validate;

/// Vacates an asset's active placement of one kind without placing it
/// anywhere else.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromLocationCommand {
    pub location_type: LocationType,
    #[validate(range(min = 1))]
    pub asset_id: i64,
}

#[async_trait::async_trait]
impl Command for RemoveFromLocationCommand {
    type Result = ();

    #[instrument(skip(coordinator, event_sender))]
    async fn execute(
        &self,
        coordinator: Arc<RelocationCoordinator>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        coordinator
            .services()
            .commands_for(self.location_type)
            .remove_from_current_location(self.asset_id)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to remove asset from its location");
                e
            })?;

        info!("asset removed from its location");
        event_sender
            .publish(Event::AssetRemovedFromLocation {
                asset_id: self.asset_id,
                location_type: self.location_type,
            })
            .await;
        Ok(())
    }
}
