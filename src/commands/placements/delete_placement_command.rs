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

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeletePlacementCommand {
    pub location_type: LocationType,
    #[validate(range(min = 1))]
    pub placement_id: i64,
}

#[async_trait::async_trait]
impl Command for DeletePlacementCommand {
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
            .delete(self.placement_id)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to delete placement");
                e
            })?;

        info!("placement deleted");
        event_sender
            .publish(Event::PlacementDeleted {
                location_type: self.location_type,
                placement_id: self.placement_id,
            })
            .await;
        Ok(())
    }
}
