use crate::{errors::ServiceError, events::EventSender, relocation::RelocationCoordinator};
use async_trait::async_trait;
use std::sync::Arc;

/// Command trait for implementing the Command Pattern
///
/// A command encapsulates one placement operation: it validates its input,
/// runs against the coordinator's collaborators and publishes domain events.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command with the given dependencies
    ///
    /// # Arguments
    /// * `coordinator` - Relocation coordinator owning the placement collaborators
    /// * `event_sender` - Channel to publish domain events
    async fn execute(
        &self,
        coordinator: Arc<RelocationCoordinator>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError>;
}

pub mod placements;
