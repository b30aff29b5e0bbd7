pub mod create_placement_command;
pub mod delete_placement_command;
pub mod remove_from_location_command;
pub mod update_placement_command;

pub use create_placement_command::CreatePlacementCommand;
pub use delete_placement_command::DeletePlacementCommand;
pub use remove_from_location_command::RemoveFromLocationCommand;
pub use update_placement_command::UpdatePlacementCommand;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::errors::{RelocationError, ServiceError};
    use crate::events::{Event, EventSender};
    use crate::models::{LocationType, PlacementPayload, PlacementTarget};
    use crate::notifications::InMemoryNotifier;
    use crate::prompt::AutoConfirm;
    use crate::relocation::{RelocationCoordinator, RelocationSettings, SubmissionOutcome};
    use crate::services::in_memory::{FailurePoint, InMemoryPlacementStore};
    use assert_matches::assert_matches;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Harness {
        store: InMemoryPlacementStore,
        coordinator: Arc<RelocationCoordinator>,
        events: Arc<EventSender>,
        rx: mpsc::Receiver<Event>,
    }

    impl Harness {
        fn new(accept: bool) -> Self {
            let store = InMemoryPlacementStore::new();
            let coordinator = Arc::new(RelocationCoordinator::new(
                store.services(),
                Arc::new(AutoConfirm(accept)),
                Arc::new(InMemoryNotifier::new()),
                RelocationSettings::default().with_settle_delay(Duration::ZERO),
            ));
            let (tx, rx) = mpsc::channel(16);
            Self {
                store,
                coordinator,
                events: Arc::new(EventSender::new(tx)),
                rx,
            }
        }

        fn drain(&mut self) -> Vec<Event> {
            let mut events = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                events.push(event);
            }
            events
        }
    }

    #[tokio::test]
    async fn relocation_publishes_removal_then_move() {
        let mut h = Harness::new(true);
        h.store
            .seed_placement(LocationType::Warehouse, PlacementPayload::new(42, 3, 1))
            .await
            .unwrap();

        let outcome = CreatePlacementCommand::new(PlacementTarget::site(PlacementPayload::new(42, 7, 1)))
            .execute(h.coordinator.clone(), h.events.clone())
            .await
            .unwrap();
        assert_matches!(outcome, SubmissionOutcome::Relocated { .. });

        let events = h.drain();
        assert_matches!(
            events[0],
            Event::AssetRemovedFromLocation {
                asset_id: 42,
                location_type: LocationType::Warehouse
            }
        );
        assert_matches!(
            events[1],
            Event::AssetRelocated {
                from: LocationType::Warehouse,
                to: LocationType::Site,
                ..
            }
        );
    }

    #[tokio::test]
    async fn declined_relocation_publishes_cancellation() {
        let mut h = Harness::new(false);
        h.store
            .seed_placement(LocationType::Site, PlacementPayload::new(5, 1, 1))
            .await
            .unwrap();

        CreatePlacementCommand::new(PlacementTarget::warehouse(PlacementPayload::new(5, 2, 1)))
            .execute(h.coordinator.clone(), h.events.clone())
            .await
            .unwrap();

        assert_eq!(h.drain(), vec![Event::RelocationCancelled { asset_id: 5 }]);
    }

    #[tokio::test]
    async fn partial_move_publishes_failure_event() {
        let mut h = Harness::new(true);
        h.store
            .seed_placement(LocationType::Warehouse, PlacementPayload::new(42, 3, 1))
            .await
            .unwrap();
        h.store.fail_next(FailurePoint::Create(LocationType::Site)).await;

        let err = CreatePlacementCommand::new(PlacementTarget::site(PlacementPayload::new(42, 7, 1)))
            .execute(h.coordinator.clone(), h.events.clone())
            .await
            .unwrap_err();
        assert_matches!(
            err,
            ServiceError::Relocation(RelocationError::PartiallyMoved { .. })
        );
        assert_matches!(
            h.drain().as_slice(),
            [Event::RelocationFailed {
                asset_id: 42,
                partially_moved: true,
                ..
            }]
        );
    }

    #[tokio::test]
    async fn update_and_delete_go_straight_to_the_collaborator() {
        let mut h = Harness::new(true);
        let placement = h
            .store
            .seed_placement(LocationType::Site, PlacementPayload::new(8, 4, 1))
            .await
            .unwrap();

        let updated = UpdatePlacementCommand {
            location_type: LocationType::Site,
            placement_id: placement.id,
            payload: PlacementPayload::new(8, 4, 2),
        }
        .execute(h.coordinator.clone(), h.events.clone())
        .await
        .unwrap();
        assert_eq!(updated.asset_status_id, 2);

        DeletePlacementCommand {
            location_type: LocationType::Site,
            placement_id: placement.id,
        }
        .execute(h.coordinator.clone(), h.events.clone())
        .await
        .unwrap();

        assert!(h.store.placements_of(8).await.is_empty());
        assert_eq!(
            h.drain(),
            vec![
                Event::PlacementUpdated {
                    asset_id: 8,
                    location_type: LocationType::Site,
                    placement_id: placement.id
                },
                Event::PlacementDeleted {
                    location_type: LocationType::Site,
                    placement_id: placement.id
                },
            ]
        );
    }

    #[tokio::test]
    async fn vacate_rejects_invalid_asset_id() {
        let h = Harness::new(true);
        let err = RemoveFromLocationCommand {
            location_type: LocationType::Warehouse,
            asset_id: 0,
        }
        .execute(h.coordinator.clone(), h.events.clone())
        .await
        .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));
        assert!(h.store.journal().await.is_empty());
    }
}
