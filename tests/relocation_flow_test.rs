mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use asset_placement::{
    notifications::NotificationLevel,
    prompt::ChannelPrompt,
    services::in_memory::{FailurePoint, InMemoryPlacementStore, StoreCall},
    services::LocationQuery,
    LocationType, PlacementPayload, PlacementTarget, PreflightStatus, RelocationCoordinator,
    RelocationError, RelocationSettings, RelocationState, SubmissionOutcome,
};
use common::{RecordingPrompt, TestHarness};
use tokio::sync::broadcast;

fn to_site_7() -> PlacementTarget {
    PlacementTarget::site(PlacementPayload::new(42, 7, 2))
}

#[tokio::test]
async fn unplaced_asset_never_prompts() {
    let h = TestHarness::new(RecordingPrompt::accepting());

    let outcome = h.coordinator.submit_placement(to_site_7()).await.unwrap();

    assert_matches!(
        outcome,
        SubmissionOutcome::Created {
            preflight: PreflightStatus::Unplaced,
            ..
        }
    );
    assert!(h.prompt.seen().is_empty());
    assert_eq!(
        h.store.journal().await,
        vec![
            StoreCall::CheckLocation { asset_id: 42 },
            StoreCall::Create {
                location_type: LocationType::Site,
                asset_id: 42,
                location_id: 7,
            },
        ]
    );
}

#[tokio::test]
async fn asset_42_moves_from_warehouse_3_to_site_7() {
    let h = TestHarness::new(RecordingPrompt::accepting());
    h.seed_asset_42_at_warehouse_3().await;

    let outcome = h.coordinator.submit_placement(to_site_7()).await.unwrap();

    let seen = h.prompt.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].asset_tag_id, "AST-0042");
    assert_eq!(seen[0].current_location_type, LocationType::Warehouse);
    assert_eq!(seen[0].current_location_name.as_deref(), Some("Central Depot"));
    assert_eq!(seen[0].current_location_code.as_deref(), Some("WH-03"));
    assert_eq!(seen[0].new_location_type, LocationType::Site);

    assert_eq!(
        h.store.journal().await,
        vec![
            StoreCall::CheckLocation { asset_id: 42 },
            StoreCall::RemoveFromCurrentLocation {
                location_type: LocationType::Warehouse,
                asset_id: 42,
            },
            StoreCall::Create {
                location_type: LocationType::Site,
                asset_id: 42,
                location_id: 7,
            },
        ]
    );

    let placement = assert_matches!(
        outcome,
        SubmissionOutcome::Relocated { placement, location_type: LocationType::Site, .. } => placement
    );
    assert_eq!(placement.location_id, 7);

    let placements = h.store.placements_of(42).await;
    assert_eq!(placements.len(), 1);
    assert_eq!(placements[0].0, LocationType::Site);
    assert_eq!(h.coordinator.state(), RelocationState::Idle);
    assert!(h.coordinator.pending_relocation().is_none());
}

#[tokio::test]
async fn declining_makes_no_mutating_call() {
    let h = TestHarness::new(RecordingPrompt::declining());
    h.seed_asset_42_at_warehouse_3().await;

    let outcome = h.coordinator.submit_placement(to_site_7()).await.unwrap();

    assert!(outcome.is_cancelled());
    assert_eq!(h.prompt.seen().len(), 1);
    assert!(!h.store.journal().await.iter().any(StoreCall::is_mutation));

    let check = h.store.check_location(42).await.unwrap();
    assert_eq!(check.location_type, Some(LocationType::Warehouse));
}

#[tokio::test]
async fn removal_failure_never_attempts_create() {
    let h = TestHarness::new(RecordingPrompt::accepting());
    h.seed_asset_42_at_warehouse_3().await;
    h.store
        .fail_next(FailurePoint::Remove(LocationType::Warehouse))
        .await;

    let err = h.coordinator.submit_placement(to_site_7()).await.unwrap_err();

    assert_matches!(err, RelocationError::RemovalFailed { .. });
    assert!(!h
        .store
        .journal()
        .await
        .iter()
        .any(|call| matches!(call, StoreCall::Create { .. })));
    let placements = h.store.placements_of(42).await;
    assert_eq!(placements.len(), 1);
    assert_eq!(placements[0].0, LocationType::Warehouse);
    assert!(h.coordinator.pending_relocation().is_none());
}

#[tokio::test]
async fn create_failure_after_removal_leaves_asset_unplaced() {
    let h = TestHarness::new(RecordingPrompt::accepting());
    h.seed_asset_42_at_warehouse_3().await;
    h.store.fail_next(FailurePoint::Create(LocationType::Site)).await;

    let err = h.coordinator.submit_placement(to_site_7()).await.unwrap_err();

    assert!(err.is_partial_move());
    assert!(err
        .to_string()
        .contains("was removed from its previous warehouse but has not been placed in the new site"));

    let check = h.store.check_location(42).await.unwrap();
    assert_eq!(check.location_type, None);

    assert_eq!(
        h.coordinator.state(),
        RelocationState::Failed {
            partially_moved: true
        }
    );
    let notifications = h.notifier.notifications().await;
    let last = notifications.last().unwrap();
    assert_eq!(last.level, NotificationLevel::Error);
    assert_eq!(last.title, "Asset removed but not placed");
}

#[tokio::test]
async fn check_failure_with_unplaced_asset_still_places() {
    let h = TestHarness::new(RecordingPrompt::accepting());
    h.store.fail_next(FailurePoint::CheckLocation).await;

    let outcome = h.coordinator.submit_placement(to_site_7()).await.unwrap();

    assert_matches!(
        outcome,
        SubmissionOutcome::Created {
            preflight: PreflightStatus::Unavailable,
            ..
        }
    );
    assert!(h.prompt.seen().is_empty());
    assert_eq!(h.store.placements_of(42).await.len(), 1);
}

#[tokio::test]
async fn check_failure_with_placed_asset_is_rejected_by_backend() {
    let h = TestHarness::new(RecordingPrompt::accepting());
    h.seed_asset_42_at_warehouse_3().await;
    h.store.fail_next(FailurePoint::CheckLocation).await;

    let err = h.coordinator.submit_placement(to_site_7()).await.unwrap_err();

    assert_matches!(err, RelocationError::CreationFailed { .. });
    assert!(!err.is_partial_move());
    assert_eq!(h.store.placements_of(42).await[0].0, LocationType::Warehouse);
}

#[tokio::test]
async fn direct_create_failure_is_not_a_partial_move() {
    let h = TestHarness::new(RecordingPrompt::accepting());
    h.store.fail_next(FailurePoint::Create(LocationType::Site)).await;

    let err = h.coordinator.submit_placement(to_site_7()).await.unwrap_err();

    assert_matches!(
        err,
        RelocationError::CreationFailed {
            location_type: LocationType::Site,
            ..
        }
    );
    assert_eq!(
        h.coordinator.state(),
        RelocationState::Failed {
            partially_moved: false
        }
    );
}

#[tokio::test]
async fn site_to_warehouse_removes_through_site_collaborator() {
    let h = TestHarness::new(RecordingPrompt::accepting());
    h.store
        .seed_placement(LocationType::Site, PlacementPayload::new(9, 7, 1))
        .await
        .unwrap();

    h.coordinator
        .submit_placement(PlacementTarget::warehouse(PlacementPayload::new(9, 3, 1)))
        .await
        .unwrap();

    assert!(h.store.journal().await.contains(&StoreCall::RemoveFromCurrentLocation {
        location_type: LocationType::Site,
        asset_id: 9,
    }));
    assert_eq!(h.store.placements_of(9).await[0].0, LocationType::Warehouse);
}

#[tokio::test]
async fn atomic_strategy_moves_in_one_call() {
    let h = TestHarness::atomic(RecordingPrompt::accepting());
    h.seed_asset_42_at_warehouse_3().await;

    let outcome = h.coordinator.submit_placement(to_site_7()).await.unwrap();

    assert_matches!(outcome, SubmissionOutcome::Relocated { .. });
    assert_eq!(
        h.store.journal().await,
        vec![
            StoreCall::CheckLocation { asset_id: 42 },
            StoreCall::Relocate {
                asset_id: 42,
                location_type: LocationType::Site,
                location_id: 7,
            },
        ]
    );
}

#[tokio::test]
async fn atomic_failure_keeps_prior_placement() {
    let h = TestHarness::atomic(RecordingPrompt::accepting());
    h.seed_asset_42_at_warehouse_3().await;
    h.store.fail_next(FailurePoint::Relocate).await;

    let err = h.coordinator.submit_placement(to_site_7()).await.unwrap_err();

    assert_matches!(err, RelocationError::RelocationFailed { .. });
    let check = h.store.check_location(42).await.unwrap();
    assert_eq!(check.location_type, Some(LocationType::Warehouse));
}

#[tokio::test]
async fn invalid_warehouse_dates_are_rejected_before_any_call() {
    let h = TestHarness::new(RecordingPrompt::accepting());
    let mut payload = PlacementPayload::new(42, 3, 1);
    payload.dates.deployed_date = chrono::NaiveDate::from_ymd_opt(2024, 5, 1);

    let err = h
        .coordinator
        .submit_placement(PlacementTarget::warehouse(payload))
        .await
        .unwrap_err();

    assert_matches!(err, RelocationError::InvalidPlacement(_));
    assert!(h.store.journal().await.is_empty());
}

#[tokio::test]
async fn settle_delay_separates_remove_and_create() {
    let h = TestHarness::with_settings(
        RecordingPrompt::accepting(),
        RelocationSettings::default().with_settle_delay(Duration::from_millis(50)),
    );
    h.seed_asset_42_at_warehouse_3().await;

    let started = Instant::now();
    h.coordinator.submit_placement(to_site_7()).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[tokio::test]
async fn second_submission_while_pending_is_rejected() {
    let store = InMemoryPlacementStore::new();
    store
        .seed_placement(LocationType::Warehouse, PlacementPayload::new(42, 3, 1))
        .await
        .unwrap();
    let (prompt, mut requests) = ChannelPrompt::channel(1);
    let coordinator = Arc::new(RelocationCoordinator::new(
        store.services(),
        Arc::new(prompt),
        Arc::new(asset_placement::notifications::InMemoryNotifier::new()),
        RelocationSettings::default().with_settle_delay(Duration::ZERO),
    ));

    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.submit_placement(to_site_7()).await })
    };

    let request = requests.recv().await.expect("prompt shown");
    assert_eq!(coordinator.state(), RelocationState::AwaitingConfirmation);
    let pending = coordinator.pending_relocation().expect("pending relocation");
    assert_eq!(pending.target, to_site_7());
    assert_eq!(pending.previous_location_type(), Some(LocationType::Warehouse));

    let second = coordinator
        .submit_placement(PlacementTarget::site(PlacementPayload::new(42, 8, 2)))
        .await;
    assert_matches!(second, Err(RelocationError::SubmissionInProgress));

    request.accept();
    let outcome = first.await.unwrap().unwrap();
    assert_matches!(outcome, SubmissionOutcome::Relocated { .. });
    assert!(coordinator.pending_relocation().is_none());
}

fn drain(rx: &mut broadcast::Receiver<RelocationState>) -> Vec<RelocationState> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

#[tokio::test]
async fn current_state_settles_back_to_idle() {
    let h = TestHarness::new(RecordingPrompt::accepting());
    h.seed_asset_42_at_warehouse_3().await;
    let mut rx = h.coordinator.subscribe_state();

    h.coordinator.submit_placement(to_site_7()).await.unwrap();

    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), RelocationState::Idle);
}

#[tokio::test]
async fn accepted_move_walks_every_transition() {
    let h = TestHarness::new(RecordingPrompt::accepting());
    h.seed_asset_42_at_warehouse_3().await;
    let mut rx = h.coordinator.subscribe_transitions();

    h.coordinator.submit_placement(to_site_7()).await.unwrap();

    assert_eq!(
        drain(&mut rx),
        vec![
            RelocationState::Checking,
            RelocationState::ConflictDetected,
            RelocationState::AwaitingConfirmation,
            RelocationState::Confirmed,
            RelocationState::Removing,
            RelocationState::Removed,
            RelocationState::Submitting,
            RelocationState::Created,
            RelocationState::Idle,
        ]
    );
}

#[tokio::test]
async fn unplaced_asset_transitions_skip_confirmation() {
    let h = TestHarness::new(RecordingPrompt::accepting());
    let mut rx = h.coordinator.subscribe_transitions();

    h.coordinator.submit_placement(to_site_7()).await.unwrap();

    assert_eq!(
        drain(&mut rx),
        vec![
            RelocationState::Checking,
            RelocationState::NoConflict,
            RelocationState::Submitting,
            RelocationState::Created,
            RelocationState::Idle,
        ]
    );
}

#[tokio::test]
async fn declined_move_transitions_through_cancelled() {
    let h = TestHarness::new(RecordingPrompt::declining());
    h.seed_asset_42_at_warehouse_3().await;
    let mut rx = h.coordinator.subscribe_transitions();

    h.coordinator.submit_placement(to_site_7()).await.unwrap();

    assert_eq!(
        drain(&mut rx),
        vec![
            RelocationState::Checking,
            RelocationState::ConflictDetected,
            RelocationState::AwaitingConfirmation,
            RelocationState::Cancelled,
            RelocationState::Idle,
        ]
    );
}

#[tokio::test]
async fn removal_failure_transitions_end_in_failed() {
    let h = TestHarness::new(RecordingPrompt::accepting());
    h.seed_asset_42_at_warehouse_3().await;
    h.store
        .fail_next(FailurePoint::Remove(LocationType::Warehouse))
        .await;
    let mut rx = h.coordinator.subscribe_transitions();

    h.coordinator.submit_placement(to_site_7()).await.unwrap_err();

    assert_eq!(
        drain(&mut rx),
        vec![
            RelocationState::Checking,
            RelocationState::ConflictDetected,
            RelocationState::AwaitingConfirmation,
            RelocationState::Confirmed,
            RelocationState::Removing,
            RelocationState::RemoveFailed,
            RelocationState::Failed {
                partially_moved: false
            },
        ]
    );
    assert_eq!(
        h.coordinator.state(),
        RelocationState::Failed {
            partially_moved: false
        }
    );
}

#[tokio::test]
async fn partial_move_transitions_end_in_failed() {
    let h = TestHarness::new(RecordingPrompt::accepting());
    h.seed_asset_42_at_warehouse_3().await;
    h.store.fail_next(FailurePoint::Create(LocationType::Site)).await;
    let mut rx = h.coordinator.subscribe_transitions();

    h.coordinator.submit_placement(to_site_7()).await.unwrap_err();

    assert_eq!(
        drain(&mut rx),
        vec![
            RelocationState::Checking,
            RelocationState::ConflictDetected,
            RelocationState::AwaitingConfirmation,
            RelocationState::Confirmed,
            RelocationState::Removing,
            RelocationState::Removed,
            RelocationState::Submitting,
            RelocationState::CreateFailed,
            RelocationState::Failed {
                partially_moved: true
            },
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_observer_sees_cancellation() {
    let h = TestHarness::new(RecordingPrompt::declining());
    h.seed_asset_42_at_warehouse_3().await;
    let mut rx = h.coordinator.subscribe_transitions();

    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Ok(state) = rx.recv().await {
            seen.push(state);
            if state == RelocationState::Idle {
                break;
            }
        }
        seen
    });

    let coordinator = h.coordinator.clone();
    tokio::spawn(async move { coordinator.submit_placement(to_site_7()).await })
        .await
        .unwrap()
        .unwrap();

    let seen = tokio::time::timeout(Duration::from_secs(5), observer)
        .await
        .expect("observer finished")
        .unwrap();
    assert!(seen.contains(&RelocationState::Checking));
    assert!(seen.contains(&RelocationState::Cancelled));
    assert_eq!(seen.last(), Some(&RelocationState::Idle));
}
