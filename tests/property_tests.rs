//! Property-based tests for the placement flow.
//!
//! Whatever the starting placement, the user's answer and the backend
//! failure injected, an asset never ends up placed in two locations and a
//! declined move never mutates anything.

mod common;

use asset_placement::{
    services::in_memory::{FailurePoint, StoreCall},
    LocationType, PlacementPayload, PlacementTarget, RelocationError,
};
use chrono::NaiveDate;
use common::{RecordingPrompt, TestHarness};
use proptest::prelude::*;

fn location_type_strategy() -> impl Strategy<Value = LocationType> {
    prop_oneof![Just(LocationType::Site), Just(LocationType::Warehouse)]
}

fn failure_strategy() -> impl Strategy<Value = Option<FailurePoint>> {
    prop_oneof![
        Just(None),
        Just(Some(FailurePoint::CheckLocation)),
        location_type_strategy().prop_map(|kind| Some(FailurePoint::Remove(kind))),
        location_type_strategy().prop_map(|kind| Some(FailurePoint::Create(kind))),
    ]
}

fn date_strategy() -> impl Strategy<Value = Option<NaiveDate>> {
    prop::option::of((0i64..365).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
    }))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn asset_is_never_placed_twice(
        initial in prop::option::of(location_type_strategy()),
        target_kind in location_type_strategy(),
        accept in any::<bool>(),
        failure in failure_strategy(),
    ) {
        let prompt = if accept { RecordingPrompt::accepting() } else { RecordingPrompt::declining() };
        let h = TestHarness::new(prompt);

        let (placements_after, journal, result) = runtime().block_on(async {
            if let Some(kind) = initial {
                h.store.seed_placement(kind, PlacementPayload::new(42, 3, 1)).await.unwrap();
            }
            if let Some(point) = failure {
                h.store.fail_next(point).await;
            }
            let result = h
                .coordinator
                .submit_placement(PlacementTarget::new(target_kind, PlacementPayload::new(42, 7, 1)))
                .await;
            (h.store.placements_of(42).await, h.store.journal().await, result)
        });

        prop_assert!(placements_after.len() <= 1);

        let prompted = !h.prompt.seen().is_empty();
        let check_ok = failure != Some(FailurePoint::CheckLocation);
        prop_assert_eq!(prompted, initial.is_some() && check_ok);

        if prompted && !accept {
            prop_assert!(!journal.iter().any(StoreCall::is_mutation));
            prop_assert_eq!(placements_after.len(), 1);
        }

        if let Err(RelocationError::PartiallyMoved { .. }) = &result {
            prop_assert!(placements_after.is_empty());
        }
        if let Err(RelocationError::RemovalFailed { .. }) = &result {
            let created = journal.iter().any(|call| matches!(call, StoreCall::Create { .. }));
            prop_assert!(!created);
        }
    }

    #[test]
    fn warehouse_placements_never_carry_deployment_dates(
        deployed in date_strategy(),
        activated in date_strategy(),
        decommissioned in date_strategy(),
    ) {
        let mut payload = PlacementPayload::new(1, 1, 1);
        payload.dates.deployed_date = deployed;
        payload.dates.activated_date = activated;
        payload.dates.decommissioned_date = decommissioned;

        let any_set = deployed.is_some() || activated.is_some() || decommissioned.is_some();
        prop_assert_eq!(PlacementTarget::warehouse(payload.clone()).validate().is_err(), any_set);
        prop_assert!(PlacementTarget::site(payload).validate().is_ok());
    }

    #[test]
    fn dates_before_assignment_are_rejected(
        assigned in 10i64..300,
        delivered in 0i64..365,
    ) {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut payload = PlacementPayload::new(1, 1, 1);
        payload.dates.assigned_date = Some(base + chrono::Duration::days(assigned));
        payload.dates.delivered_date = Some(base + chrono::Duration::days(delivered));

        let result = PlacementTarget::site(payload).validate();
        prop_assert_eq!(result.is_err(), delivered < assigned);
    }
}
