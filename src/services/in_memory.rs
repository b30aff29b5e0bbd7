//! In-memory placement backend.
//!
//! Implements every collaborator trait over a shared map, enforcing the
//! single-location rule the way the real backend does (a create for an
//! already-placed asset is rejected with a conflict). Calls are journaled
//! and failures can be injected per operation, which makes the store the
//! backbone of the relocation tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{AtomicRelocation, LocationQuery, PlacementCommands, PlacementServices};
use crate::errors::ServiceError;
use crate::models::{
    asset_tag, AssetId, LocationCheck, LocationId, LocationType, Placement, PlacementId,
    PlacementPayload, PlacementTarget,
};

/// One recorded invocation against the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCall {
    CheckLocation {
        asset_id: AssetId,
    },
    Create {
        location_type: LocationType,
        asset_id: AssetId,
        location_id: LocationId,
    },
    Update {
        location_type: LocationType,
        placement_id: PlacementId,
    },
    Delete {
        location_type: LocationType,
        placement_id: PlacementId,
    },
    RemoveFromCurrentLocation {
        location_type: LocationType,
        asset_id: AssetId,
    },
    Relocate {
        asset_id: AssetId,
        location_type: LocationType,
        location_id: LocationId,
    },
}

impl StoreCall {
    /// True for every call that can change placement state.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, StoreCall::CheckLocation { .. })
    }
}

/// Operations a failure can be injected into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    CheckLocation,
    Create(LocationType),
    Update(LocationType),
    Delete(LocationType),
    Remove(LocationType),
    Relocate,
}

#[derive(Debug, Clone)]
struct LocationRecord {
    name: String,
    code: String,
}

#[derive(Debug, Default)]
struct StoreState {
    next_id: PlacementId,
    asset_tags: HashMap<AssetId, String>,
    locations: HashMap<(LocationType, LocationId), LocationRecord>,
    placements: HashMap<LocationType, BTreeMap<PlacementId, Placement>>,
    failures: HashMap<FailurePoint, u32>,
    journal: Vec<StoreCall>,
}

impl StoreState {
    fn tag(&self, asset_id: AssetId) -> String {
        self.asset_tags
            .get(&asset_id)
            .cloned()
            .unwrap_or_else(|| asset_tag(asset_id))
    }

    fn active_placement(&self, asset_id: AssetId) -> Option<(LocationType, &Placement)> {
        LocationType::ALL.into_iter().find_map(|kind| {
            self.placements
                .get(&kind)
                .and_then(|table| table.values().find(|p| p.asset_id == asset_id))
                .map(|placement| (kind, placement))
        })
    }

    fn take_failure(&mut self, point: FailurePoint) -> Option<ServiceError> {
        let remaining = self.failures.get_mut(&point)?;
        if *remaining == 0 {
            return None;
        }
        if *remaining != u32::MAX {
            *remaining -= 1;
        }
        Some(ServiceError::ServiceUnavailable(format!(
            "injected failure at {:?}",
            point
        )))
    }

    fn ensure_unplaced(&self, asset_id: AssetId) -> Result<(), ServiceError> {
        match self.active_placement(asset_id) {
            Some((kind, placement)) => Err(ServiceError::Conflict(format!(
                "asset {} is already placed at {} {}",
                self.tag(asset_id),
                kind,
                placement.location_id
            ))),
            None => Ok(()),
        }
    }

    fn insert(&mut self, location_type: LocationType, payload: &PlacementPayload) -> Placement {
        self.next_id += 1;
        let placement = Placement::from_payload(self.next_id, payload);
        self.placements
            .entry(location_type)
            .or_default()
            .insert(placement.id, placement.clone());
        placement
    }

    fn remove_asset(&mut self, location_type: LocationType, asset_id: AssetId) -> bool {
        let Some(table) = self.placements.get_mut(&location_type) else {
            return false;
        };
        let before = table.len();
        table.retain(|_, placement| placement.asset_id != asset_id);
        table.len() != before
    }
}

/// Shared in-memory backend. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryPlacementStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryPlacementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_asset(&self, asset_id: AssetId, tag: impl Into<String>) {
        self.state
            .write()
            .await
            .asset_tags
            .insert(asset_id, tag.into());
    }

    pub async fn register_location(
        &self,
        location_type: LocationType,
        location_id: LocationId,
        name: impl Into<String>,
        code: impl Into<String>,
    ) {
        self.state.write().await.locations.insert(
            (location_type, location_id),
            LocationRecord {
                name: name.into(),
                code: code.into(),
            },
        );
    }

    /// Inserts a placement directly, without journaling or failure injection.
    /// Still rejects assets that are already placed.
    pub async fn seed_placement(
        &self,
        location_type: LocationType,
        payload: PlacementPayload,
    ) -> Result<Placement, ServiceError> {
        let mut state = self.state.write().await;
        state.ensure_unplaced(payload.asset_id)?;
        Ok(state.insert(location_type, &payload))
    }

    /// Makes the next invocation of `point` fail.
    pub async fn fail_next(&self, point: FailurePoint) {
        self.state.write().await.failures.insert(point, 1);
    }

    /// Makes every invocation of `point` fail until [`Self::clear_failures`].
    pub async fn fail_always(&self, point: FailurePoint) {
        self.state.write().await.failures.insert(point, u32::MAX);
    }

    pub async fn clear_failures(&self) {
        self.state.write().await.failures.clear();
    }

    pub async fn journal(&self) -> Vec<StoreCall> {
        self.state.read().await.journal.clone()
    }

    /// Every active placement of `asset_id`, across both kinds.
    pub async fn placements_of(&self, asset_id: AssetId) -> Vec<(LocationType, Placement)> {
        let state = self.state.read().await;
        LocationType::ALL
            .into_iter()
            .flat_map(|kind| {
                state
                    .placements
                    .get(&kind)
                    .into_iter()
                    .flat_map(|table| table.values())
                    .filter(|p| p.asset_id == asset_id)
                    .map(move |p| (kind, p.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn site(&self) -> InMemoryPlacementCommands {
        InMemoryPlacementCommands {
            store: self.clone(),
            location_type: LocationType::Site,
        }
    }

    pub fn warehouse(&self) -> InMemoryPlacementCommands {
        InMemoryPlacementCommands {
            store: self.clone(),
            location_type: LocationType::Warehouse,
        }
    }

    /// Wires this store in as every collaborator, atomic relocation included.
    pub fn services(&self) -> PlacementServices {
        PlacementServices::new(
            Arc::new(self.clone()),
            Arc::new(self.site()),
            Arc::new(self.warehouse()),
        )
        .with_atomic_relocation(Arc::new(self.clone()))
    }
}

#[async_trait]
impl LocationQuery for InMemoryPlacementStore {
    async fn check_location(&self, asset_id: AssetId) -> Result<LocationCheck, ServiceError> {
        let mut state = self.state.write().await;
        state.journal.push(StoreCall::CheckLocation { asset_id });
        if let Some(err) = state.take_failure(FailurePoint::CheckLocation) {
            return Err(err);
        }

        let tag = state.tag(asset_id);
        let check = match state.active_placement(asset_id) {
            None => LocationCheck::unplaced(tag),
            Some((kind, placement)) => {
                let record = state.locations.get(&(kind, placement.location_id));
                LocationCheck::placed(
                    tag,
                    kind,
                    record.map(|r| r.name.clone()),
                    record.map(|r| r.code.clone()),
                )
            }
        };
        Ok(check)
    }
}

#[async_trait]
impl AtomicRelocation for InMemoryPlacementStore {
    async fn relocate_asset(
        &self,
        asset_id: AssetId,
        target: &PlacementTarget,
    ) -> Result<Placement, ServiceError> {
        let mut state = self.state.write().await;
        state.journal.push(StoreCall::Relocate {
            asset_id,
            location_type: target.location_type,
            location_id: target.payload.location_id,
        });
        if let Some(err) = state.take_failure(FailurePoint::Relocate) {
            return Err(err);
        }

        for kind in LocationType::ALL {
            state.remove_asset(kind, asset_id);
        }
        Ok(state.insert(target.location_type, &target.payload))
    }
}

/// Kind-bound handle on an [`InMemoryPlacementStore`].
#[derive(Clone)]
pub struct InMemoryPlacementCommands {
    store: InMemoryPlacementStore,
    location_type: LocationType,
}

#[async_trait]
impl PlacementCommands for InMemoryPlacementCommands {
    fn location_type(&self) -> LocationType {
        self.location_type
    }

    async fn create(&self, payload: &PlacementPayload) -> Result<Placement, ServiceError> {
        let mut state = self.store.state.write().await;
        state.journal.push(StoreCall::Create {
            location_type: self.location_type,
            asset_id: payload.asset_id,
            location_id: payload.location_id,
        });
        if let Some(err) = state.take_failure(FailurePoint::Create(self.location_type)) {
            return Err(err);
        }

        state.ensure_unplaced(payload.asset_id)?;
        let placement = state.insert(self.location_type, payload);
        debug!(
            asset_id = payload.asset_id,
            location_type = %self.location_type,
            placement_id = placement.id,
            "in-memory placement created"
        );
        Ok(placement)
    }

    async fn update(
        &self,
        placement_id: PlacementId,
        payload: &PlacementPayload,
    ) -> Result<Placement, ServiceError> {
        let mut state = self.store.state.write().await;
        state.journal.push(StoreCall::Update {
            location_type: self.location_type,
            placement_id,
        });
        if let Some(err) = state.take_failure(FailurePoint::Update(self.location_type)) {
            return Err(err);
        }

        let existing = state
            .placements
            .get(&self.location_type)
            .and_then(|table| table.get(&placement_id))
            .cloned()
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "{} placement {} not found",
                    self.location_type, placement_id
                ))
            })?;
        if existing.asset_id != payload.asset_id {
            state.ensure_unplaced(payload.asset_id)?;
        }

        let mut updated = Placement::from_payload(placement_id, payload);
        updated.created_at = existing.created_at;
        state
            .placements
            .entry(self.location_type)
            .or_default()
            .insert(placement_id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, placement_id: PlacementId) -> Result<(), ServiceError> {
        let mut state = self.store.state.write().await;
        state.journal.push(StoreCall::Delete {
            location_type: self.location_type,
            placement_id,
        });
        if let Some(err) = state.take_failure(FailurePoint::Delete(self.location_type)) {
            return Err(err);
        }

        state
            .placements
            .get_mut(&self.location_type)
            .and_then(|table| table.remove(&placement_id))
            .map(|_| ())
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "{} placement {} not found",
                    self.location_type, placement_id
                ))
            })
    }

    async fn remove_from_current_location(&self, asset_id: AssetId) -> Result<(), ServiceError> {
        let mut state = self.store.state.write().await;
        state.journal.push(StoreCall::RemoveFromCurrentLocation {
            location_type: self.location_type,
            asset_id,
        });
        if let Some(err) = state.take_failure(FailurePoint::Remove(self.location_type)) {
            return Err(err);
        }

        if state.remove_asset(self.location_type, asset_id) {
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!(
                "asset {} has no active {} placement",
                state.tag(asset_id),
                self.location_type
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn create_rejects_an_asset_placed_elsewhere() {
        let store = InMemoryPlacementStore::new();
        store
            .seed_placement(LocationType::Warehouse, PlacementPayload::new(42, 3, 1))
            .await
            .unwrap();

        let result = store.site().create(&PlacementPayload::new(42, 7, 1)).await;
        assert_matches!(result, Err(ServiceError::Conflict(_)));
        assert_eq!(store.placements_of(42).await.len(), 1);
    }

    #[tokio::test]
    async fn check_reports_registered_names() {
        let store = InMemoryPlacementStore::new();
        store
            .register_location(LocationType::Warehouse, 3, "Central Depot", "WH-03")
            .await;
        store
            .seed_placement(LocationType::Warehouse, PlacementPayload::new(42, 3, 1))
            .await
            .unwrap();

        let check = store.check_location(42).await.unwrap();
        assert_eq!(check.asset_tag_id, "AST-0042");
        assert_eq!(check.location_type, Some(LocationType::Warehouse));
        assert_eq!(check.location_code.as_deref(), Some("WH-03"));

        let unplaced = store.check_location(5).await.unwrap();
        assert!(!unplaced.is_placed());
    }

    #[tokio::test]
    async fn remove_only_touches_its_own_kind() {
        let store = InMemoryPlacementStore::new();
        store
            .seed_placement(LocationType::Warehouse, PlacementPayload::new(42, 3, 1))
            .await
            .unwrap();

        let wrong_kind = store.site().remove_from_current_location(42).await;
        assert_matches!(wrong_kind, Err(ServiceError::NotFound(_)));
        assert_eq!(store.placements_of(42).await.len(), 1);

        store
            .warehouse()
            .remove_from_current_location(42)
            .await
            .unwrap();
        assert!(store.placements_of(42).await.is_empty());
    }

    #[tokio::test]
    async fn injected_failures_are_one_shot_unless_persistent() {
        let store = InMemoryPlacementStore::new();
        store.fail_next(FailurePoint::CheckLocation).await;

        assert!(store.check_location(1).await.is_err());
        assert!(store.check_location(1).await.is_ok());

        store.fail_always(FailurePoint::CheckLocation).await;
        assert!(store.check_location(1).await.is_err());
        assert!(store.check_location(1).await.is_err());
        store.clear_failures().await;
        assert!(store.check_location(1).await.is_ok());
    }

    #[tokio::test]
    async fn journal_records_failed_calls_too() {
        let store = InMemoryPlacementStore::new();
        store.fail_next(FailurePoint::Create(LocationType::Site)).await;
        let _ = store.site().create(&PlacementPayload::new(9, 1, 1)).await;

        assert_eq!(
            store.journal().await,
            vec![StoreCall::Create {
                location_type: LocationType::Site,
                asset_id: 9,
                location_id: 1,
            }]
        );
        assert!(store.placements_of(9).await.is_empty());
    }

    #[tokio::test]
    async fn relocate_moves_in_one_step() {
        let store = InMemoryPlacementStore::new();
        store
            .seed_placement(LocationType::Warehouse, PlacementPayload::new(42, 3, 1))
            .await
            .unwrap();

        let placement = store
            .relocate_asset(42, &PlacementTarget::site(PlacementPayload::new(42, 7, 1)))
            .await
            .unwrap();

        assert_eq!(placement.location_id, 7);
        let placements = store.placements_of(42).await;
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].0, LocationType::Site);
    }

    #[tokio::test]
    async fn update_keeps_creation_timestamp() {
        let store = InMemoryPlacementStore::new();
        let placement = store
            .seed_placement(LocationType::Site, PlacementPayload::new(42, 7, 1))
            .await
            .unwrap();

        let updated = store
            .site()
            .update(placement.id, &PlacementPayload::new(42, 8, 2))
            .await
            .unwrap();
        assert_eq!(updated.location_id, 8);
        assert_eq!(updated.created_at, placement.created_at);

        let missing = store.warehouse().update(placement.id, &PlacementPayload::new(42, 8, 2)).await;
        assert_matches!(missing, Err(ServiceError::NotFound(_)));
    }
}
