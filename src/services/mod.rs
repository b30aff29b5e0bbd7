//! Collaborator interfaces consumed by the relocation coordinator.
//!
//! The coordinator never talks to a backend directly: it reads through a
//! [`LocationQuery`] and mutates through one [`PlacementCommands`] per
//! location kind. HTTP implementations live in [`crate::client`], an
//! in-memory backend in [`in_memory`].

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::ServiceError;
use crate::models::{
    AssetId, LocationCheck, LocationType, Placement, PlacementId, PlacementPayload,
    PlacementTarget,
};

pub mod in_memory;

/// Reports where an asset currently is. Idempotent and side-effect free;
/// results may be stale.
#[async_trait]
pub trait LocationQuery: Send + Sync {
    async fn check_location(&self, asset_id: AssetId) -> Result<LocationCheck, ServiceError>;
}

/// Placement commands against one location kind's table.
#[async_trait]
pub trait PlacementCommands: Send + Sync {
    /// The kind of location this collaborator manages.
    fn location_type(&self) -> LocationType;

    async fn create(&self, payload: &PlacementPayload) -> Result<Placement, ServiceError>;

    async fn update(
        &self,
        placement_id: PlacementId,
        payload: &PlacementPayload,
    ) -> Result<Placement, ServiceError>;

    async fn delete(&self, placement_id: PlacementId) -> Result<(), ServiceError>;

    /// Vacates the asset's active placement in this kind's table. Must have
    /// committed by the time it returns.
    async fn remove_from_current_location(&self, asset_id: AssetId) -> Result<(), ServiceError>;
}

/// Single-call move of an asset to a new placement, executed by the backend
/// inside one transaction.
#[async_trait]
pub trait AtomicRelocation: Send + Sync {
    async fn relocate_asset(
        &self,
        asset_id: AssetId,
        target: &PlacementTarget,
    ) -> Result<Placement, ServiceError>;
}

/// Container holding every collaborator the coordinator needs.
#[derive(Clone)]
pub struct PlacementServices {
    pub location_query: Arc<dyn LocationQuery>,
    pub sites: Arc<dyn PlacementCommands>,
    pub warehouses: Arc<dyn PlacementCommands>,
    pub relocation: Option<Arc<dyn AtomicRelocation>>,
}

impl PlacementServices {
    pub fn new(
        location_query: Arc<dyn LocationQuery>,
        sites: Arc<dyn PlacementCommands>,
        warehouses: Arc<dyn PlacementCommands>,
    ) -> Self {
        Self {
            location_query,
            sites,
            warehouses,
            relocation: None,
        }
    }

    pub fn with_atomic_relocation(mut self, relocation: Arc<dyn AtomicRelocation>) -> Self {
        self.relocation = Some(relocation);
        self
    }

    /// Routes to the collaborator owning placements of `location_type`.
    pub fn commands_for(&self, location_type: LocationType) -> &Arc<dyn PlacementCommands> {
        match location_type {
            LocationType::Site => &self.sites,
            LocationType::Warehouse => &self.warehouses,
        }
    }
}

impl std::fmt::Debug for PlacementServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacementServices")
            .field("sites", &self.sites.location_type())
            .field("warehouses", &self.warehouses.location_type())
            .field("atomic_relocation", &self.relocation.is_some())
            .finish()
    }
}
