// Placement domain models
pub mod asset;
pub mod location;
pub mod placement;

pub use asset::{asset_tag, AssetId};
pub use location::{describe_location, LocationCheck, LocationId, LocationType};
pub use placement::{LifecycleDates, Placement, PlacementId, PlacementPayload, PlacementTarget};
