//! Asset Placement Library
//!
//! Client-side coordination for placing tracked assets at sites and
//! warehouses. The [`relocation::RelocationCoordinator`] enforces the rule
//! that an asset is active in at most one location, and runs the
//! confirm → remove → create sequence when an already-placed asset is moved.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod client;
pub mod commands;
pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod notifications;
pub mod prompt;
pub mod relocation;
pub mod services;
pub mod tracing;

pub use errors::{RelocationError, ServiceError};
pub use models::{
    AssetId, LifecycleDates, LocationCheck, LocationId, LocationType, Placement, PlacementId,
    PlacementPayload, PlacementTarget,
};
pub use relocation::{
    PendingRelocation, PreflightStatus, RelocationCoordinator, RelocationSettings,
    RelocationState, RelocationStrategy, SubmissionOutcome,
};
pub use services::PlacementServices;
