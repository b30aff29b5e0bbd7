//! Placement submission flow.
//!
//! A submission for an unplaced asset is a plain create. For an asset that
//! is already placed elsewhere the coordinator asks for confirmation, then
//! removes the asset through the collaborator of its *current* kind, waits
//! for the removal to settle, and creates the new placement through the
//! collaborator of the *target* kind. A create that fails after a committed
//! removal leaves the asset unplaced and is reported as
//! [`RelocationError::PartiallyMoved`](crate::errors::RelocationError::PartiallyMoved);
//! there is no automatic rollback.

mod coordinator;
mod state;

pub use coordinator::RelocationCoordinator;
pub use state::{
    PendingRelocation, PreflightStatus, RelocationSettings, RelocationState, RelocationStrategy,
    SubmissionOutcome, DEFAULT_SETTLE_DELAY,
};
