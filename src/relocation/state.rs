use serde::Serialize;
use std::time::Duration;
use strum::{Display, EnumString};

use crate::models::{LocationCheck, LocationType, Placement, PlacementTarget};

/// Default pause between a committed removal and the follow-up create.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Where a submission currently is.
///
/// `Failed` is terminal for the submission it belongs to; the next
/// submission starts again from `Checking`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RelocationState {
    #[default]
    Idle,
    Checking,
    NoConflict,
    ConflictDetected,
    AwaitingConfirmation,
    Cancelled,
    Confirmed,
    Removing,
    RemoveFailed,
    Removed,
    Submitting,
    Created,
    CreateFailed,
    Failed { partially_moved: bool },
}

/// How a confirmed conflict is resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RelocationStrategy {
    /// Remove through the prior kind's collaborator, pause, then create.
    #[default]
    Sequential,
    /// One backend call that moves the asset inside a transaction.
    Atomic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelocationSettings {
    pub settle_delay: Duration,
    pub strategy: RelocationStrategy,
}

impl Default for RelocationSettings {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            strategy: RelocationStrategy::Sequential,
        }
    }
}

impl RelocationSettings {
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn with_strategy(mut self, strategy: RelocationStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// The submission held while a conflict is being confirmed and resolved.
/// Exists from conflict detection until the submission ends, then dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRelocation {
    pub target: PlacementTarget,
    pub check: LocationCheck,
}

impl PendingRelocation {
    /// The kind the asset has to be removed from. Always present: a pending
    /// relocation is only created for a placed asset.
    pub fn previous_location_type(&self) -> Option<LocationType> {
        self.check.location_type
    }
}

/// What the pre-flight check said about a direct create.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreflightStatus {
    /// The asset was reported unplaced.
    Unplaced,
    /// The check failed and the create went ahead unchecked.
    Unavailable,
}

/// Successful end of a submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// The asset had no placement (or the check was unavailable) and was
    /// placed directly.
    Created {
        placement: Placement,
        location_type: LocationType,
        preflight: PreflightStatus,
    },
    /// The asset was moved away from `previous` after confirmation.
    Relocated {
        placement: Placement,
        location_type: LocationType,
        previous: LocationCheck,
    },
    /// The user declined the move. Nothing was changed.
    Cancelled { previous: LocationCheck },
}

impl SubmissionOutcome {
    pub fn placement(&self) -> Option<&Placement> {
        match self {
            SubmissionOutcome::Created { placement, .. }
            | SubmissionOutcome::Relocated { placement, .. } => Some(placement),
            SubmissionOutcome::Cancelled { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SubmissionOutcome::Cancelled { .. })
    }
}
