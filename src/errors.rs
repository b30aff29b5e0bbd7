use http::StatusCode;

use crate::models::{AssetId, LocationType};
use crate::notifications::{Notification, NotificationLevel};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    ApiError { status: StatusCode, body: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Relocation error: {0}")]
    Relocation(#[from] RelocationError),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl ServiceError {
    /// Maps a non-2xx response from the placement backend onto an error.
    /// This is the single source of truth for status-to-error mapping.
    pub fn from_response(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::NotFound(body),
            StatusCode::CONFLICT => Self::Conflict(body),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Self::ValidationError(body)
            }
            StatusCode::SERVICE_UNAVAILABLE => Self::ServiceUnavailable(body),
            _ => Self::ApiError { status, body },
        }
    }

    /// Returns the HTTP status this error corresponds to, when there is one.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::RequestError(err) => err.status(),
            Self::ApiError { status, .. } => Some(*status),
            Self::NotFound(_) => Some(StatusCode::NOT_FOUND),
            Self::ValidationError(_) => Some(StatusCode::UNPROCESSABLE_ENTITY),
            Self::Conflict(_) => Some(StatusCode::CONFLICT),
            Self::ServiceUnavailable(_) => Some(StatusCode::SERVICE_UNAVAILABLE),
            Self::InvalidResponse(_)
            | Self::SerializationError(_)
            | Self::EventError(_)
            | Self::InternalError(_)
            | Self::Relocation(_) => None,
        }
    }

    /// Returns the error message suitable for showing to a user.
    /// Transport and internal errors return generic messages.
    pub fn response_message(&self) -> String {
        match self {
            Self::RequestError(_) => "Could not reach the placement service".to_string(),
            Self::ApiError { status, .. } => {
                format!("The placement service returned an error ({})", status)
            }
            Self::InvalidResponse(_)
            | Self::SerializationError(_)
            | Self::EventError(_)
            | Self::InternalError(_) => "Internal error".to_string(),
            Self::Relocation(err) => err.to_string(),
            _ => self.to_string(),
        }
    }
}

/// Failures of a placement submission, caught at the coordinator boundary.
///
/// A declined confirmation is not an error and never appears here; see
/// [`crate::relocation::SubmissionOutcome::Cancelled`].
#[derive(Debug, thiserror::Error)]
pub enum RelocationError {
    #[error("A placement submission is already in progress")]
    SubmissionInProgress,

    #[error("Invalid placement: {0}")]
    InvalidPlacement(String),

    /// Direct creation failed. Nothing was removed beforehand.
    #[error("Could not place asset {asset_id} at the {location_type}: {source}")]
    CreationFailed {
        asset_id: AssetId,
        location_type: LocationType,
        #[source]
        source: Box<ServiceError>,
    },

    /// Removal from the prior location failed; the new placement was never
    /// attempted and the asset stays where it was.
    #[error("Could not remove asset {asset_tag_id} from its current {location_type}: {source}")]
    RemovalFailed {
        asset_id: AssetId,
        asset_tag_id: String,
        location_type: LocationType,
        #[source]
        source: Box<ServiceError>,
    },

    /// Removal succeeded and creation failed: the asset is now unplaced.
    #[error(
        "Asset {asset_tag_id} was removed from its previous {previous_location_type} but has not been placed in the new {target_location_type}: {source}"
    )]
    PartiallyMoved {
        asset_id: AssetId,
        asset_tag_id: String,
        previous_location_type: LocationType,
        target_location_type: LocationType,
        #[source]
        source: Box<ServiceError>,
    },

    /// The single-call relocation endpoint rejected the move. The prior
    /// placement is untouched.
    #[error("Could not relocate asset {asset_tag_id} to the {target_location_type}: {source}")]
    RelocationFailed {
        asset_id: AssetId,
        asset_tag_id: String,
        target_location_type: LocationType,
        #[source]
        source: Box<ServiceError>,
    },
}

impl From<validator::ValidationErrors> for RelocationError {
    fn from(err: validator::ValidationErrors) -> Self {
        RelocationError::InvalidPlacement(err.to_string())
    }
}

impl RelocationError {
    pub fn asset_id(&self) -> Option<AssetId> {
        match self {
            Self::SubmissionInProgress | Self::InvalidPlacement(_) => None,
            Self::CreationFailed { asset_id, .. }
            | Self::RemovalFailed { asset_id, .. }
            | Self::PartiallyMoved { asset_id, .. }
            | Self::RelocationFailed { asset_id, .. } => Some(*asset_id),
        }
    }

    /// True when an irreversible side effect happened before the failure.
    pub fn is_partial_move(&self) -> bool {
        matches!(self, Self::PartiallyMoved { .. })
    }

    /// Builds the user-facing notification for this failure.
    pub fn notification(&self) -> Notification {
        let (level, title, message) = match self {
            Self::SubmissionInProgress => (
                NotificationLevel::Warning,
                "Submission in progress",
                "Wait for the current placement to finish before submitting again.".to_string(),
            ),
            Self::InvalidPlacement(details) => (
                NotificationLevel::Error,
                "Invalid placement",
                details.clone(),
            ),
            Self::CreationFailed {
                location_type,
                source,
                ..
            } => (
                NotificationLevel::Error,
                "Placement failed",
                format!(
                    "The asset could not be placed at the {}. {}",
                    location_type,
                    source.response_message()
                ),
            ),
            Self::RemovalFailed {
                asset_tag_id,
                location_type,
                source,
                ..
            } => (
                NotificationLevel::Error,
                "Move aborted",
                format!(
                    "Asset {} could not be removed from its current {} and was not moved. {}",
                    asset_tag_id,
                    location_type,
                    source.response_message()
                ),
            ),
            Self::PartiallyMoved {
                asset_tag_id,
                previous_location_type,
                target_location_type,
                source,
                ..
            } => (
                NotificationLevel::Error,
                "Asset removed but not placed",
                format!(
                    "Asset {} was removed from its previous {} but has not been placed in the new {}. Place the asset again manually. {}",
                    asset_tag_id,
                    previous_location_type,
                    target_location_type,
                    source.response_message()
                ),
            ),
            Self::RelocationFailed {
                asset_tag_id,
                target_location_type,
                source,
                ..
            } => (
                NotificationLevel::Error,
                "Move failed",
                format!(
                    "Asset {} could not be moved to the {} and remains at its current location. {}",
                    asset_tag_id,
                    target_location_type,
                    source.response_message()
                ),
            ),
        };

        Notification::new(level, title, message, self.asset_id())
    }
}
