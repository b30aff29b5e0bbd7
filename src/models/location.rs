use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Numeric identifier of a site or a warehouse.
pub type LocationId = i64;

/// The two location kinds an asset can be placed in.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LocationType {
    Site,
    Warehouse,
}

impl LocationType {
    pub const ALL: [LocationType; 2] = [LocationType::Site, LocationType::Warehouse];

    /// Lifecycle dates a placement of this kind may carry.
    pub fn allows_deployment_dates(self) -> bool {
        matches!(self, LocationType::Site)
    }
}

/// Result of asking the backend where an asset currently is.
///
/// Ephemeral: recomputed on demand and never persisted. A `None`
/// `location_type` means the asset has no active placement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCheck {
    pub asset_tag_id: String,
    pub location_type: Option<LocationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_code: Option<String>,
}

impl LocationCheck {
    pub fn unplaced(asset_tag_id: impl Into<String>) -> Self {
        Self {
            asset_tag_id: asset_tag_id.into(),
            location_type: None,
            location_name: None,
            location_code: None,
        }
    }

    pub fn placed(
        asset_tag_id: impl Into<String>,
        location_type: LocationType,
        location_name: Option<String>,
        location_code: Option<String>,
    ) -> Self {
        Self {
            asset_tag_id: asset_tag_id.into(),
            location_type: Some(location_type),
            location_name,
            location_code,
        }
    }

    pub fn is_placed(&self) -> bool {
        self.location_type.is_some()
    }

    /// Human readable description of the current location, e.g.
    /// `warehouse "Central Depot" (WH-03)`.
    pub fn describe(&self) -> String {
        match self.location_type {
            Some(kind) => describe_location(
                kind,
                self.location_name.as_deref(),
                self.location_code.as_deref(),
            ),
            None => "no location".to_string(),
        }
    }
}

/// `warehouse "Central Depot" (WH-03)`, leaving out whichever of name and
/// code is missing.
pub fn describe_location(kind: LocationType, name: Option<&str>, code: Option<&str>) -> String {
    let mut out = kind.to_string();
    if let Some(name) = name {
        out.push_str(&format!(" \"{}\"", name));
    }
    if let Some(code) = code {
        out.push_str(&format!(" ({})", code));
    }
    out
}
