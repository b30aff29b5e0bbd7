use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::asset::AssetId;
use super::location::{LocationId, LocationType};

/// Identifier of a placement record inside its kind-specific table.
pub type PlacementId = i64;

/// Lifecycle timestamps of a placement. Which ones apply depends on the
/// location kind: deployment dates only make sense at a site.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LifecycleDates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployed_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decommissioned_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vacated_date: Option<NaiveDate>,
}

impl LifecycleDates {
    fn named(&self) -> [(&'static str, Option<NaiveDate>); 6] {
        [
            ("assigned_date", self.assigned_date),
            ("delivered_date", self.delivered_date),
            ("deployed_date", self.deployed_date),
            ("activated_date", self.activated_date),
            ("decommissioned_date", self.decommissioned_date),
            ("vacated_date", self.vacated_date),
        ]
    }

    fn site_only(&self) -> [(&'static str, Option<NaiveDate>); 3] {
        [
            ("deployed_date", self.deployed_date),
            ("activated_date", self.activated_date),
            ("decommissioned_date", self.decommissioned_date),
        ]
    }
}

/// Body of a placement create/update command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlacementPayload {
    #[validate(range(min = 1))]
    pub asset_id: i64,

    #[validate(range(min = 1))]
    pub location_id: i64,

    #[validate(range(min = 1))]
    pub asset_status_id: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub activity_work_id: Option<i64>,

    #[serde(flatten)]
    pub dates: LifecycleDates,
}

impl PlacementPayload {
    pub fn new(asset_id: AssetId, location_id: LocationId, asset_status_id: i64) -> Self {
        Self {
            asset_id,
            location_id,
            asset_status_id,
            activity_work_id: None,
            dates: LifecycleDates::default(),
        }
    }

    pub fn with_activity_work(mut self, activity_work_id: i64) -> Self {
        self.activity_work_id = Some(activity_work_id);
        self
    }

    pub fn with_dates(mut self, dates: LifecycleDates) -> Self {
        self.dates = dates;
        self
    }
}

/// A placement submission: where the asset should go, and with what record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementTarget {
    pub location_type: LocationType,
    #[serde(flatten)]
    pub payload: PlacementPayload,
}

impl PlacementTarget {
    pub fn new(location_type: LocationType, payload: PlacementPayload) -> Self {
        Self {
            location_type,
            payload,
        }
    }

    pub fn site(payload: PlacementPayload) -> Self {
        Self::new(LocationType::Site, payload)
    }

    pub fn warehouse(payload: PlacementPayload) -> Self {
        Self::new(LocationType::Warehouse, payload)
    }

    pub fn asset_id(&self) -> AssetId {
        self.payload.asset_id
    }

    /// Field checks of the payload plus the kind-dependent date rules.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.payload.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        let dates = &self.payload.dates;

        if !self.location_type.allows_deployment_dates() {
            for (field, value) in dates.site_only() {
                if value.is_some() {
                    let mut err = ValidationError::new("site_only_date");
                    err.message = Some("Only site placements carry this date".into());
                    errors.add(field, err);
                }
            }
        }

        if let Some(assigned) = dates.assigned_date {
            for (field, value) in dates.named().into_iter().skip(1) {
                if matches!(value, Some(date) if date < assigned) {
                    let mut err = ValidationError::new("before_assigned_date");
                    err.message = Some("Must not precede the assigned date".into());
                    errors.add(field, err);
                }
            }
        }

        if let Some(vacated) = dates.vacated_date {
            let precedes_other = dates
                .named()
                .into_iter()
                .filter(|(field, _)| *field != "vacated_date")
                .any(|(_, value)| matches!(value, Some(date) if date > vacated));
            if precedes_other {
                let mut err = ValidationError::new("vacated_too_early");
                err.message = Some("Must not precede any other lifecycle date".into());
                errors.add("vacated_date", err);
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A placement record as stored by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub id: PlacementId,
    pub asset_id: AssetId,
    pub location_id: LocationId,
    pub asset_status_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_work_id: Option<i64>,
    #[serde(flatten)]
    pub dates: LifecycleDates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Placement {
    pub fn from_payload(id: PlacementId, payload: &PlacementPayload) -> Self {
        let now = Utc::now();
        Self {
            id,
            asset_id: payload.asset_id,
            location_id: payload.location_id,
            asset_status_id: payload.asset_status_id,
            activity_work_id: payload.activity_work_id,
            dates: payload.dates.clone(),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}
