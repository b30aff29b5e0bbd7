use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use tracing::instrument;

use super::ApiClient;
use crate::errors::ServiceError;
use crate::models::{AssetId, LocationType, Placement, PlacementId, PlacementPayload, PlacementTarget};
use crate::services::{AtomicRelocation, PlacementCommands};

/// Placement commands for one location kind, under `/site-assets` or
/// `/warehouse-assets`.
#[derive(Clone, Debug)]
pub struct HttpPlacementClient {
    api: ApiClient,
    location_type: LocationType,
}

impl HttpPlacementClient {
    pub fn new(api: ApiClient, location_type: LocationType) -> Self {
        Self { api, location_type }
    }

    pub fn site(api: ApiClient) -> Self {
        Self::new(api, LocationType::Site)
    }

    pub fn warehouse(api: ApiClient) -> Self {
        Self::new(api, LocationType::Warehouse)
    }

    fn collection(&self) -> &'static str {
        match self.location_type {
            LocationType::Site => "/site-assets",
            LocationType::Warehouse => "/warehouse-assets",
        }
    }
}

#[async_trait]
impl PlacementCommands for HttpPlacementClient {
    fn location_type(&self) -> LocationType {
        self.location_type
    }

    #[instrument(skip(self, payload), fields(location_type = %self.location_type, asset_id = payload.asset_id))]
    async fn create(&self, payload: &PlacementPayload) -> Result<Placement, ServiceError> {
        let request = self.api.request(Method::POST, self.collection()).json(payload);
        self.api.send_json(request).await
    }

    #[instrument(skip(self, payload), fields(location_type = %self.location_type))]
    async fn update(
        &self,
        placement_id: PlacementId,
        payload: &PlacementPayload,
    ) -> Result<Placement, ServiceError> {
        let path = format!("{}/{}", self.collection(), placement_id);
        let request = self.api.request(Method::PUT, &path).json(payload);
        self.api.send_json(request).await
    }

    #[instrument(skip(self), fields(location_type = %self.location_type))]
    async fn delete(&self, placement_id: PlacementId) -> Result<(), ServiceError> {
        let path = format!("{}/{}", self.collection(), placement_id);
        let request = self.api.request(Method::DELETE, &path);
        self.api.send_empty(request).await
    }

    #[instrument(skip(self), fields(location_type = %self.location_type))]
    async fn remove_from_current_location(&self, asset_id: AssetId) -> Result<(), ServiceError> {
        let path = format!("{}/remove-from-location", self.collection());
        let request = self
            .api
            .request(Method::POST, &path)
            .json(&json!({ "assetId": asset_id }));
        self.api.send_empty(request).await
    }
}

/// `POST /assets/{assetId}/relocate`
#[derive(Clone, Debug)]
pub struct HttpRelocationClient {
    api: ApiClient,
}

impl HttpRelocationClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl AtomicRelocation for HttpRelocationClient {
    #[instrument(skip(self, target), fields(location_type = %target.location_type))]
    async fn relocate_asset(
        &self,
        asset_id: AssetId,
        target: &PlacementTarget,
    ) -> Result<Placement, ServiceError> {
        let path = format!("/assets/{}/relocate", asset_id);
        let request = self.api.request(Method::POST, &path).json(target);
        self.api.send_json(request).await
    }
}
