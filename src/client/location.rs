use async_trait::async_trait;
use reqwest::Method;
use tracing::instrument;

use super::ApiClient;
use crate::errors::ServiceError;
use crate::models::{AssetId, LocationCheck};
use crate::services::LocationQuery;

/// `GET /assets/{assetId}/location-check`
#[derive(Clone, Debug)]
pub struct HttpLocationQuery {
    api: ApiClient,
}

impl HttpLocationQuery {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl LocationQuery for HttpLocationQuery {
    #[instrument(skip(self))]
    async fn check_location(&self, asset_id: AssetId) -> Result<LocationCheck, ServiceError> {
        let request = self
            .api
            .request(Method::GET, &format!("/assets/{}/location-check", asset_id));
        self.api.send_json(request).await
    }
}
