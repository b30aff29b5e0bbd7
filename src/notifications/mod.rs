use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{AssetId, LocationType};

/// Represents a user-facing notification
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    pub asset_id: Option<AssetId>,
    pub created_at: DateTime<Utc>,
}

/// Severity of a notification
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl Notification {
    pub fn new(
        level: NotificationLevel,
        title: impl Into<String>,
        message: impl Into<String>,
        asset_id: Option<AssetId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            title: title.into(),
            message: message.into(),
            asset_id,
            created_at: Utc::now(),
        }
    }
}

/// Delivers notifications to the user. Delivery is best-effort and must not
/// fail the operation that produced the notification.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success | NotificationLevel::Info => info!(
                title = %notification.title,
                asset_id = ?notification.asset_id,
                "{}",
                notification.message
            ),
            NotificationLevel::Warning => warn!(
                title = %notification.title,
                asset_id = ?notification.asset_id,
                "{}",
                notification.message
            ),
            NotificationLevel::Error => error!(
                title = %notification.title,
                asset_id = ?notification.asset_id,
                "{}",
                notification.message
            ),
        }
    }
}

/// Keeps notifications in memory, newest last. Hosts drain it to render
/// toasts; tests read it to assert what the user was told.
#[derive(Clone, Debug, Default)]
pub struct InMemoryNotifier {
    inbox: Arc<RwLock<Vec<Notification>>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.inbox.read().await.clone()
    }

    pub async fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.inbox.write().await)
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, notification: Notification) {
        self.inbox.write().await.push(notification);
    }
}

/// Builders for the success notifications of a placement submission.
pub struct NotificationBuilder;

impl NotificationBuilder {
    pub fn placed(asset_id: AssetId, location_type: LocationType) -> Notification {
        Notification::new(
            NotificationLevel::Success,
            "Asset placed",
            format!("Asset {} was placed at the {}.", asset_id, location_type),
            Some(asset_id),
        )
    }

    pub fn relocated(
        asset_id: AssetId,
        asset_tag_id: &str,
        from: LocationType,
        to: LocationType,
    ) -> Notification {
        Notification::new(
            NotificationLevel::Success,
            "Asset moved",
            format!(
                "Asset {} was removed from its previous {} and placed at the {}.",
                asset_tag_id, from, to
            ),
            Some(asset_id),
        )
    }

    pub fn updated(asset_id: AssetId, location_type: LocationType) -> Notification {
        Notification::new(
            NotificationLevel::Success,
            "Placement updated",
            format!("The {} placement of asset {} was updated.", location_type, asset_id),
            Some(asset_id),
        )
    }
}
