#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use asset_placement::{
    notifications::InMemoryNotifier,
    prompt::{ConfirmationPrompt, RelocationPrompt},
    services::in_memory::InMemoryPlacementStore,
    LocationType, PlacementPayload, RelocationCoordinator, RelocationSettings,
    RelocationStrategy,
};
use async_trait::async_trait;

/// Prompt with a fixed answer that records every prompt it was shown.
#[derive(Clone, Default)]
pub struct RecordingPrompt {
    answer: bool,
    seen: Arc<Mutex<Vec<RelocationPrompt>>>,
}

impl RecordingPrompt {
    pub fn accepting() -> Self {
        Self {
            answer: true,
            ..Self::default()
        }
    }

    pub fn declining() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> Vec<RelocationPrompt> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfirmationPrompt for RecordingPrompt {
    async fn confirm(&self, prompt: &RelocationPrompt) -> bool {
        self.seen.lock().unwrap().push(prompt.clone());
        self.answer
    }
}

/// Coordinator wired to an in-memory backend.
pub struct TestHarness {
    pub store: InMemoryPlacementStore,
    pub prompt: RecordingPrompt,
    pub notifier: InMemoryNotifier,
    pub coordinator: Arc<RelocationCoordinator>,
}

impl TestHarness {
    pub fn new(prompt: RecordingPrompt) -> Self {
        Self::with_settings(
            prompt,
            RelocationSettings::default().with_settle_delay(Duration::ZERO),
        )
    }

    pub fn atomic(prompt: RecordingPrompt) -> Self {
        Self::with_settings(
            prompt,
            RelocationSettings::default()
                .with_settle_delay(Duration::ZERO)
                .with_strategy(RelocationStrategy::Atomic),
        )
    }

    pub fn with_settings(prompt: RecordingPrompt, settings: RelocationSettings) -> Self {
        let store = InMemoryPlacementStore::new();
        let notifier = InMemoryNotifier::new();
        let coordinator = Arc::new(RelocationCoordinator::new(
            store.services(),
            Arc::new(prompt.clone()),
            Arc::new(notifier.clone()),
            settings,
        ));
        Self {
            store,
            prompt,
            notifier,
            coordinator,
        }
    }

    /// Asset 42 (`AST-0042`) placed at warehouse 3 "Central Depot".
    pub async fn seed_asset_42_at_warehouse_3(&self) {
        self.store.register_asset(42, "AST-0042").await;
        self.store
            .register_location(LocationType::Warehouse, 3, "Central Depot", "WH-03")
            .await;
        self.store
            .register_location(LocationType::Site, 7, "North Tower", "ST-07")
            .await;
        self.store
            .seed_placement(LocationType::Warehouse, PlacementPayload::new(42, 3, 1))
            .await
            .expect("seed placement");
    }
}
