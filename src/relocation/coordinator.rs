use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, watch, Mutex as AsyncMutex};
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

use super::state::{
    PendingRelocation, PreflightStatus, RelocationSettings, RelocationState, RelocationStrategy,
    SubmissionOutcome,
};
use crate::errors::{RelocationError, ServiceError};
use crate::models::{LocationCheck, LocationType, Placement, PlacementId, PlacementPayload, PlacementTarget};
use crate::notifications::{Notification, NotificationBuilder, NotificationLevel, Notifier};
use crate::prompt::{ConfirmationPrompt, RelocationPrompt};
use crate::services::PlacementServices;
use crate::tracing::{current_request_id, scope_request_id};

/// Transitions buffered per subscriber before the oldest are dropped.
const TRANSITION_BUFFER: usize = 64;

/// Orchestrates placement submissions so an asset is never placed in two
/// locations at once.
///
/// One submission runs at a time per coordinator; a second submission while
/// one is in flight is rejected with
/// [`RelocationError::SubmissionInProgress`].
pub struct RelocationCoordinator {
    services: PlacementServices,
    prompt: Arc<dyn ConfirmationPrompt>,
    notifier: Arc<dyn Notifier>,
    settings: RelocationSettings,
    in_flight: AsyncMutex<()>,
    state: watch::Sender<RelocationState>,
    transitions: broadcast::Sender<RelocationState>,
    pending: Mutex<Option<PendingRelocation>>,
}

impl RelocationCoordinator {
    pub fn new(
        services: PlacementServices,
        prompt: Arc<dyn ConfirmationPrompt>,
        notifier: Arc<dyn Notifier>,
        settings: RelocationSettings,
    ) -> Self {
        let (state, _) = watch::channel(RelocationState::Idle);
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
        Self {
            services,
            prompt,
            notifier,
            settings,
            in_flight: AsyncMutex::new(()),
            state,
            transitions,
            pending: Mutex::new(None),
        }
    }

    pub fn services(&self) -> &PlacementServices {
        &self.services
    }

    pub fn settings(&self) -> RelocationSettings {
        self.settings
    }

    /// Follows the current state. Only the latest value is kept, so
    /// transitions published back to back collapse into the last one; use
    /// [`Self::subscribe_transitions`] to see each of them.
    pub fn subscribe_state(&self) -> watch::Receiver<RelocationState> {
        self.state.subscribe()
    }

    /// Receives every state transition published after this call, in order.
    /// A subscriber that falls more than 64 transitions behind gets
    /// [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe_transitions(&self) -> broadcast::Receiver<RelocationState> {
        self.transitions.subscribe()
    }

    pub fn state(&self) -> RelocationState {
        *self.state.borrow()
    }

    /// The relocation awaiting confirmation or resolution, if any.
    pub fn pending_relocation(&self) -> Option<PendingRelocation> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Places an asset at `target`, moving it away from its current location
    /// after confirmation when it is already placed.
    ///
    /// Declining the confirmation is a successful
    /// [`SubmissionOutcome::Cancelled`]. Every failure is also delivered to
    /// the notifier.
    pub async fn submit_placement(
        &self,
        target: PlacementTarget,
    ) -> Result<SubmissionOutcome, RelocationError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            let err = RelocationError::SubmissionInProgress;
            warn!(asset_id = target.asset_id(), "rejecting submission while another is in flight");
            self.notifier.notify(err.notification()).await;
            return Err(err);
        };

        if let Err(errors) = target.validate() {
            let err = RelocationError::from(errors);
            self.notifier.notify(err.notification()).await;
            return Err(err);
        }

        let request_id = current_request_id().unwrap_or_default();
        let span = info_span!(
            "submit_placement",
            asset_id = target.asset_id(),
            location_type = %target.location_type,
            request_id = %request_id
        );
        scope_request_id(request_id, self.run_submission(target).instrument(span)).await
    }

    /// Edits an existing placement. No location check, no prompt.
    #[instrument(skip(self, payload), fields(asset_id = payload.asset_id))]
    pub async fn submit_update(
        &self,
        location_type: LocationType,
        placement_id: PlacementId,
        payload: PlacementPayload,
    ) -> Result<Placement, ServiceError> {
        let asset_id = payload.asset_id;
        let target = PlacementTarget::new(location_type, payload);
        let result = match target.validate() {
            Ok(()) => {
                self.services
                    .commands_for(location_type)
                    .update(placement_id, &target.payload)
                    .await
            }
            Err(errors) => Err(ServiceError::from(errors)),
        };

        match result {
            Ok(placement) => {
                info!(placement_id, "placement updated");
                self.notifier
                    .notify(NotificationBuilder::updated(asset_id, location_type))
                    .await;
                Ok(placement)
            }
            Err(err) => {
                error!(placement_id, error = %err, "placement update failed");
                self.notifier
                    .notify(Notification::new(
                        NotificationLevel::Error,
                        "Update failed",
                        err.response_message(),
                        Some(asset_id),
                    ))
                    .await;
                Err(err)
            }
        }
    }

    async fn run_submission(
        &self,
        target: PlacementTarget,
    ) -> Result<SubmissionOutcome, RelocationError> {
        self.set_state(RelocationState::Checking);
        let asset_id = target.asset_id();

        let check = match self.services.location_query.check_location(asset_id).await {
            Ok(check) => Some(check),
            Err(err) => {
                warn!(error = %err, "location check failed; placing without confirmation");
                None
            }
        };

        match check {
            Some(check) if check.is_placed() => self.relocate(target, check).await,
            Some(_) => {
                self.set_state(RelocationState::NoConflict);
                self.create_directly(target, PreflightStatus::Unplaced).await
            }
            None => {
                self.set_state(RelocationState::NoConflict);
                self.create_directly(target, PreflightStatus::Unavailable)
                    .await
            }
        }
    }

    async fn create_directly(
        &self,
        target: PlacementTarget,
        preflight: PreflightStatus,
    ) -> Result<SubmissionOutcome, RelocationError> {
        let asset_id = target.asset_id();
        let location_type = target.location_type;

        self.set_state(RelocationState::Submitting);
        match self
            .services
            .commands_for(location_type)
            .create(&target.payload)
            .await
        {
            Ok(placement) => {
                info!(placement_id = placement.id, ?preflight, "asset placed");
                self.set_state(RelocationState::Created);
                self.notifier
                    .notify(NotificationBuilder::placed(asset_id, location_type))
                    .await;
                self.set_state(RelocationState::Idle);
                Ok(SubmissionOutcome::Created {
                    placement,
                    location_type,
                    preflight,
                })
            }
            Err(err) => {
                self.set_state(RelocationState::CreateFailed);
                Err(self
                    .fail(RelocationError::CreationFailed {
                        asset_id,
                        location_type,
                        source: Box::new(err),
                    })
                    .await)
            }
        }
    }

    async fn relocate(
        &self,
        target: PlacementTarget,
        check: LocationCheck,
    ) -> Result<SubmissionOutcome, RelocationError> {
        self.set_state(RelocationState::ConflictDetected);
        let Some(prompt) = RelocationPrompt::from_check(&check, target.location_type) else {
            return self
                .create_directly(target, PreflightStatus::Unplaced)
                .await;
        };
        info!(
            current = %check.describe(),
            "asset is already placed; asking for confirmation"
        );
        self.set_pending(Some(PendingRelocation {
            target: target.clone(),
            check: check.clone(),
        }));

        self.set_state(RelocationState::AwaitingConfirmation);
        if !self.prompt.confirm(&prompt).await {
            info!("relocation declined");
            self.set_state(RelocationState::Cancelled);
            self.set_pending(None);
            self.notifier
                .notify(Notification::new(
                    NotificationLevel::Info,
                    "Move cancelled",
                    format!("Asset {} was left at {}.", check.asset_tag_id, check.describe()),
                    Some(target.asset_id()),
                ))
                .await;
            self.set_state(RelocationState::Idle);
            return Ok(SubmissionOutcome::Cancelled { previous: check });
        }

        self.set_state(RelocationState::Confirmed);
        let atomic = match (self.settings.strategy, &self.services.relocation) {
            (RelocationStrategy::Atomic, Some(relocation)) => Some(relocation.clone()),
            (RelocationStrategy::Atomic, None) => {
                warn!("atomic relocation requested but not available; falling back to sequential");
                None
            }
            (RelocationStrategy::Sequential, _) => None,
        };

        let result = match atomic {
            Some(relocation) => {
                self.set_state(RelocationState::Submitting);
                relocation
                    .relocate_asset(target.asset_id(), &target)
                    .await
                    .map_err(|err| RelocationError::RelocationFailed {
                        asset_id: target.asset_id(),
                        asset_tag_id: check.asset_tag_id.clone(),
                        target_location_type: target.location_type,
                        source: Box::new(err),
                    })
            }
            None => self.remove_then_create(&target, &check).await,
        };

        match result {
            Ok(placement) => {
                let previous_type = check.location_type.unwrap_or(target.location_type);
                info!(placement_id = placement.id, from = %previous_type, "asset relocated");
                self.set_state(RelocationState::Created);
                self.set_pending(None);
                self.notifier
                    .notify(NotificationBuilder::relocated(
                        target.asset_id(),
                        &check.asset_tag_id,
                        previous_type,
                        target.location_type,
                    ))
                    .await;
                self.set_state(RelocationState::Idle);
                Ok(SubmissionOutcome::Relocated {
                    placement,
                    location_type: target.location_type,
                    previous: check,
                })
            }
            Err(err) => Err(self.fail(err).await),
        }
    }

    /// Sequential strategy: remove through the prior kind's collaborator,
    /// let the removal settle, then create through the target kind's.
    async fn remove_then_create(
        &self,
        target: &PlacementTarget,
        check: &LocationCheck,
    ) -> Result<Placement, RelocationError> {
        let asset_id = target.asset_id();
        let previous_type = check.location_type.unwrap_or(target.location_type);

        self.set_state(RelocationState::Removing);
        if let Err(err) = self
            .services
            .commands_for(previous_type)
            .remove_from_current_location(asset_id)
            .await
        {
            self.set_state(RelocationState::RemoveFailed);
            return Err(RelocationError::RemovalFailed {
                asset_id,
                asset_tag_id: check.asset_tag_id.clone(),
                location_type: previous_type,
                source: Box::new(err),
            });
        }
        self.set_state(RelocationState::Removed);
        debug!(from = %previous_type, "removed from previous location");

        if !self.settings.settle_delay.is_zero() {
            tokio::time::sleep(self.settings.settle_delay).await;
        }

        self.set_state(RelocationState::Submitting);
        self.services
            .commands_for(target.location_type)
            .create(&target.payload)
            .await
            .map_err(|err| {
                self.set_state(RelocationState::CreateFailed);
                RelocationError::PartiallyMoved {
                    asset_id,
                    asset_tag_id: check.asset_tag_id.clone(),
                    previous_location_type: previous_type,
                    target_location_type: target.location_type,
                    source: Box::new(err),
                }
            })
    }

    async fn fail(&self, err: RelocationError) -> RelocationError {
        if err.is_partial_move() {
            error!(error = %err, "asset left without a placement");
        } else {
            error!(error = %err, "placement submission failed");
        }
        self.set_pending(None);
        self.set_state(RelocationState::Failed {
            partially_moved: err.is_partial_move(),
        });
        self.notifier.notify(err.notification()).await;
        err
    }

    fn set_state(&self, state: RelocationState) {
        debug!(?state, "relocation state");
        self.state.send_replace(state);
        // Fails only when nobody is subscribed.
        let _ = self.transitions.send(state);
    }

    fn set_pending(&self, pending: Option<PendingRelocation>) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = pending;
    }
}

impl std::fmt::Debug for RelocationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelocationCoordinator")
            .field("services", &self.services)
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish()
    }
}
