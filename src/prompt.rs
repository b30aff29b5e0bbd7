//! Confirmation prompts for moving an already-placed asset.
//!
//! A prompt is purely presentational: it shows the conflict and answers
//! accept or decline. Every way of leaving a prompt resolves to one of the
//! two; closed channels, end of input and I/O errors all decline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::models::{describe_location, LocationCheck, LocationType};

/// What the user is asked to confirm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelocationPrompt {
    pub asset_tag_id: String,
    pub current_location_type: LocationType,
    pub current_location_name: Option<String>,
    pub current_location_code: Option<String>,
    pub new_location_type: LocationType,
}

impl RelocationPrompt {
    /// Builds the prompt from a check that found the asset placed.
    /// Returns `None` for an unplaced asset.
    pub fn from_check(check: &LocationCheck, new_location_type: LocationType) -> Option<Self> {
        Some(Self {
            asset_tag_id: check.asset_tag_id.clone(),
            current_location_type: check.location_type?,
            current_location_name: check.location_name.clone(),
            current_location_code: check.location_code.clone(),
            new_location_type,
        })
    }

    pub fn message(&self) -> String {
        let current = describe_location(
            self.current_location_type,
            self.current_location_name.as_deref(),
            self.current_location_code.as_deref(),
        );
        format!(
            "Asset {} is currently placed at {}. Remove it from there and place it at the new {}?",
            self.asset_tag_id, current, self.new_location_type
        )
    }
}

#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    /// Resolves to `true` on accept and `false` on decline.
    async fn confirm(&self, prompt: &RelocationPrompt) -> bool;
}

/// Answers every prompt the same way. Used for `--yes` style
/// non-interactive runs.
#[derive(Clone, Copy, Debug)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl ConfirmationPrompt for AutoConfirm {
    async fn confirm(&self, _prompt: &RelocationPrompt) -> bool {
        self.0
    }
}

/// Asks on the controlling terminal.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn ask(message: &str) -> io::Result<Option<String>> {
        let mut stderr = io::stderr().lock();
        write!(stderr, "{} [y/N] ", message)?;
        stderr.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        Ok((read > 0).then_some(line))
    }
}

#[async_trait]
impl ConfirmationPrompt for TerminalPrompt {
    async fn confirm(&self, prompt: &RelocationPrompt) -> bool {
        let message = prompt.message();
        match tokio::task::spawn_blocking(move || Self::ask(&message)).await {
            Ok(Ok(Some(line))) => parse_answer(&line),
            Ok(Ok(None)) => false,
            Ok(Err(err)) => {
                warn!(error = %err, "failed to read confirmation; declining");
                false
            }
            Err(err) => {
                warn!(error = %err, "confirmation task failed; declining");
                false
            }
        }
    }
}

/// `y` / `yes` in any case accepts; everything else declines.
pub fn parse_answer(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// A pending confirmation handed to an event-loop UI.
///
/// Dropping the request without answering declines.
#[derive(Debug)]
pub struct PromptRequest {
    pub prompt: RelocationPrompt,
    responder: oneshot::Sender<bool>,
}

impl PromptRequest {
    pub fn accept(self) {
        let _ = self.responder.send(true);
    }

    pub fn decline(self) {
        let _ = self.responder.send(false);
    }

    pub fn answer(self, accepted: bool) {
        let _ = self.responder.send(accepted);
    }
}

/// Forwards prompts over a channel to whatever renders them.
#[derive(Clone, Debug)]
pub struct ChannelPrompt {
    sender: mpsc::Sender<PromptRequest>,
}

impl ChannelPrompt {
    pub fn new(sender: mpsc::Sender<PromptRequest>) -> Self {
        Self { sender }
    }

    /// Creates a prompt and the receiving end a UI loop should drain.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PromptRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl ConfirmationPrompt for ChannelPrompt {
    async fn confirm(&self, prompt: &RelocationPrompt) -> bool {
        let (responder, response) = oneshot::channel();
        let request = PromptRequest {
            prompt: prompt.clone(),
            responder,
        };
        if self.sender.send(request).await.is_err() {
            warn!("confirmation receiver is gone; declining");
            return false;
        }
        response.await.unwrap_or(false)
    }
}
