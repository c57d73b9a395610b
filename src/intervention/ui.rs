use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::penalty::{Penalty, PenaltyScope};

/// Identifies one overlay from `show_*` until it is hidden. Every UI action
/// carries the ticket it answers.
pub type Ticket = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PleaOffer {
    pub bonus_minutes: u32,
    pub win_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoastRequest {
    pub ticket: Ticket,
    pub package: String,
    pub title: String,
    pub message: String,
    /// `None` when the penalty duration is zero.
    pub penalty: Option<Penalty>,
    /// Present only when the plea bargain may still be taken this session.
    pub plea: Option<PleaOffer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PleaOutcome {
    pub won: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum EmergencyOffer {
    /// One tap unlocks.
    Tap,
    /// The sentence must be typed back exactly.
    Confession { sentence: String },
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockdownRequest {
    pub ticket: Ticket,
    pub package: String,
    pub scope: PenaltyScope,
    pub unblock_at: i64,
    pub remaining_ms: i64,
    pub emergency: EmergencyOffer,
}

/// Overlay surface driven by the orchestrator.
///
/// Implementations render and collect input only; every decision is made by
/// the orchestrator and reported back as a [`UiAction`].
pub trait InterventionUi: Send {
    fn show_roast(&mut self, request: &RoastRequest) -> Result<()>;

    fn show_plea_outcome(&mut self, ticket: Ticket, outcome: &PleaOutcome) -> Result<()>;

    fn show_lockdown(&mut self, request: &LockdownRequest) -> Result<()>;

    fn update_countdown(&mut self, ticket: Ticket, remaining_ms: i64) -> Result<()>;

    fn confession_rejected(&mut self, ticket: Ticket) -> Result<()>;

    /// Must be safe to call when nothing is showing.
    fn hide(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum UiActionKind {
    /// "No thanks" on the plea, or "Okay" when no plea was offered.
    Declined,
    PleaRequested,
    EmergencyUnlockRequested,
    ConfessionSubmitted { text: String },
    CountdownFinished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiAction {
    pub ticket: Ticket,
    #[serde(flatten)]
    pub kind: UiActionKind,
}

impl UiAction {
    pub fn new(ticket: Ticket, kind: UiActionKind) -> Self {
        Self { ticket, kind }
    }
}
