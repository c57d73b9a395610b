//! Overlay contract, timers and the state machine that drives them.

mod orchestrator;
mod timers;
mod ui;

pub use orchestrator::{GuardDeps, GuardSnapshot, Orchestrator, PhaseKind, CONFESSIONS};
pub use timers::{Scheduler, Timer, TimerKind};
pub use ui::{
    EmergencyOffer, InterventionUi, LockdownRequest, PleaOffer, PleaOutcome, RoastRequest, Ticket,
    UiAction, UiActionKind,
};
