use std::{collections::HashMap, time::Duration};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerKind {
    /// Session time budget
    TimeLimit,
    /// Lockdown countdown refresh
    LockdownTick,
    /// End of the plea suspense
    PleaReveal,
    /// Kill the exited app after the grace delay
    ExitGrace,
}

impl TimerKind {
    pub const ALL: [TimerKind; 4] = [
        TimerKind::TimeLimit,
        TimerKind::LockdownTick,
        TimerKind::PleaReveal,
        TimerKind::ExitGrace,
    ];
}

/// A scheduled wake-up. The generation tells a live timer from one that was
/// replaced or cancelled after it was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Timer {
    pub kind: TimerKind,
    pub generation: u64,
}

/// Delivers timers back to the orchestrator after a delay.
///
/// Scheduling a kind replaces any pending timer of that kind. Implementations
/// may still deliver a timer after it was cancelled; the orchestrator drops it.
pub trait Scheduler: Send {
    fn schedule(&mut self, timer: Timer, after: Duration);

    fn cancel(&mut self, kind: TimerKind);
}

/// Armed generation per timer kind.
#[derive(Debug, Default)]
pub(crate) struct TimerBook {
    next_generation: u64,
    armed: HashMap<TimerKind, u64>,
}

impl TimerBook {
    pub(crate) fn arm(&mut self, kind: TimerKind) -> Timer {
        self.next_generation += 1;
        self.armed.insert(kind, self.next_generation);
        Timer {
            kind,
            generation: self.next_generation,
        }
    }

    pub(crate) fn disarm(&mut self, kind: TimerKind) -> bool {
        self.armed.remove(&kind).is_some()
    }

    /// Consumes `timer` if it is the armed one for its kind.
    pub(crate) fn take_if_current(&mut self, timer: Timer) -> bool {
        if self.armed.get(&timer.kind) == Some(&timer.generation) {
            self.armed.remove(&timer.kind);
            true
        } else {
            false
        }
    }

    pub(crate) fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.contains_key(&kind)
    }
}
