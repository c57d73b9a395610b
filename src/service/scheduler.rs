use std::{collections::HashMap, time::Duration};

use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle, time};

use crate::intervention::{Scheduler, Timer, TimerKind};

use super::GuardCommand;

/// Sleeps on the tokio timer wheel and posts the timer back to the service
/// channel. One pending sleep per kind.
pub struct TokioScheduler {
    commands: UnboundedSender<GuardCommand>,
    pending: HashMap<TimerKind, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new(commands: UnboundedSender<GuardCommand>) -> Self {
        Self {
            commands,
            pending: HashMap::new(),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, timer: Timer, after: Duration) {
        if let Some(previous) = self.pending.remove(&timer.kind) {
            previous.abort();
        }

        let commands = self.commands.clone();
        let handle = tokio::spawn(async move {
            time::sleep(after).await;
            let _ = commands.send(GuardCommand::TimerFired(timer));
        });
        self.pending.insert(timer.kind, handle);
    }

    fn cancel(&mut self, kind: TimerKind) {
        if let Some(handle) = self.pending.remove(&kind) {
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}
