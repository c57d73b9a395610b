//! Async runtime around the orchestrator.
//!
//! One tokio task owns the [`Orchestrator`]; platform events, UI actions,
//! fired timers and snapshot queries reach it through a single channel, so
//! they are processed strictly one after another.

pub mod emitter;
pub mod protocol;
mod scheduler;

use anyhow::{anyhow, Context, Result};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::config::GuardConfig;
use crate::intervention::{GuardDeps, GuardSnapshot, Orchestrator, Timer, UiAction};
use crate::sensing::RawEvent;
use crate::utils::logging::MONITOR;

pub use scheduler::TokioScheduler;

pub enum GuardCommand {
    Platform(RawEvent),
    Ui(UiAction),
    TimerFired(Timer),
    Snapshot(oneshot::Sender<GuardSnapshot>),
}

/// Cheap, cloneable sender into the running service.
#[derive(Clone)]
pub struct GuardHandle {
    commands: mpsc::UnboundedSender<GuardCommand>,
}

impl GuardHandle {
    fn send(&self, command: GuardCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("guard service is not running"))
    }

    pub fn platform_event(&self, event: RawEvent) -> Result<()> {
        self.send(GuardCommand::Platform(event))
    }

    pub fn ui_action(&self, action: UiAction) -> Result<()> {
        self.send(GuardCommand::Ui(action))
    }

    pub async fn snapshot(&self) -> Result<GuardSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(GuardCommand::Snapshot(reply))?;
        response
            .await
            .context("guard service dropped the snapshot request")
    }
}

pub struct GuardService {
    handle: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
    commands: GuardHandle,
}

impl GuardService {
    /// Starts the service task. Must be called inside a tokio runtime.
    pub fn spawn(config: GuardConfig, deps: GuardDeps) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(tx.clone());
        let orchestrator = Orchestrator::new(config, deps, Box::new(scheduler));

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(service_loop(orchestrator, rx, cancel_token.clone()));
        log::info!(target: MONITOR, "guard service started");

        Self {
            handle: Some(handle),
            cancel_token,
            commands: GuardHandle { commands: tx },
        }
    }

    pub fn handle(&self) -> GuardHandle {
        self.commands.clone()
    }

    pub async fn shutdown(mut self) -> Result<()> {
        self.cancel_token.cancel();

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("guard service task failed to join")?;
        }
        log::info!(target: MONITOR, "guard service stopped");
        Ok(())
    }
}

impl Drop for GuardService {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn service_loop(
    mut orchestrator: Orchestrator,
    mut commands: mpsc::UnboundedReceiver<GuardCommand>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => dispatch(&mut orchestrator, command),
                None => break,
            },
        }
    }

    orchestrator.shutdown();
}

fn dispatch(orchestrator: &mut Orchestrator, command: GuardCommand) {
    match command {
        GuardCommand::Platform(event) => orchestrator.on_platform_event(&event),
        GuardCommand::Ui(action) => orchestrator.on_ui_action(action),
        GuardCommand::TimerFired(timer) => orchestrator.on_timer(timer),
        GuardCommand::Snapshot(reply) => {
            let _ = reply.send(orchestrator.snapshot());
        }
    }
}
