//! Device capabilities the engine needs from its host.

use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use anyhow::Result;
use serde::Serialize;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

use crate::service::emitter::JsonLineEmitter;
use crate::utils::logging::INTERVENTION;

pub trait DevicePlatform: Send {
    /// Sends the user to the home screen.
    fn go_home(&mut self) -> Result<()>;

    /// Best-effort termination of the app's background processes. Returns
    /// whether anything was killed.
    fn kill_background_process(&mut self, package: &str) -> Result<bool>;

    fn vibrate(&mut self, duration: Duration) -> Result<()>;

    /// Full id of the current input method, `package/service`.
    fn active_input_method(&self) -> Option<String>;
}

/// Shared slot for the input method the host last reported.
#[derive(Debug, Clone, Default)]
pub struct InputMethodSlot {
    current: Arc<RwLock<Option<String>>>,
}

impl InputMethodSlot {
    pub fn set(&self, id: Option<String>) {
        let id = id.filter(|id| !id.is_empty());
        match self.current.write() {
            Ok(mut guard) => *guard = id,
            Err(poisoned) => *poisoned.into_inner() = id,
        }
    }

    pub fn get(&self) -> Option<String> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VibratePayload {
    duration_ms: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KillPayload<'a> {
    package: &'a str,
    killed: usize,
}

/// Platform backed by the local process table. Navigation and haptics are
/// forwarded to the host as events.
pub struct HostPlatform {
    emitter: JsonLineEmitter,
    system: System,
    input_method: InputMethodSlot,
    own_pid: u32,
}

impl HostPlatform {
    pub fn new(emitter: JsonLineEmitter, input_method: InputMethodSlot) -> Self {
        Self {
            emitter,
            system: System::new(),
            input_method,
            own_pid: std::process::id(),
        }
    }
}

impl DevicePlatform for HostPlatform {
    fn go_home(&mut self) -> Result<()> {
        self.emitter.emit("go-home", &serde_json::Value::Null)
    }

    fn kill_background_process(&mut self, package: &str) -> Result<bool> {
        self.system
            .refresh_processes_specifics(ProcessesToUpdate::All, ProcessRefreshKind::everything());

        let mut killed = 0;
        for (pid, process) in self.system.processes() {
            if pid.as_u32() == self.own_pid {
                continue;
            }
            if process.name().to_string_lossy() != package {
                continue;
            }
            if process.kill() {
                killed += 1;
            } else {
                log::warn!(target: INTERVENTION, "could not kill {package} (pid {pid})");
            }
        }

        self.emitter.emit("app-killed", &KillPayload { package, killed })?;
        Ok(killed > 0)
    }

    fn vibrate(&mut self, duration: Duration) -> Result<()> {
        self.emitter.emit(
            "vibrate",
            &VibratePayload {
                duration_ms: duration.as_millis() as u64,
            },
        )
    }

    fn active_input_method(&self) -> Option<String> {
        self.input_method.get()
    }
}
