use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::intervention::{
    InterventionUi, LockdownRequest, PleaOutcome, RoastRequest, Ticket,
};

#[derive(Serialize)]
struct Envelope<'a, T: Serialize + ?Sized> {
    event: &'a str,
    payload: &'a T,
}

/// Writes `{"event": ..., "payload": ...}` records, one per line.
#[derive(Clone)]
pub struct JsonLineEmitter {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl JsonLineEmitter {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Emitter that records into a buffer the caller can read back.
    pub fn in_memory() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::new(buffer.clone()), buffer)
    }

    pub fn emit<T: Serialize + ?Sized>(&self, event: &str, payload: &T) -> Result<()> {
        let line = serde_json::to_string(&Envelope { event, payload })
            .with_context(|| format!("failed to encode {event} event"))?;

        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow!("event writer lock poisoned"))?;
        writeln!(out, "{line}").with_context(|| format!("failed to write {event} event"))?;
        out.flush().context("failed to flush event writer")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn lines(&self) -> Vec<String> {
        let bytes = match self.bytes.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .bytes
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "buffer lock poisoned"))?;
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PleaOutcomeEvent<'a> {
    ticket: Ticket,
    #[serde(flatten)]
    outcome: &'a PleaOutcome,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CountdownEvent {
    ticket: Ticket,
    remaining_ms: i64,
}

#[derive(Serialize)]
struct TicketEvent {
    ticket: Ticket,
}

/// Overlay that forwards every request to the host as a JSON line.
pub struct JsonLineUi {
    emitter: JsonLineEmitter,
}

impl JsonLineUi {
    pub fn new(emitter: JsonLineEmitter) -> Self {
        Self { emitter }
    }
}

impl InterventionUi for JsonLineUi {
    fn show_roast(&mut self, request: &RoastRequest) -> Result<()> {
        self.emitter.emit("show-roast", request)
    }

    fn show_plea_outcome(&mut self, ticket: Ticket, outcome: &PleaOutcome) -> Result<()> {
        self.emitter
            .emit("plea-outcome", &PleaOutcomeEvent { ticket, outcome })
    }

    fn show_lockdown(&mut self, request: &LockdownRequest) -> Result<()> {
        self.emitter.emit("show-lockdown", request)
    }

    fn update_countdown(&mut self, ticket: Ticket, remaining_ms: i64) -> Result<()> {
        self.emitter.emit(
            "countdown",
            &CountdownEvent {
                ticket,
                remaining_ms,
            },
        )
    }

    fn confession_rejected(&mut self, ticket: Ticket) -> Result<()> {
        self.emitter
            .emit("confession-rejected", &TicketEvent { ticket })
    }

    fn hide(&mut self) -> Result<()> {
        self.emitter.emit("hide", &serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_emit_writes_one_line_per_event() {
        let (emitter, buffer) = JsonLineEmitter::in_memory();
        emitter.emit("hide", &serde_json::Value::Null).unwrap();
        emitter.emit("vibrate", &serde_json::json!({ "durationMs": 500 })).unwrap();

        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["event"], "hide");
        assert!(first["payload"].is_null());
    }

    #[test]
    fn test_plea_outcome_flattens_payload() {
        let (emitter, buffer) = JsonLineEmitter::in_memory();
        let mut ui = JsonLineUi::new(emitter);
        let ticket = Uuid::new_v4();
        ui.show_plea_outcome(
            ticket,
            &PleaOutcome {
                won: true,
                message: "lucky".into(),
            },
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&buffer.lines()[0]).unwrap();
        assert_eq!(value["event"], "plea-outcome");
        assert_eq!(value["payload"]["won"], true);
        assert_eq!(value["payload"]["ticket"], ticket.to_string());
    }
}
