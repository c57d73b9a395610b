//! Line-delimited JSON commands from the host process.
//!
//! ```text
//! {"type":"event","package":"com.instagram.android","kind":"windowStateChanged"}
//! {"type":"event","package":"com.instagram.android","kind":"viewScrolled","scrollDelta":{"x":0,"y":48}}
//! {"type":"ui","ticket":"<uuid>","action":"pleaRequested"}
//! {"type":"inputMethod","id":"com.google.android.inputmethod.latin/.LatinIME"}
//! {"type":"snapshot"}
//! {"type":"shutdown"}
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::intervention::UiAction;
use crate::platform::InputMethodSlot;
use crate::sensing::RawEvent;
use crate::utils::logging::MONITOR;

use super::emitter::JsonLineEmitter;
use super::GuardHandle;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostCommand {
    Event(RawEvent),
    Ui(UiAction),
    InputMethod {
        #[serde(default)]
        id: Option<String>,
    },
    Snapshot,
    Shutdown,
}

/// `None` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<HostCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let command = serde_json::from_str(line)
        .with_context(|| format!("unrecognised host command: {line}"))?;
    Ok(Some(command))
}

/// Feeds host commands into the service until `shutdown` or end of input.
/// Malformed lines are logged and skipped.
pub async fn serve_lines<R>(
    reader: R,
    guard: GuardHandle,
    input_method: InputMethodSlot,
    emitter: JsonLineEmitter,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await.context("failed to read host input")? {
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                log::warn!(target: MONITOR, "{err:#}");
                continue;
            }
        };

        match command {
            HostCommand::Event(event) => guard.platform_event(event)?,
            HostCommand::Ui(action) => guard.ui_action(action)?,
            HostCommand::InputMethod { id } => input_method.set(id),
            HostCommand::Snapshot => {
                let snapshot = guard.snapshot().await?;
                emitter.emit("snapshot", &snapshot)?;
            }
            HostCommand::Shutdown => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intervention::UiActionKind;
    use crate::sensing::RawEventKind;

    #[test]
    fn test_parse_event_line() {
        let command = parse_line(
            r#"{"type":"event","package":"com.x","kind":"viewScrolled","scrollDelta":{"x":0,"y":12}}"#,
        )
        .unwrap()
        .unwrap();

        match command {
            HostCommand::Event(event) => {
                assert_eq!(event.package, "com.x");
                assert_eq!(event.kind, RawEventKind::ViewScrolled);
                assert_eq!(event.scroll_delta.map(|d| d.y), Some(12));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_ui_line() {
        let ticket = uuid::Uuid::new_v4();
        let command = parse_line(&format!(
            r#"{{"type":"ui","ticket":"{ticket}","action":"emergencyUnlockRequested"}}"#
        ))
        .unwrap()
        .unwrap();

        assert_eq!(
            command,
            HostCommand::Ui(UiAction::new(
                ticket,
                UiActionKind::EmergencyUnlockRequested
            ))
        );
    }

    #[test]
    fn test_unknown_event_kind_still_parses() {
        let command = parse_line(r#"{"type":"event","package":"com.x","kind":"viewClicked"}"#)
            .unwrap()
            .unwrap();

        match command {
            HostCommand::Event(event) => assert_eq!(event.kind, RawEventKind::Other),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_blank_and_bad_lines() {
        assert!(parse_line("   ").unwrap().is_none());
        assert!(parse_line(r#"{"type":"teleport"}"#).is_err());
        assert_eq!(
            parse_line(r#"{"type":"inputMethod"}"#).unwrap(),
            Some(HostCommand::InputMethod { id: None })
        );
    }
}
