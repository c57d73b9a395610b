use serde::{Deserialize, Serialize};

use crate::utils::logging::SWIPE;
use crate::log_debug;

// Per-event chatter; flip off when tracing other modules.
const ENABLE_LOGS: bool = true;

/// Platform event types the engine understands. Anything else arrives as
/// `Other` and is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RawEventKind {
    WindowStateChanged,
    ViewScrolled,
    WindowContentChanged,
    #[serde(other)]
    Other,
}

impl RawEventKind {
    pub fn is_scroll(self) -> bool {
        matches!(
            self,
            RawEventKind::ViewScrolled | RawEventKind::WindowContentChanged
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RawEventKind::WindowStateChanged => "WINDOW_STATE_CHANGED",
            RawEventKind::ViewScrolled => "VIEW_SCROLLED",
            RawEventKind::WindowContentChanged => "WINDOW_CONTENT_CHANGED",
            RawEventKind::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollDelta {
    pub x: i32,
    pub y: i32,
}

impl ScrollDelta {
    pub fn is_zero(&self) -> bool {
        self.x == 0 && self.y == 0
    }
}

/// One notification from the platform's accessibility stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub package: String,
    pub kind: RawEventKind,
    /// Content movement, when the platform reports it. Older platform
    /// versions leave it out entirely.
    #[serde(default)]
    pub scroll_delta: Option<ScrollDelta>,
}

impl RawEvent {
    pub fn focus(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            kind: RawEventKind::WindowStateChanged,
            scroll_delta: None,
        }
    }

    pub fn scroll(package: impl Into<String>, kind: RawEventKind, delta: Option<ScrollDelta>) -> Self {
        Self {
            package: package.into(),
            kind,
            scroll_delta: delta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    FocusChanged(String),
    ScrollTick(RawEventKind),
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceWindows {
    /// Repeats of the same event kind inside this window are one gesture.
    pub same_kind_ms: i64,
    /// Any two scroll signals inside this window are one gesture.
    pub any_kind_ms: i64,
}

impl Default for DebounceWindows {
    fn default() -> Self {
        Self {
            same_kind_ms: 600,
            any_kind_ms: 100,
        }
    }
}

/// Collapses the burst of scroll notifications a single swipe produces.
#[derive(Debug, Clone)]
pub struct ScrollDebouncer {
    windows: DebounceWindows,
    last_accepted: Option<(i64, RawEventKind)>,
}

impl ScrollDebouncer {
    pub fn new(windows: DebounceWindows) -> Self {
        Self {
            windows,
            last_accepted: None,
        }
    }

    /// Returns `true` when the signal counts. State only moves on acceptance.
    pub fn accept(&mut self, kind: RawEventKind, now_ms: i64) -> bool {
        if let Some((last_ms, last_kind)) = self.last_accepted {
            let elapsed = now_ms - last_ms;
            // A clock that stepped backwards restarts the window.
            if elapsed >= 0 {
                if elapsed < self.windows.same_kind_ms && kind == last_kind {
                    log_debug!(
                        SWIPE,
                        "debounced {} (same kind within {}ms)",
                        kind.as_str(),
                        self.windows.same_kind_ms
                    );
                    return false;
                }
                if elapsed < self.windows.any_kind_ms {
                    log_debug!(
                        SWIPE,
                        "debounced {} (any kind within {}ms)",
                        kind.as_str(),
                        self.windows.any_kind_ms
                    );
                    return false;
                }
            }
        }

        self.last_accepted = Some((now_ms, kind));
        true
    }

    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}

/// Turns raw platform events into the two signals the engine acts on.
#[derive(Debug, Clone)]
pub struct EventClassifier {
    debouncer: ScrollDebouncer,
}

impl EventClassifier {
    pub fn new(windows: DebounceWindows) -> Self {
        Self {
            debouncer: ScrollDebouncer::new(windows),
        }
    }

    pub fn classify(&mut self, event: &RawEvent, now_ms: i64) -> Signal {
        match event.kind {
            RawEventKind::WindowStateChanged => Signal::FocusChanged(event.package.clone()),
            kind if kind.is_scroll() => {
                if event.scroll_delta.is_some_and(|delta| delta.is_zero()) {
                    log_debug!(SWIPE, "scroll from {} ignored (no movement)", event.package);
                    return Signal::Ignored;
                }
                if self.debouncer.accept(kind, now_ms) {
                    Signal::ScrollTick(kind)
                } else {
                    Signal::Ignored
                }
            }
            _ => Signal::Ignored,
        }
    }

    pub fn reset(&mut self) {
        self.debouncer.reset();
    }
}

impl Default for EventClassifier {
    fn default() -> Self {
        Self::new(DebounceWindows::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PKG: &str = "com.instagram.android";

    fn scrolled(delta: Option<ScrollDelta>) -> RawEvent {
        RawEvent::scroll(PKG, RawEventKind::ViewScrolled, delta)
    }

    #[test]
    fn test_focus_event_passes_through() {
        let mut classifier = EventClassifier::default();
        assert_eq!(
            classifier.classify(&RawEvent::focus(PKG), 0),
            Signal::FocusChanged(PKG.to_string())
        );
    }

    #[test]
    fn test_zero_delta_is_not_a_scroll() {
        let mut classifier = EventClassifier::default();
        let held = scrolled(Some(ScrollDelta { x: 0, y: 0 }));
        assert_eq!(classifier.classify(&held, 0), Signal::Ignored);

        // The rejected event must not arm the debounce window.
        let moved = scrolled(Some(ScrollDelta { x: 0, y: 40 }));
        assert_eq!(
            classifier.classify(&moved, 10),
            Signal::ScrollTick(RawEventKind::ViewScrolled)
        );
    }

    #[test]
    fn test_missing_delta_is_accepted() {
        let mut classifier = EventClassifier::default();
        assert_eq!(
            classifier.classify(&scrolled(None), 0),
            Signal::ScrollTick(RawEventKind::ViewScrolled)
        );
    }

    #[test]
    fn test_same_kind_inside_window_counts_once() {
        let mut debouncer = ScrollDebouncer::new(DebounceWindows::default());
        assert!(debouncer.accept(RawEventKind::ViewScrolled, 1_000));
        assert!(!debouncer.accept(RawEventKind::ViewScrolled, 1_599));
        assert!(debouncer.accept(RawEventKind::ViewScrolled, 1_600));
    }

    #[test]
    fn test_differing_kind_inside_tight_window_counts_once() {
        let mut debouncer = ScrollDebouncer::new(DebounceWindows::default());
        assert!(debouncer.accept(RawEventKind::ViewScrolled, 1_000));
        assert!(!debouncer.accept(RawEventKind::WindowContentChanged, 1_099));
        assert!(debouncer.accept(RawEventKind::WindowContentChanged, 1_100));
    }

    #[test]
    fn test_differing_kind_outside_tight_window_counts() {
        let mut debouncer = ScrollDebouncer::new(DebounceWindows::default());
        assert!(debouncer.accept(RawEventKind::ViewScrolled, 1_000));
        assert!(debouncer.accept(RawEventKind::WindowContentChanged, 1_300));
        // Window measures from the last accepted signal, whatever its kind.
        assert!(!debouncer.accept(RawEventKind::WindowContentChanged, 1_500));
        assert!(debouncer.accept(RawEventKind::ViewScrolled, 1_500));
    }

    #[test]
    fn test_rejection_does_not_extend_window() {
        let mut debouncer = ScrollDebouncer::new(DebounceWindows::default());
        assert!(debouncer.accept(RawEventKind::ViewScrolled, 0));
        assert!(!debouncer.accept(RawEventKind::ViewScrolled, 500));
        assert!(debouncer.accept(RawEventKind::ViewScrolled, 600));
    }

    #[test]
    fn test_backwards_clock_restarts_window() {
        let mut debouncer = ScrollDebouncer::new(DebounceWindows::default());
        assert!(debouncer.accept(RawEventKind::ViewScrolled, 10_000));
        assert!(debouncer.accept(RawEventKind::ViewScrolled, 2_000));
        assert!(!debouncer.accept(RawEventKind::ViewScrolled, 2_100));
    }

    #[test]
    fn test_other_kinds_are_ignored() {
        let mut classifier = EventClassifier::default();
        let event = RawEvent::scroll(PKG, RawEventKind::Other, None);
        assert_eq!(classifier.classify(&event, 0), Signal::Ignored);
    }

    #[test]
    fn test_raw_event_deserializes_without_delta() {
        let event: RawEvent =
            serde_json::from_str(r#"{"package":"com.x","kind":"viewScrolled"}"#).unwrap();
        assert_eq!(event.kind, RawEventKind::ViewScrolled);
        assert!(event.scroll_delta.is_none());
    }

    #[test]
    fn test_unknown_kind_deserializes_as_other() {
        let event: RawEvent =
            serde_json::from_str(r#"{"package":"com.x","kind":"viewClicked"}"#).unwrap();
        assert_eq!(event.kind, RawEventKind::Other);

        let mut classifier = EventClassifier::default();
        assert_eq!(classifier.classify(&event, 0), Signal::Ignored);
    }
}
