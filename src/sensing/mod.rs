pub mod classifier;
pub mod router;

pub use classifier::{
    DebounceWindows, EventClassifier, RawEvent, RawEventKind, ScrollDebouncer, ScrollDelta, Signal,
};
pub use router::{AppRouter, Route, RouteContext, DEFAULT_TEMPORARY_PREFIXES};
