//! Conditional logging macros that check a module-level `ENABLE_LOGS` flag and
//! route every record to one of the crate's log targets.
//!
//! Usage:
//! ```ignore
//! // In your module, define the flag first:
//! const ENABLE_LOGS: bool = true;
//!
//! // Then use the macros (they're exported at the crate root):
//! use crate::utils::logging::SWIPE;
//! use crate::log_debug;
//!
//! log_debug!(SWIPE, "swipe #{} counted", 3);
//! ```
//!
//! Filter per concern with `RUST_LOG`, e.g. `RUST_LOG=brostop::swipe=debug`.

pub const SWIPE: &str = "brostop::swipe";
pub const APP_SWITCH: &str = "brostop::app_switch";
pub const MONITOR: &str = "brostop::monitor";
pub const ROULETTE: &str = "brostop::roulette";
pub const INTERVENTION: &str = "brostop::intervention";
pub const PENALTY: &str = "brostop::penalty";
pub const ROAST: &str = "brostop::roast";
pub const PLEA: &str = "brostop::plea";
pub const STORE: &str = "brostop::store";

/// Debug record on `$target`, emitted only when the calling module sets
/// `ENABLE_LOGS = true`.
#[macro_export]
macro_rules! log_debug {
    ($target:expr, $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!(target: $target, $($arg)*);
        }
    };
}

/// Info record on `$target`, gated on the calling module's `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_info {
    ($target:expr, $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!(target: $target, $($arg)*);
        }
    };
}

/// Warn record on `$target`, gated on the calling module's `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_warn {
    ($target:expr, $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!(target: $target, $($arg)*);
        }
    };
}

/// Error record on `$target`. Errors ignore `ENABLE_LOGS` so a muted module
/// still reports failures.
#[macro_export]
macro_rules! log_error {
    ($target:expr, $($arg:tt)*) => {
        log::error!(target: $target, $($arg)*);
    };
}
