use std::{env, time::Duration};

use crate::sensing::{DebounceWindows, DEFAULT_TEMPORARY_PREFIXES};

pub const DEFAULT_HOST_PACKAGE: &str = "app.brostop.android";

/// Process-level tunables. User-facing settings live in the store instead.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Package of the app hosting the engine; its own windows are ignored.
    pub host_package: String,

    pub debounce: DebounceWindows,

    /// Transient system surfaces that never end a session.
    pub temporary_prefixes: Vec<String>,

    /// Swipes granted on top of the current count when a plea is won
    pub plea_bonus_swipes: u32,
    /// Chance of winning a plea, in percent
    pub plea_win_percent: u32,
    /// Suspense between the gamble and applying its outcome
    pub plea_reveal_delay: Duration,

    /// Wait between sending the user home and killing the app
    pub exit_grace: Duration,
    pub countdown_tick: Duration,
    pub vibration: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            host_package: DEFAULT_HOST_PACKAGE.to_string(),
            debounce: DebounceWindows::default(),
            temporary_prefixes: DEFAULT_TEMPORARY_PREFIXES
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
            plea_bonus_swipes: 30,
            plea_win_percent: 20,
            plea_reveal_delay: Duration::from_secs(2),
            exit_grace: Duration::from_millis(800),
            countdown_tick: Duration::from_secs(1),
            vibration: Duration::from_millis(500),
        }
    }
}

impl GuardConfig {
    /// Defaults, with `BROSTOP_HOST_PACKAGE` and `BROSTOP_EXTRA_TEMPORARY`
    /// (comma-separated prefixes) applied when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = env::var("BROSTOP_HOST_PACKAGE") {
            let host = host.trim();
            if !host.is_empty() {
                config.host_package = host.to_string();
            }
        }

        if let Ok(extra) = env::var("BROSTOP_EXTRA_TEMPORARY") {
            config.temporary_prefixes.extend(
                extra
                    .split(',')
                    .map(str::trim)
                    .filter(|prefix| !prefix.is_empty())
                    .map(str::to_string),
            );
        }

        config
    }
}
