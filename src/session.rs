use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::random::RandomSource;
use crate::utils::logging::{PLEA, ROULETTE, SWIPE};
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

const MS_PER_MINUTE: u64 = 60_000;

/// Inclusive draw range after normalization: `1 <= min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitRange {
    pub min: u32,
    pub max: u32,
}

impl LimitRange {
    /// Clamps a user-entered range: the minimum is raised to 1 and the maximum
    /// to the minimum, so inverted or zeroed settings still draw a usable value.
    pub fn normalized(min: i64, max: i64) -> Self {
        let min = clamp_to_u32(min.max(1));
        let max = clamp_to_u32(max).max(min);
        Self { min, max }
    }

    pub fn draw(&self, random: &mut dyn RandomSource) -> u32 {
        random.between(self.min, self.max)
    }
}

fn clamp_to_u32(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub swipes: LimitRange,
    /// Time budget range, in whole minutes.
    pub minutes: LimitRange,
}

/// Live tracking state for one monitored package.
///
/// `active` is true exactly when `target_package` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: Option<String>,
    pub target_package: String,
    pub scroll_count: u32,
    pub swipe_limit: u32,
    pub time_limit_ms: u64,
    pub active: bool,
    /// Plea bargain already spent during this session.
    pub mercy_used: bool,
    pub started_at_ms: i64,
}

impl Session {
    pub fn progress_percent(&self) -> u32 {
        if self.swipe_limit == 0 {
            return 0;
        }
        (u64::from(self.scroll_count) * 100 / u64::from(self.swipe_limit)) as u32
    }

    pub fn remaining_swipes(&self) -> u32 {
        self.swipe_limit.saturating_sub(self.scroll_count)
    }
}

/// Owns the single session. At most one package is tracked at a time.
#[derive(Debug, Default)]
pub struct SessionManager {
    session: Session,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_active(&self) -> bool {
        self.session.active
    }

    pub fn is_monitoring(&self, package: &str) -> bool {
        self.session.active && self.session.target_package == package
    }

    /// Begins a fresh session with newly drawn budgets. Any live session is
    /// replaced.
    pub fn start(
        &mut self,
        package: &str,
        limits: &SessionLimits,
        random: &mut dyn RandomSource,
        now_ms: i64,
    ) -> &Session {
        let swipe_limit = limits.swipes.draw(random);
        let minutes = limits.minutes.draw(random);

        self.session = Session {
            session_id: Some(Uuid::new_v4().to_string()),
            target_package: package.to_string(),
            scroll_count: 0,
            swipe_limit,
            time_limit_ms: u64::from(minutes) * MS_PER_MINUTE,
            active: true,
            mercy_used: false,
            started_at_ms: now_ms,
        };

        log_info!(
            ROULETTE,
            "session started for {package}: swipe limit {swipe_limit} (range {}-{}), time limit {minutes}m (range {}-{})",
            limits.swipes.min,
            limits.swipes.max,
            limits.minutes.min,
            limits.minutes.max
        );

        &self.session
    }

    /// Counts one gesture. Returns `true` once the swipe budget is spent;
    /// inactive sessions never breach.
    pub fn increment_scroll(&mut self) -> bool {
        if !self.session.active {
            return false;
        }

        self.session.scroll_count = self.session.scroll_count.saturating_add(1);
        log_debug!(
            SWIPE,
            "swipe #{} | limit {} | {}% | {} remaining",
            self.session.scroll_count,
            self.session.swipe_limit,
            self.session.progress_percent(),
            self.session.remaining_swipes()
        );

        self.session.scroll_count >= self.session.swipe_limit
    }

    /// Grants more budget on top of what was already used: the swipe limit
    /// continues from the current count and the time budget is replaced.
    pub fn extend(&mut self, bonus_scrolls: u32, bonus_minutes: u32) {
        if !self.session.active {
            return;
        }

        self.session.swipe_limit = self.session.scroll_count.saturating_add(bonus_scrolls);
        self.session.time_limit_ms = u64::from(bonus_minutes) * MS_PER_MINUTE;

        log_info!(
            PLEA,
            "session extended: +{bonus_scrolls} swipes, {bonus_minutes}m; now {}/{} swipes",
            self.session.scroll_count,
            self.session.swipe_limit
        );
    }

    /// Ends the live session and hands back its final state.
    pub fn stop(&mut self) -> Option<Session> {
        if !self.session.active {
            return None;
        }

        log_debug!(
            ROULETTE,
            "session stopped for {}",
            self.session.target_package
        );
        let ended = std::mem::take(&mut self.session);
        Some(ended)
    }

    /// Reinstates a session previously returned by `stop`, counters intact.
    pub fn restore(&mut self, mut session: Session) {
        session.active = !session.target_package.is_empty();
        self.session = session;
    }
}
