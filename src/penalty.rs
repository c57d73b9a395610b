use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::clock::Clock;
use crate::settings::{defaults, keys};
use crate::store::ConfigStore;
use crate::utils::logging::PENALTY;
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

const MS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PenaltyScope {
    Global,
    App,
}

impl PenaltyScope {
    pub fn is_global(self) -> bool {
        matches!(self, PenaltyScope::Global)
    }

    pub fn from_global(is_global: bool) -> Self {
        if is_global {
            PenaltyScope::Global
        } else {
            PenaltyScope::App
        }
    }
}

/// A penalty that has just been written to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Penalty {
    pub scope: PenaltyScope,
    pub unblock_at: i64,
}

/// Reads and writes unblock timestamps.
///
/// Global scope uses a single `UNBLOCK_TIME` key; per-app scope uses one
/// `PENALTY_TIME_<package>` key per package. The scope flag is read on every
/// call so the setting can change between interventions.
#[derive(Clone)]
pub struct PenaltyManager {
    store: Arc<dyn ConfigStore>,
    clock: Arc<dyn Clock>,
}

impl PenaltyManager {
    pub fn new(store: Arc<dyn ConfigStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn duration_ms(&self) -> Result<Option<i64>> {
        let minutes = self
            .store
            .get_int(keys::PENALTY_TIME, defaults::PENALTY_MINUTES)?;
        if minutes <= 0 {
            return Ok(None);
        }
        Ok(Some(minutes.saturating_mul(MS_PER_MINUTE)))
    }

    fn is_global(&self) -> Result<bool> {
        self.store
            .get_bool(keys::GLOBAL_LOCKDOWN, defaults::GLOBAL_LOCKDOWN)
    }

    /// Returns `true` when the global timestamp was written. Per-app scope and
    /// a zero duration both return `false`; the caller then writes the
    /// per-app timestamp through [`apply_app_penalty`](Self::apply_app_penalty).
    pub fn apply_penalty(&self) -> Result<bool> {
        let Some(duration_ms) = self.duration_ms()? else {
            log_info!(PENALTY, "penalty disabled (0 minutes)");
            return Ok(false);
        };

        let is_global = self.is_global()?;
        if is_global {
            let unblock_at = self.clock.now_ms().saturating_add(duration_ms);
            self.store.set_int(keys::UNBLOCK_TIME, unblock_at)?;
            log_info!(
                PENALTY,
                "global penalty applied: {}m, unblock at {unblock_at}",
                duration_ms / MS_PER_MINUTE
            );
        }
        Ok(is_global)
    }

    pub fn apply_app_penalty(&self, package: &str) -> Result<()> {
        let Some(duration_ms) = self.duration_ms()? else {
            return Ok(());
        };

        let unblock_at = self.clock.now_ms().saturating_add(duration_ms);
        self.store.set_int(&keys::app_penalty(package), unblock_at)?;
        log_info!(
            PENALTY,
            "app penalty applied for {package}: {}m, unblock at {unblock_at}",
            duration_ms / MS_PER_MINUTE
        );
        Ok(())
    }

    /// Applies a penalty in whichever scope is configured. `None` when the
    /// configured duration is zero.
    pub fn penalize(&self, package: &str) -> Result<Option<Penalty>> {
        if self.duration_ms()?.is_none() {
            log_info!(PENALTY, "penalty disabled (0 minutes)");
            return Ok(None);
        }

        let scope = if self.apply_penalty()? {
            PenaltyScope::Global
        } else {
            self.apply_app_penalty(package)?;
            PenaltyScope::App
        };

        let key = match scope {
            PenaltyScope::Global => keys::UNBLOCK_TIME.to_string(),
            PenaltyScope::App => keys::app_penalty(package),
        };
        let unblock_at = self.store.get_int(&key, 0)?;
        Ok(Some(Penalty { scope, unblock_at }))
    }

    /// Unblock timestamp governing `package`, if it lies in the future.
    pub fn get_active_penalty(&self, package: &str) -> Result<Option<i64>> {
        let key = if self.is_global()? {
            keys::UNBLOCK_TIME.to_string()
        } else {
            keys::app_penalty(package)
        };

        let unblock_at = self.store.get_int(&key, 0)?;
        if self.clock.now_ms() < unblock_at {
            Ok(Some(unblock_at))
        } else {
            Ok(None)
        }
    }

    /// Like [`get_active_penalty`](Self::get_active_penalty) but also reports
    /// the scope in force.
    pub fn active_penalty(&self, package: &str) -> Result<Option<Penalty>> {
        let scope = PenaltyScope::from_global(self.is_global()?);
        Ok(self
            .get_active_penalty(package)?
            .map(|unblock_at| Penalty { scope, unblock_at }))
    }

    /// Clears the relevant timestamp regardless of time left. Idempotent.
    pub fn pardon(&self, is_global: bool, package: Option<&str>) -> Result<()> {
        log_debug!(
            PENALTY,
            "penalty pardoned (global: {is_global}, package: {})",
            package.unwrap_or("-")
        );

        if is_global {
            self.store.remove(keys::UNBLOCK_TIME)?;
        } else if let Some(package) = package {
            self.store.remove(&keys::app_penalty(package))?;
        }
        Ok(())
    }

    pub fn remaining_ms(&self, unblock_at: i64) -> i64 {
        (unblock_at - self.clock.now_ms()).max(0)
    }

    /// Removes timestamps that already lapsed. Returns how many were removed.
    pub fn prune_expired(&self) -> Result<usize> {
        let now = self.clock.now_ms();
        let mut removed = 0;

        let mut candidates = self.store.keys_with_prefix(keys::APP_PENALTY_PREFIX)?;
        candidates.push(keys::UNBLOCK_TIME.to_string());

        for key in candidates {
            if self.store.get(&key)?.is_none() {
                continue;
            }
            if self.store.get_int(&key, 0)? <= now {
                self.store.remove(&key)?;
                removed += 1;
            }
        }

        if removed > 0 {
            log_info!(PENALTY, "pruned {removed} expired penalty timestamp(s)");
        }
        Ok(removed)
    }
}
