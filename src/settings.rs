use std::{collections::BTreeSet, fmt, fs, path::Path, str::FromStr};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    roast::RoastProfile,
    session::{LimitRange, SessionLimits},
    store::ConfigStore,
    utils::logging::STORE,
};

/// Store keys. Names match what the companion setup screens write.
pub mod keys {
    pub const USER_GENDER: &str = "USER_GENDER";
    pub const USER_LANG: &str = "USER_LANG";
    pub const USER_HOBBIES: &str = "USER_HOBBIES";
    pub const USER_OCCUPATION: &str = "USER_OCCUPATION";
    pub const USER_HUMOR_STYLES: &str = "USER_HUMOR_STYLES";

    pub const BLOCKED_PACKAGES: &str = "BLOCKED_PACKAGES";

    pub const MIN_SWIPE: &str = "MIN_SWIPE";
    pub const MAX_SWIPE: &str = "MAX_SWIPE";
    pub const MIN_TIME: &str = "MIN_TIME";
    pub const MAX_TIME: &str = "MAX_TIME";

    pub const PENALTY_TIME: &str = "PENALTY_TIME";
    pub const GLOBAL_LOCKDOWN: &str = "GLOBAL_LOCKDOWN";
    pub const UNBLOCK_TIME: &str = "UNBLOCK_TIME";
    pub const APP_PENALTY_PREFIX: &str = "PENALTY_TIME_";

    pub const PLEA_ENABLED: &str = "PLEA_ENABLED";
    pub const BONUS_DURATION: &str = "BONUS_DURATION";

    pub const EMERGENCY_MODE: &str = "EMERGENCY_MODE";
    pub const VIBRATION_ENABLED: &str = "VIBRATION_ENABLED";

    /// Per-package unblock timestamp key.
    pub fn app_penalty(package: &str) -> String {
        format!("{APP_PENALTY_PREFIX}{package}")
    }
}

pub mod defaults {
    pub const GENDER: &str = "he";
    pub const LANGUAGE: &str = "en";
    pub const EMERGENCY_MODE: &str = "weak";
    pub const MIN_SWIPE: i64 = 20;
    pub const MAX_SWIPE: i64 = 50;
    pub const MIN_TIME_MINUTES: i64 = 5;
    pub const MAX_TIME_MINUTES: i64 = 15;
    pub const PENALTY_MINUTES: i64 = 10;
    pub const BONUS_MINUTES: i64 = 5;
    pub const PLEA_ENABLED: bool = true;
    pub const VIBRATION_ENABLED: bool = true;
    pub const GLOBAL_LOCKDOWN: bool = false;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum EmergencyMode {
    /// A single tap lifts the lockdown.
    #[default]
    Weak,
    /// The user must retype a confession sentence exactly.
    Shame,
    /// No escape; wait it out.
    Impossible,
}

impl EmergencyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyMode::Weak => "weak",
            EmergencyMode::Shame => "shame",
            EmergencyMode::Impossible => "impossible",
        }
    }
}

impl FromStr for EmergencyMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "weak" => Ok(EmergencyMode::Weak),
            "shame" => Ok(EmergencyMode::Shame),
            "impossible" => Ok(EmergencyMode::Impossible),
            other => anyhow::bail!("unknown emergency mode '{other}'"),
        }
    }
}

impl fmt::Display for EmergencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of every user setting the engine reads.
///
/// Loaded fresh from the store on each foreground change so edits made by the
/// setup screens apply without a restart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub gender: String,
    pub language: String,
    pub humor_styles: BTreeSet<String>,
    pub hobbies: BTreeSet<String>,
    pub occupation: String,
    pub monitored_packages: BTreeSet<String>,
    pub min_swipe: i64,
    pub max_swipe: i64,
    pub min_time_minutes: i64,
    pub max_time_minutes: i64,
    pub penalty_minutes: i64,
    pub plea_enabled: bool,
    pub bonus_minutes: i64,
    pub emergency_mode: EmergencyMode,
    pub global_lockdown: bool,
    pub vibration_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gender: defaults::GENDER.into(),
            language: defaults::LANGUAGE.into(),
            humor_styles: BTreeSet::new(),
            hobbies: BTreeSet::new(),
            occupation: String::new(),
            monitored_packages: BTreeSet::new(),
            min_swipe: defaults::MIN_SWIPE,
            max_swipe: defaults::MAX_SWIPE,
            min_time_minutes: defaults::MIN_TIME_MINUTES,
            max_time_minutes: defaults::MAX_TIME_MINUTES,
            penalty_minutes: defaults::PENALTY_MINUTES,
            plea_enabled: defaults::PLEA_ENABLED,
            bonus_minutes: defaults::BONUS_MINUTES,
            emergency_mode: EmergencyMode::Weak,
            global_lockdown: defaults::GLOBAL_LOCKDOWN,
            vibration_enabled: defaults::VIBRATION_ENABLED,
        }
    }
}

impl Settings {
    pub fn load(store: &dyn ConfigStore) -> Result<Self> {
        let mode_raw = store.get_string(keys::EMERGENCY_MODE, defaults::EMERGENCY_MODE)?;
        let emergency_mode = mode_raw.parse().unwrap_or_else(|err| {
            log::warn!(target: STORE, "{err}; falling back to {}", EmergencyMode::default());
            EmergencyMode::default()
        });

        Ok(Self {
            gender: store.get_string(keys::USER_GENDER, defaults::GENDER)?,
            language: store.get_string(keys::USER_LANG, defaults::LANGUAGE)?,
            humor_styles: store.get_string_set(keys::USER_HUMOR_STYLES)?,
            hobbies: store.get_string_set(keys::USER_HOBBIES)?,
            occupation: store.get_string(keys::USER_OCCUPATION, "")?,
            monitored_packages: store.get_string_set(keys::BLOCKED_PACKAGES)?,
            min_swipe: store.get_int(keys::MIN_SWIPE, defaults::MIN_SWIPE)?,
            max_swipe: store.get_int(keys::MAX_SWIPE, defaults::MAX_SWIPE)?,
            min_time_minutes: store.get_int(keys::MIN_TIME, defaults::MIN_TIME_MINUTES)?,
            max_time_minutes: store.get_int(keys::MAX_TIME, defaults::MAX_TIME_MINUTES)?,
            penalty_minutes: store.get_int(keys::PENALTY_TIME, defaults::PENALTY_MINUTES)?,
            plea_enabled: store.get_bool(keys::PLEA_ENABLED, defaults::PLEA_ENABLED)?,
            bonus_minutes: store.get_int(keys::BONUS_DURATION, defaults::BONUS_MINUTES)?,
            emergency_mode,
            global_lockdown: store.get_bool(keys::GLOBAL_LOCKDOWN, defaults::GLOBAL_LOCKDOWN)?,
            vibration_enabled: store
                .get_bool(keys::VIBRATION_ENABLED, defaults::VIBRATION_ENABLED)?,
        })
    }

    /// Writes every field back under its key.
    pub fn save(&self, store: &dyn ConfigStore) -> Result<()> {
        store.set_string(keys::USER_GENDER, &self.gender)?;
        store.set_string(keys::USER_LANG, &self.language)?;
        store.set_string_set(keys::USER_HUMOR_STYLES, self.humor_styles.clone())?;
        store.set_string_set(keys::USER_HOBBIES, self.hobbies.clone())?;
        store.set_string(keys::USER_OCCUPATION, &self.occupation)?;
        store.set_string_set(keys::BLOCKED_PACKAGES, self.monitored_packages.clone())?;
        store.set_int(keys::MIN_SWIPE, self.min_swipe)?;
        store.set_int(keys::MAX_SWIPE, self.max_swipe)?;
        store.set_int(keys::MIN_TIME, self.min_time_minutes)?;
        store.set_int(keys::MAX_TIME, self.max_time_minutes)?;
        store.set_int(keys::PENALTY_TIME, self.penalty_minutes)?;
        store.set_bool(keys::PLEA_ENABLED, self.plea_enabled)?;
        store.set_int(keys::BONUS_DURATION, self.bonus_minutes)?;
        store.set_string(keys::EMERGENCY_MODE, self.emergency_mode.as_str())?;
        store.set_bool(keys::GLOBAL_LOCKDOWN, self.global_lockdown)?;
        store.set_bool(keys::VIBRATION_ENABLED, self.vibration_enabled)?;
        Ok(())
    }

    /// Reads a `settings.json` export. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            swipes: LimitRange::normalized(self.min_swipe, self.max_swipe),
            minutes: LimitRange::normalized(self.min_time_minutes, self.max_time_minutes),
        }
    }

    pub fn roast_profile(&self) -> RoastProfile {
        RoastProfile {
            language: self.language.clone(),
            gender: self.gender.clone(),
            humor_styles: self.humor_styles.clone(),
            hobbies: self.hobbies.clone(),
            occupation: self.occupation.clone(),
        }
    }

    pub fn is_monitored(&self, package: &str) -> bool {
        self.monitored_packages.contains(package)
    }
}
