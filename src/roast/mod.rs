//! Roast messages and their selection.

mod pool;
mod selector;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub use pool::{Meme, MemePool};
pub use selector::RoastSelector;

/// Scenario tag for the message shown after a won plea.
pub const PLEA_WON_TAG: &str = "plea_won";
/// Scenario tag for the message shown after a lost plea.
pub const PLEA_LOST_TAG: &str = "2nd_chance_fail";

pub const DEFAULT_LANGUAGE: &str = "en";
pub const FALLBACK_ROAST: &str = "You've reached your limit. Time to take a break!";

/// The user attributes a roast is matched against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoastProfile {
    pub language: String,
    pub gender: String,
    pub humor_styles: BTreeSet<String>,
    pub hobbies: BTreeSet<String>,
    pub occupation: String,
}

/// Overlay headline for the user's gender.
pub fn title(gender: &str) -> &'static str {
    if gender == "he" {
        "🛑 BRO STOP."
    } else {
        "🛑 SIS STOP."
    }
}
