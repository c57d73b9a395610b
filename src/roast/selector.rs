use crate::random::RandomSource;
use crate::utils::logging::ROAST;
use crate::log_debug;

use super::{Meme, MemePool, RoastProfile, DEFAULT_LANGUAGE, FALLBACK_ROAST};

const ENABLE_LOGS: bool = true;

/// Picks a roast for the user's profile, or a scripted message for a scenario
/// tag.
#[derive(Debug, Clone, Default)]
pub struct RoastSelector {
    pool: MemePool,
}

impl RoastSelector {
    pub fn new(pool: MemePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MemePool {
        &self.pool
    }

    pub fn select(
        &self,
        profile: &RoastProfile,
        tag: Option<&str>,
        random: &mut dyn RandomSource,
    ) -> String {
        match tag {
            Some(tag) => self.select_tagged(&profile.language, tag, random),
            None => self.select_personalized(profile, random),
        }
    }

    fn in_language(&self, language: &str) -> Vec<&Meme> {
        self.pool
            .memes()
            .iter()
            .filter(|meme| meme.language == language)
            .collect()
    }

    fn tagged_in(&self, language: &str, tag: &str) -> Vec<&Meme> {
        self.in_language(language)
            .into_iter()
            .filter(|meme| meme.has_tag(tag))
            .collect()
    }

    fn select_tagged(&self, language: &str, tag: &str, random: &mut dyn RandomSource) -> String {
        let mut candidates = self.tagged_in(language, tag);
        if candidates.is_empty() && language != DEFAULT_LANGUAGE {
            candidates = self.tagged_in(DEFAULT_LANGUAGE, tag);
        }

        log_debug!(ROAST, "{} candidates for scenario '{tag}'", candidates.len());
        pick(&candidates, random)
    }

    fn select_personalized(&self, profile: &RoastProfile, random: &mut dyn RandomSource) -> String {
        let mut filtered = self.in_language(&profile.language);
        if filtered.is_empty() {
            filtered = self.in_language(DEFAULT_LANGUAGE);
        }

        filtered.retain(|meme| meme.has_tag(&profile.gender));

        if !profile.humor_styles.is_empty() {
            let styles: Vec<String> = profile
                .humor_styles
                .iter()
                .map(|style| style.to_lowercase())
                .collect();
            filtered.retain(|meme| styles.iter().any(|style| meme.has_tag(style)));
        }

        let hobbies: Vec<String> = profile
            .hobbies
            .iter()
            .map(|hobby| hobby.to_lowercase())
            .collect();
        let occupation = profile.occupation.to_lowercase();

        // Hobby and occupation matches carry equal weight: one union, one draw.
        let personalized: Vec<&Meme> = filtered
            .iter()
            .copied()
            .filter(|meme| {
                hobbies.iter().any(|hobby| meme.has_tag(hobby))
                    || (!occupation.is_empty() && meme.has_tag(&occupation))
            })
            .collect();

        if !personalized.is_empty() {
            log_debug!(ROAST, "{} personalized roasts match", personalized.len());
            return pick(&personalized, random);
        }

        log_debug!(
            ROAST,
            "no personalized match, drawing from {} roasts in '{}'",
            filtered.len(),
            profile.language
        );
        pick(&filtered, random)
    }
}

fn pick(candidates: &[&Meme], random: &mut dyn RandomSource) -> String {
    if candidates.is_empty() {
        return FALLBACK_ROAST.to_string();
    }
    candidates[random.index(candidates.len())].text.clone()
}
