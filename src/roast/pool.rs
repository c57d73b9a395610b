use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::utils::logging::ROAST;

const BUILTIN_POOL: &str = include_str!("pool.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meme {
    pub id: u32,
    pub text: String,
    /// Gender, humor style, hobby, occupation and scenario tags, lowercase.
    pub tags: Vec<String>,
    pub language: String,
}

impl Meme {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemePool {
    memes: Vec<Meme>,
}

impl MemePool {
    pub fn new(memes: Vec<Meme>) -> Self {
        Self { memes }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let memes: Vec<Meme> = serde_json::from_str(json).context("Failed to parse meme pool")?;
        Ok(Self { memes })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read meme pool from {}", path.display()))?;
        let pool = Self::from_json(&contents)
            .with_context(|| format!("Invalid meme pool in {}", path.display()))?;
        log::debug!(target: ROAST, "loaded {} memes from {}", pool.len(), path.display());
        Ok(pool)
    }

    /// The pool compiled into the binary. An unparsable built-in pool yields
    /// an empty pool, which makes every selection use the fallback text.
    pub fn builtin() -> Self {
        Self::from_json(BUILTIN_POOL).unwrap_or_else(|err| {
            log::error!(target: ROAST, "built-in meme pool unusable: {err:#}");
            Self::default()
        })
    }

    pub fn memes(&self) -> &[Meme] {
        &self.memes
    }

    pub fn len(&self) -> usize {
        self.memes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memes.is_empty()
    }
}
