//! Character and word counts for the HUD.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A letter run, optionally continued by letters, nonspacing marks, dashes or apostrophes.
const WORD_PATTERN: &str = r"\p{L}+(?:[\p{L}\p{Mn}\p{Pd}'’]+)?";

fn word_regex() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(WORD_PATTERN).expect("word pattern is valid"))
}

/// Counts derived from a piece of text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStats {
    /// Unicode scalar values.
    pub chars: usize,
    /// Matches of the word pattern.
    pub words: usize,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        Self {
            chars: text.chars().count(),
            words: word_regex().find_iter(text).count(),
        }
    }
}
