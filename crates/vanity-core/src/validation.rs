//! Text and color checks shared by tag submission and nickname changes.

use crate::error::{Result, ValidationReason, VanityError};
use regex::Regex;

/// Accepts exactly `#` followed by six hexadecimal digits.
pub fn validate_hex_color(input: &str) -> Result<()> {
    let valid = input.len() == 7
        && input.starts_with('#')
        && input[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(VanityError::validation(
            ValidationReason::InvalidColorFormat,
            format!("'{}' is not a #RRGGBB color", input),
        ))
    }
}

/// Compiled length, character and wordlist rules for free-form text.
///
/// Checks run in a fixed order and the first failure wins: length bounds,
/// allowed characters, forbidden substrings.
#[derive(Debug, Clone)]
pub struct TextPolicy {
    min_length: usize,
    max_length: usize,
    allowed: Regex,
    forbidden: Vec<String>,
}

impl TextPolicy {
    pub fn new(
        min_length: usize,
        max_length: usize,
        allowed_pattern: &str,
        forbidden_words: &[String],
    ) -> Result<Self> {
        let allowed = Regex::new(allowed_pattern).map_err(|e| {
            VanityError::config("settings.toml", format!("bad pattern '{}': {}", allowed_pattern, e))
        })?;
        Ok(Self {
            min_length,
            max_length,
            allowed,
            forbidden: forbidden_words
                .iter()
                .filter(|w| !w.is_empty())
                .map(|w| w.to_lowercase())
                .collect(),
        })
    }

    /// Same policy with different length bounds.
    pub fn with_bounds(&self, min_length: usize, max_length: usize) -> Self {
        Self {
            min_length,
            max_length,
            ..self.clone()
        }
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn check(&self, text: &str) -> Result<()> {
        let len = text.chars().count();
        if len < self.min_length {
            return Err(VanityError::validation(
                ValidationReason::TooShort,
                format!("must be at least {} characters", self.min_length),
            ));
        }
        if len > self.max_length {
            return Err(VanityError::validation(
                ValidationReason::TooLong,
                format!("must be at most {} characters", self.max_length),
            ));
        }
        if !self.allowed.is_match(text) {
            return Err(VanityError::validation(
                ValidationReason::InvalidCharacters,
                "contains characters that are not allowed",
            ));
        }
        let lowered = text.to_lowercase();
        if let Some(word) = self.forbidden.iter().find(|w| lowered.contains(w.as_str())) {
            return Err(VanityError::validation(
                ValidationReason::ForbiddenWord,
                format!("contains forbidden word '{}'", word),
            ));
        }
        Ok(())
    }
}

/// Rejects text equal to a rank name, ignoring case.
pub fn check_rank_collision<'a>(
    text: &str,
    mut rank_names: impl Iterator<Item = &'a str>,
) -> Result<()> {
    match rank_names.find(|rank| rank.eq_ignore_ascii_case(text.trim())) {
        Some(rank) => Err(VanityError::validation(
            ValidationReason::RankNameCollision,
            format!("'{}' is a rank name", rank),
        )),
        None => Ok(()),
    }
}
