// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pattern-based extraction of profile facts from free text.
//!
//! Each [`FactRule`] recognizes one fact key. A rule first tries a strict
//! pattern: a trigger phrase followed by up to three alphabetic tokens that
//! run to punctuation or the end of the message. Only if that finds nothing
//! does it fall back to taking up to three words after the first trigger
//! phrase present. Matching is case-insensitive against the original text,
//! so the captured value keeps the user's casing.

use std::sync::LazyLock;

use maddy_core::types::{NAME_FACT, ProfileFacts};
use regex::Regex;

/// Trigger phrases for the strict name pattern.
const NAME_PHRASES: &[&str] = &[
    "save my name as",
    "remember my name as",
    "my name is",
    "my name's",
    "call me",
    "i'm",
    "i am",
];

/// Trigger phrases for the fallback pass, tried in this order.
const NAME_FALLBACK_PHRASES: &[&str] = &[
    "save my name as",
    "remember my name as",
    "my name is",
    "i am",
    "i'm",
    "call me",
];

static NAME_RULE: LazyLock<FactRule> = LazyLock::new(|| {
    FactRule::new(NAME_FACT, NAME_PHRASES, NAME_FALLBACK_PHRASES)
        .expect("built-in name patterns are valid regexes")
});

/// Recognizes one fact key from a set of trigger phrases.
#[derive(Debug, Clone)]
pub struct FactRule {
    key: String,
    strict: Regex,
    fallback: Vec<Regex>,
}

impl FactRule {
    /// Compiles a rule. Phrases are matched literally and case-insensitively.
    pub fn new(
        key: impl Into<String>,
        phrases: &[&str],
        fallback_phrases: &[&str],
    ) -> Result<Self, regex::Error> {
        let alternation = phrases
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");
        let strict = Regex::new(&format!(
            r"(?i)\b(?:{alternation})\s+([a-z]+(?:[ \t]+[a-z]+){{0,2}})[ \t]*(?:[.,!?;:]|$)"
        ))?;

        let fallback = fallback_phrases
            .iter()
            .map(|p| {
                Regex::new(&format!(
                    r"(?i)\b{}\s+([a-z]+(?:\s+[a-z]+){{0,2}})",
                    regex::escape(p)
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            key: key.into(),
            strict,
            fallback,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the captured value, if any pass yields one longer than one character.
    pub fn capture(&self, message: &str) -> Option<String> {
        let accept = |caps: regex::Captures<'_>| {
            let value = caps.get(1)?.as_str().trim();
            (value.chars().count() > 1).then(|| value.to_string())
        };

        self.strict
            .captures_iter(message)
            .find_map(accept)
            .or_else(|| {
                self.fallback
                    .iter()
                    .find_map(|re| re.captures(message).and_then(accept))
            })
    }
}

/// Pure, stateless fact extraction over a list of rules.
#[derive(Debug, Clone)]
pub struct FactExtractor {
    rules: Vec<FactRule>,
}

impl Default for FactExtractor {
    /// An extractor recognizing the user's name.
    fn default() -> Self {
        Self {
            rules: vec![NAME_RULE.clone()],
        }
    }
}

impl FactExtractor {
    pub fn new(rules: Vec<FactRule>) -> Self {
        Self { rules }
    }

    /// Extracts every recognized fact. Never fails; no match yields an empty map.
    pub fn extract(&self, message: &str) -> ProfileFacts {
        self.rules
            .iter()
            .filter_map(|rule| rule.capture(message).map(|v| (rule.key.clone(), v)))
            .collect()
    }
}
