// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Prompt clean-up ahead of intent matching, plus negation capture on the
//! raw text.

use crate::text;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CONDITIONAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^if\s+(?P<cond>.+?),?\s+then\s+(?P<then>.+?)(?:,?\s+else\s+.+)?$").unwrap()
});
static CONJUNCTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:as well as|along with|in order to|so that|and then|and|but|also|plus)\b")
        .unwrap()
});
static PRONOUN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:i|me|my|we|us|our|you|your|it|its|they|them|their)\b").unwrap()
});
static QUESTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:what|how|why|which|where|when|who|can|could|would|will|is|are|do|does)\b\s*)+")
        .unwrap()
});
static COMPARATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:more than|less than|greater than|fewer than|higher than|lower than|better than|worse than|compared to|compared with|relative to)\b",
    )
    .unwrap()
});
static RELATIVE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:(?:last|past|previous|prior)\s+(?:\d+\s+)?(?:days?|weeks?|months?|quarters?|years?)|this\s+(?:week|month|quarter|year)|year to date|ytd)\b",
    )
    .unwrap()
});
static HEDGING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:just|only|maybe|perhaps|possibly|kind of|sort of|basically|please|kindly|a bit|somewhat|roughly)\b",
    )
    .unwrap()
});
static NEGATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?P<marker>not|no|never|without|exclude|excluding|except|ignore|ignoring|don't|dont|doesn't|isn't|aren't|won't)\s+(?P<phrase>(?:[a-z0-9'-]+\s*){1,3})",
    )
    .unwrap()
});
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const TIME_TERMS: &[&str] = &[
    "trend", "time", "timeline", "history", "historical", "growth", "seasonal", "period", "month",
    "year", "quarter", "week", "daily",
];
const COMPARISON_TERMS: &[&str] = &[
    "compar", "versus", "vs", "breakdown", "rank", "across", "by region", "by channel",
];
const FILLER_ARTICLES: &[&str] = &["a", "an", "the", "any"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Negation {
    pub marker: String,
    pub phrase: String,
    pub targets_time: bool,
    pub targets_comparison: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalisedPrompt {
    /// Lower-cased prompt with whitespace collapsed.
    pub raw: String,
    pub normalised: String,
    pub negations: Vec<Negation>,
}
impl NormalisedPrompt {
    /// Single words match on word starts, phrases on substrings, against
    /// either form of the prompt.
    pub fn mentions(&self, term: &str) -> bool {
        text::contains_term(&self.normalised, term) || text::contains_term(&self.raw, term)
    }
    pub fn negates_time(&self) -> bool {
        self.negations.iter().any(|n| n.targets_time)
    }
    pub fn negates_comparison(&self) -> bool {
        self.negations.iter().any(|n| n.targets_comparison)
    }
}

pub fn normalise(prompt: &str) -> NormalisedPrompt {
    let raw = collapse(&prompt.to_lowercase());
    let negations = detect_negations(&raw);

    let mut text = raw.clone();
    if let Some(caps) = CONDITIONAL_RE.captures(&text) {
        text = format!("{} {}", &caps["then"], &caps["cond"]);
    }
    text = CONJUNCTION_RE.replace_all(&text, " ").into_owned();
    text = PRONOUN_RE.replace_all(&text, " ").into_owned();
    text = QUESTION_RE.replace(text.trim_start(), "").into_owned();
    text = COMPARATIVE_RE.replace_all(&text, "compare").into_owned();
    text = RELATIVE_TIME_RE
        .replace_all(&text, "historical period")
        .into_owned();
    text = HEDGING_RE.replace_all(&text, " ").into_owned();

    NormalisedPrompt {
        raw,
        normalised: collapse(&text),
        negations,
    }
}

fn detect_negations(raw: &str) -> Vec<Negation> {
    NEGATION_RE
        .captures_iter(raw)
        .map(|caps| {
            let phrase = caps["phrase"]
                .split_whitespace()
                .skip_while(|word| FILLER_ARTICLES.contains(word))
                .collect::<Vec<_>>()
                .join(" ");
            Negation {
                marker: caps["marker"].to_string(),
                targets_time: TIME_TERMS.iter().any(|t| text::contains_term(&phrase, t)),
                targets_comparison: COMPARISON_TERMS
                    .iter()
                    .any(|t| text::contains_term(&phrase, t)),
                phrase,
            }
        })
        .collect()
}

fn collapse(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}
