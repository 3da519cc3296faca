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

//! Small lexical helpers shared by the classifier, intent analyser and
//! relevance scorer.

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "for", "to", "in", "on", "by", "me", "my", "our", "is",
    "are", "be", "with", "show", "give", "get", "what", "how", "can", "you", "please", "chart",
    "graph", "plot", "display", "see", "want", "like", "would", "could", "i", "we", "it", "this",
    "that", "all",
];

/// Splits a camelCase / snake_case / dotted identifier into lower-case words.
pub fn split_identifier(identifier: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower_or_digit = false;
    for ch in identifier.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower_or_digit = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower_or_digit && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower_or_digit = ch.is_lowercase() || ch.is_ascii_digit();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// `"grossSales"` becomes `"gross sales"`.
pub fn humanise(identifier: &str) -> String {
    split_identifier(identifier).join(" ")
}

/// `"grossSales"` becomes `"Gross Sales"`.
pub fn title_case(identifier: &str) -> String {
    split_identifier(identifier)
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lower-cased alphanumeric tokens of free text with stop words removed.
pub fn content_tokens(text: &str, min_len: usize) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() >= min_len && !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Whole-word containment for single words (prefix match so plurals hit),
/// plain substring containment for phrases.
pub fn contains_term(text: &str, term: &str) -> bool {
    if term.contains(' ') {
        return text.contains(term);
    }
    text.split(|c: char| !c.is_alphanumeric())
        .any(|token| !token.is_empty() && token.starts_with(term))
}

/// Normalised edit-distance similarity in `[0, 1]`; two empty strings are
/// identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_camel_case_and_paths() {
        assert_eq!(
            split_identifier("dataBySalesConnectors.grossSales"),
            vec!["data", "by", "sales", "connectors", "gross", "sales"]
        );
        assert_eq!(split_identifier("net_income"), vec!["net", "income"]);
        assert_eq!(split_identifier("AOV"), vec!["aov"]);
    }

    #[test]
    fn title_and_humanised_forms() {
        assert_eq!(humanise("cashDetails"), "cash details");
        assert_eq!(title_case("grossSales"), "Gross Sales");
    }

    #[test]
    fn term_matching_respects_word_starts() {
        assert!(contains_term("show revenue trends", "trend"));
        assert!(!contains_term("separate", "rate"));
        assert!(contains_term("month over month growth", "month over month"));
    }

    #[test]
    fn similarity_is_total() {
        assert!((similarity("", "") - 1.0).abs() < f64::EPSILON);
        assert!(similarity("revenue", "revenu") > 0.8);
        assert!(similarity("cash", "") < f64::EPSILON);
    }

    #[test]
    fn content_tokens_drop_stop_words() {
        assert_eq!(
            content_tokens("Compare sales by region", 2),
            vec!["compare", "sales", "region"]
        );
    }
}
