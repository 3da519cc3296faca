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

use super::core::{
    AggregationLevel, ComparisonSignal, ComparisonSignalKind, IntentKind, IntentProfile,
    IntentScore, TemporalSignal, TemporalSignalKind,
};
use super::normalise::{normalise, NormalisedPrompt};
use crate::config::IntentConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

struct IntentPattern {
    kind: IntentKind,
    keywords: &'static [&'static str],
    signals: &'static [&'static str],
    exact_phrases: &'static [&'static str],
    weight: f64,
}

const PATTERNS: [IntentPattern; 8] = [
    IntentPattern {
        kind: IntentKind::TemporalTrend,
        keywords: &[
            "trend", "over time", "monthly", "weekly", "daily", "quarterly", "yearly", "annual",
            "growth", "history", "historical", "timeline", "progression", "evolution",
            "trajectory",
        ],
        signals: &["month", "year", "quarter", "week", "period", "since", "seasonal", "time"],
        exact_phrases: &["over time", "month over month", "year over year", "trend of", "trend in"],
        weight: 1.0,
    },
    IntentPattern {
        kind: IntentKind::CategoricalComparison,
        keywords: &[
            "compare", "comparison", "versus", "vs", "against", "rank", "top", "bottom", "best",
            "worst", "across", "between", "difference",
        ],
        signals: &[
            "by region", "by channel", "by product", "by category", "by segment", "by account",
            "each", "per region", "per channel",
        ],
        exact_phrases: &["side by side", "head to head", "compare sales", "how do they compare"],
        weight: 1.0,
    },
    IntentPattern {
        kind: IntentKind::CompositionalBreakdown,
        keywords: &[
            "breakdown", "composition", "share", "proportion", "mix", "split", "makeup",
            "contribution", "part of",
        ],
        signals: &["made up of", "consist", "component", "segment", "portion"],
        exact_phrases: &["breakdown of", "share of", "as a percentage", "percentage of"],
        weight: 0.9,
    },
    IntentPattern {
        kind: IntentKind::PerformanceOverview,
        keywords: &[
            "total", "overview", "dashboard", "kpi", "performance", "summary", "overall",
            "snapshot", "scorecard", "status", "health",
        ],
        signals: &["key metrics", "at a glance", "headline", "how are we doing", "big picture"],
        exact_phrases: &["key performance", "executive summary"],
        weight: 0.9,
    },
    IntentPattern {
        kind: IntentKind::CorrelationAnalysis,
        keywords: &[
            "correlation", "correlate", "relationship", "impact of", "affect", "depend",
            "association",
        ],
        signals: &["related to", "driven by", "influence", "linked"],
        exact_phrases: &["correlation between", "relationship between"],
        weight: 0.85,
    },
    IntentPattern {
        kind: IntentKind::AnomalyDetection,
        keywords: &[
            "anomaly", "anomalies", "outlier", "unusual", "spike", "abnormal", "unexpected",
            "deviation",
        ],
        signals: &["sudden", "strange", "irregular", "weird", "drop"],
        exact_phrases: &["what went wrong", "out of the ordinary"],
        weight: 0.85,
    },
    IntentPattern {
        kind: IntentKind::Forecasting,
        keywords: &[
            "forecast", "predict", "projection", "future", "outlook", "estimate", "expected",
        ],
        signals: &["will be", "going forward", "upcoming", "run rate", "next"],
        exact_phrases: &["next quarter", "next year", "next month"],
        weight: 0.85,
    },
    IntentPattern {
        kind: IntentKind::DrillDown,
        keywords: &[
            "drill", "detail", "granular", "deep dive", "underlying", "specific", "individual",
        ],
        signals: &["each account", "per account", "line item", "transactions"],
        exact_phrases: &["drill down", "deep dive", "zoom in"],
        weight: 0.8,
    },
];

const PERIODICITY_TERMS: &[&str] = &[
    "monthly", "weekly", "daily", "quarterly", "annually", "yearly", "seasonal",
];
const PERIOD_COMPARISON_TERMS: &[&str] = &[
    "month over month", "year over year", "quarter over quarter", "mom", "yoy", "qoq",
    "vs last year", "versus last year", "compared to last",
];
const TREND_TERMS: &[&str] = &["trend", "over time", "trajectory", "progression"];
const SEASONALITY_TERMS: &[&str] = &["seasonal", "seasonality", "cyclical", "monthly pattern"];
const GROWTH_TERMS: &[&str] = &["growth", "grow", "increase", "decline", "cagr"];
const RANKING_TERMS: &[&str] = &["top", "bottom", "rank", "best", "worst", "highest", "lowest", "leading"];
const GENERAL_COMPARISON_TERMS: &[&str] = &["compare", "comparison", "difference", "between"];
const DETAILED_TERMS: &[&str] = &[
    "detail", "granular", "drill", "each", "individual", "line item", "breakdown",
];
const OVERVIEW_TERMS: &[&str] = &[
    "overview", "dashboard", "at a glance", "high level", "big picture", "snapshot", "executive",
];
const METRIC_VOCABULARY: &[&str] = &[
    "gross sales", "net sales", "gross profit", "net income", "cash flow", "burn rate",
    "conversion rate", "revenue", "sales", "profit", "income", "margin", "expenses", "cost",
    "cash", "balance", "orders", "customers", "aov", "cac", "ltv", "churn", "ebitda", "arr",
    "mrr", "refunds", "discounts", "inventory",
];
const METRIC_EXPANSIONS: &[(&str, &[&str])] = &[
    ("unit economics", &["aov", "cac", "ltv"]),
    ("profitability", &["gross profit", "net income", "margin"]),
    ("cash position", &["cash", "balance"]),
    ("top line", &["revenue"]),
    ("bottom line", &["net income"]),
    ("burn", &["burn rate", "cash"]),
];

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());
static QUARTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bq[1-4]\b").unwrap());
static MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:january|february|march|april|may|june|july|august|september|october|november|december)\b",
    )
    .unwrap()
});
static ENTITY_PAIR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<a>[a-z0-9]+(?: [a-z0-9]+)?)\s+(?:vs\.?|versus)\s+(?P<b>[a-z0-9]+(?: [a-z0-9]+)?)")
        .unwrap()
});

#[derive(Debug, Clone, Default)]
pub struct IntentAnalyser {
    config: IntentConfig,
}
impl IntentAnalyser {
    pub fn new(config: IntentConfig) -> Self {
        Self { config }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn analyse(&self, prompt: &str) -> IntentProfile {
        let prompt = normalise(prompt);
        let scores = self.score_intents(&prompt);
        let (primary, secondary, competitors) = self.select(&scores);
        let timeframes = extract_timeframes(&prompt);
        let temporal_signals = if prompt.negates_time() {
            Vec::new()
        } else {
            temporal_signals(&prompt)
        };
        let comparison_signals = if prompt.negates_comparison() {
            Vec::new()
        } else {
            comparison_signals(&prompt)
        };
        let explicit_metric_mentions = metric_mentions(&prompt);

        let mut implicit_requirements = Vec::new();
        for kind in std::iter::once(primary.kind).chain(secondary.iter().map(|s| s.kind)) {
            for requirement in kind.requirements() {
                if !implicit_requirements.iter().any(|r| r == requirement) {
                    implicit_requirements.push(requirement.to_string());
                }
            }
        }

        let mut overall = primary.confidence;
        if !temporal_signals.is_empty() {
            overall += self.config.temporal_signal_boost;
        }
        if timeframes.len() >= 2 {
            overall += self.config.multiple_timeframe_boost;
        }
        if temporal_signals
            .iter()
            .any(|s| s.kind == TemporalSignalKind::PeriodComparison)
        {
            overall += self.config.period_comparison_boost;
        }
        if !comparison_signals.is_empty() {
            overall += self.config.comparison_signal_boost;
        }
        if !explicit_metric_mentions.is_empty() {
            overall += self.config.metric_mention_boost;
        }
        if competitors >= self.config.competition_min_count
            && primary.confidence < self.config.competition_max_primary
        {
            overall -= self.config.competition_penalty;
        }

        let profile = IntentProfile {
            primary,
            secondary,
            temporal_signals,
            comparison_signals,
            aggregation_level: aggregation_level(&prompt),
            explicit_metric_mentions,
            implicit_requirements,
            timeframes,
            negated_phrases: prompt.negations.iter().map(|n| n.phrase.clone()).collect(),
            overall_confidence: overall.clamp(0.0, 1.0),
        };
        debug!(
            primary = %profile.primary.kind,
            confidence = profile.primary.confidence,
            secondary_count = profile.secondary.len(),
            "Analysed prompt intent"
        );
        profile
    }

    /// Raw scores for every intent kind, in declaration order.
    pub fn score_intents(&self, prompt: &NormalisedPrompt) -> Vec<(IntentKind, f64)> {
        PATTERNS
            .iter()
            .map(|pattern| {
                let keyword_hits = count_hits(prompt, pattern.keywords);
                let signal_hits = count_hits(prompt, pattern.signals);
                let phrase_hits = count_hits(prompt, pattern.exact_phrases);
                let mut score = (self.config.keyword_weight * keyword_hits
                    + self.config.signal_weight * signal_hits)
                    * pattern.weight
                    + self.config.exact_phrase_bonus * phrase_hits;
                match pattern.kind {
                    IntentKind::TemporalTrend => {
                        score += self.temporal_bonus(prompt);
                        if prompt.negates_time() {
                            score *= self.config.negation_temporal_factor;
                        }
                    }
                    IntentKind::CategoricalComparison if prompt.negates_comparison() => {
                        score *= self.config.negation_comparison_factor;
                    }
                    IntentKind::PerformanceOverview if prompt.negates_comparison() => {
                        score += self.config.negation_overview_bias;
                    }
                    _ => {}
                }
                (pattern.kind, score)
            })
            .collect()
    }

    fn temporal_bonus(&self, prompt: &NormalisedPrompt) -> f64 {
        let timeframes = extract_timeframes(prompt);
        let mut bonus = 0.0;
        if !timeframes.is_empty() {
            bonus += self.config.timeframe_bonus;
        }
        if timeframes.len() >= 2 {
            bonus += self.config.multiple_timeframe_bonus;
        }
        if PERIODICITY_TERMS.iter().any(|t| prompt.mentions(t)) {
            bonus += self.config.periodicity_bonus;
        }
        if PERIOD_COMPARISON_TERMS.iter().any(|t| prompt.mentions(t)) {
            bonus += self.config.period_comparison_bonus;
        }
        bonus
    }

    /// Primary, the strongest secondaries and the number of non-primary
    /// intents above the secondary threshold.
    fn select(&self, scores: &[(IntentKind, f64)]) -> (IntentScore, Vec<IntentScore>, usize) {
        let mut ranked = scores
            .iter()
            .map(|&(kind, score)| IntentScore {
                kind,
                confidence: (score / self.config.confidence_divisor).min(1.0),
            })
            .collect::<Vec<_>>();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let Some(top) = ranked.first().copied().filter(|s| s.confidence > 0.0) else {
            return (
                IntentScore {
                    kind: IntentKind::PerformanceOverview,
                    confidence: self.config.fallback_confidence,
                },
                Vec::new(),
                0,
            );
        };
        let competitive = ranked[1..]
            .iter()
            .filter(|s| s.confidence > self.config.secondary_min_confidence)
            .copied()
            .collect::<Vec<_>>();
        let count = competitive.len();
        let secondary = competitive
            .into_iter()
            .take(self.config.max_secondary)
            .collect();
        (top, secondary, count)
    }
}

fn count_hits(prompt: &NormalisedPrompt, terms: &[&str]) -> f64 {
    terms.iter().filter(|term| prompt.mentions(term)).count() as f64
}

fn extract_timeframes(prompt: &NormalisedPrompt) -> Vec<String> {
    let mut found = Vec::new();
    for re in [&*YEAR_RE, &*QUARTER_RE, &*MONTH_RE] {
        for m in re.find_iter(&prompt.normalised) {
            if !found.iter().any(|f| f == m.as_str()) {
                found.push(m.as_str().to_string());
            }
        }
    }
    if prompt.normalised.contains("historical period") {
        found.push("historical period".to_string());
    }
    found
}

fn temporal_signals(prompt: &NormalisedPrompt) -> Vec<TemporalSignal> {
    [
        (TemporalSignalKind::Trend, 0.8, TREND_TERMS),
        (TemporalSignalKind::Seasonality, 0.7, SEASONALITY_TERMS),
        (TemporalSignalKind::PeriodComparison, 0.9, PERIOD_COMPARISON_TERMS),
        (TemporalSignalKind::GrowthAnalysis, 0.75, GROWTH_TERMS),
    ]
    .into_iter()
    .filter_map(|(kind, strength, terms)| {
        terms
            .iter()
            .find(|t| prompt.mentions(t))
            .map(|phrase| TemporalSignal {
                kind,
                strength,
                phrase: phrase.to_string(),
            })
    })
    .collect()
}

fn comparison_signals(prompt: &NormalisedPrompt) -> Vec<ComparisonSignal> {
    let mut signals = ENTITY_PAIR_RE
        .captures_iter(&prompt.raw)
        .map(|caps| ComparisonSignal {
            kind: ComparisonSignalKind::EntityPair,
            entities: vec![caps["a"].to_string(), caps["b"].to_string()],
            strength: 0.9,
        })
        .collect::<Vec<_>>();
    if RANKING_TERMS.iter().any(|t| prompt.mentions(t)) {
        signals.push(ComparisonSignal {
            kind: ComparisonSignalKind::Ranking,
            entities: Vec::new(),
            strength: 0.7,
        });
    }
    if GENERAL_COMPARISON_TERMS.iter().any(|t| prompt.mentions(t)) {
        signals.push(ComparisonSignal {
            kind: ComparisonSignalKind::General,
            entities: Vec::new(),
            strength: 0.6,
        });
    }
    signals
}

fn aggregation_level(prompt: &NormalisedPrompt) -> AggregationLevel {
    if DETAILED_TERMS.iter().any(|t| prompt.mentions(t)) {
        AggregationLevel::Detailed
    } else if OVERVIEW_TERMS.iter().any(|t| prompt.mentions(t)) {
        AggregationLevel::Overview
    } else {
        AggregationLevel::Summary
    }
}

fn metric_mentions(prompt: &NormalisedPrompt) -> Vec<String> {
    let mut mentions: Vec<String> = Vec::new();
    let mut push = |metric: &str| {
        if !mentions.iter().any(|m| m == metric) {
            mentions.push(metric.to_string());
        }
    };
    for metric in METRIC_VOCABULARY {
        if prompt.mentions(metric) {
            push(*metric);
        }
    }
    for (phrase, expansion) in METRIC_EXPANSIONS {
        if prompt.mentions(phrase) {
            expansion.iter().for_each(|metric| push(*metric));
        }
    }
    mentions
}
