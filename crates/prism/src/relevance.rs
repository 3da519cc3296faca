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

//! Prompt-to-metric relevance with a diversity-aware top-K cut.

use crate::chart::fit::severity_penalty;
use crate::config::{RelevanceConfig, ShapeBoosts};
use crate::descriptor::{MetricDescriptor, MetricKind};
use crate::intent::{IntentKind, IntentProfile};
use crate::quality::DataQualityReport;
use crate::text;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, instrument};

struct SemanticCategory {
    name: &'static str,
    literal: &'static str,
    associated: &'static [&'static str],
}

const CATEGORIES: &[SemanticCategory] = &[
    SemanticCategory {
        name: "revenue",
        literal: "revenue",
        associated: &["sales", "income", "top line", "turnover"],
    },
    SemanticCategory {
        name: "profitability",
        literal: "profit",
        associated: &["margin", "earnings", "net income", "bottom line"],
    },
    SemanticCategory {
        name: "cash",
        literal: "cash",
        associated: &["balance", "liquidity", "bank", "runway"],
    },
    SemanticCategory {
        name: "expenses",
        literal: "expense",
        associated: &["cost", "spend", "burn", "opex"],
    },
    SemanticCategory {
        name: "customers",
        literal: "customer",
        associated: &["users", "clients", "churn", "retention", "ltv", "cac"],
    },
    SemanticCategory {
        name: "orders",
        literal: "order",
        associated: &["transactions", "aov", "purchases", "basket"],
    },
];

const KPI_NAMES: &[&str] = &[
    "revenue", "sales", "profit", "income", "margin", "cash", "orders", "customers", "aov", "cac",
    "ltv", "ebitda",
];
const EXECUTIVE_TERMS: &[&str] = &["executive", "dashboard", "kpi"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRelevance {
    pub path: String,
    pub kind: MetricKind,
    pub score: f64,
    pub confidence: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MetricRelevanceScorer {
    config: RelevanceConfig,
}
impl MetricRelevanceScorer {
    pub fn new(config: RelevanceConfig) -> Self {
        Self { config }
    }

    /// Ranked, diversified metrics for the prompt. Metrics the prompt gives
    /// no lexical or semantic reason for are left out; an empty result means
    /// nothing matched.
    #[instrument(level = "debug", skip_all, fields(metric_count = descriptors.len()))]
    pub fn rank(
        &self,
        prompt: &str,
        descriptors: &[MetricDescriptor],
        profile: &IntentProfile,
        quality: &DataQualityReport,
        max_metrics: Option<usize>,
    ) -> Vec<MetricRelevance> {
        let lowered = prompt.to_lowercase();
        let tokens = text::content_tokens(&lowered, self.config.min_token_length);
        let mut scored = descriptors
            .iter()
            .filter_map(|metric| {
                self.score_metric(&lowered, &tokens, metric, profile)
                    .map(|(score, reasons)| (metric, score, reasons))
            })
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.path.cmp(&b.0.path)));

        let limit = max_metrics.unwrap_or(self.config.default_max_metrics).max(1);
        let mut selected: Vec<(&MetricDescriptor, f64, Vec<String>)> = Vec::new();
        for (metric, score, mut reasons) in scored {
            if selected.len() >= limit {
                break;
            }
            if let Some((_, top_score, _)) = selected.first() {
                let mut bonus = 0.0;
                if !selected.iter().any(|(m, _, _)| m.kind == metric.kind) {
                    bonus += self.config.diversity_new_kind;
                }
                if !selected.iter().any(|(m, _, _)| m.value_kind == metric.value_kind) {
                    bonus += self.config.diversity_new_value_kind;
                }
                let close = top_score - score < self.config.score_gap_tolerance;
                if bonus <= self.config.diversity_accept_threshold && !close {
                    continue;
                }
                if bonus > 0.0 {
                    reasons.push(format!("diversity bonus {bonus:.2}"));
                }
            }
            selected.push((metric, score, reasons));
        }

        let ranked = selected
            .into_iter()
            .map(|(metric, score, reasons)| MetricRelevance {
                confidence: self.confidence(metric, score, profile, quality),
                path: metric.path.clone(),
                kind: metric.kind,
                score,
                reasons,
            })
            .collect::<Vec<_>>();
        debug!(
            selected = ranked.len(),
            top = ranked.first().map(|r| r.path.as_str()).unwrap_or("none"),
            "Ranked metrics by relevance"
        );
        ranked
    }

    /// `None` unless at least one prompt-derived rule fired.
    fn score_metric(
        &self,
        prompt: &str,
        tokens: &[String],
        metric: &MetricDescriptor,
        profile: &IntentProfile,
    ) -> Option<(f64, Vec<String>)> {
        let mut score = 0.0;
        let mut reasons = Vec::new();
        let path = metric.path.to_lowercase();
        let leaf = metric.leaf_name().to_lowercase();
        let humanised = text::humanise(metric.leaf_name());

        let named = [&path, &leaf, &humanised]
            .into_iter()
            .any(|name| !name.is_empty() && prompt.contains(name.as_str()));
        if named {
            score += self.config.exact_path_match;
            reasons.push(format!("prompt names '{}'", metric.leaf_name()));
        }

        let metric_tokens = metric.name_tokens().into_iter().collect::<HashSet<_>>();
        for token in tokens {
            let best = metric_tokens
                .iter()
                .filter_map(|candidate| self.token_match(token, candidate))
                .max_by(|a, b| a.0.total_cmp(&b.0));
            if let Some((points, how)) = best {
                score += points;
                reasons.push(format!("{how} token match on '{token}'"));
            }
        }

        let name_words = text::humanise(&metric.path);
        for category in CATEGORIES {
            let metric_in_category = name_words.contains(category.literal)
                || category.associated.iter().any(|w| name_words.contains(w));
            if !metric_in_category {
                continue;
            }
            if text::contains_term(prompt, category.literal) {
                score += self.config.category_literal;
                reasons.push(format!("{} category named in prompt", category.name));
            } else if category.associated.iter().any(|w| text::contains_term(prompt, w)) {
                score += self.config.category_associated;
                reasons.push(format!("{} category implied by prompt", category.name));
            }
        }

        if reasons.is_empty() {
            return None;
        }

        if KPI_NAMES.iter().any(|kpi| metric_tokens.contains(*kpi)) {
            score += self.config.kpi_boost;
            reasons.push("key performance indicator".to_string());
            if EXECUTIVE_TERMS.iter().any(|t| text::contains_term(prompt, t)) {
                score += self.config.kpi_executive_boost;
                reasons.push("executive context".to_string());
            }
        }

        let primary = shape_boost(profile.primary.kind, metric, &self.config.shape_boosts);
        if primary > 0.0 {
            score += primary;
            reasons.push(format!("shape suits {}", profile.primary.kind));
        }
        for secondary in &profile.secondary {
            let boost = shape_boost(secondary.kind, metric, &self.config.shape_boosts)
                * self.config.secondary_intent_factor;
            if boost > 0.0 {
                score += boost;
                reasons.push(format!("shape suits secondary {}", secondary.kind));
            }
        }
        Some((score, reasons))
    }

    fn token_match(&self, token: &str, candidate: &str) -> Option<(f64, &'static str)> {
        if token == candidate {
            return Some((self.config.token_exact, "exact"));
        }
        let long_enough = token.len() >= 3 && candidate.len() >= 3;
        if long_enough && (token.contains(candidate) || candidate.contains(token)) {
            return Some((self.config.token_partial, "partial"));
        }
        if text::similarity(token, candidate) > self.config.fuzzy_threshold {
            return Some((self.config.token_fuzzy, "fuzzy"));
        }
        None
    }

    fn confidence(&self, metric: &MetricDescriptor, score: f64, profile: &IntentProfile, quality: &DataQualityReport) -> f64 {
        let mut confidence = (score / self.config.confidence_divisor)
            .clamp(self.config.confidence_min, self.config.confidence_max);
        confidence += self.config.profile_confidence_weight * profile.overall_confidence;
        confidence -= severity_penalty(quality.severity_of(&metric.path), &self.config.quality_penalties);
        if !metric.description.is_empty() {
            confidence += self.config.description_bonus;
        }
        if !metric.business_name.is_empty() {
            confidence += self.config.business_name_bonus;
        }
        if !metric.sample_values.is_empty() {
            confidence += self.config.samples_bonus;
        }
        confidence.clamp(0.0, 1.0)
    }
}

fn shape_boost(intent: IntentKind, metric: &MetricDescriptor, boosts: &ShapeBoosts) -> f64 {
    match intent {
        IntentKind::TemporalTrend | IntentKind::Forecasting if metric.has_time_dimension => {
            boosts.time_dimension
        }
        IntentKind::CategoricalComparison | IntentKind::CompositionalBreakdown
            if metric.has_grouping_dimension =>
        {
            boosts.grouping_dimension
        }
        IntentKind::PerformanceOverview if metric.kind == MetricKind::Scalar => {
            boosts.scalar_total
        }
        IntentKind::CorrelationAnalysis if metric.kind == MetricKind::TimeSeries => {
            boosts.correlated_series
        }
        IntentKind::AnomalyDetection if metric.has_time_dimension => boosts.anomaly_history,
        IntentKind::DrillDown if metric.is_container() || metric.has_grouping_dimension => {
            boosts.drill_down_detail
        }
        _ => 0.0,
    }
}
