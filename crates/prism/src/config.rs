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

//! Every threshold and weight used by the reasoning engine, grouped by the
//! component that reads it. Values can be overridden from YAML.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    pub classifier: ClassifierConfig,
    pub quality: QualityConfig,
    pub suggestion: SuggestionConfig,
    pub intent: IntentConfig,
    pub relevance: RelevanceConfig,
    pub ranker: RankerConfig,
    pub orchestrator: OrchestratorConfig,
    pub narrative: NarrativeThresholds,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Path length bound for traversal, counted in key segments.
    pub max_depth: usize,
    pub dynamic_key_min_length: usize,
    pub max_sample_values: usize,
}
impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            dynamic_key_min_length: 20,
            max_sample_values: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub min_outlier_samples: usize,
    pub iqr_multiplier: f64,
    pub min_samples: usize,
    /// Null ratio above which the dataset is no longer consistent.
    pub max_null_ratio: f64,
    pub high_null_ratio: f64,
    pub gap_threshold_days: i64,
}
impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_outlier_samples: 4,
            iqr_multiplier: 1.5,
            min_samples: 3,
            max_null_ratio: 0.3,
            high_null_ratio: 0.5,
            gap_threshold_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionWeights {
    pub intent_alignment: f64,
    pub data_compatibility: f64,
    pub actionability: f64,
    pub visual_clarity: f64,
}
impl Default for SuggestionWeights {
    fn default() -> Self {
        Self {
            intent_alignment: 0.4,
            data_compatibility: 0.3,
            actionability: 0.2,
            visual_clarity: 0.1,
        }
    }
}
impl SuggestionWeights {
    fn total(&self) -> f64 {
        self.intent_alignment + self.data_compatibility + self.actionability + self.visual_clarity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceBands {
    pub excellent_min: f64,
    pub good_min: f64,
    pub acceptable_min: f64,
    pub poor_min: f64,
}
impl Default for ConfidenceBands {
    fn default() -> Self {
        Self {
            excellent_min: 0.85,
            good_min: 0.70,
            acceptable_min: 0.55,
            poor_min: 0.35,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinationPenalties {
    pub crowded_metrics: usize,
    pub crowded_penalty: f64,
    pub overcrowded_metrics: usize,
    pub overcrowded_penalty: f64,
    pub max_value_kinds: usize,
    pub heterogeneity_penalty: f64,
}
impl Default for CombinationPenalties {
    fn default() -> Self {
        Self {
            crowded_metrics: 4,
            crowded_penalty: 0.2,
            overcrowded_metrics: 6,
            overcrowded_penalty: 0.3,
            max_value_kinds: 2,
            heterogeneity_penalty: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityPenalties {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}
impl Default for SeverityPenalties {
    fn default() -> Self {
        Self {
            high: 0.2,
            medium: 0.1,
            low: 0.05,
        }
    }
}

/// Per-chart adjustments applied on top of the base fit scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitAdjustments {
    pub line_time_bonus: f64,
    pub line_no_time_penalty: f64,
    pub line_visual_shift: f64,
    pub bar_grouped_bonus: f64,
    pub bar_array_bonus: f64,
    pub bar_scalar_bonus: f64,
    pub bar_time_only_bonus: f64,
    pub bar_visual_shift: f64,
    pub bar_scalar_visual_bonus: f64,
    pub stacked_fit_bonus: f64,
    pub stacked_overflow_penalty: f64,
    pub stacked_no_group_penalty: f64,
    pub stacked_visual_bonus: f64,
    pub stacked_visual_penalty: f64,
    pub stacked_visual_readable_groups: usize,
    pub heatmap_fit_bonus: f64,
    pub heatmap_missing_dimension_penalty: f64,
    pub heatmap_few_categories_penalty: f64,
    pub heatmap_visual_bonus: f64,
    pub heatmap_visual_penalty: f64,
    pub waterfall_change_bonus: f64,
    pub waterfall_no_change_penalty: f64,
    pub waterfall_currency_bonus: f64,
    pub waterfall_visual_bonus: f64,
    pub waterfall_visual_penalty: f64,
}
impl Default for FitAdjustments {
    fn default() -> Self {
        Self {
            line_time_bonus: 0.4,
            line_no_time_penalty: 0.3,
            line_visual_shift: 0.2,
            bar_grouped_bonus: 0.3,
            bar_array_bonus: 0.2,
            bar_scalar_bonus: 0.1,
            bar_time_only_bonus: 0.1,
            bar_visual_shift: 0.2,
            bar_scalar_visual_bonus: 0.1,
            stacked_fit_bonus: 0.35,
            stacked_overflow_penalty: 0.3,
            stacked_no_group_penalty: 0.3,
            stacked_visual_bonus: 0.15,
            stacked_visual_penalty: 0.25,
            stacked_visual_readable_groups: 6,
            heatmap_fit_bonus: 0.35,
            heatmap_missing_dimension_penalty: 0.3,
            heatmap_few_categories_penalty: 0.15,
            heatmap_visual_bonus: 0.1,
            heatmap_visual_penalty: 0.2,
            waterfall_change_bonus: 0.4,
            waterfall_no_change_penalty: 0.2,
            waterfall_currency_bonus: 0.05,
            waterfall_visual_bonus: 0.15,
            waterfall_visual_penalty: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionabilityConfig {
    pub base: f64,
    pub currency_bonus: f64,
    pub percentage_bonus: f64,
    pub performance_name_bonus: f64,
    pub performance_names: Vec<String>,
}
impl Default for ActionabilityConfig {
    fn default() -> Self {
        Self {
            base: 0.5,
            currency_bonus: 0.3,
            percentage_bonus: 0.1,
            performance_name_bonus: 0.15,
            performance_names: ["revenue", "sales", "profit", "income", "margin", "growth", "conversion"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    pub base_data_compatibility: f64,
    pub base_visual_effectiveness: f64,
    pub stacked_min_groups: usize,
    pub stacked_max_groups: usize,
    pub stacked_penalty_above: usize,
    pub heatmap_min_categories: usize,
    pub bar_readable_groups: usize,
    pub bar_crowded_groups: usize,
    pub weights: SuggestionWeights,
    pub fallback_data_weight: f64,
    pub fallback_visual_weight: f64,
    pub floor_with_intent: f64,
    pub floor_without_intent: f64,
    pub max_candidates: usize,
    pub combination: CombinationPenalties,
    pub bands: ConfidenceBands,
    /// Data-compatibility deductions by per-metric quality severity.
    pub quality_penalties: SeverityPenalties,
    pub fit: FitAdjustments,
    pub actionability: ActionabilityConfig,
}
impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            base_data_compatibility: 0.5,
            base_visual_effectiveness: 0.6,
            stacked_min_groups: 2,
            stacked_max_groups: 8,
            stacked_penalty_above: 10,
            heatmap_min_categories: 3,
            bar_readable_groups: 12,
            bar_crowded_groups: 20,
            weights: SuggestionWeights::default(),
            fallback_data_weight: 0.7,
            fallback_visual_weight: 0.3,
            floor_with_intent: 0.35,
            floor_without_intent: 0.3,
            max_candidates: 5,
            combination: CombinationPenalties::default(),
            bands: ConfidenceBands::default(),
            quality_penalties: SeverityPenalties::default(),
            fit: FitAdjustments::default(),
            actionability: ActionabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentConfig {
    pub keyword_weight: f64,
    pub signal_weight: f64,
    pub exact_phrase_bonus: f64,
    pub confidence_divisor: f64,
    pub secondary_min_confidence: f64,
    pub max_secondary: usize,
    pub negation_temporal_factor: f64,
    pub negation_comparison_factor: f64,
    pub negation_overview_bias: f64,
    pub timeframe_bonus: f64,
    pub multiple_timeframe_bonus: f64,
    pub periodicity_bonus: f64,
    pub period_comparison_bonus: f64,
    pub fallback_confidence: f64,
    pub temporal_signal_boost: f64,
    pub multiple_timeframe_boost: f64,
    pub period_comparison_boost: f64,
    pub comparison_signal_boost: f64,
    pub metric_mention_boost: f64,
    pub competition_penalty: f64,
    pub competition_min_count: usize,
    pub competition_max_primary: f64,
}
impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            keyword_weight: 0.8,
            signal_weight: 0.6,
            exact_phrase_bonus: 0.3,
            confidence_divisor: 3.0,
            secondary_min_confidence: 0.3,
            max_secondary: 2,
            negation_temporal_factor: 0.3,
            negation_comparison_factor: 0.5,
            negation_overview_bias: 0.6,
            timeframe_bonus: 0.5,
            multiple_timeframe_bonus: 0.2,
            periodicity_bonus: 0.3,
            period_comparison_bonus: 0.4,
            fallback_confidence: 0.3,
            temporal_signal_boost: 0.05,
            multiple_timeframe_boost: 0.05,
            period_comparison_boost: 0.05,
            comparison_signal_boost: 0.05,
            metric_mention_boost: 0.05,
            competition_penalty: 0.1,
            competition_min_count: 3,
            competition_max_primary: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    pub exact_path_match: f64,
    pub token_exact: f64,
    pub token_partial: f64,
    pub token_fuzzy: f64,
    pub fuzzy_threshold: f64,
    pub min_token_length: usize,
    pub category_literal: f64,
    pub category_associated: f64,
    pub kpi_boost: f64,
    pub kpi_executive_boost: f64,
    pub secondary_intent_factor: f64,
    pub diversity_new_kind: f64,
    pub diversity_new_value_kind: f64,
    pub diversity_accept_threshold: f64,
    pub score_gap_tolerance: f64,
    pub confidence_divisor: f64,
    pub confidence_min: f64,
    pub confidence_max: f64,
    pub profile_confidence_weight: f64,
    pub quality_penalties: SeverityPenalties,
    pub description_bonus: f64,
    pub business_name_bonus: f64,
    pub samples_bonus: f64,
    pub default_max_metrics: usize,
    pub shape_boosts: ShapeBoosts,
}
impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            exact_path_match: 2.5,
            token_exact: 1.8,
            token_partial: 1.2,
            token_fuzzy: 0.8,
            fuzzy_threshold: 0.8,
            min_token_length: 2,
            category_literal: 1.5,
            category_associated: 1.0,
            kpi_boost: 1.3,
            kpi_executive_boost: 0.5,
            secondary_intent_factor: 0.5,
            diversity_new_kind: 0.2,
            diversity_new_value_kind: 0.1,
            diversity_accept_threshold: 0.15,
            score_gap_tolerance: 1.0,
            confidence_divisor: 5.0,
            confidence_min: 0.1,
            confidence_max: 0.95,
            profile_confidence_weight: 0.1,
            quality_penalties: SeverityPenalties {
                high: 0.3,
                medium: 0.15,
                low: 0.05,
            },
            description_bonus: 0.02,
            business_name_bonus: 0.02,
            samples_bonus: 0.01,
            default_max_metrics: 5,
            shape_boosts: ShapeBoosts::default(),
        }
    }
}

/// Score added when a metric's shape suits the prompt's intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeBoosts {
    pub time_dimension: f64,
    pub grouping_dimension: f64,
    pub scalar_total: f64,
    pub correlated_series: f64,
    pub anomaly_history: f64,
    pub drill_down_detail: f64,
}
impl Default for ShapeBoosts {
    fn default() -> Self {
        Self {
            time_dimension: 1.0,
            grouping_dimension: 1.0,
            scalar_total: 1.0,
            correlated_series: 0.5,
            anomaly_history: 0.8,
            drill_down_detail: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerWeights {
    pub data_compatibility: f64,
    pub intent_alignment: f64,
    pub visual_effectiveness: f64,
    pub usability: f64,
}
impl Default for RankerWeights {
    fn default() -> Self {
        Self {
            data_compatibility: 0.30,
            intent_alignment: 0.35,
            visual_effectiveness: 0.20,
            usability: 0.15,
        }
    }
}
impl RankerWeights {
    fn total(&self) -> f64 {
        self.data_compatibility + self.intent_alignment + self.visual_effectiveness + self.usability
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsabilityPriors {
    pub line: f64,
    pub bar: f64,
    pub stacked_bar: f64,
    pub heatmap: f64,
    pub waterfall: f64,
}
impl Default for UsabilityPriors {
    fn default() -> Self {
        Self {
            line: 0.85,
            bar: 0.9,
            stacked_bar: 0.7,
            heatmap: 0.5,
            waterfall: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerConfig {
    pub weights: RankerWeights,
    pub usability: UsabilityPriors,
    pub confidence_lift: f64,
    pub empty_metrics_discount: f64,
    pub empty_data_compatibility: f64,
    pub neutral_intent_alignment: f64,
    /// Share of the best single-metric fit in the aggregate; the rest is the mean.
    pub aggregate_max_weight: f64,
    pub crowded_categories: usize,
    pub crowded_usability_penalty: f64,
    pub explicit_chart_bonus: f64,
    pub signal_nudge: f64,
    pub secondary_weight: f64,
    pub default_top_k: usize,
    /// Minimum single-metric fit for a ranked chart to carry the selected metric.
    pub min_metric_fit: f64,
}
impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            weights: RankerWeights::default(),
            usability: UsabilityPriors::default(),
            confidence_lift: 0.1,
            empty_metrics_discount: 0.8,
            empty_data_compatibility: 0.3,
            neutral_intent_alignment: 0.5,
            aggregate_max_weight: 0.6,
            crowded_categories: 12,
            crowded_usability_penalty: 0.15,
            explicit_chart_bonus: 0.15,
            signal_nudge: 0.05,
            secondary_weight: 0.5,
            default_top_k: 3,
            min_metric_fit: 0.45,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub enabled: bool,
    /// Share of the token-overlap cross-check in the final step's confidence.
    pub overlap_weight: f64,
}
impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            overlap_weight: 0.5,
        }
    }
}

/// Prompt words that pull a family of related metrics onto a dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedMetricGroup {
    pub name: String,
    pub triggers: Vec<String>,
    /// Substrings matched against the lowercased metric path.
    pub path_terms: Vec<String>,
    pub limit: usize,
}
impl RelatedMetricGroup {
    fn new(name: &str, triggers: &[&str], path_terms: &[&str], limit: usize) -> Self {
        Self {
            name: name.to_string(),
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
            path_terms: path_terms.iter().map(|t| t.to_string()).collect(),
            limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub default_max_charts: usize,
    pub related_groups: Vec<RelatedMetricGroup>,
    pub layout_columns: usize,
    pub max_insights: usize,
    /// Chart count above which the dashboard is called comprehensive.
    pub comprehensive_chart_count: usize,
    pub varied_chart_kinds: usize,
}
impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_max_charts: 5,
            related_groups: vec![
                RelatedMetricGroup::new(
                    "business",
                    &["performance", "overview", "dashboard"],
                    &["sales", "orders", "revenue", "profit"],
                    3,
                ),
                RelatedMetricGroup::new(
                    "sales",
                    &["sales", "revenue"],
                    &["gross", "net", "connector", "channel"],
                    2,
                ),
                RelatedMetricGroup::new(
                    "financial",
                    &["financial", "cash"],
                    &["cash", "profit", "margin"],
                    2,
                ),
            ],
            layout_columns: 2,
            max_insights: 3,
            comprehensive_chart_count: 3,
            varied_chart_kinds: 2,
        }
    }
}

/// Shared bands for strength/weakness narratives so every component words
/// the same score the same way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeThresholds {
    pub strong: f64,
    pub moderate: f64,
}
impl Default for NarrativeThresholds {
    fn default() -> Self {
        Self {
            strong: 0.8,
            moderate: 0.6,
        }
    }
}

impl ReasoningConfig {
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: ReasoningConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::ConfigFileError {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_yaml_str(&content)
    }
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
    pub fn validate(&self) -> ConfigResult<()> {
        if self.classifier.max_depth == 0 {
            return Err(out_of_range("classifier.max_depth", self.classifier.max_depth));
        }
        if self.quality.min_outlier_samples < 4 {
            return Err(out_of_range(
                "quality.min_outlier_samples",
                self.quality.min_outlier_samples,
            ));
        }
        for (field, value) in [
            ("quality.max_null_ratio", self.quality.max_null_ratio),
            ("quality.high_null_ratio", self.quality.high_null_ratio),
            ("suggestion.floor_with_intent", self.suggestion.floor_with_intent),
            ("suggestion.floor_without_intent", self.suggestion.floor_without_intent),
            ("relevance.fuzzy_threshold", self.relevance.fuzzy_threshold),
            ("ranker.min_metric_fit", self.ranker.min_metric_fit),
            ("orchestrator.overlap_weight", self.orchestrator.overlap_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(out_of_range(field, value));
            }
        }
        if self.suggestion.stacked_min_groups > self.suggestion.stacked_max_groups {
            return Err(ConfigError::ConflictingOptions {
                details: "suggestion.stacked_min_groups exceeds stacked_max_groups".to_string(),
            });
        }
        if (self.suggestion.weights.total() - 1.0).abs() > 0.01 {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "suggestion weights must sum to 1.0, got {:.2}",
                    self.suggestion.weights.total()
                ),
            });
        }
        if (self.ranker.weights.total() - 1.0).abs() > 0.01 {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "ranker weights must sum to 1.0, got {:.2}",
                    self.ranker.weights.total()
                ),
            });
        }
        if self.intent.confidence_divisor <= 0.0 || self.relevance.confidence_divisor <= 0.0 {
            return Err(ConfigError::ValidationFailed {
                reason: "confidence divisors must be positive".to_string(),
            });
        }
        if self.dashboard.layout_columns == 0 {
            return Err(out_of_range("dashboard.layout_columns", self.dashboard.layout_columns));
        }
        if self.narrative.moderate > self.narrative.strong {
            return Err(ConfigError::ConflictingOptions {
                details: "narrative.moderate exceeds narrative.strong".to_string(),
            });
        }
        Ok(())
    }
    pub fn for_exploration() -> Self {
        let mut config = Self::default();
        config.suggestion.floor_with_intent = 0.3;
        config.suggestion.floor_without_intent = 0.25;
        config.relevance.default_max_metrics = 8;
        config.ranker.default_top_k = 5;
        config
    }
    pub fn for_presentation() -> Self {
        let mut config = Self::default();
        config.suggestion.floor_with_intent = 0.55;
        config.suggestion.floor_without_intent = 0.5;
        config.relevance.default_max_metrics = 3;
        config.ranker.default_top_k = 2;
        config
    }
}

fn out_of_range(field: &str, value: impl std::fmt::Display) -> ConfigError {
    ConfigError::OutOfRange {
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        assert!(ReasoningConfig::default().validate().is_ok());
        assert!(ReasoningConfig::for_exploration().validate().is_ok());
        assert!(ReasoningConfig::for_presentation().validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = ReasoningConfig::from_yaml_str(
            "classifier:\n  max_depth: 5\nsuggestion:\n  stacked_max_groups: 15\n",
        )
        .unwrap();
        assert_eq!(config.classifier.max_depth, 5);
        assert_eq!(config.classifier.dynamic_key_min_length, 20);
        assert_eq!(config.suggestion.stacked_max_groups, 15);
        assert!((config.suggestion.weights.intent_alignment - 0.4).abs() < 1e-9);
    }

    #[test]
    fn partial_penalty_override_keeps_remaining_levels() {
        let config = ReasoningConfig::from_yaml_str(
            "suggestion:\n  quality_penalties:\n    high: 0.4\n",
        )
        .unwrap();
        assert!((config.suggestion.quality_penalties.high - 0.4).abs() < 1e-9);
        assert!((config.suggestion.quality_penalties.medium - 0.1).abs() < 1e-9);
        assert!((config.suggestion.quality_penalties.low - 0.05).abs() < 1e-9);
    }

    #[test]
    fn scoring_adjustments_are_overridable() {
        let config = ReasoningConfig::from_yaml_str(
            "suggestion:\n  fit:\n    line_time_bonus: 0.1\n  actionability:\n    base: 0.3\nrelevance:\n  shape_boosts:\n    time_dimension: 2.0\n",
        )
        .unwrap();
        assert!((config.suggestion.fit.line_time_bonus - 0.1).abs() < 1e-9);
        assert!((config.suggestion.fit.bar_grouped_bonus - 0.3).abs() < 1e-9);
        assert!((config.suggestion.actionability.base - 0.3).abs() < 1e-9);
        assert_eq!(config.suggestion.actionability.performance_names.len(), 7);
        assert!((config.relevance.shape_boosts.time_dimension - 2.0).abs() < 1e-9);
        assert!((config.relevance.shape_boosts.correlated_series - 0.5).abs() < 1e-9);
    }

    #[test]
    fn unbalanced_weights_are_rejected() {
        let err = ReasoningConfig::from_yaml_str("ranker:\n  weights:\n    usability: 0.9\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationFailed { .. }));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "orchestrator:\n  enabled: false").unwrap();
        let config = ReasoningConfig::from_yaml_file(file.path()).unwrap();
        assert!(!config.orchestrator.enabled);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ReasoningConfig::from_yaml_file("/nonexistent/prism.yml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/prism.yml"));
    }

    #[test]
    fn yaml_round_trip_preserves_values() {
        let config = ReasoningConfig::for_presentation();
        let parsed = ReasoningConfig::from_yaml_str(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed.relevance.default_max_metrics, 3);
    }
}
