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

use super::fit::structural_fit;
use super::{describe_factor, intent_affinity, ChartCandidate, ChartEvidence, ChartKind, ConfidenceLevel};
use crate::config::{ActionabilityConfig, NarrativeThresholds, SuggestionConfig};
use crate::descriptor::{MetricDescriptor, MetricKind, ValueKind};
use crate::intent::IntentProfile;
use crate::quality::DataQualityReport;
use itertools::Itertools;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Scored candidate before snapping, so ties between equal named levels can
/// still be broken by the underlying score.
struct Scored {
    candidate: ChartCandidate,
    raw: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ChartSuggestionGenerator {
    config: SuggestionConfig,
    narrative: NarrativeThresholds,
}
impl ChartSuggestionGenerator {
    pub fn new(config: SuggestionConfig, narrative: NarrativeThresholds) -> Self {
        Self { config, narrative }
    }

    /// Top candidates above the viability floor, one per chart kind, best
    /// first. An empty list means no chart is viable.
    #[instrument(level = "debug", skip_all, fields(metric_count = descriptors.len(), with_intent = intent.is_some()))]
    pub fn generate(
        &self,
        descriptors: &[MetricDescriptor],
        quality: &DataQualityReport,
        intent: Option<&IntentProfile>,
    ) -> Vec<ChartCandidate> {
        let metrics = descriptors.iter().filter(|d| !d.is_container()).collect::<Vec<_>>();
        let mut scored = Vec::new();
        for metric in metrics.iter().copied() {
            for chart in ChartKind::ALL {
                scored.push(self.score(&[metric], chart, quality, intent));
            }
        }
        for (chart, group) in self.combinations(&metrics) {
            scored.push(self.score(&group, chart, quality, intent));
        }

        let floor = if intent.is_some() {
            self.config.floor_with_intent
        } else {
            self.config.floor_without_intent
        };
        scored.retain(|s| s.raw >= floor);
        scored.sort_by(|a, b| {
            b.candidate
                .confidence
                .total_cmp(&a.candidate.confidence)
                .then(b.raw.total_cmp(&a.raw))
        });

        let mut seen = HashSet::new();
        let candidates = scored
            .into_iter()
            .filter(|s| seen.insert(s.candidate.chart_kind))
            .take(self.config.max_candidates)
            .map(|s| s.candidate)
            .collect::<Vec<_>>();
        debug!(candidate_count = candidates.len(), "Generated chart suggestions");
        candidates
    }

    /// Metric groups that read better together than apart.
    fn combinations<'a>(&self, metrics: &[&'a MetricDescriptor]) -> Vec<(ChartKind, Vec<&'a MetricDescriptor>)> {
        let mut combos = Vec::new();
        let by_value_kind = metrics
            .iter()
            .filter(|m| m.kind == MetricKind::TimeSeries)
            .copied()
            .into_group_map_by(|m| m.value_kind);
        for (_, group) in by_value_kind.into_iter().sorted_by_key(|(kind, _)| kind.as_str()) {
            if group.len() >= 2 {
                combos.push((ChartKind::Line, group));
            }
        }
        let grouped_currency = metrics
            .iter()
            .filter(|m| m.has_grouping_dimension && m.value_kind == ValueKind::Currency)
            .copied()
            .collect::<Vec<_>>();
        if grouped_currency.len() >= 2 {
            combos.push((ChartKind::StackedBar, grouped_currency));
        }
        let changes = metrics.iter().filter(|m| m.mentions_change()).copied().collect::<Vec<_>>();
        if !changes.is_empty() {
            combos.push((ChartKind::Waterfall, changes));
        }
        let matrix = metrics
            .iter()
            .filter(|m| {
                m.has_time_dimension
                    && m.has_grouping_dimension
                    && m.distinct_group_count() > self.config.heatmap_min_categories
            })
            .copied()
            .collect::<Vec<_>>();
        if !matrix.is_empty() {
            combos.push((ChartKind::Heatmap, matrix));
        }
        combos
    }

    fn score(
        &self,
        metrics: &[&MetricDescriptor],
        chart: ChartKind,
        quality: &DataQualityReport,
        intent: Option<&IntentProfile>,
    ) -> Scored {
        let count = metrics.len() as f64;
        let fits = metrics
            .iter()
            .map(|m| structural_fit(m, chart, quality.severity_of(&m.path), &self.config))
            .collect::<Vec<_>>();
        let mut data = fits.iter().map(|f| f.data_compatibility).sum::<f64>() / count;
        let visual = fits.iter().map(|f| f.visual_effectiveness).sum::<f64>() / count;
        let action = metrics
            .iter()
            .map(|m| actionability_of(m, &self.config.actionability))
            .sum::<f64>()
            / count;
        if metrics.len() > 1 {
            data = (data - self.clarity_penalty(metrics)).clamp(0.0, 1.0);
        }

        let (raw, level, alignment) = match intent {
            Some(profile) => {
                let alignment = intent_affinity(profile.primary.kind, chart);
                let weights = &self.config.weights;
                let raw = weights.intent_alignment * alignment
                    + weights.data_compatibility * data
                    + weights.actionability * action
                    + weights.visual_clarity * visual;
                (raw, Some(ConfidenceLevel::from_score(raw, &self.config.bands)), alignment)
            }
            None => (
                self.config.fallback_data_weight * data + self.config.fallback_visual_weight * visual,
                None,
                0.0,
            ),
        };
        let evidence = ChartEvidence {
            data_compatibility: data,
            intent_alignment: alignment,
            visual_clarity: visual,
            actionability: action,
        };
        let paths = metrics.iter().map(|m| m.path.clone()).collect::<Vec<_>>();
        Scored {
            candidate: ChartCandidate {
                chart_kind: chart,
                confidence: level.map(|l| l.value()).unwrap_or(raw.clamp(0.0, 1.0)),
                level,
                rationale: self.rationale(chart, &paths, &evidence, intent.is_some()),
                supporting_metric_paths: paths,
                evidence,
            },
            raw,
        }
    }

    fn clarity_penalty(&self, metrics: &[&MetricDescriptor]) -> f64 {
        let rules = &self.config.combination;
        let mut penalty = 0.0;
        if metrics.len() > rules.crowded_metrics {
            penalty += rules.crowded_penalty;
        }
        if metrics.len() > rules.overcrowded_metrics {
            penalty += rules.overcrowded_penalty;
        }
        let value_kinds = metrics.iter().map(|m| m.value_kind).collect::<HashSet<_>>();
        if value_kinds.len() > rules.max_value_kinds {
            penalty += rules.heterogeneity_penalty;
        }
        penalty
    }

    fn rationale(&self, chart: ChartKind, paths: &[String], evidence: &ChartEvidence, with_intent: bool) -> String {
        let subject = match paths {
            [single] => single.clone(),
            many => format!("{} metrics ({})", many.len(), many.join(", ")),
        };
        let mut factors = vec![
            describe_factor("data compatibility", evidence.data_compatibility, &self.narrative),
            describe_factor("visual clarity", evidence.visual_clarity, &self.narrative),
        ];
        if with_intent {
            factors.insert(
                0,
                describe_factor("intent alignment", evidence.intent_alignment, &self.narrative),
            );
        }
        format!("A {} for {subject}: {}", chart.display_name(), factors.join(", "))
    }
}

/// How directly a metric supports a business decision.
pub fn actionability_of(metric: &MetricDescriptor, config: &ActionabilityConfig) -> f64 {
    let mut score = config.base;
    match metric.value_kind {
        ValueKind::Currency => score += config.currency_bonus,
        ValueKind::Percentage => score += config.percentage_bonus,
        ValueKind::Count | ValueKind::Generic => {}
    }
    let name = metric.path.to_lowercase();
    if config.performance_names.iter().any(|n| name.contains(n.as_str())) {
        score += config.performance_name_bonus;
    }
    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::IntentAnalyser;
    use crate::quality::DataQualityAssessor;
    use serde_json::json;

    fn revenue_series() -> MetricDescriptor {
        MetricDescriptor::new("revenue", MetricKind::TimeSeries, ValueKind::Currency)
            .with_samples(vec![json!(100), json!(150), json!(120)])
            .with_dates(vec!["2025-01".into(), "2025-02".into(), "2025-03".into()])
    }

    #[test]
    fn trend_intent_prefers_line() {
        let metrics = vec![revenue_series()];
        let quality = DataQualityAssessor::default().assess(&metrics);
        let intent = IntentAnalyser::default().analyse("show revenue trend");
        let candidates = ChartSuggestionGenerator::default().generate(&metrics, &quality, Some(&intent));
        assert_eq!(candidates[0].chart_kind, ChartKind::Line);
        assert_eq!(candidates[0].confidence, 0.9);
        assert_eq!(candidates[0].level, Some(ConfidenceLevel::Excellent));
        assert!(candidates[0].rationale.contains("strong intent alignment"));
    }

    #[test]
    fn with_intent_confidences_are_named_levels() {
        let metrics = vec![
            revenue_series(),
            MetricDescriptor::new("sales.grossSales", MetricKind::GroupedSeries, ValueKind::Currency)
                .with_grouping(vec!["A".into(), "B".into(), "C".into()]),
        ];
        let quality = DataQualityAssessor::default().assess(&metrics);
        let intent = IntentAnalyser::default().analyse("compare sales by region");
        let candidates = ChartSuggestionGenerator::default().generate(&metrics, &quality, Some(&intent));
        assert!(!candidates.is_empty());
        for candidate in &candidates {
            assert!([0.9, 0.75, 0.6, 0.4, 0.2].contains(&candidate.confidence));
        }
        let kinds = candidates.iter().map(|c| c.chart_kind).collect::<HashSet<_>>();
        assert_eq!(kinds.len(), candidates.len());
    }

    #[test]
    fn without_intent_uses_raw_fit() {
        let metrics = vec![revenue_series()];
        let quality = DataQualityAssessor::default().assess(&metrics);
        let candidates = ChartSuggestionGenerator::default().generate(&metrics, &quality, None);
        let line = &candidates[0];
        assert_eq!(line.chart_kind, ChartKind::Line);
        assert!(line.level.is_none());
        assert!((line.confidence - (0.7 * 0.9 + 0.3 * 0.8)).abs() < 1e-9);
    }

    #[test]
    fn matching_time_series_combine() {
        let second = MetricDescriptor::new("netIncome", MetricKind::TimeSeries, ValueKind::Currency)
            .with_samples(vec![json!(10), json!(12), json!(9)])
            .with_dates(vec!["2025-01".into(), "2025-02".into(), "2025-03".into()]);
        let metrics = vec![revenue_series(), second];
        let generator = ChartSuggestionGenerator::default();
        let refs = metrics.iter().collect::<Vec<_>>();
        let combos = generator.combinations(&refs);
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].0, ChartKind::Line);
        assert_eq!(combos[0].1.len(), 2);
    }

    #[test]
    fn crowded_heterogeneous_combinations_are_penalised() {
        let kinds = [ValueKind::Currency, ValueKind::Count, ValueKind::Percentage, ValueKind::Generic];
        let metrics = (0..7)
            .map(|i| MetricDescriptor::new(format!("m{i}"), MetricKind::TimeSeries, kinds[i % 4]))
            .collect::<Vec<_>>();
        let refs = metrics.iter().collect::<Vec<_>>();
        let penalty = ChartSuggestionGenerator::default().clarity_penalty(&refs);
        assert!((penalty - 0.7).abs() < 1e-9);
    }

    #[test]
    fn containers_alone_yield_nothing() {
        let container = MetricDescriptor::new("set", MetricKind::EmbeddedMetricSet, ValueKind::Generic);
        let candidates = ChartSuggestionGenerator::default().generate(
            &[container],
            &DataQualityReport::default(),
            None,
        );
        assert!(candidates.is_empty());
    }

    #[test]
    fn actionability_rewards_currency_performance_metrics() {
        let config = ActionabilityConfig::default();
        assert!((actionability_of(&revenue_series(), &config) - 0.95).abs() < 1e-9);
        let visits = MetricDescriptor::new("visits", MetricKind::Array, ValueKind::Generic);
        assert!((actionability_of(&visits, &config) - 0.5).abs() < 1e-9);
    }
}
