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

//! Human-readable explanation of an already made decision. Nothing here
//! feeds back into which metric or chart was chosen.

use crate::chart::{describe_factor, ChartCandidate, ChartKind, ChartRanking};
use crate::config::{NarrativeThresholds, OrchestratorConfig};
use crate::descriptor::{MetricDescriptor, MetricKind};
use crate::intent::IntentProfile;
use crate::quality::DataQualityReport;
use crate::relevance::MetricRelevance;
use crate::text;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, instrument};

const MAX_LISTED_ISSUES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCategory {
    PromptAnalysis,
    DataEvaluation,
    ChartSelection,
    MetricSelection,
    FinalDecision,
}
impl StepCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepCategory::PromptAnalysis => "prompt_analysis",
            StepCategory::DataEvaluation => "data_evaluation",
            StepCategory::ChartSelection => "chart_selection",
            StepCategory::MetricSelection => "metric_selection",
            StepCategory::FinalDecision => "final_decision",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub category: StepCategory,
    pub narrative: String,
    pub factors: Vec<String>,
    pub confidence: f64,
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningTrace {
    pub steps: Vec<ReasoningStep>,
    /// Unweighted mean of the step confidences.
    pub confidence: f64,
    pub chart: Option<ChartKind>,
    pub metric: Option<String>,
}
impl ReasoningTrace {
    pub fn disabled(chart: Option<ChartKind>, metric: Option<&str>) -> Self {
        Self {
            steps: Vec::new(),
            confidence: 0.0,
            chart,
            metric: metric.map(str::to_string),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
    pub fn step(&self, category: StepCategory) -> Option<&ReasoningStep> {
        self.steps.iter().find(|s| s.category == category)
    }
}
impl std::fmt::Display for ReasoningTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.steps.is_empty() {
            return writeln!(f, "Reasoning trace disabled");
        }
        for (index, step) in self.steps.iter().enumerate() {
            writeln!(
                f,
                "{}. [{}] {} ({:.0}%)",
                index + 1,
                step.category.as_str(),
                step.narrative,
                step.confidence * 100.0
            )?;
            for factor in &step.factors {
                writeln!(f, "     - {factor}")?;
            }
            if !step.alternatives.is_empty() {
                writeln!(f, "     alternatives: {}", step.alternatives.join("; "))?;
            }
        }
        writeln!(f, "Overall confidence: {:.0}%", self.confidence * 100.0)
    }
}

/// Everything the orchestrator explains. All of it is computed before the
/// trace is built.
pub struct ReasoningInputs<'a> {
    pub prompt: &'a str,
    pub profile: &'a IntentProfile,
    pub descriptors: &'a [MetricDescriptor],
    pub quality: &'a DataQualityReport,
    pub candidates: &'a [ChartCandidate],
    pub ranking: &'a ChartRanking,
    pub relevance: &'a [MetricRelevance],
    pub chart: Option<ChartKind>,
    pub metric: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct ReasoningOrchestrator {
    config: OrchestratorConfig,
    narrative: NarrativeThresholds,
}
impl ReasoningOrchestrator {
    pub fn new(config: OrchestratorConfig, narrative: NarrativeThresholds) -> Self {
        Self { config, narrative }
    }
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    #[instrument(level = "debug", skip_all, fields(enabled = self.config.enabled))]
    pub fn build(&self, inputs: &ReasoningInputs<'_>) -> ReasoningTrace {
        if !self.config.enabled {
            return ReasoningTrace::disabled(inputs.chart, inputs.metric);
        }
        let steps = vec![
            self.prompt_analysis(inputs.profile),
            self.data_evaluation(inputs.descriptors, inputs.quality),
            self.chart_selection(inputs.ranking, inputs.candidates, inputs.chart),
            self.metric_selection(inputs.relevance, inputs.metric),
        ];
        let final_step = self.final_decision(inputs, &steps);
        let mut steps = steps;
        steps.push(final_step);
        let confidence = steps.iter().map(|s| s.confidence).sum::<f64>() / steps.len() as f64;
        debug!(step_count = steps.len(), confidence, "Built reasoning trace");
        ReasoningTrace {
            steps,
            confidence,
            chart: inputs.chart,
            metric: inputs.metric.map(str::to_string),
        }
    }

    fn prompt_analysis(&self, profile: &IntentProfile) -> ReasoningStep {
        let mut factors = Vec::new();
        for signal in &profile.temporal_signals {
            factors.push(format!("temporal signal {:?} from '{}'", signal.kind, signal.phrase));
        }
        for signal in &profile.comparison_signals {
            if signal.entities.is_empty() {
                factors.push(format!("comparison signal {:?}", signal.kind));
            } else {
                factors.push(format!("comparing {}", signal.entities.join(" and ")));
            }
        }
        if !profile.explicit_metric_mentions.is_empty() {
            factors.push(format!("mentions {}", profile.explicit_metric_mentions.join(", ")));
        }
        if !profile.timeframes.is_empty() {
            factors.push(format!("timeframe {}", profile.timeframes.join(", ")));
        }
        for phrase in &profile.negated_phrases {
            factors.push(format!("explicitly not '{phrase}'"));
        }
        factors.push(format!("aggregation level {:?}", profile.aggregation_level));
        ReasoningStep {
            category: StepCategory::PromptAnalysis,
            narrative: format!("Interpreted the request as {}", profile.summary()),
            factors,
            confidence: profile.overall_confidence,
            alternatives: profile
                .secondary
                .iter()
                .map(|s| format!("{} ({:.2})", s.kind, s.confidence))
                .collect(),
        }
    }

    fn data_evaluation(&self, descriptors: &[MetricDescriptor], quality: &DataQualityReport) -> ReasoningStep {
        let counts = kind_counts(descriptors)
            .into_iter()
            .map(|(kind, count)| format!("{count} {kind}"))
            .collect::<Vec<_>>();
        let mut factors = vec![format!(
            "completeness {:.0}%, {}",
            quality.completeness * 100.0,
            if quality.consistency { "consistent" } else { "inconsistent" }
        )];
        if !counts.is_empty() {
            factors.push(format!("shapes: {}", counts.join(", ")));
        }
        factors.extend(quality.issues.iter().take(MAX_LISTED_ISSUES).cloned());
        let time_dimensioned = descriptors.iter().filter(|d| d.has_time_dimension).count();
        ReasoningStep {
            category: StepCategory::DataEvaluation,
            narrative: format!(
                "Found {} metrics, {} with a time dimension",
                descriptors.len(),
                time_dimensioned
            ),
            factors,
            confidence: quality.completeness,
            alternatives: Vec::new(),
        }
    }

    fn chart_selection(&self, ranking: &ChartRanking, candidates: &[ChartCandidate], chart: Option<ChartKind>) -> ReasoningStep {
        let chosen = chart
            .and_then(|kind| ranking.get(kind))
            .unwrap_or(&ranking.recommended);
        let mut factors = chosen
            .strengths
            .iter()
            .chain(chosen.weaknesses.iter())
            .cloned()
            .collect::<Vec<_>>();
        if let Some(best) = candidates.first() {
            factors.push(format!(
                "best single suggestion: {} ({:.2})",
                best.rationale, best.confidence
            ));
        }
        ReasoningStep {
            category: StepCategory::ChartSelection,
            narrative: format!(
                "Chose a {} with score {:.2}",
                chosen.chart_kind.display_name(),
                chosen.score
            ),
            factors,
            confidence: chosen.confidence,
            alternatives: ranking
                .rankings
                .iter()
                .filter(|r| r.chart_kind != chosen.chart_kind)
                .map(|r| format!("{} ({:.2})", r.chart_kind, r.score))
                .collect(),
        }
    }

    fn metric_selection(&self, relevance: &[MetricRelevance], metric: Option<&str>) -> ReasoningStep {
        let chosen = metric.and_then(|path| relevance.iter().find(|r| r.path == path));
        match chosen {
            Some(top) => ReasoningStep {
                category: StepCategory::MetricSelection,
                narrative: format!("Selected {} with relevance {:.2}", top.path, top.score),
                factors: top.reasons.clone(),
                confidence: top.confidence,
                alternatives: relevance
                    .iter()
                    .filter(|r| r.path != top.path)
                    .map(|r| format!("{} ({:.2})", r.path, r.score))
                    .collect(),
            },
            None => ReasoningStep {
                category: StepCategory::MetricSelection,
                narrative: "No metric matched the request".to_string(),
                factors: Vec::new(),
                confidence: 0.0,
                alternatives: Vec::new(),
            },
        }
    }

    /// Cross-checks the chosen path against the prompt. The overlap only
    /// changes the displayed confidence.
    fn final_decision(&self, inputs: &ReasoningInputs<'_>, steps: &[ReasoningStep]) -> ReasoningStep {
        let decided = steps
            .iter()
            .filter(|s| matches!(s.category, StepCategory::ChartSelection | StepCategory::MetricSelection))
            .map(|s| s.confidence)
            .collect::<Vec<_>>();
        let base = decided.iter().sum::<f64>() / decided.len().max(1) as f64;
        let overlap = inputs.metric.map(|path| token_overlap(inputs.prompt, path)).unwrap_or(0.0);
        let confidence = ((1.0 - self.config.overlap_weight) * base + self.config.overlap_weight * overlap)
            .clamp(0.0, 1.0);
        let narrative = match (inputs.chart, inputs.metric) {
            (Some(chart), Some(metric)) => format!("Show {metric} as a {}", chart.display_name()),
            (Some(chart), None) => format!("Recommend a {} once a metric is chosen", chart.display_name()),
            (None, _) => "No viable chart for this request".to_string(),
        };
        ReasoningStep {
            category: StepCategory::FinalDecision,
            narrative,
            factors: vec![
                format!("prompt/metric token overlap {overlap:.2}"),
                describe_factor("decision confidence", confidence, &self.narrative),
            ],
            confidence,
            alternatives: Vec::new(),
        }
    }
}

/// Share of the prompt's content tokens that also appear in the metric path.
pub fn token_overlap(prompt: &str, path: &str) -> f64 {
    let prompt_tokens = text::content_tokens(prompt, 2).into_iter().collect::<HashSet<_>>();
    if prompt_tokens.is_empty() {
        return 0.0;
    }
    let path_tokens = text::split_identifier(path).into_iter().collect::<HashSet<_>>();
    prompt_tokens.intersection(&path_tokens).count() as f64 / prompt_tokens.len() as f64
}

/// Descriptor counts per kind, ordered by kind name.
fn kind_counts(descriptors: &[MetricDescriptor]) -> Vec<(MetricKind, usize)> {
    descriptors
        .iter()
        .counts_by(|d| d.kind)
        .into_iter()
        .sorted_by_key(|(kind, _)| kind.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartRanker;
    use crate::descriptor::ValueKind;
    use crate::intent::IntentAnalyser;

    fn inputs_for<'a>(
        prompt: &'a str,
        profile: &'a IntentProfile,
        descriptors: &'a [MetricDescriptor],
        quality: &'a DataQualityReport,
        ranking: &'a ChartRanking,
        relevance: &'a [MetricRelevance],
    ) -> ReasoningInputs<'a> {
        ReasoningInputs {
            prompt,
            profile,
            descriptors,
            quality,
            candidates: &[],
            ranking,
            relevance,
            chart: Some(ranking.recommended.chart_kind),
            metric: relevance.first().map(|r| r.path.as_str()),
        }
    }

    fn fixture() -> (IntentProfile, Vec<MetricDescriptor>, DataQualityReport, ChartRanking, Vec<MetricRelevance>) {
        let prompt = "show revenue trend";
        let profile = IntentAnalyser::default().analyse(prompt);
        let descriptors = vec![MetricDescriptor::new("revenue", MetricKind::TimeSeries, ValueKind::Currency)
            .with_dates(vec!["2025-01".into()])];
        let quality = DataQualityReport {
            completeness: 1.0,
            consistency: true,
            ..Default::default()
        };
        let ranking = ChartRanker::default().rank(prompt, &descriptors, &quality, Some(&profile), 3);
        let relevance = vec![MetricRelevance {
            path: "revenue".into(),
            kind: MetricKind::TimeSeries,
            score: 6.0,
            confidence: 0.9,
            reasons: vec!["prompt names 'revenue'".into()],
        }];
        (profile, descriptors, quality, ranking, relevance)
    }

    #[test]
    fn steps_follow_fixed_order() {
        let (profile, descriptors, quality, ranking, relevance) = fixture();
        let inputs = inputs_for("show revenue trend", &profile, &descriptors, &quality, &ranking, &relevance);
        let trace = ReasoningOrchestrator::default().build(&inputs);
        let order = trace.steps.iter().map(|s| s.category).collect::<Vec<_>>();
        assert_eq!(
            order,
            vec![
                StepCategory::PromptAnalysis,
                StepCategory::DataEvaluation,
                StepCategory::ChartSelection,
                StepCategory::MetricSelection,
                StepCategory::FinalDecision,
            ]
        );
        let mean = trace.steps.iter().map(|s| s.confidence).sum::<f64>() / 5.0;
        assert!((trace.confidence - mean).abs() < 1e-12);
        assert_eq!(trace.metric.as_deref(), Some("revenue"));
    }

    #[test]
    fn disabled_trace_is_empty() {
        let (profile, descriptors, quality, ranking, relevance) = fixture();
        let inputs = inputs_for("show revenue trend", &profile, &descriptors, &quality, &ranking, &relevance);
        let orchestrator = ReasoningOrchestrator::new(
            OrchestratorConfig {
                enabled: false,
                ..Default::default()
            },
            NarrativeThresholds::default(),
        );
        let trace = orchestrator.build(&inputs);
        assert!(trace.is_empty());
        assert_eq!(trace.confidence, 0.0);
        assert_eq!(trace.chart, Some(ranking.recommended.chart_kind));
        assert_eq!(trace.metric.as_deref(), Some("revenue"));
    }

    #[test]
    fn overlap_only_changes_displayed_confidence() {
        let (profile, descriptors, quality, ranking, relevance) = fixture();
        let matching = inputs_for("show revenue trend", &profile, &descriptors, &quality, &ranking, &relevance);
        let unrelated = inputs_for("show me something", &profile, &descriptors, &quality, &ranking, &relevance);
        let orchestrator = ReasoningOrchestrator::default();
        let a = orchestrator.build(&matching);
        let b = orchestrator.build(&unrelated);
        assert_eq!(a.chart, b.chart);
        assert_eq!(a.metric, b.metric);
        let final_a = a.step(StepCategory::FinalDecision).unwrap().confidence;
        let final_b = b.step(StepCategory::FinalDecision).unwrap().confidence;
        assert!(final_a > final_b);
    }

    #[test]
    fn overlap_counts_shared_tokens() {
        assert!((token_overlap("revenue trend", "revenue") - 0.5).abs() < 1e-12);
        assert_eq!(token_overlap("", "revenue"), 0.0);
        assert_eq!(token_overlap("gross sales", "dataBySalesConnectors.grossSales"), 1.0);
    }
}
