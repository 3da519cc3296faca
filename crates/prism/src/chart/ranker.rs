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

//! Ranks all five chart kinds against the whole metric set at once.

use super::fit::structural_fit;
use super::{intent_affinity, ChartKind, StrengthBand};
use crate::config::{NarrativeThresholds, RankerConfig, ReasoningConfig, SuggestionConfig};
use crate::descriptor::MetricDescriptor;
use crate::intent::{ComparisonSignalKind, IntentAnalyser, IntentKind, IntentProfile};
use crate::quality::DataQualityReport;
use crate::text;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedChart {
    pub chart_kind: ChartKind,
    pub score: f64,
    pub confidence: f64,
    pub data_compatibility: f64,
    pub intent_alignment: f64,
    pub visual_effectiveness: f64,
    pub usability: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRanking {
    /// Every chart kind, best first.
    pub rankings: Vec<RankedChart>,
    pub recommended: RankedChart,
    pub top_k: Vec<RankedChart>,
    pub alternatives: Vec<RankedChart>,
    pub intent_summary: String,
}
impl ChartRanking {
    pub fn position_of(&self, chart: ChartKind) -> Option<usize> {
        self.rankings.iter().position(|r| r.chart_kind == chart)
    }
    pub fn get(&self, chart: ChartKind) -> Option<&RankedChart> {
        self.rankings.iter().find(|r| r.chart_kind == chart)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChartRanker {
    config: RankerConfig,
    fit: SuggestionConfig,
    narrative: NarrativeThresholds,
    analyser: IntentAnalyser,
}
impl ChartRanker {
    pub fn new(config: &ReasoningConfig) -> Self {
        Self {
            config: config.ranker.clone(),
            fit: config.suggestion.clone(),
            narrative: config.narrative.clone(),
            analyser: IntentAnalyser::new(config.intent.clone()),
        }
    }

    /// Without a profile the prompt is analysed here.
    #[instrument(level = "debug", skip_all, fields(metric_count = metrics.len(), top_k = top_k))]
    pub fn rank(
        &self,
        prompt: &str,
        metrics: &[MetricDescriptor],
        quality: &DataQualityReport,
        intent: Option<&IntentProfile>,
        top_k: usize,
    ) -> ChartRanking {
        let profile = match intent {
            Some(profile) => Cow::Borrowed(profile),
            None => Cow::Owned(self.analyser.analyse(prompt)),
        };
        let lowered = prompt.to_lowercase();
        let metrics = metrics.iter().filter(|m| !m.is_container()).collect::<Vec<_>>();

        let mut rankings = ChartKind::ALL
            .into_iter()
            .map(|chart| self.rank_chart(chart, &metrics, quality, &profile, &lowered))
            .collect::<Vec<_>>();
        rankings.sort_by(|a, b| b.score.total_cmp(&a.score));

        let k = top_k.clamp(1, rankings.len());
        let top = rankings[..k].to_vec();
        let ranking = ChartRanking {
            recommended: rankings[0].clone(),
            alternatives: top[1..].to_vec(),
            top_k: top,
            intent_summary: profile.summary(),
            rankings,
        };
        debug!(
            recommended = %ranking.recommended.chart_kind,
            score = ranking.recommended.score,
            "Ranked chart kinds"
        );
        ranking
    }

    fn rank_chart(
        &self,
        chart: ChartKind,
        metrics: &[&MetricDescriptor],
        quality: &DataQualityReport,
        profile: &IntentProfile,
        prompt: &str,
    ) -> RankedChart {
        let (data, visual) = self.aggregate_fit(chart, metrics, quality);
        let alignment = self.intent_alignment(chart, profile, prompt);
        let usability = self.usability(chart, metrics);
        let weights = &self.config.weights;
        let score = weights.data_compatibility * data
            + weights.intent_alignment * alignment
            + weights.visual_effectiveness * visual
            + weights.usability * usability;
        let mut confidence = (score + self.config.confidence_lift).min(1.0);
        if metrics.is_empty() {
            confidence *= self.config.empty_metrics_discount;
        }

        let mut strengths = Vec::new();
        let mut weaknesses = Vec::new();
        for (label, value) in [
            ("data compatibility", data),
            ("intent alignment", alignment),
            ("visual effectiveness", visual),
            ("usability", usability),
        ] {
            match StrengthBand::classify(value, &self.narrative) {
                StrengthBand::Strong => strengths.push(format!("strong {label} ({value:.2})")),
                StrengthBand::Weak => weaknesses.push(format!("weak {label} ({value:.2})")),
                StrengthBand::Moderate => {}
            }
        }
        RankedChart {
            chart_kind: chart,
            score,
            confidence,
            data_compatibility: data,
            intent_alignment: alignment,
            visual_effectiveness: visual,
            usability,
            strengths,
            weaknesses,
        }
    }

    /// Blend of the best single-metric fit and the average fit.
    fn aggregate_fit(&self, chart: ChartKind, metrics: &[&MetricDescriptor], quality: &DataQualityReport) -> (f64, f64) {
        if metrics.is_empty() {
            let empty = self.config.empty_data_compatibility;
            return (empty, empty);
        }
        let fits = metrics
            .iter()
            .map(|m| structural_fit(m, chart, quality.severity_of(&m.path), &self.fit))
            .collect::<Vec<_>>();
        let blend = |values: Vec<f64>| {
            let max = values.iter().copied().fold(0.0, f64::max);
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            self.config.aggregate_max_weight * max + (1.0 - self.config.aggregate_max_weight) * mean
        };
        (
            blend(fits.iter().map(|f| f.data_compatibility).collect()),
            blend(fits.iter().map(|f| f.visual_effectiveness).collect()),
        )
    }

    fn intent_alignment(&self, chart: ChartKind, profile: &IntentProfile, prompt: &str) -> f64 {
        let mut weighted = profile.primary.confidence * intent_affinity(profile.primary.kind, chart);
        let mut total = profile.primary.confidence;
        for secondary in &profile.secondary {
            let weight = self.config.secondary_weight * secondary.confidence;
            weighted += weight * intent_affinity(secondary.kind, chart);
            total += weight;
        }
        let mut alignment = if total > 0.0 {
            weighted / total
        } else {
            self.config.neutral_intent_alignment
        };

        if chart == ChartKind::Line && profile.has_temporal_signals() {
            alignment += self.config.signal_nudge;
        }
        if chart == ChartKind::Bar
            && (profile.has_comparison_signals() || profile.is_primary(IntentKind::CategoricalComparison))
        {
            alignment += self.config.signal_nudge;
        }
        if chart == ChartKind::Bar
            && profile
                .comparison_signals
                .iter()
                .any(|s| s.kind == ComparisonSignalKind::Ranking)
        {
            alignment += self.config.signal_nudge;
        }
        if chart.prompt_aliases().iter().any(|alias| text::contains_term(prompt, alias)) {
            alignment += self.config.explicit_chart_bonus;
        }
        alignment.clamp(0.0, 1.0)
    }

    fn usability(&self, chart: ChartKind, metrics: &[&MetricDescriptor]) -> f64 {
        let priors = &self.config.usability;
        let prior = match chart {
            ChartKind::Line => priors.line,
            ChartKind::Bar => priors.bar,
            ChartKind::StackedBar => priors.stacked_bar,
            ChartKind::Heatmap => priors.heatmap,
            ChartKind::Waterfall => priors.waterfall,
        };
        let max_groups = metrics.iter().map(|m| m.distinct_group_count()).max().unwrap_or(0);
        if max_groups > self.config.crowded_categories {
            (prior - self.config.crowded_usability_penalty).clamp(0.0, 1.0)
        } else {
            prior
        }
    }
}
