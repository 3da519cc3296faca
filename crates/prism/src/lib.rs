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

pub mod cache;
pub mod chart;
pub mod classifier;
pub mod config;
pub mod dashboard;
pub mod descriptor;
pub mod error;
pub mod intent;
pub mod quality;
pub mod reasoning;
pub mod relevance;
pub mod slicer;
pub mod summary;
pub mod text;
pub mod value_type;

pub use cache::{CachedDataset, DatasetCache, DatasetLoader};
pub use chart::{
    chart_title, structural_fit, ChartCandidate, ChartKind, ChartRanker, ChartRanking,
    ChartSuggestionGenerator, ConfidenceLevel, RankedChart,
};
pub use classifier::MetricClassifier;
pub use config::ReasoningConfig;
pub use dashboard::{Dashboard, DashboardChart, DashboardComposer};
pub use descriptor::{MetricDescriptor, MetricKind, ValueKind};
pub use error::{
    CacheError, ConfigError, DatasetError, ErrorReporter, ReasoningError, Result,
};
pub use intent::{IntentAnalyser, IntentKind, IntentProfile};
pub use quality::{DataQualityAssessor, DataQualityReport, QualitySeverity};
pub use reasoning::{ReasoningInputs, ReasoningOrchestrator, ReasoningStep, ReasoningTrace, StepCategory};
pub use relevance::{MetricRelevance, MetricRelevanceScorer};
pub use slicer::{find_metric, ChartSeries, DateRange, MetricSlicer};
pub use summary::DatasetOverview;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Per-request knobs; unset limits fall back to the configuration.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub max_metrics: Option<usize>,
    pub top_k: Option<usize>,
    pub include_trace: bool,
    /// Pre-computed intent shared by the scorer, ranker and orchestrator.
    pub intent: Option<IntentProfile>,
}
impl AnalysisOptions {
    pub fn with_trace() -> Self {
        Self {
            include_trace: true,
            ..Self::default()
        }
    }
}

/// The metric and chart finally put forward for the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub metric_path: String,
    pub chart: ChartKind,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartDecision {
    pub overview: DatasetOverview,
    pub descriptors: Vec<MetricDescriptor>,
    pub quality: DataQualityReport,
    pub intent: IntentProfile,
    pub relevance: Vec<MetricRelevance>,
    pub suggestions: Vec<ChartCandidate>,
    pub ranking: ChartRanking,
    /// `None` when no metric is relevant to the prompt.
    pub selection: Option<Selection>,
    pub trace: ReasoningTrace,
}

#[derive(Debug, Clone)]
struct Components {
    classifier: MetricClassifier,
    assessor: DataQualityAssessor,
    suggester: ChartSuggestionGenerator,
    analyser: IntentAnalyser,
    scorer: MetricRelevanceScorer,
    ranker: ChartRanker,
    orchestrator: ReasoningOrchestrator,
    composer: DashboardComposer,
}

/// Runs the whole reasoning pipeline for one dataset and prompt.
#[derive(Debug, Clone)]
pub struct ChartReasoningSystem {
    config: ReasoningConfig,
    components: Components,
}

impl ChartReasoningSystem {
    pub fn new(config: ReasoningConfig) -> Self {
        let components = Components {
            classifier: MetricClassifier::new(config.classifier.clone()),
            assessor: DataQualityAssessor::new(config.quality.clone()),
            suggester: ChartSuggestionGenerator::new(config.suggestion.clone(), config.narrative.clone()),
            analyser: IntentAnalyser::new(config.intent.clone()),
            scorer: MetricRelevanceScorer::new(config.relevance.clone()),
            ranker: ChartRanker::new(&config),
            orchestrator: ReasoningOrchestrator::new(config.orchestrator.clone(), config.narrative.clone()),
            composer: DashboardComposer::new(config.dashboard.clone()),
        };
        Self { config, components }
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(ReasoningConfig::from_yaml_file(path)?))
    }

    pub fn config(&self) -> &ReasoningConfig {
        &self.config
    }

    pub fn classifier(&self) -> &MetricClassifier {
        &self.components.classifier
    }

    /// Classification and intent analysis are independent and run in
    /// parallel; everything after them is sequential.
    #[instrument(level = "info", skip_all, fields(prompt_len = prompt.len()))]
    pub fn analyse(&self, dataset: &Value, prompt: &str, options: &AnalysisOptions) -> ChartDecision {
        let (descriptors, intent) = match &options.intent {
            Some(profile) => (self.components.classifier.classify(dataset), profile.clone()),
            None => rayon::join(
                || self.components.classifier.classify(dataset),
                || self.components.analyser.analyse(prompt),
            ),
        };
        let overview = DatasetOverview::build(dataset, &descriptors);
        self.decide(prompt, descriptors, overview, intent, options)
    }

    /// Same as [`analyse`](Self::analyse) over a cached, already classified
    /// dataset.
    pub async fn analyse_cached<L: DatasetLoader + 'static>(
        &self,
        cache: &DatasetCache<L>,
        date_range: Option<&str>,
        prompt: &str,
        options: &AnalysisOptions,
    ) -> Result<ChartDecision> {
        let entry = cache.get(date_range).await?;
        let intent = options
            .intent
            .clone()
            .unwrap_or_else(|| self.components.analyser.analyse(prompt));
        Ok(self.decide(
            prompt,
            entry.descriptors.clone(),
            entry.overview.clone(),
            intent,
            options,
        ))
    }

    fn decide(
        &self,
        prompt: &str,
        descriptors: Vec<MetricDescriptor>,
        overview: DatasetOverview,
        intent: IntentProfile,
        options: &AnalysisOptions,
    ) -> ChartDecision {
        let quality = self.components.assessor.assess(&descriptors);
        let suggestions = self.components.suggester.generate(&descriptors, &quality, Some(&intent));
        let relevance = self
            .components
            .scorer
            .rank(prompt, &descriptors, &intent, &quality, options.max_metrics);
        let top_k = options.top_k.unwrap_or(self.config.ranker.default_top_k);
        let ranking = self
            .components
            .ranker
            .rank(prompt, &descriptors, &quality, Some(&intent), top_k);
        let selection = self.select(&descriptors, &quality, &relevance, &ranking);

        let chart = Some(selection.as_ref().map_or(ranking.recommended.chart_kind, |s| s.chart));
        let metric = selection.as_ref().map(|s| s.metric_path.as_str());
        let inputs = ReasoningInputs {
            prompt,
            profile: &intent,
            descriptors: &descriptors,
            quality: &quality,
            candidates: &suggestions,
            ranking: &ranking,
            relevance: &relevance,
            chart,
            metric,
        };
        let trace = if options.include_trace && self.components.orchestrator.is_enabled() {
            self.components.orchestrator.build(&inputs)
        } else {
            ReasoningTrace::disabled(chart, metric)
        };
        info!(
            metric_count = descriptors.len(),
            intent = %intent.primary.kind,
            selected_metric = metric.unwrap_or("none"),
            chart = %ranking.recommended.chart_kind,
            "Chart decision ready"
        );

        ChartDecision {
            overview,
            quality,
            intent,
            relevance,
            suggestions,
            selection,
            trace,
            ranking,
            descriptors,
        }
    }

    /// One chart per related metric, each picked by ranking the chart kinds
    /// against a prompt focused on that metric alone.
    #[instrument(level = "info", skip_all, fields(prompt_len = prompt.len(), max_charts = max_charts))]
    pub fn dashboard(&self, dataset: &Value, prompt: &str, max_charts: usize) -> Dashboard {
        let (descriptors, intent) = rayon::join(
            || self.components.classifier.classify(dataset),
            || self.components.analyser.analyse(prompt),
        );
        let quality = self.components.assessor.assess(&descriptors);
        let relevance = self
            .components
            .scorer
            .rank(prompt, &descriptors, &intent, &quality, None);
        let composer = &self.components.composer;
        let metrics = composer.related_metrics(prompt, &descriptors, &relevance, max_charts);
        if metrics.is_empty() {
            warn!(metric_count = descriptors.len(), "No chartable metrics for dashboard");
            return Dashboard::empty();
        }

        let charts = metrics
            .par_iter()
            .enumerate()
            .map(|(index, metric)| {
                let focus = composer.focus_prompt(metric);
                let focus_intent = self.components.analyser.analyse(&focus);
                let ranking = self.components.ranker.rank(
                    &focus,
                    std::slice::from_ref(*metric),
                    &quality,
                    Some(&focus_intent),
                    1,
                );
                let chart = self.chart_for(metric, &quality, &ranking);
                let (row, col) = composer.layout(index);
                DashboardChart {
                    id: format!("chart_{}", index + 1),
                    metric_path: metric.path.clone(),
                    chart,
                    title: chart_title(metric, chart),
                    confidence: ranking.get(chart).map_or(0.0, |r| r.confidence),
                    row,
                    col,
                }
            })
            .collect::<Vec<_>>();
        let insights = composer.insights(&charts);
        info!(chart_count = charts.len(), insight_count = insights.len(), "Dashboard ready");
        Dashboard {
            charts,
            insights,
            notice: None,
        }
    }

    /// Top relevant metric paired with the best ranked chart that can
    /// actually carry it on its own.
    fn select(
        &self,
        descriptors: &[MetricDescriptor],
        quality: &DataQualityReport,
        relevance: &[MetricRelevance],
        ranking: &ChartRanking,
    ) -> Option<Selection> {
        let top = relevance.first()?;
        let metric = descriptors.iter().find(|d| d.path == top.path)?;
        let chart = self.chart_for(metric, quality, ranking);
        Some(Selection {
            metric_path: metric.path.clone(),
            chart,
            title: chart_title(metric, chart),
        })
    }

    /// First ranked chart whose single-metric fit clears the floor, else the
    /// ranker's recommendation.
    fn chart_for(&self, metric: &MetricDescriptor, quality: &DataQualityReport, ranking: &ChartRanking) -> ChartKind {
        let severity = quality.severity_of(&metric.path);
        ranking
            .rankings
            .iter()
            .map(|r| r.chart_kind)
            .find(|chart| {
                structural_fit(metric, *chart, severity, &self.config.suggestion).data_compatibility
                    >= self.config.ranker.min_metric_fit
            })
            .unwrap_or(ranking.recommended.chart_kind)
    }
}

impl Default for ChartReasoningSystem {
    fn default() -> Self {
        Self::new(ReasoningConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_dataset_yields_structured_empty_decision() {
        let decision = ChartReasoningSystem::default().analyse(&json!({}), "show revenue", &AnalysisOptions::default());
        assert!(decision.descriptors.is_empty());
        assert!(decision.relevance.is_empty());
        assert!(decision.suggestions.is_empty());
        assert!(decision.selection.is_none());
        assert_eq!(decision.ranking.rankings.len(), 5);
        assert!(decision.trace.is_empty());
    }

    #[test]
    fn trace_only_when_requested() {
        let dataset = json!({"revenue": [{"date": "2025-01", "value": 1}, {"date": "2025-02", "value": 2}]});
        let system = ChartReasoningSystem::default();
        let plain = system.analyse(&dataset, "revenue trend", &AnalysisOptions::default());
        let traced = system.analyse(&dataset, "revenue trend", &AnalysisOptions::with_trace());
        assert!(plain.trace.is_empty());
        assert_eq!(traced.trace.steps.len(), 5);
        assert_eq!(plain.selection, traced.selection);
    }

    #[test]
    fn disabled_orchestrator_skips_the_trace() {
        let dataset = json!({"revenue": [{"date": "2025-01", "value": 1}, {"date": "2025-02", "value": 2}]});
        let mut config = ReasoningConfig::default();
        config.orchestrator.enabled = false;
        let system = ChartReasoningSystem::new(config);
        let decision = system.analyse(&dataset, "revenue trend", &AnalysisOptions::with_trace());
        assert!(decision.trace.is_empty());
        assert_eq!(decision.trace.metric.as_deref(), Some("revenue"));
    }

    #[test]
    fn loads_configuration_from_yaml_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ranker:\n  default_top_k: 4").unwrap();
        let system = ChartReasoningSystem::from_yaml_file(file.path()).unwrap();
        assert_eq!(system.config().ranker.default_top_k, 4);
        assert!(ChartReasoningSystem::from_yaml_file("/nonexistent/prism.yml").is_err());
    }

    #[test]
    fn supplied_intent_is_used_as_is() {
        let dataset = json!({"revenue": [{"date": "2025-01", "value": 1}]});
        let system = ChartReasoningSystem::default();
        let mut profile = IntentAnalyser::default().analyse("compare revenue");
        profile.overall_confidence = 0.42;
        let options = AnalysisOptions {
            intent: Some(profile.clone()),
            ..AnalysisOptions::default()
        };
        let decision = system.analyse(&dataset, "revenue trend", &options);
        assert_eq!(decision.intent, profile);
    }
}
