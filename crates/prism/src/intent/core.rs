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

use serde::{Deserialize, Serialize};
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    TemporalTrend,
    CategoricalComparison,
    CompositionalBreakdown,
    PerformanceOverview,
    CorrelationAnalysis,
    AnomalyDetection,
    Forecasting,
    DrillDown,
}
impl IntentKind {
    pub const ALL: [IntentKind; 8] = [
        IntentKind::TemporalTrend,
        IntentKind::CategoricalComparison,
        IntentKind::CompositionalBreakdown,
        IntentKind::PerformanceOverview,
        IntentKind::CorrelationAnalysis,
        IntentKind::AnomalyDetection,
        IntentKind::Forecasting,
        IntentKind::DrillDown,
    ];
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::TemporalTrend => "temporal_trend",
            IntentKind::CategoricalComparison => "categorical_comparison",
            IntentKind::CompositionalBreakdown => "compositional_breakdown",
            IntentKind::PerformanceOverview => "performance_overview",
            IntentKind::CorrelationAnalysis => "correlation_analysis",
            IntentKind::AnomalyDetection => "anomaly_detection",
            IntentKind::Forecasting => "forecasting",
            IntentKind::DrillDown => "drill_down",
        }
    }
    pub fn requirements(&self) -> &'static [&'static str] {
        match self {
            IntentKind::TemporalTrend => &["time-ordered data", "consistent time intervals"],
            IntentKind::CategoricalComparison => &["categorical grouping", "comparable magnitudes"],
            IntentKind::CompositionalBreakdown => &["part-to-whole relationship", "additive components"],
            IntentKind::PerformanceOverview => &["key performance indicators", "aggregate totals"],
            IntentKind::CorrelationAnalysis => &["two or more related measures", "aligned observations"],
            IntentKind::AnomalyDetection => &["baseline for normal behaviour", "sufficient history"],
            IntentKind::Forecasting => &["historical time series", "regular periodicity"],
            IntentKind::DrillDown => &["hierarchical breakdown", "detailed records"],
        }
    }
}
impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntentScore {
    pub kind: IntentKind,
    pub confidence: f64,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalSignalKind {
    Trend,
    Seasonality,
    PeriodComparison,
    GrowthAnalysis,
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalSignal {
    pub kind: TemporalSignalKind,
    pub strength: f64,
    pub phrase: String,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonSignalKind {
    EntityPair,
    Ranking,
    General,
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSignal {
    pub kind: ComparisonSignalKind,
    pub entities: Vec<String>,
    pub strength: f64,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationLevel {
    Detailed,
    #[default]
    Summary,
    Overview,
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentProfile {
    pub primary: IntentScore,
    pub secondary: Vec<IntentScore>,
    pub temporal_signals: Vec<TemporalSignal>,
    pub comparison_signals: Vec<ComparisonSignal>,
    pub aggregation_level: AggregationLevel,
    pub explicit_metric_mentions: Vec<String>,
    pub implicit_requirements: Vec<String>,
    /// Timeframes named in the prompt (`"2025"`, `"q3"`, `"historical period"`).
    pub timeframes: Vec<String>,
    pub negated_phrases: Vec<String>,
    pub overall_confidence: f64,
}
impl IntentProfile {
    pub fn is_primary(&self, kind: IntentKind) -> bool {
        self.primary.kind == kind
    }
    pub fn has_temporal_signals(&self) -> bool {
        !self.temporal_signals.is_empty()
    }
    pub fn has_comparison_signals(&self) -> bool {
        !self.comparison_signals.is_empty()
    }
    pub fn summary(&self) -> String {
        let mut text = format!(
            "{} ({:.0}% confidence)",
            self.primary.kind,
            self.primary.confidence * 100.0
        );
        if !self.secondary.is_empty() {
            let secondary = self
                .secondary
                .iter()
                .map(|s| s.kind.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            text.push_str(&format!(", also {secondary}"));
        }
        text
    }
}
