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

pub mod fit;
pub mod ranker;
pub mod suggestion;

use crate::config::{ConfidenceBands, NarrativeThresholds};
use crate::descriptor::MetricDescriptor;
use crate::intent::IntentKind;
use serde::{Deserialize, Serialize};

pub use fit::{structural_fit, StructuralFit};
pub use ranker::{ChartRanker, ChartRanking, RankedChart};
pub use suggestion::ChartSuggestionGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    Line,
    Bar,
    StackedBar,
    Heatmap,
    Waterfall,
}
impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::Line,
        ChartKind::Bar,
        ChartKind::StackedBar,
        ChartKind::Heatmap,
        ChartKind::Waterfall,
    ];
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::StackedBar => "stacked-bar",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Waterfall => "waterfall",
        }
    }
    pub fn display_name(&self) -> &'static str {
        match self {
            ChartKind::Line => "line chart",
            ChartKind::Bar => "bar chart",
            ChartKind::StackedBar => "stacked bar chart",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Waterfall => "waterfall chart",
        }
    }
    pub fn title_suffix(&self) -> &'static str {
        match self {
            ChartKind::Line => "Trends",
            ChartKind::Bar => "Comparison",
            ChartKind::StackedBar => "Breakdown",
            ChartKind::Heatmap => "Pattern Analysis",
            ChartKind::Waterfall => "Impact Analysis",
        }
    }
    /// Words in a prompt that name this chart kind outright.
    pub fn prompt_aliases(&self) -> &'static [&'static str] {
        match self {
            ChartKind::Line => &["line chart", "line graph"],
            ChartKind::Bar => &["bar chart", "bar graph", "column chart"],
            ChartKind::StackedBar => &["stacked bar", "stacked column", "stacked chart"],
            ChartKind::Heatmap => &["heatmap", "heat map"],
            ChartKind::Waterfall => &["waterfall", "bridge chart"],
        }
    }
}
impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named confidence bands for chart suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Excellent,
    Good,
    Acceptable,
    Poor,
    Unsuitable,
}
impl ConfidenceLevel {
    pub fn value(&self) -> f64 {
        match self {
            ConfidenceLevel::Excellent => 0.9,
            ConfidenceLevel::Good => 0.75,
            ConfidenceLevel::Acceptable => 0.6,
            ConfidenceLevel::Poor => 0.4,
            ConfidenceLevel::Unsuitable => 0.2,
        }
    }
    pub fn from_score(score: f64, bands: &ConfidenceBands) -> Self {
        if score >= bands.excellent_min {
            ConfidenceLevel::Excellent
        } else if score >= bands.good_min {
            ConfidenceLevel::Good
        } else if score >= bands.acceptable_min {
            ConfidenceLevel::Acceptable
        } else if score >= bands.poor_min {
            ConfidenceLevel::Poor
        } else {
            ConfidenceLevel::Unsuitable
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartEvidence {
    pub data_compatibility: f64,
    pub intent_alignment: f64,
    pub visual_clarity: f64,
    pub actionability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartCandidate {
    pub chart_kind: ChartKind,
    pub confidence: f64,
    /// Present only when an intent profile drove the score.
    pub level: Option<ConfidenceLevel>,
    pub supporting_metric_paths: Vec<String>,
    pub evidence: ChartEvidence,
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrengthBand {
    Strong,
    Moderate,
    Weak,
}
impl StrengthBand {
    pub fn classify(score: f64, thresholds: &NarrativeThresholds) -> Self {
        if score > thresholds.strong {
            StrengthBand::Strong
        } else if score >= thresholds.moderate {
            StrengthBand::Moderate
        } else {
            StrengthBand::Weak
        }
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            StrengthBand::Strong => "strong",
            StrengthBand::Moderate => "moderate",
            StrengthBand::Weak => "weak",
        }
    }
}

/// `"strong data compatibility (0.85)"`.
pub fn describe_factor(label: &str, score: f64, thresholds: &NarrativeThresholds) -> String {
    format!(
        "{} {label} ({score:.2})",
        StrengthBand::classify(score, thresholds).as_str()
    )
}

mod internal {
    /// Rows follow `IntentKind` declaration order, columns `ChartKind::ALL`.
    pub const AFFINITY: [[f64; 5]; 8] = [
        [0.95, 0.55, 0.60, 0.50, 0.45],
        [0.35, 0.95, 0.75, 0.55, 0.40],
        [0.30, 0.60, 0.95, 0.50, 0.70],
        [0.70, 0.85, 0.60, 0.40, 0.50],
        [0.60, 0.40, 0.35, 0.95, 0.25],
        [0.85, 0.55, 0.35, 0.75, 0.50],
        [0.95, 0.45, 0.40, 0.30, 0.45],
        [0.45, 0.80, 0.70, 0.70, 0.55],
    ];
}

pub fn intent_affinity(intent: IntentKind, chart: ChartKind) -> f64 {
    internal::AFFINITY[intent as usize][chart as usize]
}

/// `"Gross Sales Trends"` for a line chart of `grossSales`.
pub fn chart_title(metric: &MetricDescriptor, chart: ChartKind) -> String {
    format!("{} {}", metric.business_name, chart.title_suffix())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{MetricKind, ValueKind};

    #[test]
    fn bands_snap_to_named_levels() {
        let bands = ConfidenceBands::default();
        assert_eq!(ConfidenceLevel::from_score(0.905, &bands).value(), 0.9);
        assert_eq!(ConfidenceLevel::from_score(0.70, &bands).value(), 0.75);
        assert_eq!(ConfidenceLevel::from_score(0.56, &bands).value(), 0.6);
        assert_eq!(ConfidenceLevel::from_score(0.35, &bands).value(), 0.4);
        assert_eq!(ConfidenceLevel::from_score(-1.0, &bands).value(), 0.2);
    }

    #[test]
    fn affinity_prefers_natural_pairs() {
        assert!(
            intent_affinity(IntentKind::TemporalTrend, ChartKind::Line)
                > intent_affinity(IntentKind::TemporalTrend, ChartKind::Bar)
        );
        assert!(
            intent_affinity(IntentKind::CategoricalComparison, ChartKind::Bar)
                > intent_affinity(IntentKind::CategoricalComparison, ChartKind::Line)
        );
        assert_eq!(
            intent_affinity(IntentKind::CorrelationAnalysis, ChartKind::Heatmap),
            0.95
        );
    }

    #[test]
    fn titles_use_kind_suffix() {
        let metric = MetricDescriptor::new("sales.grossSales", MetricKind::TimeSeries, ValueKind::Currency);
        assert_eq!(chart_title(&metric, ChartKind::Line), "Gross Sales Trends");
        assert_eq!(chart_title(&metric, ChartKind::Waterfall), "Gross Sales Impact Analysis");
    }

    #[test]
    fn narrative_bands_share_thresholds() {
        let thresholds = NarrativeThresholds::default();
        assert_eq!(StrengthBand::classify(0.81, &thresholds), StrengthBand::Strong);
        assert_eq!(StrengthBand::classify(0.8, &thresholds), StrengthBand::Moderate);
        assert_eq!(StrengthBand::classify(0.59, &thresholds), StrengthBand::Weak);
        assert_eq!(
            describe_factor("usability", 0.9, &thresholds),
            "strong usability (0.90)"
        );
    }
}
