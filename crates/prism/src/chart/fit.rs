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

//! Structural fit of one metric to one chart kind. Both the per-metric
//! suggestion generator and the whole-profile ranker build on this, so a
//! metric never fits a chart differently depending on who asks.

use super::ChartKind;
use crate::config::{SeverityPenalties, SuggestionConfig};
use crate::descriptor::{MetricDescriptor, MetricKind, ValueKind};
use crate::quality::QualitySeverity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructuralFit {
    pub data_compatibility: f64,
    pub visual_effectiveness: f64,
}

pub fn severity_penalty(severity: QualitySeverity, penalties: &SeverityPenalties) -> f64 {
    match severity {
        QualitySeverity::High => penalties.high,
        QualitySeverity::Medium => penalties.medium,
        QualitySeverity::Low => penalties.low,
        QualitySeverity::None => 0.0,
    }
}

/// Both scores start from the configured bases and are clamped to `[0, 1]`.
pub fn structural_fit(
    metric: &MetricDescriptor,
    chart: ChartKind,
    severity: QualitySeverity,
    config: &SuggestionConfig,
) -> StructuralFit {
    let mut data = config.base_data_compatibility;
    let mut visual = config.base_visual_effectiveness;
    let groups = metric.distinct_group_count();
    let grouped = metric.has_grouping_dimension;
    let timed = metric.has_time_dimension;
    let adj = &config.fit;

    match chart {
        ChartKind::Line => {
            if timed {
                data += adj.line_time_bonus;
                visual += adj.line_visual_shift;
            } else {
                data -= adj.line_no_time_penalty;
                visual -= adj.line_visual_shift;
            }
        }
        ChartKind::Bar => {
            if grouped && (2..=config.bar_crowded_groups).contains(&groups) {
                data += adj.bar_grouped_bonus;
            } else if metric.kind == MetricKind::Array {
                data += adj.bar_array_bonus;
            } else if metric.kind == MetricKind::Scalar {
                data += adj.bar_scalar_bonus;
                visual += adj.bar_scalar_visual_bonus;
            } else if timed && !grouped {
                data += adj.bar_time_only_bonus;
            }
            if grouped && groups <= config.bar_readable_groups {
                visual += adj.bar_visual_shift;
            } else if groups > config.bar_crowded_groups {
                visual -= adj.bar_visual_shift;
            }
        }
        ChartKind::StackedBar => {
            if !grouped {
                data -= adj.stacked_no_group_penalty;
            } else if (config.stacked_min_groups..=config.stacked_max_groups).contains(&groups) {
                data += adj.stacked_fit_bonus;
            } else if groups > config.stacked_penalty_above {
                data -= adj.stacked_overflow_penalty;
            }
            if grouped
                && (config.stacked_min_groups..=adj.stacked_visual_readable_groups).contains(&groups)
            {
                visual += adj.stacked_visual_bonus;
            } else if groups > config.stacked_max_groups {
                visual -= adj.stacked_visual_penalty;
            }
        }
        ChartKind::Heatmap => {
            if timed && grouped && groups > config.heatmap_min_categories {
                data += adj.heatmap_fit_bonus;
                visual += adj.heatmap_visual_bonus;
            } else {
                data -= if timed && grouped {
                    adj.heatmap_few_categories_penalty
                } else {
                    adj.heatmap_missing_dimension_penalty
                };
                visual -= adj.heatmap_visual_penalty;
            }
        }
        ChartKind::Waterfall => {
            if metric.mentions_change() {
                data += adj.waterfall_change_bonus;
                visual += adj.waterfall_visual_bonus;
            } else {
                data -= adj.waterfall_no_change_penalty;
                visual -= adj.waterfall_visual_penalty;
            }
            if metric.value_kind == ValueKind::Currency {
                data += adj.waterfall_currency_bonus;
            }
        }
    }
    data -= severity_penalty(severity, &config.quality_penalties);

    StructuralFit {
        data_compatibility: data.clamp(0.0, 1.0),
        visual_effectiveness: visual.clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grouped(labels: usize, timed: bool) -> MetricDescriptor {
        let metric = MetricDescriptor::new("sales", MetricKind::GroupedSeries, ValueKind::Currency)
            .with_grouping((0..labels).map(|i| format!("g{i}")).collect());
        if timed {
            metric.with_dates(vec!["2025-01".into()])
        } else {
            metric
        }
    }

    fn fit(metric: &MetricDescriptor, chart: ChartKind) -> StructuralFit {
        structural_fit(metric, chart, QualitySeverity::None, &SuggestionConfig::default())
    }

    #[test]
    fn line_needs_time() {
        let timed = MetricDescriptor::new("revenue", MetricKind::TimeSeries, ValueKind::Currency)
            .with_dates(vec!["2025-01".into()]);
        let scalar = MetricDescriptor::new("revenue", MetricKind::Scalar, ValueKind::Currency);
        assert!((fit(&timed, ChartKind::Line).data_compatibility - 0.9).abs() < 1e-9);
        assert!((fit(&scalar, ChartKind::Line).data_compatibility - 0.2).abs() < 1e-9);
    }

    #[test]
    fn stacked_bar_group_window() {
        let inside = fit(&grouped(5, false), ChartKind::StackedBar).data_compatibility;
        let edge = fit(&grouped(9, false), ChartKind::StackedBar).data_compatibility;
        let crowded = fit(&grouped(11, false), ChartKind::StackedBar).data_compatibility;
        assert!(inside > edge && edge > crowded);
    }

    #[test]
    fn heatmap_needs_both_dimensions_and_categories() {
        assert!(fit(&grouped(5, true), ChartKind::Heatmap).data_compatibility > 0.8);
        assert!((fit(&grouped(3, true), ChartKind::Heatmap).data_compatibility - 0.35).abs() < 1e-9);
        assert!((fit(&grouped(5, false), ChartKind::Heatmap).data_compatibility - 0.2).abs() < 1e-9);
    }

    #[test]
    fn waterfall_rewards_change_metrics() {
        let change = MetricDescriptor::new("cashChange", MetricKind::Array, ValueKind::Currency);
        let plain = MetricDescriptor::new("visits", MetricKind::Array, ValueKind::Generic);
        assert!((fit(&change, ChartKind::Waterfall).data_compatibility - 0.95).abs() < 1e-9);
        assert!((fit(&plain, ChartKind::Waterfall).data_compatibility - 0.3).abs() < 1e-9);
    }

    #[test]
    fn configured_adjustments_replace_defaults() {
        let metric = MetricDescriptor::new("revenue", MetricKind::TimeSeries, ValueKind::Currency)
            .with_dates(vec!["2025-01".into()]);
        let mut config = SuggestionConfig::default();
        config.fit.line_time_bonus = 0.1;
        let fit = structural_fit(&metric, ChartKind::Line, QualitySeverity::None, &config);
        assert!((fit.data_compatibility - 0.6).abs() < 1e-9);
    }

    #[test]
    fn quality_penalty_lowers_data_compatibility_only() {
        let metric = grouped(4, false);
        let config = SuggestionConfig::default();
        let clean = structural_fit(&metric, ChartKind::Bar, QualitySeverity::None, &config);
        let sparse = structural_fit(&metric, ChartKind::Bar, QualitySeverity::High, &config);
        assert!((clean.data_compatibility - sparse.data_compatibility - 0.2).abs() < 1e-9);
        assert_eq!(clean.visual_effectiveness, sparse.visual_effectiveness);
    }
}
