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

//! Multi-chart dashboards: the prompt's primary metric plus the related
//! metric families it calls for, one chart each.

use crate::chart::ChartKind;
use crate::config::DashboardConfig;
use crate::descriptor::{MetricDescriptor, MetricKind};
use crate::relevance::MetricRelevance;
use crate::text;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const NO_METRICS_NOTICE: &str = "No suitable metrics found for the requested dashboard";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardChart {
    pub id: String,
    pub metric_path: String,
    pub chart: ChartKind,
    pub title: String,
    pub confidence: f64,
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub charts: Vec<DashboardChart>,
    pub insights: Vec<String>,
    /// Set when nothing in the dataset could be charted.
    pub notice: Option<String>,
}
impl Dashboard {
    pub fn empty() -> Self {
        Self {
            notice: Some(NO_METRICS_NOTICE.to_string()),
            ..Self::default()
        }
    }
    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DashboardComposer {
    config: DashboardConfig,
}
impl DashboardComposer {
    pub fn new(config: DashboardConfig) -> Self {
        Self { config }
    }

    /// The most relevant chartable metric first, then every related group
    /// the prompt triggers, deduplicated and cut to `max_charts`. Scalars
    /// and containers never get a chart of their own.
    pub fn related_metrics<'a>(
        &self,
        prompt: &str,
        descriptors: &'a [MetricDescriptor],
        relevance: &[MetricRelevance],
        max_charts: usize,
    ) -> Vec<&'a MetricDescriptor> {
        let chartable = descriptors.iter().filter(|d| is_chartable(d)).collect::<Vec<_>>();
        let lowered = prompt.to_lowercase();
        let primary = relevance
            .iter()
            .find_map(|r| chartable.iter().find(|d| d.path == r.path).copied());

        let mut picked = primary.into_iter().collect::<Vec<_>>();
        for group in &self.config.related_groups {
            if !group.triggers.iter().any(|t| text::contains_term(&lowered, t)) {
                continue;
            }
            let members = chartable
                .iter()
                .filter(|d| {
                    let path = d.path.to_lowercase();
                    group.path_terms.iter().any(|term| path.contains(term.as_str()))
                })
                .take(group.limit)
                .copied();
            picked.extend(members);
        }

        let mut seen = HashSet::new();
        picked
            .into_iter()
            .filter(|d| seen.insert(d.path.clone()))
            .take(max_charts)
            .collect()
    }

    /// Narrow prompt used to pick the chart for one dashboard slot.
    pub fn focus_prompt(&self, metric: &MetricDescriptor) -> String {
        let view = if metric.has_time_dimension {
            "trends over time"
        } else {
            "breakdown"
        };
        format!("Show {} {view}", text::humanise(metric.leaf_name()))
    }

    /// 1-based `(row, col)` of the chart at `index`, filled row by row.
    pub fn layout(&self, index: usize) -> (usize, usize) {
        let columns = self.config.layout_columns.max(1);
        (index / columns + 1, index % columns + 1)
    }

    pub fn insights(&self, charts: &[DashboardChart]) -> Vec<String> {
        let mut insights = Vec::new();
        if charts.len() > self.config.comprehensive_chart_count {
            insights.push(format!(
                "Generated {} related charts for comprehensive analysis",
                charts.len()
            ));
        }
        if charts.iter().map(|c| c.chart).unique().count() > self.config.varied_chart_kinds {
            insights.push("Multiple visualization types used for different data perspectives".to_string());
        }
        let has_trend = charts.iter().any(|c| c.chart == ChartKind::Line);
        let has_comparison = charts
            .iter()
            .any(|c| matches!(c.chart, ChartKind::Bar | ChartKind::StackedBar));
        if has_trend && has_comparison {
            insights.push("Dashboard includes both trend analysis and comparative metrics".to_string());
        }
        insights.truncate(self.config.max_insights);
        insights
    }
}

fn is_chartable(metric: &MetricDescriptor) -> bool {
    metric.kind != MetricKind::Scalar && !metric.is_container()
}
