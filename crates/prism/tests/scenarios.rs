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

use anyhow::Result;
use async_trait::async_trait;
use prism::reasoning::StepCategory;
use prism::{
    AnalysisOptions, ChartKind, ChartReasoningSystem, DatasetCache, DatasetLoader, IntentKind,
    MetricKind, MetricSlicer, ReasoningConfig,
};
use serde_json::{json, Value};

fn revenue_dataset() -> Value {
    json!({
        "revenue": [
            {"date": "2025-01", "value": 100},
            {"date": "2025-02", "value": 150}
        ]
    })
}

fn regional_dataset() -> Value {
    json!({
        "accountsByRegion": {
            "a1b2c3d4e5f6g7h8i9j0": {"name": "North", "sales": 120.0},
            "b2c3d4e5f6g7h8i9j0k1": {"name": "South", "sales": 80.0},
            "c3d4e5f6g7h8i9j0k1l2": {"name": "East", "sales": 95.0},
            "d4e5f6g7h8i9j0k1l2m3": {"name": "West", "sales": 60.0}
        }
    })
}

fn cash_flow(values: Vec<Value>) -> Value {
    let points = values
        .into_iter()
        .enumerate()
        .map(|(i, value)| json!({"date": format!("2025-{:02}", i + 1), "value": value}))
        .collect::<Vec<_>>();
    json!({ "cashFlow": points })
}

#[test]
fn test_revenue_trend_scenario() -> Result<()> {
    let system = ChartReasoningSystem::default();
    let decision = system.analyse(
        &revenue_dataset(),
        "show revenue trend for 2025",
        &AnalysisOptions::with_trace(),
    );

    assert_eq!(decision.descriptors.len(), 1);
    assert_eq!(decision.descriptors[0].path, "revenue");
    assert_eq!(decision.descriptors[0].kind, MetricKind::TimeSeries);
    assert_eq!(decision.intent.primary.kind, IntentKind::TemporalTrend);
    assert!(decision.intent.timeframes.iter().any(|t| t == "2025"));

    let top = &decision.suggestions[0];
    assert_eq!(top.chart_kind, ChartKind::Line);
    assert!(top.confidence >= 0.75);

    let selection = decision.selection.as_ref().expect("revenue should be selected");
    assert_eq!(selection.metric_path, "revenue");
    assert_eq!(selection.chart, ChartKind::Line);
    assert_eq!(selection.title, "Revenue Trends");

    assert_eq!(decision.trace.steps.len(), 5);
    assert_eq!(decision.trace.steps[0].category, StepCategory::PromptAnalysis);
    assert_eq!(decision.trace.metric.as_deref(), Some("revenue"));
    Ok(())
}

#[test]
fn test_regional_comparison_scenario() -> Result<()> {
    let decision = ChartReasoningSystem::default().analyse(
        &regional_dataset(),
        "compare sales by region",
        &AnalysisOptions::default(),
    );

    let kinds = decision
        .descriptors
        .iter()
        .map(|d| (d.path.as_str(), d.kind))
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            ("accountsByRegion", MetricKind::DynamicKeyCollection),
            ("accountsByRegion.sales", MetricKind::GroupedSeries),
        ]
    );
    assert_eq!(
        decision.descriptors[1].grouping_labels,
        vec!["North", "South", "East", "West"]
    );

    assert_eq!(decision.relevance[0].path, "accountsByRegion.sales");
    if let Some(container) = decision.relevance.iter().find(|r| r.path == "accountsByRegion") {
        assert!(container.score < decision.relevance[0].score);
    }

    let line = decision.ranking.position_of(ChartKind::Line).unwrap();
    let bar = decision.ranking.position_of(ChartKind::Bar).unwrap();
    let stacked = decision.ranking.position_of(ChartKind::StackedBar).unwrap();
    assert!(bar < line);
    assert!(stacked < line);
    assert!(decision.trace.is_empty());
    Ok(())
}

#[test]
fn test_negated_trend_scenario() -> Result<()> {
    let decision = ChartReasoningSystem::default().analyse(
        &revenue_dataset(),
        "not a trend, just totals",
        &AnalysisOptions::default(),
    );
    assert_ne!(decision.intent.primary.kind, IntentKind::TemporalTrend);
    assert!(matches!(
        decision.intent.primary.kind,
        IntentKind::CategoricalComparison | IntentKind::PerformanceOverview
    ));
    Ok(())
}

#[test]
fn test_sparse_metric_scenario() -> Result<()> {
    let system = ChartReasoningSystem::default();
    let prompt = "show cash flow trend";

    let mut sparse = vec![Value::Null; 9];
    sparse.push(json!(40));
    let sparse = system.analyse(&cash_flow(sparse), prompt, &AnalysisOptions::default());
    let full = system.analyse(
        &cash_flow((1..=10).map(|v| json!(v * 10)).collect()),
        prompt,
        &AnalysisOptions::default(),
    );

    let metric = sparse.quality.for_metric("cashFlow").expect("cashFlow assessed");
    assert!(metric.completeness <= 0.2);
    assert!(sparse
        .quality
        .issues
        .iter()
        .any(|issue| issue.contains("cashFlow") && issue.contains("missing data")));

    let sparse_top = sparse.suggestions.first().map_or(0.0, |c| c.confidence);
    let full_top = full.suggestions.first().map_or(0.0, |c| c.confidence);
    assert!(sparse_top < full_top);
    Ok(())
}

#[test]
fn test_selected_metric_slices_back_to_series() -> Result<()> {
    let dataset = regional_dataset();
    let decision = ChartReasoningSystem::default().analyse(
        &dataset,
        "compare sales by region",
        &AnalysisOptions::default(),
    );
    let selection = decision.selection.expect("a metric should be selected");
    let series = MetricSlicer::new().slice_by_name(
        &dataset,
        &decision.descriptors,
        &selection.metric_path,
        None,
    )?;
    assert_eq!(series.categories, vec!["North", "South", "East", "West"]);
    assert_eq!(
        series.series[0].values,
        vec![Some(120.0), Some(80.0), Some(95.0), Some(60.0)]
    );
    Ok(())
}

#[test]
fn test_presentation_preset_limits_metrics() -> Result<()> {
    let dataset = json!({
        "revenue": [{"date": "2025-01", "value": 1}, {"date": "2025-02", "value": 2}],
        "revenueForecast": [{"date": "2025-01", "value": 1}, {"date": "2025-02", "value": 3}],
        "revenueTarget": [{"date": "2025-01", "value": 2}, {"date": "2025-02", "value": 2}],
        "revenueGrowthRate": [{"date": "2025-01", "value": 0.1}, {"date": "2025-02", "value": 0.2}]
    });
    let system = ChartReasoningSystem::new(ReasoningConfig::for_presentation());
    let decision = system.analyse(&dataset, "revenue over time", &AnalysisOptions::default());
    assert!(decision.relevance.len() <= 3);
    assert_eq!(decision.ranking.top_k.len(), 2);
    Ok(())
}

fn sales_dataset() -> Value {
    json!({
        "cashBalance": 1200.5,
        "dataBySalesConnectors": [
            {"connector": "Shopify", "grossSales": 100.0, "netSales": 90.0, "orders": 4},
            {"connector": "Amazon", "grossSales": 80.0, "netSales": 70.0, "orders": 2},
            {"connector": "Etsy", "grossSales": 30.0, "netSales": 25.0, "orders": 1}
        ],
        "revenue": [
            {"date": "2025-01", "value": 100},
            {"date": "2025-02", "value": 150},
            {"date": "2025-03", "value": 120}
        ]
    })
}

#[test]
fn test_sales_dashboard_scenario() -> Result<()> {
    let system = ChartReasoningSystem::default();
    let dashboard = system.dashboard(&sales_dataset(), "revenue and sales performance dashboard", 4);

    let paths = dashboard
        .charts
        .iter()
        .map(|c| c.metric_path.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        paths,
        vec![
            "revenue",
            "dataBySalesConnectors.grossSales",
            "dataBySalesConnectors.netSales",
            "dataBySalesConnectors.orders",
        ]
    );
    assert!(dashboard.notice.is_none());

    let revenue = &dashboard.charts[0];
    assert_eq!(revenue.chart, ChartKind::Line);
    assert_eq!(revenue.title, "Revenue Trends");
    assert_eq!((revenue.id.as_str(), revenue.row, revenue.col), ("chart_1", 1, 1));

    for (index, chart) in dashboard.charts.iter().enumerate().skip(1) {
        assert!(matches!(chart.chart, ChartKind::Bar | ChartKind::StackedBar));
        assert_eq!(chart.id, format!("chart_{}", index + 1));
        assert_eq!((chart.row, chart.col), (index / 2 + 1, index % 2 + 1));
        assert!((0.0..=1.0).contains(&chart.confidence));
    }
    assert!(dashboard.charts[1].title.starts_with("Gross Sales "));

    assert!(dashboard
        .insights
        .contains(&"Generated 4 related charts for comprehensive analysis".to_string()));
    assert!(dashboard
        .insights
        .contains(&"Dashboard includes both trend analysis and comparative metrics".to_string()));
    assert!(dashboard.insights.len() <= 3);
    Ok(())
}

#[test]
fn test_dashboard_respects_chart_limit() -> Result<()> {
    let dashboard = ChartReasoningSystem::default().dashboard(
        &sales_dataset(),
        "revenue and sales performance dashboard",
        2,
    );
    let paths = dashboard
        .charts
        .iter()
        .map(|c| c.metric_path.as_str())
        .collect::<Vec<_>>();
    assert_eq!(paths, vec!["revenue", "dataBySalesConnectors.grossSales"]);
    assert_eq!(
        dashboard.insights,
        vec!["Dashboard includes both trend analysis and comparative metrics"]
    );
    Ok(())
}

#[test]
fn test_scalar_only_dashboard_is_empty() -> Result<()> {
    let dataset = json!({"cashBalance": 10.0, "totalOrders": 5});
    let dashboard = ChartReasoningSystem::default().dashboard(&dataset, "cash dashboard", 5);
    assert!(dashboard.is_empty());
    assert!(dashboard.insights.is_empty());
    assert_eq!(
        dashboard.notice.as_deref(),
        Some("No suitable metrics found for the requested dashboard")
    );
    Ok(())
}

struct StaticLoader;

#[async_trait]
impl DatasetLoader for StaticLoader {
    async fn load(&self, _date_range: Option<&str>) -> anyhow::Result<Value> {
        Ok(revenue_dataset())
    }
}

#[tokio::test]
async fn test_cached_analysis_matches_direct_analysis() -> Result<()> {
    let system = ChartReasoningSystem::default();
    let cache = DatasetCache::new(StaticLoader, system.classifier().clone());
    let options = AnalysisOptions::default();
    let prompt = "show revenue trend for 2025";

    let cached = system
        .analyse_cached(&cache, Some("2025"), prompt, &options)
        .await?;
    let direct = system.analyse(&revenue_dataset(), prompt, &options);

    assert_eq!(cached.descriptors, direct.descriptors);
    assert_eq!(cached.selection, direct.selection);
    assert_eq!(cached.ranking, direct.ranking);
    Ok(())
}
