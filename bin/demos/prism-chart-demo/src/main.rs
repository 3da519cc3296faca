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

use anyhow::Context;
use clap::Parser;
use prism::{
    AnalysisOptions, ChartDecision, ChartReasoningSystem, ChartSeries, Dashboard, DateRange,
    ErrorReporter, MetricSlicer, ReasoningError,
};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "prism-chart-demo", about = "Pick a metric and chart for a finance dataset")]
struct Cli {
    /// JSON dataset to analyse.
    #[arg(long)]
    data: PathBuf,
    #[arg(long)]
    prompt: String,
    /// YAML file overriding the default thresholds.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    max_metrics: Option<usize>,
    #[arg(long)]
    top_k: Option<usize>,
    #[arg(long)]
    no_trace: bool,
    /// Print the whole decision as JSON.
    #[arg(long)]
    json: bool,
    /// YYYY, YYYY-MM, YYYY-MM-DD or "start,end"; filters the sliced series.
    #[arg(long)]
    date_range: Option<String>,
    /// Build a multi-chart dashboard instead of a single decision.
    #[arg(long)]
    dashboard: bool,
    /// Dashboard size; defaults to the configured limit.
    #[arg(long)]
    max_charts: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if cli.dashboard {
        let dashboard = match run_dashboard(&cli) {
            Ok(dashboard) => dashboard,
            Err(error) => {
                eprint!("{}", ErrorReporter::new().report(&error));
                std::process::exit(1);
            }
        };
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&dashboard).context("Failed to render dashboard as JSON")?
            );
        } else {
            print_dashboard(&dashboard);
        }
        return Ok(());
    }

    let (decision, series) = match run(&cli) {
        Ok(result) => result,
        Err(error) => {
            eprint!("{}", ErrorReporter::new().report(&error));
            std::process::exit(1);
        }
    };

    if cli.json {
        let output = serde_json::json!({ "decision": decision, "series": series });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to render decision as JSON")?
        );
    } else {
        print_decision(&decision, series.as_ref());
    }
    Ok(())
}

fn load(cli: &Cli) -> Result<(ChartReasoningSystem, Value), ReasoningError> {
    let system = match &cli.config {
        Some(path) => ChartReasoningSystem::from_yaml_file(path)?,
        None => ChartReasoningSystem::default(),
    };
    info!(path = %cli.data.display(), "Loading dataset");
    let raw = std::fs::read_to_string(&cli.data)?;
    let dataset: Value = serde_json::from_str(&raw)?;
    Ok((system, dataset))
}

fn run_dashboard(cli: &Cli) -> Result<Dashboard, ReasoningError> {
    let (system, dataset) = load(cli)?;
    let max_charts = cli
        .max_charts
        .unwrap_or(system.config().dashboard.default_max_charts);
    Ok(system.dashboard(&dataset, &cli.prompt, max_charts))
}

fn run(cli: &Cli) -> Result<(ChartDecision, Option<ChartSeries>), ReasoningError> {
    let range = cli.date_range.as_deref().map(DateRange::parse).transpose()?;
    let (system, dataset) = load(cli)?;
    let options = AnalysisOptions {
        max_metrics: cli.max_metrics,
        top_k: cli.top_k,
        include_trace: !cli.no_trace,
        intent: None,
    };
    let decision = system.analyse(&dataset, &cli.prompt, &options);

    let series = match &decision.selection {
        Some(selection) => Some(MetricSlicer::new().slice_by_name(
            &dataset,
            &decision.descriptors,
            &selection.metric_path,
            range.as_ref(),
        )?),
        None => {
            warn!("No metric matched the prompt");
            None
        }
    };
    Ok((decision, series))
}

fn print_decision(decision: &ChartDecision, series: Option<&ChartSeries>) {
    println!("{}", decision.overview.report());
    println!("Intent: {}", decision.intent.summary());

    match &decision.selection {
        Some(selection) => println!(
            "\nSelected: {} as {} ({})",
            selection.metric_path,
            selection.chart.display_name(),
            selection.title
        ),
        None => println!("\nNo metric matched the request."),
    }

    if decision.suggestions.is_empty() {
        println!("\nNo viable chart suggestions.");
    } else {
        println!("\nChart suggestions:");
        for candidate in &decision.suggestions {
            println!(
                "  {:<12} {:.2}  {}",
                candidate.chart_kind.as_str(),
                candidate.confidence,
                candidate.rationale
            );
        }
    }

    println!("\nRanking:");
    for (position, ranked) in decision.ranking.rankings.iter().enumerate() {
        println!(
            "  {}. {:<12} score {:.2}  confidence {:.2}",
            position + 1,
            ranked.chart_kind.as_str(),
            ranked.score,
            ranked.confidence
        );
    }

    if let Some(series) = series {
        println!("\nSeries ({} categories):", series.categories.len());
        for data in &series.series {
            let values = data
                .values
                .iter()
                .map(|v| v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}")))
                .collect::<Vec<_>>();
            println!("  {}: {}", data.label, values.join(", "));
        }
    }

    if !decision.trace.is_empty() {
        println!("\nReasoning:\n{}", decision.trace);
    }
}

fn print_dashboard(dashboard: &Dashboard) {
    if let Some(notice) = &dashboard.notice {
        println!("{notice}");
        return;
    }
    println!("Dashboard ({} charts):", dashboard.charts.len());
    for chart in &dashboard.charts {
        println!(
            "  [{},{}] {:<12} {:.2}  {} ({})",
            chart.row,
            chart.col,
            chart.chart.as_str(),
            chart.confidence,
            chart.title,
            chart.metric_path
        );
    }
    for insight in &dashboard.insights {
        println!("  * {insight}");
    }
}
