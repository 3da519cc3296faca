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

use crate::descriptor::{MetricDescriptor, MetricKind, ValueKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

const YEAR_SEARCH_DEPTH: usize = 3;
const YEAR_SEARCH_ITEMS: usize = 3;
const YEAR_SEARCH_KEYS: usize = 10;

/// Shape-level summary of a classified dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub total_metrics: usize,
    pub kind_counts: BTreeMap<String, usize>,
    pub time_dimensioned: usize,
    pub grouped: usize,
    pub currency_metrics: Vec<String>,
    pub percentage_metrics: Vec<String>,
    pub count_metrics: Vec<String>,
    pub data_year: Option<String>,
    pub description: String,
}

impl DatasetOverview {
    pub fn build(dataset: &Value, descriptors: &[MetricDescriptor]) -> Self {
        let mut kind_counts = BTreeMap::new();
        for descriptor in descriptors {
            *kind_counts.entry(descriptor.kind.as_str().to_string()).or_insert(0) += 1;
        }
        let paths_of = |value_kind: ValueKind| {
            descriptors
                .iter()
                .filter(|d| d.value_kind == value_kind && !d.is_container())
                .map(|d| d.path.clone())
                .collect::<Vec<_>>()
        };
        let mut overview = Self {
            total_metrics: descriptors.len(),
            time_dimensioned: descriptors.iter().filter(|d| d.has_time_dimension).count(),
            grouped: descriptors.iter().filter(|d| d.has_grouping_dimension).count(),
            currency_metrics: paths_of(ValueKind::Currency),
            percentage_metrics: paths_of(ValueKind::Percentage),
            count_metrics: paths_of(ValueKind::Count),
            data_year: detect_year(dataset, 0),
            kind_counts,
            description: String::new(),
        };
        overview.description = overview.describe();
        overview
    }

    pub fn count_of(&self, kind: MetricKind) -> usize {
        self.kind_counts.get(kind.as_str()).copied().unwrap_or(0)
    }

    fn describe(&self) -> String {
        let mut sentences = vec![format!("This dataset contains {} metrics.", self.total_metrics)];
        if self.time_dimensioned > 0 {
            sentences.push(format!(
                "There are {} time-series metrics that show trends over time.",
                self.time_dimensioned
            ));
        }
        if self.grouped > 0 {
            sentences.push(format!(
                "There are {} grouped metrics that can be broken down by categories.",
                self.grouped
            ));
        }
        let scalars = self.count_of(MetricKind::Scalar);
        if scalars > 0 {
            sentences.push(format!("There are {scalars} summary/total metrics."));
        }
        let containers = self.count_of(MetricKind::EmbeddedMetricSet) + self.count_of(MetricKind::DynamicKeyCollection);
        if containers > 0 {
            sentences.push(format!(
                "There are {containers} complex metrics with embedded sub-metrics or account-level breakdowns."
            ));
        }
        for (label, paths) in [
            ("Currency", &self.currency_metrics),
            ("Percentage", &self.percentage_metrics),
            ("Count", &self.count_metrics),
        ] {
            if !paths.is_empty() {
                sentences.push(format!("{label} metrics include: {}.", paths.join(", ")));
            }
        }
        if let Some(year) = &self.data_year {
            sentences.push(format!(
                "Data appears to be from {year}. Use {year} for date ranges unless told otherwise."
            ));
        }
        sentences.join(" ")
    }

    /// Multi-line report for terminals.
    pub fn report(&self) -> String {
        let mut out = String::from("Dataset overview\n");
        out.push_str(&format!("  metrics:          {}\n", self.total_metrics));
        for (kind, count) in &self.kind_counts {
            out.push_str(&format!("    {kind:<22}{count}\n"));
        }
        out.push_str(&format!("  time dimensioned: {}\n", self.time_dimensioned));
        out.push_str(&format!("  grouped:          {}\n", self.grouped));
        if let Some(year) = &self.data_year {
            out.push_str(&format!("  data year:        {year}\n"));
        }
        out
    }
}

impl fmt::Display for DatasetOverview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// First year found in a `date` field or a `dates` array, looking only a
/// few levels deep.
fn detect_year(value: &Value, depth: usize) -> Option<String> {
    if depth > YEAR_SEARCH_DEPTH {
        return None;
    }
    match value {
        Value::Array(items) => items
            .iter()
            .take(YEAR_SEARCH_ITEMS)
            .find_map(|item| item.get("date").and_then(year_prefix)),
        Value::Object(map) => {
            let from_dates = map
                .get("dates")
                .and_then(Value::as_array)
                .and_then(|dates| dates.first())
                .and_then(year_prefix);
            from_dates.or_else(|| {
                map.values()
                    .take(YEAR_SEARCH_KEYS)
                    .find_map(|child| detect_year(child, depth + 1))
            })
        }
        _ => None,
    }
}

fn year_prefix(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (text.len() >= 4 && text.is_char_boundary(4)).then(|| text[..4].to_string())
}
