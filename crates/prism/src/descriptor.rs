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

use crate::text;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Structural shape of a metric. Derived from the data's shape only, never
/// from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    Scalar,
    TimeSeries,
    GroupedSeries,
    Array,
    DynamicKeyCollection,
    EmbeddedMetricSet,
}
impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Scalar => "scalar",
            MetricKind::TimeSeries => "timeSeries",
            MetricKind::GroupedSeries => "groupedSeries",
            MetricKind::Array => "array",
            MetricKind::DynamicKeyCollection => "dynamicKeyCollection",
            MetricKind::EmbeddedMetricSet => "embeddedMetricSet",
        }
    }
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            MetricKind::DynamicKeyCollection | MetricKind::EmbeddedMetricSet
        )
    }
    fn description_template(&self, words: &str) -> String {
        match self {
            MetricKind::Scalar => format!("Total {words}"),
            MetricKind::TimeSeries => format!("{words} over time"),
            MetricKind::GroupedSeries => format!("{words} broken down by category"),
            MetricKind::Array => format!("{words} data points"),
            MetricKind::DynamicKeyCollection => format!("{words} breakdown by account/entity"),
            MetricKind::EmbeddedMetricSet => format!("{words} with multiple metrics"),
        }
    }
}
impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Currency,
    Percentage,
    Count,
    Generic,
}
impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Currency => "currency",
            ValueKind::Percentage => "percentage",
            ValueKind::Count => "count",
            ValueKind::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDescriptor {
    /// Dot-joined key path; unique within one classification pass.
    pub path: String,
    pub kind: MetricKind,
    pub has_time_dimension: bool,
    pub has_grouping_dimension: bool,
    pub grouping_labels: Vec<String>,
    pub value_kind: ValueKind,
    pub sample_values: Vec<Value>,
    pub description: String,
    pub business_name: String,
    pub embedded_field_names: Vec<String>,
    pub dates: Vec<String>,
    /// Container path when this descriptor was expanded from an embedded
    /// metric set or dynamic-key collection.
    pub container: Option<String>,
}
impl MetricDescriptor {
    pub fn new(path: impl Into<String>, kind: MetricKind, value_kind: ValueKind) -> Self {
        let path = path.into();
        let leaf = path.rsplit('.').next().unwrap_or_default().to_string();
        Self {
            description: kind.description_template(&text::humanise(&leaf)),
            business_name: text::title_case(&leaf),
            path,
            kind,
            has_time_dimension: false,
            has_grouping_dimension: false,
            grouping_labels: Vec::new(),
            value_kind,
            sample_values: Vec::new(),
            embedded_field_names: Vec::new(),
            dates: Vec::new(),
            container: None,
        }
    }
    pub fn with_samples(mut self, samples: Vec<Value>) -> Self {
        self.sample_values = samples;
        self
    }
    pub fn with_dates(mut self, dates: Vec<String>) -> Self {
        self.has_time_dimension = true;
        self.dates = dates;
        self
    }
    pub fn with_grouping(mut self, labels: Vec<String>) -> Self {
        self.has_grouping_dimension = !labels.is_empty();
        self.grouping_labels = labels;
        self
    }
    pub fn leaf_name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }
    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }
    pub fn distinct_group_count(&self) -> usize {
        self.grouping_labels.iter().collect::<HashSet<_>>().len()
    }
    /// Numeric samples with nulls kept as `None`; non-numeric values are
    /// dropped entirely.
    pub fn numeric_samples(&self) -> Vec<Option<f64>> {
        self.sample_values
            .iter()
            .filter_map(|value| match value {
                Value::Null => Some(None),
                Value::Number(n) => n.as_f64().map(Some),
                _ => None,
            })
            .collect()
    }
    pub fn name_tokens(&self) -> Vec<String> {
        let mut tokens = text::split_identifier(&self.path);
        tokens.dedup();
        tokens
    }
    pub fn mentions_change(&self) -> bool {
        let lower = self.path.to_lowercase();
        lower.contains("change") || lower.contains("delta")
    }
}
impl std::fmt::Display for MetricDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.path,
            self.kind,
            self.value_kind.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn derives_names_from_leaf_segment() {
        let descriptor = MetricDescriptor::new(
            "dataBySalesConnectors.grossSales",
            MetricKind::GroupedSeries,
            ValueKind::Currency,
        );
        assert_eq!(descriptor.leaf_name(), "grossSales");
        assert_eq!(descriptor.business_name, "Gross Sales");
        assert_eq!(descriptor.description, "gross sales broken down by category");
    }

    #[test]
    fn numeric_samples_keep_nulls_and_drop_strings() {
        let descriptor = MetricDescriptor::new("revenue", MetricKind::TimeSeries, ValueKind::Currency)
            .with_samples(vec![json!(1.5), Value::Null, json!("12"), json!(3)]);
        assert_eq!(descriptor.numeric_samples(), vec![Some(1.5), None, Some(3.0)]);
    }

    #[test]
    fn kind_serialises_camel_case() {
        assert_eq!(
            serde_json::to_string(&MetricKind::DynamicKeyCollection).unwrap(),
            "\"dynamicKeyCollection\""
        );
    }
}
