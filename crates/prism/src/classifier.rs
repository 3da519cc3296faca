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

//! Depth-first discovery of chart-addressable metrics in an arbitrarily
//! shaped dataset.
//!
//! Each node is matched against a fixed sequence of shape tests. Nodes that
//! match a structured shape are never descended into, so every location in
//! the tree produces at most one family of descriptors. Anything that does
//! not match is skipped without error.

use crate::config::ClassifierConfig;
use crate::descriptor::{MetricDescriptor, MetricKind, ValueKind};
use crate::text;
use crate::value_type::detect_value_kind;
use serde_json::{Map, Value};
use tracing::{debug, instrument, trace};

const LABEL_FIELDS: &[&str] = &["connector", "label", "name"];
const ENTITY_NAME_FIELDS: &[&str] = &["name", "officialName"];

/// The structured shapes a node can take.
enum Shape<'a> {
    Scalar(f64),
    TimeSeries(&'a [Value]),
    GroupedSeries {
        dates: &'a [Value],
        series: &'a [Value],
    },
    EmbeddedMetricSet {
        items: &'a [Value],
        numeric_fields: Vec<String>,
    },
    DynamicKeyCollection {
        entries: &'a Map<String, Value>,
        numeric_fields: Vec<String>,
    },
    Array(&'a [Value]),
}

#[derive(Debug, Clone, Default)]
pub struct MetricClassifier {
    config: ClassifierConfig,
}
impl MetricClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classifies every metric under `dataset`. Non-object roots yield an
    /// empty list.
    #[instrument(level = "debug", skip_all, fields(max_depth = self.config.max_depth))]
    pub fn classify(&self, dataset: &Value) -> Vec<MetricDescriptor> {
        let mut descriptors = Vec::new();
        if let Value::Object(root) = dataset {
            self.walk(root, &[], &mut descriptors);
        }
        debug!(metric_count = descriptors.len(), "Classified dataset");
        descriptors
    }

    fn walk(&self, node: &Map<String, Value>, prefix: &[&str], out: &mut Vec<MetricDescriptor>) {
        for (key, value) in node {
            let mut segments = prefix.to_vec();
            segments.push(key.as_str());
            if segments.len() > self.config.max_depth {
                trace!(path = %segments.join("."), "Depth bound reached");
                continue;
            }
            let path = segments.join(".");
            match self.detect_shape(value) {
                Some(shape) => self.describe(&path, shape, out),
                None => {
                    if let Value::Object(child) = value {
                        self.walk(child, &segments, out);
                    }
                }
            }
        }
    }

    fn detect_shape<'a>(&self, value: &'a Value) -> Option<Shape<'a>> {
        match value {
            Value::Number(n) => n.as_f64().map(Shape::Scalar),
            Value::Array(items) if items.is_empty() => None,
            Value::Array(items) => {
                if items.iter().all(is_dated_point) {
                    return Some(Shape::TimeSeries(items));
                }
                if items.iter().all(Value::is_object) {
                    let numeric_fields = numeric_fields(&items[0], &["date"]);
                    return (!numeric_fields.is_empty()).then_some(Shape::EmbeddedMetricSet {
                        items,
                        numeric_fields,
                    });
                }
                let numeric_only = items.iter().all(|v| v.is_number() || v.is_null());
                (numeric_only && items.iter().any(Value::is_number)).then_some(Shape::Array(items))
            }
            Value::Object(map) if map.is_empty() => None,
            Value::Object(map) => {
                if let (Some(Value::Array(dates)), Some(Value::Array(series))) =
                    (map.get("dates"), map.get("values"))
                {
                    if series.iter().all(is_labelled_series) {
                        return Some(Shape::GroupedSeries { dates, series });
                    }
                }
                self.dynamic_key_fields(map)
                    .map(|numeric_fields| Shape::DynamicKeyCollection {
                        entries: map,
                        numeric_fields,
                    })
            }
            _ => None,
        }
    }

    /// Opaque keys (account ids, UUIDs) whose values all share one key set
    /// with at least one numeric field.
    fn dynamic_key_fields(&self, map: &Map<String, Value>) -> Option<Vec<String>> {
        let opaque = map.keys().all(|key| {
            key.len() >= self.config.dynamic_key_min_length
                && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
        if !opaque {
            return None;
        }
        let first = map.values().next()?.as_object()?;
        let uniform = map.values().all(|value| {
            value
                .as_object()
                .is_some_and(|obj| obj.len() == first.len() && obj.keys().all(|k| first.contains_key(k)))
        });
        if !uniform {
            return None;
        }
        let fields = numeric_fields(map.values().next()?, &[]);
        (!fields.is_empty()).then_some(fields)
    }

    fn describe(&self, path: &str, shape: Shape<'_>, out: &mut Vec<MetricDescriptor>) {
        let leaf = path.rsplit('.').next().unwrap_or(path);
        match shape {
            Shape::Scalar(value) => {
                let kind = detect_value_kind(leaf, Some(value));
                out.push(
                    MetricDescriptor::new(path, MetricKind::Scalar, kind)
                        .with_samples(vec![Value::from(value)]),
                );
            }
            Shape::TimeSeries(items) => {
                let samples = self.cap(items.iter().map(|item| item.get("value").cloned().unwrap_or(Value::Null)));
                let dates = items.iter().filter_map(|item| item.get("date")?.as_str().map(str::to_string)).collect();
                let kind = detect_value_kind(leaf, first_number(&samples));
                out.push(
                    MetricDescriptor::new(path, MetricKind::TimeSeries, kind)
                        .with_samples(samples)
                        .with_dates(dates),
                );
            }
            Shape::GroupedSeries { dates, series } => {
                let labels = series
                    .iter()
                    .map(|s| s.get("label").and_then(Value::as_str).unwrap_or_default().to_string())
                    .collect();
                let samples = self.cap(
                    series
                        .iter()
                        .filter_map(|s| s.get("values").and_then(Value::as_array))
                        .flatten()
                        .cloned(),
                );
                let dates = dates.iter().filter_map(|d| d.as_str().map(str::to_string)).collect();
                let kind = detect_value_kind(leaf, first_number(&samples));
                out.push(
                    MetricDescriptor::new(path, MetricKind::GroupedSeries, kind)
                        .with_samples(samples)
                        .with_dates(dates)
                        .with_grouping(labels),
                );
            }
            Shape::EmbeddedMetricSet { items, numeric_fields } => {
                let labels = items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| item_label(item, index))
                    .collect::<Vec<_>>();
                let records = items.iter().collect::<Vec<_>>();
                self.expand_container(
                    path,
                    MetricKind::EmbeddedMetricSet,
                    format!("containing {} metrics", numeric_fields.len()),
                    format!("from {path}"),
                    &records,
                    labels,
                    numeric_fields,
                    out,
                );
            }
            Shape::DynamicKeyCollection { entries, numeric_fields } => {
                let labels = entries
                    .iter()
                    .map(|(key, value)| {
                        ENTITY_NAME_FIELDS
                            .iter()
                            .find_map(|field| value.get(*field)?.as_str().filter(|s| !s.is_empty()))
                            .unwrap_or(key)
                            .to_string()
                    })
                    .collect::<Vec<_>>();
                let records = entries.values().collect::<Vec<_>>();
                self.expand_container(
                    path,
                    MetricKind::DynamicKeyCollection,
                    format!("with {} accounts", entries.len()),
                    format!("across {}", text::humanise(leaf)),
                    &records,
                    labels,
                    numeric_fields,
                    out,
                );
            }
            Shape::Array(items) => {
                let samples = self.cap(items.iter().cloned());
                out.push(
                    MetricDescriptor::new(path, MetricKind::Array, ValueKind::Generic)
                        .with_samples(samples),
                );
            }
        }
    }

    /// One container descriptor followed by one grouped series per numeric
    /// field, in field order.
    #[allow(clippy::too_many_arguments)]
    fn expand_container(
        &self,
        path: &str,
        kind: MetricKind,
        container_suffix: String,
        field_suffix: String,
        records: &[&Value],
        labels: Vec<String>,
        numeric_fields: Vec<String>,
        out: &mut Vec<MetricDescriptor>,
    ) {
        let mut container = MetricDescriptor::new(path, kind, ValueKind::Generic).with_grouping(labels.clone());
        container.description = format!("{} {container_suffix}", container.description);
        container.embedded_field_names = numeric_fields.clone();
        out.push(container);

        for field in numeric_fields {
            let samples = self.cap(records.iter().map(|record| record.get(&field).cloned().unwrap_or(Value::Null)));
            let kind = detect_value_kind(&field, first_number(&samples));
            let mut descriptor = MetricDescriptor::new(format!("{path}.{field}"), MetricKind::GroupedSeries, kind)
                .with_samples(samples)
                .with_grouping(labels.clone());
            descriptor.description = format!("{} {field_suffix}", descriptor.description);
            descriptor.container = Some(path.to_string());
            out.push(descriptor);
        }
    }

    fn cap(&self, values: impl Iterator<Item = Value>) -> Vec<Value> {
        values.take(self.config.max_sample_values).collect()
    }
}

fn is_dated_point(value: &Value) -> bool {
    value.as_object().is_some_and(|obj| obj.contains_key("date") && obj.contains_key("value"))
}

fn is_labelled_series(value: &Value) -> bool {
    value.as_object().is_some_and(|obj| obj.get("values").is_some_and(Value::is_array))
}

fn numeric_fields(record: &Value, excluded: &[&str]) -> Vec<String> {
    record
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter(|(key, value)| value.is_number() && !excluded.contains(&key.as_str()))
                .map(|(key, _)| key.clone())
                .collect()
        })
        .unwrap_or_default()
}

/// Explicit label field, then the first other non-date string field, then a
/// synthetic 1-based category name.
fn item_label(item: &Value, index: usize) -> String {
    let explicit = LABEL_FIELDS
        .iter()
        .find_map(|field| item.get(*field)?.as_str().filter(|s| !s.is_empty()));
    let secondary = || {
        item.as_object()?
            .iter()
            .filter(|(key, _)| key.as_str() != "date")
            .find_map(|(_, value)| value.as_str().filter(|s| !s.is_empty()))
    };
    explicit
        .or_else(secondary)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Category {}", index + 1))
}

fn first_number(samples: &[Value]) -> Option<f64> {
    samples.iter().find_map(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify(value: Value) -> Vec<MetricDescriptor> {
        MetricClassifier::default().classify(&value)
    }

    #[test]
    fn time_series_of_dated_points() {
        let metrics = classify(json!({
            "revenue": [{"date": "2025-01", "value": 100}, {"date": "2025-02", "value": 150}]
        }));
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].path, "revenue");
        assert_eq!(metrics[0].kind, MetricKind::TimeSeries);
        assert_eq!(metrics[0].value_kind, ValueKind::Currency);
        assert!(metrics[0].has_time_dimension);
        assert_eq!(metrics[0].dates, vec!["2025-01", "2025-02"]);
    }

    #[test]
    fn grouped_series_with_labels() {
        let metrics = classify(json!({
            "sales": {
                "dates": ["2025-01", "2025-02"],
                "values": [
                    {"label": "Online", "values": [1, 2]},
                    {"label": "Retail", "values": [3, null]}
                ]
            }
        }));
        assert_eq!(metrics.len(), 1);
        let grouped = &metrics[0];
        assert_eq!(grouped.kind, MetricKind::GroupedSeries);
        assert!(grouped.has_time_dimension && grouped.has_grouping_dimension);
        assert_eq!(grouped.grouping_labels, vec!["Online", "Retail"]);
        assert_eq!(grouped.numeric_samples().len(), 4);
    }

    #[test]
    fn embedded_metric_set_expands_numeric_fields() {
        let metrics = classify(json!({
            "dataBySalesConnectors": [
                {"connector": "Shopify", "grossSales": 100.0, "orders": 4, "date": 20250101},
                {"connector": "Amazon", "grossSales": 80.0, "orders": 2, "date": 20250101}
            ]
        }));
        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics[0].kind, MetricKind::EmbeddedMetricSet);
        assert_eq!(metrics[0].embedded_field_names, vec!["grossSales", "orders"]);
        assert_eq!(metrics[1].path, "dataBySalesConnectors.grossSales");
        assert_eq!(metrics[1].grouping_labels, vec!["Shopify", "Amazon"]);
        assert_eq!(metrics[2].value_kind, ValueKind::Count);
        assert_eq!(metrics[2].container.as_deref(), Some("dataBySalesConnectors"));
    }

    #[test]
    fn label_fallback_chain() {
        let metrics = classify(json!({
            "segments": [{"region": "North", "amount": 1}, {"amount": 2}]
        }));
        assert_eq!(metrics[0].grouping_labels, vec!["North", "Category 2"]);
    }

    #[test]
    fn dynamic_key_collection_prefers_entity_names() {
        let metrics = classify(json!({
            "cashDetails": {
                "a1b2c3d4e5f6g7h8i9j0k": {"name": "Operating", "balance": 10.0},
                "f3e2d1c0-b9a8-7766-5544": {"name": "", "balance": 4.0}
            }
        }));
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].kind, MetricKind::DynamicKeyCollection);
        assert_eq!(
            metrics[0].grouping_labels,
            vec!["Operating", "f3e2d1c0-b9a8-7766-5544"]
        );
        assert_eq!(metrics[1].path, "cashDetails.balance");
        assert_eq!(metrics[1].value_kind, ValueKind::Currency);
    }

    #[test]
    fn dynamic_key_collection_expands_every_numeric_field() {
        let metrics = classify(json!({
            "accountBalances": {
                "acct-0001-aaaa-bbbb-cccc": {"name": "Checking", "balance": 10.0, "credits": 3, "debits": 2},
                "acct-0002-aaaa-bbbb-cccc": {"name": "Savings", "balance": 25.5, "credits": 1, "debits": 0},
                "acct-0003-aaaa-bbbb-cccc": {"name": "Payroll", "balance": 4.0, "credits": 7, "debits": 9}
            }
        }));
        let kinds = metrics.iter().map(|m| (m.path.as_str(), m.kind)).collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                ("accountBalances", MetricKind::DynamicKeyCollection),
                ("accountBalances.balance", MetricKind::GroupedSeries),
                ("accountBalances.credits", MetricKind::GroupedSeries),
                ("accountBalances.debits", MetricKind::GroupedSeries),
            ]
        );
        assert_eq!(metrics[0].embedded_field_names, vec!["balance", "credits", "debits"]);
        for field in &metrics[1..] {
            assert_eq!(field.grouping_labels, vec!["Checking", "Savings", "Payroll"]);
            assert_eq!(field.container.as_deref(), Some("accountBalances"));
            assert_eq!(field.sample_values.len(), 3);
        }
        assert_eq!(metrics[3].sample_values, vec![json!(2), json!(0), json!(9)]);
    }

    #[test]
    fn short_keys_recurse_instead() {
        let metrics = classify(json!({
            "summary": {"netIncome": 5, "cash": {"balance": 3}}
        }));
        let paths = metrics.iter().map(|m| m.path.as_str()).collect::<Vec<_>>();
        assert_eq!(paths, vec!["summary.cash.balance", "summary.netIncome"]);
    }

    #[test]
    fn skips_strings_nulls_and_empty_containers() {
        let metrics = classify(json!({
            "note": "123",
            "missing": null,
            "flag": true,
            "list": [],
            "map": {},
            "labels": ["a", "b"]
        }));
        assert!(metrics.is_empty());
    }

    #[test]
    fn depth_is_bounded_by_path_length() {
        let classifier = MetricClassifier::new(ClassifierConfig {
            max_depth: 2,
            ..Default::default()
        });
        let metrics = classifier.classify(&json!({"a": {"b": {"c": 1}, "d": 2}}));
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].path, "a.d");
    }

    #[test]
    fn non_object_root_is_empty() {
        assert!(classify(json!([1, 2, 3])).is_empty());
        assert!(classify(Value::Null).is_empty());
    }
}
