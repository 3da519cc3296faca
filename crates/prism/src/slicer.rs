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

//! Turns a classified metric back into chart-ready series, optionally
//! restricted to a date range.

use crate::descriptor::{MetricDescriptor, MetricKind};
use crate::error::{DatasetError, DatasetResult};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, instrument};

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})$").unwrap());
static MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})$").unwrap());
static DAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// A date filter as accepted by the loader and the slicer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateRange {
    Year(i32),
    Month { year: i32, month: u32 },
    Day(NaiveDate),
    /// Two ISO dates or timestamps separated by a comma, kept verbatim.
    Custom { start: String, end: String },
}

impl DateRange {
    pub fn parse(value: &str) -> DatasetResult<Self> {
        let value = value.trim();
        let invalid = || DatasetError::InvalidDateRange {
            value: value.to_string(),
        };
        if let Some(caps) = YEAR.captures(value) {
            return caps[1].parse().map(DateRange::Year).map_err(|_| invalid());
        }
        if let Some(caps) = MONTH.captures(value) {
            let year: i32 = caps[1].parse().map_err(|_| invalid())?;
            let month: u32 = caps[2].parse().map_err(|_| invalid())?;
            NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
            return Ok(DateRange::Month { year, month });
        }
        if DAY.is_match(value) {
            return NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(DateRange::Day)
                .map_err(|_| invalid());
        }
        if let Some((start, end)) = value.split_once(',') {
            let (start, end) = (start.trim(), end.trim());
            let start_day = parse_day_prefix(start).ok_or_else(invalid)?;
            let end_day = parse_day_prefix(end).ok_or_else(invalid)?;
            if start_day > end_day {
                return Err(invalid());
            }
            return Ok(DateRange::Custom {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Err(invalid())
    }

    /// ISO timestamp bounds covering the whole range.
    pub fn bounds(&self) -> (String, String) {
        let span = |first: NaiveDate, last: NaiveDate| {
            (
                format!("{}T00:00:00.000Z", first.format("%Y-%m-%d")),
                format!("{}T23:59:59.999Z", last.format("%Y-%m-%d")),
            )
        };
        match self {
            DateRange::Year(year) => span(
                NaiveDate::from_ymd_opt(*year, 1, 1).unwrap_or_default(),
                NaiveDate::from_ymd_opt(*year, 12, 31).unwrap_or_default(),
            ),
            DateRange::Month { year, month } => {
                let first = NaiveDate::from_ymd_opt(*year, *month, 1).unwrap_or_default();
                span(first, last_day_of_month(first))
            }
            DateRange::Day(day) => span(*day, *day),
            DateRange::Custom { start, end } => (start.clone(), end.clone()),
        }
    }

    /// Prefix match for calendar ranges, inclusive day comparison for custom
    /// ranges. Dates are compared as ISO strings.
    pub fn contains(&self, date: &str) -> bool {
        match self {
            DateRange::Custom { start, end } => {
                let day = day_part(date);
                !day.is_empty() && day_part(start) <= day && day <= day_part(end)
            }
            calendar => date.starts_with(&calendar.to_string()),
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateRange::Year(year) => write!(f, "{year:04}"),
            DateRange::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            DateRange::Day(day) => write!(f, "{}", day.format("%Y-%m-%d")),
            DateRange::Custom { start, end } => write!(f, "{start},{end}"),
        }
    }
}

fn day_part(value: &str) -> &str {
    value.split('T').next().unwrap_or_default()
}

fn parse_day_prefix(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(day_part(value), "%Y-%m-%d").ok()
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesData {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

/// Chart-ready data: one category axis shared by every series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub categories: Vec<String>,
    pub series: Vec<SeriesData>,
}
impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
    fn single(categories: Vec<String>, label: &str, values: Vec<Option<f64>>) -> Self {
        Self {
            categories,
            series: vec![SeriesData {
                label: label.to_string(),
                values,
            }],
        }
    }
}

/// Case-insensitive exact path match first, then containment either way.
pub fn find_metric<'a>(descriptors: &'a [MetricDescriptor], name: &str) -> DatasetResult<&'a MetricDescriptor> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return Err(DatasetError::EmptyMetricName);
    }
    descriptors
        .iter()
        .find(|d| d.path.to_lowercase() == wanted)
        .or_else(|| {
            descriptors.iter().find(|d| {
                let path = d.path.to_lowercase();
                path.contains(&wanted) || wanted.contains(&path)
            })
        })
        .ok_or_else(|| DatasetError::MetricNotFound {
            metric: name.to_string(),
            available: descriptors.iter().map(|d| d.path.clone()).collect(),
        })
}

/// Follows a dot-joined key path through nested objects.
pub fn resolve_path<'a>(dataset: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(dataset, |node, key| node.as_object()?.get(key))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricSlicer;

impl MetricSlicer {
    pub fn new() -> Self {
        Self
    }

    #[instrument(level = "debug", skip_all, fields(path = %descriptor.path, kind = %descriptor.kind))]
    pub fn slice(
        &self,
        dataset: &Value,
        descriptor: &MetricDescriptor,
        range: Option<&DateRange>,
    ) -> DatasetResult<ChartSeries> {
        let sliced = match descriptor.kind {
            MetricKind::Scalar => {
                let value = self.node(dataset, &descriptor.path, "number")?;
                ChartSeries::single(vec!["Total".to_string()], &descriptor.description, vec![value.as_f64()])
            }
            MetricKind::TimeSeries => {
                let items = self.array(dataset, &descriptor.path)?;
                let points = items
                    .iter()
                    .filter_map(|item| Some((item.get("date")?.as_str()?, item.get("value"))))
                    .filter(|(date, _)| range.map_or(true, |r| r.contains(date)))
                    .collect::<Vec<_>>();
                ChartSeries::single(
                    points.iter().map(|(date, _)| date.to_string()).collect(),
                    &descriptor.description,
                    points.iter().map(|(_, value)| value.and_then(Value::as_f64)).collect(),
                )
            }
            MetricKind::GroupedSeries => match &descriptor.container {
                Some(container) => self.expanded_field(dataset, descriptor, container)?,
                None => self.grouped(dataset, descriptor, range)?,
            },
            MetricKind::Array => {
                let items = self.array(dataset, &descriptor.path)?;
                ChartSeries::single(
                    (1..=items.len()).map(|i| format!("Item {i}")).collect(),
                    &descriptor.description,
                    items.iter().map(Value::as_f64).collect(),
                )
            }
            MetricKind::EmbeddedMetricSet => {
                let items = self.array(dataset, &descriptor.path)?;
                ChartSeries {
                    categories: descriptor.grouping_labels.clone(),
                    series: descriptor
                        .embedded_field_names
                        .iter()
                        .map(|field| SeriesData {
                            label: field.clone(),
                            values: items.iter().map(|item| item.get(field).and_then(Value::as_f64)).collect(),
                        })
                        .collect(),
                }
            }
            MetricKind::DynamicKeyCollection => {
                let entries = self.object(dataset, &descriptor.path)?;
                match descriptor.embedded_field_names.first() {
                    Some(field) => ChartSeries::single(
                        descriptor.grouping_labels.clone(),
                        &format!("{field} by account"),
                        entries.values().map(|entry| entry.get(field).and_then(Value::as_f64)).collect(),
                    ),
                    None => ChartSeries::default(),
                }
            }
        };
        debug!(categories = sliced.categories.len(), series = sliced.series.len(), "Sliced metric");
        Ok(sliced)
    }

    /// Looks the metric up by name and slices it.
    pub fn slice_by_name(
        &self,
        dataset: &Value,
        descriptors: &[MetricDescriptor],
        name: &str,
        range: Option<&DateRange>,
    ) -> DatasetResult<ChartSeries> {
        let descriptor = find_metric(descriptors, name)?;
        self.slice(dataset, descriptor, range)
    }

    /// `{dates, values: [{label, values}]}` with dates filtered by position.
    fn grouped(&self, dataset: &Value, descriptor: &MetricDescriptor, range: Option<&DateRange>) -> DatasetResult<ChartSeries> {
        let node = self.node(dataset, &descriptor.path, "grouped series")?;
        let dates = node.get("dates").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
        let series = node.get("values").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
        let kept = dates
            .iter()
            .enumerate()
            .filter_map(|(index, date)| {
                let date = date.as_str()?;
                range.map_or(true, |r| r.contains(date)).then_some((index, date.to_string()))
            })
            .collect::<Vec<_>>();
        Ok(ChartSeries {
            categories: kept.iter().map(|(_, date)| date.clone()).collect(),
            series: series
                .iter()
                .map(|entry| {
                    let values = entry.get("values").and_then(Value::as_array);
                    SeriesData {
                        label: entry.get("label").and_then(Value::as_str).unwrap_or_default().to_string(),
                        values: kept
                            .iter()
                            .map(|(index, _)| values.and_then(|v| v.get(*index)).and_then(Value::as_f64))
                            .collect(),
                    }
                })
                .collect(),
        })
    }

    /// A single numeric field pulled out of an embedded set or a dynamic-key
    /// collection; categories are the container's grouping labels.
    fn expanded_field(&self, dataset: &Value, descriptor: &MetricDescriptor, container: &str) -> DatasetResult<ChartSeries> {
        let field = descriptor.leaf_name();
        let records: Vec<&Value> = match self.node(dataset, container, "container")? {
            Value::Array(items) => items.iter().collect(),
            Value::Object(entries) => entries.values().collect(),
            _ => {
                return Err(DatasetError::ShapeMismatch {
                    path: container.to_string(),
                    expected: "container".to_string(),
                })
            }
        };
        Ok(ChartSeries::single(
            descriptor.grouping_labels.clone(),
            &descriptor.description,
            records.iter().map(|record| record.get(field).and_then(Value::as_f64)).collect(),
        ))
    }

    fn node<'a>(&self, dataset: &'a Value, path: &str, expected: &str) -> DatasetResult<&'a Value> {
        resolve_path(dataset, path).ok_or_else(|| DatasetError::ShapeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
        })
    }

    fn array<'a>(&self, dataset: &'a Value, path: &str) -> DatasetResult<&'a Vec<Value>> {
        self.node(dataset, path, "array")?
            .as_array()
            .ok_or_else(|| DatasetError::ShapeMismatch {
                path: path.to_string(),
                expected: "array".to_string(),
            })
    }

    fn object<'a>(&self, dataset: &'a Value, path: &str) -> DatasetResult<&'a serde_json::Map<String, Value>> {
        self.node(dataset, path, "object")?
            .as_object()
            .ok_or_else(|| DatasetError::ShapeMismatch {
                path: path.to_string(),
                expected: "object".to_string(),
            })
    }
}
