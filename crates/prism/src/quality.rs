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

use crate::config::QualityConfig;
use crate::descriptor::{MetricDescriptor, MetricKind};
use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualitySeverity {
    None,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricQuality {
    pub path: String,
    pub total_samples: usize,
    pub null_count: usize,
    pub completeness: f64,
    pub outliers: Vec<f64>,
    pub insufficient_data: bool,
    pub severity: QualitySeverity,
}
impl MetricQuality {
    pub fn null_ratio(&self) -> f64 {
        if self.total_samples == 0 {
            0.0
        } else {
            self.null_count as f64 / self.total_samples as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierRecord {
    pub path: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeGap {
    pub from: String,
    pub to: String,
    pub days: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub completeness: f64,
    pub consistency: bool,
    pub outliers: Vec<OutlierRecord>,
    pub gaps: Vec<TimeGap>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub metrics: Vec<MetricQuality>,
}
impl DataQualityReport {
    pub fn for_metric(&self, path: &str) -> Option<&MetricQuality> {
        self.metrics.iter().find(|m| m.path == path)
    }
    /// Severity for a path; unknown paths (containers) count as clean.
    pub fn severity_of(&self, path: &str) -> QualitySeverity {
        self.for_metric(path)
            .map(|m| m.severity)
            .unwrap_or(QualitySeverity::None)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DataQualityAssessor {
    config: QualityConfig,
}
impl DataQualityAssessor {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    #[instrument(level = "debug", skip_all, fields(metric_count = descriptors.len()))]
    pub fn assess(&self, descriptors: &[MetricDescriptor]) -> DataQualityReport {
        let mut report = DataQualityReport {
            consistency: true,
            ..Default::default()
        };
        let (mut total, mut present) = (0usize, 0usize);

        for descriptor in descriptors.iter().filter(|d| !d.is_container()) {
            let quality = self.assess_metric(descriptor);
            total += quality.total_samples;
            present += quality.total_samples - quality.null_count;

            let null_ratio = quality.null_ratio();
            if null_ratio > self.config.max_null_ratio {
                report.consistency = false;
                report.issues.push(format!(
                    "{}: {:.0}% missing data",
                    quality.path,
                    null_ratio * 100.0
                ));
                report.recommendations.push(format!(
                    "Fill or exclude missing values in {} before charting",
                    quality.path
                ));
            }
            if !quality.outliers.is_empty() {
                report.issues.push(format!(
                    "{}: {} outlier value(s) detected",
                    quality.path,
                    quality.outliers.len()
                ));
                report
                    .recommendations
                    .push(format!("Review outliers in {} for data entry errors", quality.path));
                report.outliers.extend(quality.outliers.iter().map(|&value| OutlierRecord {
                    path: quality.path.clone(),
                    value,
                }));
            }
            if quality.insufficient_data {
                report.issues.push(format!(
                    "{}: insufficient data ({} samples)",
                    quality.path,
                    quality.total_samples - quality.null_count
                ));
                report
                    .recommendations
                    .push(format!("Collect more data points for {}", quality.path));
            }
            report.metrics.push(quality);
        }

        report.completeness = if total == 0 {
            0.0
        } else {
            round2(present as f64 / total as f64)
        };
        report.gaps = self.detect_gaps(descriptors);
        for gap in &report.gaps {
            report.issues.push(format!(
                "Time gap of {} days between {} and {}",
                gap.days, gap.from, gap.to
            ));
        }
        if !report.gaps.is_empty() {
            report
                .recommendations
                .push("Check the source for missing reporting periods".to_string());
        }
        debug!(
            completeness = report.completeness,
            consistency = report.consistency,
            issue_count = report.issues.len(),
            "Assessed data quality"
        );
        report
    }

    pub fn assess_metric(&self, descriptor: &MetricDescriptor) -> MetricQuality {
        let samples = descriptor.numeric_samples();
        let values = samples.iter().flatten().copied().collect::<Vec<_>>();
        let total_samples = samples.len();
        let null_count = total_samples - values.len();
        let completeness = if total_samples == 0 {
            0.0
        } else {
            values.len() as f64 / total_samples as f64
        };
        let outliers = if values.len() >= self.config.min_outlier_samples {
            detect_outliers(&values, self.config.iqr_multiplier)
        } else {
            Vec::new()
        };
        let insufficient_data =
            descriptor.kind != MetricKind::Scalar && values.len() < self.config.min_samples;
        let null_ratio = 1.0 - completeness;
        let severity = if total_samples > 0 && null_ratio > self.config.high_null_ratio {
            QualitySeverity::High
        } else if total_samples > 0 && null_ratio > self.config.max_null_ratio {
            QualitySeverity::Medium
        } else if null_count > 0 || !outliers.is_empty() || insufficient_data {
            QualitySeverity::Low
        } else {
            QualitySeverity::None
        };
        MetricQuality {
            path: descriptor.path.clone(),
            total_samples,
            null_count,
            completeness,
            outliers,
            insufficient_data,
            severity,
        }
    }

    /// Gaps wider than the threshold between consecutive distinct
    /// day-precision dates. Month and year labels are not gap-checked.
    pub fn detect_gaps(&self, descriptors: &[MetricDescriptor]) -> Vec<TimeGap> {
        descriptors
            .iter()
            .flat_map(|d| d.dates.iter())
            .filter(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok())
            .sorted()
            .dedup()
            .tuple_windows()
            .filter_map(|(a, b)| {
                let from = NaiveDate::parse_from_str(a, "%Y-%m-%d").ok()?;
                let to = NaiveDate::parse_from_str(b, "%Y-%m-%d").ok()?;
                let days = (to - from).num_days();
                (days > self.config.gap_threshold_days).then(|| TimeGap {
                    from: a.clone(),
                    to: b.clone(),
                    days,
                })
            })
            .collect()
    }
}

/// Tukey fences with linearly interpolated quartiles. Fewer than four
/// values never produce outliers.
pub fn detect_outliers(values: &[f64], multiplier: f64) -> Vec<f64> {
    let finite = values.iter().copied().filter(|v| v.is_finite()).collect::<Vec<_>>();
    if finite.len() < 4 {
        return Vec::new();
    }
    let mut sorted = finite.clone();
    sorted.sort_by(f64::total_cmp);
    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let (lower, upper) = (q1 - multiplier * iqr, q3 + multiplier * iqr);
    finite.into_iter().filter(|v| *v < lower || *v > upper).collect()
}

fn quantile(sorted: &[f64], p: f64) -> f64 {
    let position = (sorted.len() - 1) as f64 * p;
    let (low, high) = (position.floor() as usize, position.ceil() as usize);
    sorted[low] + (sorted[high] - sorted[low]) * (position - low as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
