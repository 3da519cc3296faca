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

use thiserror::Error;
#[derive(Error, Debug)]
pub enum ReasoningError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
    #[error("Dataset cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] SerialisationError),
}
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    ConfigFileError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse YAML configuration: {source}")]
    YamlParseError {
        #[from]
        source: serde_yaml::Error,
    },
    #[error("Invalid configuration: {field} is out of range ({value})")]
    OutOfRange { field: String, value: String },
    #[error("Conflicting configuration options: {details}")]
    ConflictingOptions { details: String },
    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },
}
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Metric \"{metric}\" not found in dataset. Available metrics: {}", available.join(", "))]
    MetricNotFound {
        metric: String,
        available: Vec<String>,
    },
    #[error("Metric name is required")]
    EmptyMetricName,
    #[error(
        "Date range '{value}' must be in YYYY, YYYY-MM, YYYY-MM-DD, or custom range format"
    )]
    InvalidDateRange { value: String },
    #[error("Path '{path}' does not resolve to a {expected} in the dataset")]
    ShapeMismatch { path: String, expected: String },
}
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to load dataset for key '{key}': {reason}")]
    LoadFailed { key: String, reason: String },
}
#[derive(Error, Debug)]
pub enum SerialisationError {
    #[error("JSON serialisation failed: {source}")]
    JsonSerialisationError {
        #[from]
        source: serde_json::Error,
    },
    #[error("YAML serialisation failed: {source}")]
    YamlSerialisationError {
        #[from]
        source: serde_yaml::Error,
    },
}
pub type Result<T> = std::result::Result<T, ReasoningError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type DatasetResult<T> = std::result::Result<T, DatasetError>;
impl From<serde_json::Error> for ReasoningError {
    fn from(err: serde_json::Error) -> Self {
        ReasoningError::Serialisation(SerialisationError::JsonSerialisationError { source: err })
    }
}
impl ReasoningError {
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ReasoningError::Dataset(DatasetError::MetricNotFound { .. })
                | ReasoningError::Dataset(DatasetError::InvalidDateRange { .. })
                | ReasoningError::Cache(_)
        )
    }
    pub fn category(&self) -> &'static str {
        match self {
            ReasoningError::Config(_) => "Configuration",
            ReasoningError::Dataset(_) => "Dataset",
            ReasoningError::Cache(_) => "Cache",
            ReasoningError::Io(_) => "I/O",
            ReasoningError::Serialisation(_) => "Serialisation",
        }
    }
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ReasoningError::Dataset(DatasetError::MetricNotFound { .. }) => ErrorSeverity::Warning,
            ReasoningError::Dataset(DatasetError::InvalidDateRange { .. }) => {
                ErrorSeverity::Warning
            }
            ReasoningError::Cache(_) => ErrorSeverity::Error,
            ReasoningError::Config(ConfigError::ValidationFailed { .. }) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            ReasoningError::Dataset(DatasetError::MetricNotFound { .. }) => vec![
                "Check the metric name spelling".to_string(),
                "Use one of the listed metric paths".to_string(),
            ],
            ReasoningError::Dataset(DatasetError::InvalidDateRange { .. }) => vec![
                "Use YYYY, YYYY-MM or YYYY-MM-DD".to_string(),
                "Custom ranges are two ISO dates separated by a comma".to_string(),
            ],
            ReasoningError::Cache(CacheError::LoadFailed { .. }) => vec![
                "Check that the upstream finance API is reachable".to_string(),
                "Retry with a different date range".to_string(),
            ],
            ReasoningError::Config(_) => vec![
                "Validate the YAML file against the default configuration".to_string(),
            ],
            _ => vec!["Check the error message for specific guidance".to_string()],
        }
    }
    pub fn user_message(&self) -> String {
        match self {
            ReasoningError::Cache(_) => {
                "Unable to load metrics data. Please try again shortly.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}
impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }
    pub fn color_code(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "\x1b[36m",
            ErrorSeverity::Warning => "\x1b[33m",
            ErrorSeverity::Error => "\x1b[31m",
            ErrorSeverity::Critical => "\x1b[35m",
        }
    }
}
pub struct ErrorReporter {
    pub show_suggestions: bool,
    pub colored_output: bool,
}
impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            show_suggestions: true,
            colored_output: true,
        }
    }
    pub fn plain() -> Self {
        Self {
            show_suggestions: true,
            colored_output: false,
        }
    }
    pub fn report(&self, error: &ReasoningError) -> String {
        let severity = error.severity();
        let mut output = String::new();
        if self.colored_output {
            output.push_str(severity.color_code());
        }
        output.push_str(&format!(
            "[{}] {}: {}\n",
            severity.as_str(),
            error.category(),
            error.user_message()
        ));
        if self.colored_output {
            output.push_str("\x1b[0m");
        }
        if self.show_suggestions {
            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                output.push_str("\nSuggestions:\n");
                for suggestion in suggestions {
                    output.push_str(&format!("  • {suggestion}\n"));
                }
            }
        }
        output
    }
}
impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
