// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Configuration for the cukeport reporter
//!
//! The reporter is configured with an `rpConfig` object (see
//! [`ReporterConfig`]), loaded from a JSON file and overridden by
//! command-line flags or `CUKEPORT_*` environment variables.

use std::path::{Path, PathBuf};

use clap::Parser;
use cukeport_client::{Attribute, LaunchMode};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attributes::parse_attribute;
use crate::hierarchy::LaunchSettings;
use crate::retry::RetryPolicy;

/// Key under which a wrapped configuration file nests the reporter options
const WRAPPER_KEY: &str = "rpConfig";

/// cukeport - report cucumber message streams to ReportPortal
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "cukeport")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Path to a JSON reporter configuration
    ///
    /// Either a bare rpConfig object or one wrapped as {"rpConfig": {...}}.
    /// Flags below override values from the file.
    #[arg(short, long, env = "CUKEPORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// NDJSON message stream to read (defaults to stdin)
    #[arg(short, long, env = "CUKEPORT_INPUT")]
    pub input: Option<PathBuf>,

    /// API root of the reporting backend, e.g. https://rp.example.com/api/v1
    #[arg(long, env = "CUKEPORT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Backend project name
    #[arg(long, env = "CUKEPORT_PROJECT")]
    pub project: Option<String>,

    /// API token sent as a bearer token
    #[arg(long, env = "CUKEPORT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Launch name
    #[arg(long, env = "CUKEPORT_LAUNCH")]
    pub launch: Option<String>,

    /// Launch description
    #[arg(long)]
    pub description: Option<String>,

    /// Launch tag, `key:value` or `value` (repeatable)
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Launch mode (DEFAULT or DEBUG)
    #[arg(long)]
    pub mode: Option<LaunchMode>,

    /// Attempts per backend call
    #[arg(long)]
    pub retry: Option<u32>,

    /// Start the launch in debug mode unless a mode is given
    #[arg(long, default_value = "false")]
    pub debug: bool,

    /// Log backend failures and keep going instead of exiting
    #[arg(long, default_value = "false")]
    pub ignore_errors: bool,

    /// Read the stream but report nothing
    #[arg(long, default_value = "false")]
    pub disable: bool,

    /// Record backend calls in memory and print a summary instead of
    /// sending them
    #[arg(long, default_value = "false")]
    pub dry_run: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Quiet mode - suppress info-level logs
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

impl Config {
    /// Get the log level based on verbose/quiet flags
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        }
    }

    /// Build the validated reporter configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed,
    /// or if the merged configuration is invalid.
    pub fn reporter_config(&self) -> Result<ReporterConfig, ConfigError> {
        let mut reporter = match &self.config {
            Some(path) => ReporterConfig::load(path)?,
            None => ReporterConfig::default(),
        };
        self.apply_overrides(&mut reporter);
        reporter.validate(self.dry_run)?;
        Ok(reporter)
    }

    fn apply_overrides(&self, reporter: &mut ReporterConfig) {
        if let Some(endpoint) = &self.endpoint {
            reporter.endpoint.clone_from(endpoint);
        }
        if let Some(project) = &self.project {
            reporter.project.clone_from(project);
        }
        if let Some(token) = &self.token {
            reporter.token.clone_from(token);
        }
        if let Some(launch) = &self.launch {
            reporter.launch.clone_from(launch);
        }
        if let Some(description) = &self.description {
            reporter.description.clone_from(description);
        }
        if !self.tags.is_empty() {
            reporter.tags.extend(self.tags.iter().cloned());
        }
        if let Some(mode) = self.mode {
            reporter.mode = Some(mode);
        }
        if let Some(retry) = self.retry {
            reporter.retry = retry;
        }
        reporter.debug |= self.debug;
        reporter.ignore_errors |= self.ignore_errors;
        if self.disable {
            reporter.enable = false;
        }
    }
}

/// The reporter options (`rpConfig`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReporterConfig {
    /// Report anything at all
    pub enable: bool,
    /// Use debug mode when no mode is given
    pub debug: bool,
    /// API token
    pub token: String,
    /// API root of the backend
    pub endpoint: String,
    /// Launch description
    pub description: String,
    /// Launch tags; `null` entries are dropped on load
    #[serde(deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    /// Backend project
    pub project: String,
    /// Launch name
    pub launch: String,
    /// Explicit launch mode
    pub mode: Option<LaunchMode>,
    /// Attempts per backend call
    pub retry: u32,
    /// Swallow failures instead of aborting
    pub ignore_errors: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            enable: true,
            debug: false,
            token: String::new(),
            endpoint: String::new(),
            description: String::new(),
            tags: Vec::new(),
            project: String::new(),
            launch: String::new(),
            mode: None,
            retry: 1,
            ignore_errors: false,
        }
    }
}

impl ReporterConfig {
    /// Parse a configuration, bare or wrapped in `{"rpConfig": ...}`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` if the text is not a valid configuration.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let mut value: Value = serde_json::from_str(text)?;
        if let Some(inner) = value
            .as_object_mut()
            .and_then(|object| object.remove(WRAPPER_KEY))
        {
            value = inner;
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Load a configuration file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, or
    /// `ConfigError::Json` if it is not a valid configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Validate the configuration
    ///
    /// Backend coordinates are only required when calls will actually be
    /// sent, i.e. when reporting is enabled and this is not a dry run.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `retry` is zero
    /// - `endpoint`, `project` or `launch` is empty for a live run
    pub fn validate(&self, dry_run: bool) -> Result<(), ConfigError> {
        if self.retry == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry",
                message: "must be at least 1".to_string(),
            });
        }
        if !self.enable || dry_run {
            return Ok(());
        }
        for (field, value) in [
            ("endpoint", &self.endpoint),
            ("project", &self.project),
            ("launch", &self.launch),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(field));
            }
        }
        Ok(())
    }

    /// Effective launch mode: explicit mode, else `DEBUG` in debug, else
    /// `DEFAULT`
    #[must_use]
    pub fn launch_mode(&self) -> LaunchMode {
        match self.mode {
            Some(mode) => mode,
            None if self.debug => LaunchMode::Debug,
            None => LaunchMode::Default,
        }
    }

    /// Launch tags as attributes, deduplicated with blank tags dropped
    #[must_use]
    pub fn launch_attributes(&self) -> Vec<Attribute> {
        self.tags
            .iter()
            .map(String::as_str)
            .filter(|tag| !tag.trim().is_empty())
            .collect::<IndexSet<&str>>()
            .into_iter()
            .map(parse_attribute)
            .collect()
    }

    /// Launch fields for the hierarchy
    #[must_use]
    pub fn launch_settings(&self) -> LaunchSettings {
        LaunchSettings {
            name: self.launch.clone(),
            description: self.description.clone(),
            attributes: self.launch_attributes(),
            mode: self.launch_mode(),
        }
    }

    /// Retry policy for backend calls
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry, self.ignore_errors)
    }
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let tags = Option::<Vec<Option<String>>>::deserialize(deserializer)?;
    Ok(tags.into_iter().flatten().flatten().collect())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid JSON for the expected shape
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field is empty
    #[error("Missing required config field: {0}")]
    MissingField(&'static str),

    /// A field has an unusable value
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        message: String,
    },
}
