//! Configuration management for inowatch.
//!
//! Uses figment to merge configuration from multiple sources:
//! 1. Default values
//! 2. Config file (TOML)
//! 3. Environment variables
//! 4. Command-line arguments

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Settings shared by every watch
    #[serde(default)]
    pub general: GeneralConfig,

    /// Paths watched when none are given on the command line
    #[serde(default)]
    pub watch: Vec<WatchConfig>,
}

/// Settings shared by every watch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Events watched when a watch names none
    #[serde(default = "default_events")]
    pub events: Vec<String>,

    /// Whether watches are recursive unless they say otherwise
    #[serde(default)]
    pub recursive: bool,
}

/// One configured watch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Path to watch
    pub path: PathBuf,

    /// Events for this path (falls back to `general.events`)
    #[serde(default)]
    pub events: Option<Vec<String>>,

    /// Recursive override (falls back to `general.recursive`)
    #[serde(default)]
    pub recursive: Option<bool>,
}

/// A watch with every default resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub path: PathBuf,
    pub events: Vec<String>,
    pub recursive: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_events() -> Vec<String> {
    vec!["all_events".to_string()]
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            events: default_events(),
            recursive: false,
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_file: Option<&PathBuf>) -> Result<Self, figment::Error> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Add config file if provided
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        } else {
            // Try default config locations
            let default_paths = [
                PathBuf::from("/etc/inowatch/config.toml"),
                dirs::config_dir()
                    .unwrap_or_default()
                    .join("inowatch/config.toml"),
            ];

            for path in &default_paths {
                if path.exists() {
                    figment = figment.merge(Toml::file(path));
                    break;
                }
            }
        }

        // Environment variables, e.g. INOWATCH_GENERAL__LOG_LEVEL
        figment = figment.merge(Env::prefixed("INOWATCH_").split("__"));

        figment.extract()
    }

    /// Override log level from CLI
    pub fn with_log_level(mut self, log_level: Option<String>) -> Self {
        if let Some(level) = log_level {
            self.general.log_level = level;
        }
        self
    }

    /// Resolve what to watch.
    ///
    /// Paths from the command line take precedence over configured
    /// watches; empty `events` means `general.events`.
    pub fn targets(&self, paths: &[PathBuf], events: &[String], recursive: bool) -> Vec<Target> {
        let events_or_default = |events: &[String]| {
            if events.is_empty() {
                self.general.events.clone()
            } else {
                events.to_vec()
            }
        };

        if !paths.is_empty() {
            return paths
                .iter()
                .map(|path| Target {
                    path: path.clone(),
                    events: events_or_default(events),
                    recursive: recursive || self.general.recursive,
                })
                .collect();
        }

        self.watch
            .iter()
            .map(|watch| Target {
                path: watch.path.clone(),
                events: events_or_default(watch.events.as_deref().unwrap_or(events)),
                recursive: recursive || watch.recursive.unwrap_or(self.general.recursive),
            })
            .collect()
    }
}
