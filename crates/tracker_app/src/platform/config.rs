use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracker_core::{FeatureConfig, FeatureKind};
use tracker_engine::{Backoff, ClientSettings, Endpoint};

use super::logging::LogDestination;

pub const DEFAULT_CONFIG_FILE: &str = "tracker.ron";
pub const DEFAULT_TOKEN_ENV: &str = "TRACKER_ACCESS_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("unknown feature {0:?} in config")]
    UnknownFeature(String),
    #[error("poll interval for {0} must be at least one second")]
    IntervalTooShort(FeatureKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub factor: u32,
    pub max_interval_secs: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            factor: 2,
            max_interval_secs: 60,
        }
    }
}

/// Per-feature adjustments; unset fields keep the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureOverride {
    pub feature: String,
    pub poll_interval_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub submit_path: Option<String>,
    pub status_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    /// Name of the environment variable holding the bearer token.
    pub token_env: String,
    pub log_destination: LogDestination,
    pub log_level: String,
    pub history_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub backoff: Option<BackoffConfig>,
    pub features: Vec<FeatureOverride>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: ClientSettings::default().base_url,
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            log_destination: LogDestination::File,
            log_level: "info".to_string(),
            history_dir: PathBuf::from("."),
            request_timeout_secs: 30,
            backoff: None,
            features: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Loads `path`, or `tracker.ron` when present, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if !required && err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        Self::parse(&content).map_err(|message| ConfigError::Parse { path, message })
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        ron::from_str(content).map_err(|err| err.to_string())
    }

    pub fn level(&self) -> LevelFilter {
        tracker_logging::parse_level(&self.log_level).unwrap_or(LevelFilter::Info)
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            ..ClientSettings::default()
        }
    }

    pub fn backoff(&self) -> Option<Backoff> {
        self.backoff.as_ref().map(|b| Backoff {
            factor: b.factor,
            max_interval: Duration::from_secs(b.max_interval_secs),
        })
    }

    fn override_for(&self, kind: FeatureKind) -> Result<Option<&FeatureOverride>, ConfigError> {
        let mut found = None;
        for entry in &self.features {
            let entry_kind = FeatureKind::from_slug(&entry.feature)
                .ok_or_else(|| ConfigError::UnknownFeature(entry.feature.clone()))?;
            if entry_kind == kind {
                found = Some(entry);
            }
        }
        Ok(found)
    }

    pub fn feature_config(&self, kind: FeatureKind) -> Result<FeatureConfig, ConfigError> {
        let mut config = FeatureConfig::for_kind(kind);
        if let Some(entry) = self.override_for(kind)? {
            if let Some(secs) = entry.poll_interval_secs {
                if secs == 0 {
                    return Err(ConfigError::IntervalTooShort(kind));
                }
                config = config.with_poll_interval(Duration::from_secs(secs));
            }
            if let Some(max_retries) = entry.max_retries {
                config = config.with_max_retries(max_retries);
            }
        }
        Ok(config)
    }

    /// Routes that differ from the built-in ones.
    pub fn endpoint_overrides(&self) -> Result<Vec<(FeatureKind, Endpoint)>, ConfigError> {
        let mut endpoints = Vec::new();
        for kind in FeatureKind::ALL {
            let Some(entry) = self.override_for(kind)? else {
                continue;
            };
            if entry.submit_path.is_none() && entry.status_path.is_none() {
                continue;
            }
            let default = Endpoint::for_feature(kind);
            endpoints.push((
                kind,
                Endpoint::new(
                    entry.submit_path.clone().unwrap_or(default.submit_path),
                    entry.status_path.clone().unwrap_or(default.status_path),
                ),
            ));
        }
        Ok(endpoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn explicit_config_path_must_exist() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = AppConfig::load(Some(&temp.path().join("absent.ron")));
        assert!(matches!(config, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config = AppConfig::parse(
            r#"(
                base_url: "https://prep.example.com",
                features: [
                    (feature: "map-tour", poll_interval_secs: Some(12), max_retries: Some(1)),
                    (feature: "documentary", status_path: Some("api/renders/{job_id}")),
                ],
            )"#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://prep.example.com");
        assert_eq!(config.token_env, DEFAULT_TOKEN_ENV);
        assert_eq!(config.level(), LevelFilter::Info);

        let map_tour = config.feature_config(FeatureKind::MapTour).unwrap();
        assert_eq!(map_tour.poll_interval, Duration::from_secs(12));
        assert_eq!(map_tour.max_retries, 1);

        let untouched = config.feature_config(FeatureKind::TopicShort).unwrap();
        assert_eq!(untouched, FeatureConfig::for_kind(FeatureKind::TopicShort));

        assert_eq!(
            config.endpoint_overrides().unwrap(),
            vec![(
                FeatureKind::Documentary,
                Endpoint::new("api/documentary/render", "api/renders/{job_id}")
            )]
        );
    }

    #[test]
    fn unknown_feature_is_rejected() {
        let config = AppConfig::parse(r#"(features: [(feature: "essay")])"#).unwrap();
        assert!(matches!(
            config.feature_config(FeatureKind::TopicShort),
            Err(ConfigError::UnknownFeature(name)) if name == "essay"
        ));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config =
            AppConfig::parse(r#"(features: [(feature: "topic-short", poll_interval_secs: Some(0))])"#)
                .unwrap();
        assert!(matches!(
            config.feature_config(FeatureKind::TopicShort),
            Err(ConfigError::IntervalTooShort(FeatureKind::TopicShort))
        ));
    }

    #[test]
    fn backoff_section_maps_to_engine_backoff() {
        let config = AppConfig::parse(r#"(backoff: Some((factor: 3, max_interval_secs: 90)))"#)
            .unwrap();
        assert_eq!(
            config.backoff(),
            Some(Backoff {
                factor: 3,
                max_interval: Duration::from_secs(90)
            })
        );
    }
}
