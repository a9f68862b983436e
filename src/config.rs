use std::{io, path::PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    fir::classifier::ClassifierMode,
    notam::NotamSegmenter,
    translate::{BatchSize, FailurePolicy, TranslationStrategy},
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ConfigResult = Result<Config, ConfigError>;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SegmenterConfig {
    /// blocks at least this long that carry a boilerplate signature are dropped
    pub boilerplate_length_threshold: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            boilerplate_length_threshold: NotamSegmenter::DEFAULT_BOILERPLATE_LENGTH_THRESHOLD,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TranslationConfig {
    pub max_workers: usize,
    pub strategy: TranslationStrategy,
    pub batch_size: BatchSize,
    pub on_failure: FailurePolicy,
}

impl TranslationConfig {
    pub const DEFAULT_MAX_WORKERS: usize = 5;
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            max_workers: Self::DEFAULT_MAX_WORKERS,
            strategy: TranslationStrategy::default(),
            batch_size: BatchSize::default(),
            on_failure: FailurePolicy::default(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeZoneConfig {
    /// CSV with `ident` and `time_zone` columns
    pub csv_path: Option<PathBuf>,
    pub use_live_lookup: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GazetteerConfig {
    /// CSV with `waypoint`, `latitude` and `longitude` columns
    pub csv_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub classifier_mode: ClassifierMode,
    pub segmenter: SegmenterConfig,
    pub translation: TranslationConfig,
    pub timezone: TimeZoneConfig,
    pub gazetteer: GazetteerConfig,
}

impl Config {
    pub fn from_json(content: &[u8]) -> ConfigResult {
        Ok(serde_json::from_slice(content)?)
    }

    pub fn from_file(path: impl Into<PathBuf>) -> ConfigResult {
        let content = fs_err::read(path.into())?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use pretty_assertions_sorted::assert_eq_sorted;

    use crate::{
        fir::classifier::ClassifierMode,
        translate::{BatchSize, FailurePolicy, TranslationStrategy},
    };

    use super::{Config, ConfigError, TranslationConfig};

    #[test]
    fn test_defaults() {
        let config = Config::from_json(b"{}").unwrap();
        assert_eq_sorted!(config, Config::default());
        assert_eq!(config.classifier_mode, ClassifierMode::Refined);
        assert_eq!(config.segmenter.boilerplate_length_threshold, 800);
        assert_eq!(config.translation.max_workers, TranslationConfig::DEFAULT_MAX_WORKERS);
        assert_eq!(config.translation.batch_size, BatchSize::Auto);
        assert_eq!(config.timezone.csv_path, None);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_json(
            br#"{
                "classifier_mode": "polygon",
                "segmenter": { "boilerplate_length_threshold": 1200 },
                "translation": {
                    "max_workers": 3,
                    "strategy": "batch",
                    "batch_size": 4,
                    "on_failure": "passthrough"
                },
                "timezone": { "csv_path": "data/airports.csv", "use_live_lookup": true },
                "gazetteer": { "csv_path": "data/waypoints.csv" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.classifier_mode, ClassifierMode::Polygon);
        assert_eq!(config.segmenter.boilerplate_length_threshold, 1200);
        assert_eq!(config.translation.max_workers, 3);
        assert_eq!(config.translation.strategy, TranslationStrategy::Batch);
        assert_eq!(config.translation.batch_size, BatchSize::Fixed(4));
        assert_eq!(config.translation.on_failure, FailurePolicy::Passthrough);
        assert_eq!(
            config.timezone.csv_path,
            Some(PathBuf::from("data/airports.csv"))
        );
        assert!(config.timezone.use_live_lookup);
        assert_eq!(
            config.gazetteer.csv_path,
            Some(PathBuf::from("data/waypoints.csv"))
        );
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Config::from_json(br#"{ "classifier_mode": "circle" }"#),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            Config::from_file("/nonexistent/notam-parser.json"),
            Err(ConfigError::FileRead(_))
        ));
    }
}
