//! Persisted analysis defaults.
//!
//! Settings are stored as TOML in `.appraise/config.toml`. Loading is
//! forgiving: a missing file yields defaults and out-of-range numbers are
//! normalized back into range, so a hand-edited file never prevents startup.
//! Converting settings into an [`AlgorithmConfig`] re-validates, which after
//! normalization cannot fail.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    analysis::{
        AlgorithmConfig, AlgorithmKind, ConfigurationError, DecisionTreesConfig, NaiveBayesConfig,
        DEFAULT_PERCENT_SPLIT, DEFAULT_TOLERANCE,
    },
    app_dirs,
};

/// Filename used to store the app configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    AppDir(#[from] app_dirs::AppDirError),
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize settings: {0}")]
    SerializeToml(toml::ser::Error),
    #[error("failed to write settings file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Analysis defaults applied when the user has not picked parameters yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub algorithm: AlgorithmKind,
    pub tolerance: f64,
    pub percent_split: u8,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmKind::NaiveBayes,
            tolerance: DEFAULT_TOLERANCE,
            percent_split: DEFAULT_PERCENT_SPLIT,
        }
    }
}

impl AnalysisSettings {
    /// Pull out-of-range values back to the documented defaults.
    fn normalized(mut self) -> Self {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 || self.tolerance > 1.0 {
            self.tolerance = DEFAULT_TOLERANCE;
        }
        if !(1..=99).contains(&self.percent_split) {
            self.percent_split = DEFAULT_PERCENT_SPLIT;
        }
        self
    }

    /// Build the validated run configuration these settings describe.
    pub fn to_algorithm_config(&self) -> Result<AlgorithmConfig, ConfigurationError> {
        Ok(match self.algorithm {
            AlgorithmKind::NaiveBayes => {
                AlgorithmConfig::NaiveBayes(NaiveBayesConfig::new(self.tolerance)?)
            }
            AlgorithmKind::DecisionTrees => {
                AlgorithmConfig::DecisionTrees(DecisionTreesConfig::new(self.percent_split)?)
            }
        })
    }
}

/// On-disk shape of the settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub analysis: AnalysisSettings,
}

/// Resolve the configuration file path inside the app root.
pub fn config_path() -> Result<PathBuf, SettingsError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

/// Load settings from disk, falling back to defaults when the file is absent.
pub fn load_or_default() -> Result<AppSettings, SettingsError> {
    load_from(&config_path()?)
}

/// Persist settings, creating parent directories as needed.
pub fn save(settings: &AppSettings) -> Result<(), SettingsError> {
    save_to(settings, &config_path()?)
}

pub fn load_from(path: &Path) -> Result<AppSettings, SettingsError> {
    if !path.exists() {
        return Ok(AppSettings::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: AppSettings =
        toml::from_str(&text).map_err(|source| SettingsError::ParseToml {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(AppSettings {
        analysis: settings.analysis.normalized(),
    })
}

pub fn save_to(settings: &AppSettings, path: &Path) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = toml::to_string_pretty(settings).map_err(SettingsError::SerializeToml)?;
    std::fs::write(path, text).map_err(|source| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let loaded = load_from(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(loaded, AppSettings::default());
    }

    #[test]
    fn settings_round_trip_through_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let settings = AppSettings {
            analysis: AnalysisSettings {
                algorithm: AlgorithmKind::DecisionTrees,
                tolerance: 0.2,
                percent_split: 80,
            },
        };
        save_to(&settings, &path).unwrap();
        assert_eq!(load_from(&path).unwrap(), settings);
    }

    #[test]
    fn out_of_range_values_normalize_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[analysis]\nalgorithm = \"decision_trees\"\ntolerance = 7.5\npercent_split = 0\n",
        )
        .unwrap();
        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.analysis.tolerance, DEFAULT_TOLERANCE);
        assert_eq!(loaded.analysis.percent_split, DEFAULT_PERCENT_SPLIT);
        assert_eq!(loaded.analysis.algorithm, AlgorithmKind::DecisionTrees);
    }

    #[test]
    fn malformed_toml_is_reported_with_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "analysis = not toml").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, SettingsError::ParseToml { .. }));
    }

    #[test]
    fn normalized_settings_always_build_a_config() {
        let settings = AnalysisSettings {
            algorithm: AlgorithmKind::NaiveBayes,
            tolerance: -3.0,
            percent_split: 50,
        }
        .normalized();
        let config = settings.to_algorithm_config().unwrap();
        assert_eq!(config.kind(), AlgorithmKind::NaiveBayes);
    }
}
