//! Analysis settings loaded from a TOML file.
//!
//! Default location: `~/.quantkit/config.toml`, overridable with the
//! `QUANTKIT_CONFIG` environment variable. A missing file yields defaults;
//! keys absent from the file take their default values.

use crate::portfolio::AddPolicy;
use crate::types::ReturnMethod;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings shared by the analysis entry points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Directory read by the CSV market data provider
    pub data_dir: PathBuf,
    /// First day of the analysis window (inclusive)
    pub start_date: NaiveDate,
    /// End of the analysis window (exclusive)
    pub end_date: NaiveDate,
    /// Annual risk-free rate (0.01 for 1%)
    pub risk_free_rate: f64,
    /// Confidence level for VaR and CVaR
    pub confidence: f64,
    pub return_method: ReturnMethod,
    pub add_policy: AddPolicy,
}

fn default_date(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            start_date: default_date(2020),
            end_date: default_date(2024),
            risk_free_rate: 0.01,
            confidence: 0.95,
            return_method: ReturnMethod::Simple,
            add_policy: AddPolicy::Preserve,
        }
    }
}

impl AnalysisConfig {
    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("QUANTKIT_CONFIG") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".quantkit/config.toml"))
            .unwrap_or_else(|| PathBuf::from("quantkit.toml"))
    }

    /// Get the default market data directory.
    ///
    /// Can be overridden with the `QUANTKIT_DATA_DIR` environment variable.
    pub fn default_data_dir() -> PathBuf {
        if let Ok(path) = env::var("QUANTKIT_DATA_DIR") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".quantkit/data"))
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    /// Load from the default path.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load from a specific path and validate.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Write the config as TOML, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reject a confidence outside (0, 1) or an empty date window.
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(Error::InvalidInput(format!(
                "confidence must be in (0, 1), got {}",
                self.confidence
            )));
        }
        if self.start_date >= self.end_date {
            return Err(Error::InvalidInput(format!(
                "start_date {} must be before end_date {}",
                self.start_date, self.end_date
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(config.end_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(config.risk_free_rate, 0.01);
        assert_eq!(config.confidence, 0.95);
        assert_eq!(config.return_method, ReturnMethod::Simple);
        assert_eq!(config.add_policy, AddPolicy::Preserve);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = AnalysisConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "data_dir = \"/tmp/prices\"\n\
             start_date = \"2021-06-01\"\n\
             return_method = \"log\"\n\
             add_policy = \"renormalize\"\n",
        )
        .unwrap();

        let config = AnalysisConfig::load_from(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/prices"));
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2021, 6, 1).unwrap());
        assert_eq!(config.return_method, ReturnMethod::Log);
        assert_eq!(config.add_policy, AddPolicy::Renormalize);
        assert_eq!(config.confidence, 0.95);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = AnalysisConfig {
            data_dir: PathBuf::from("prices"),
            risk_free_rate: 0.03,
            confidence: 0.99,
            ..Default::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(AnalysisConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_validation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "confidence = 1.5\n").unwrap();
        assert!(matches!(
            AnalysisConfig::load_from(&path),
            Err(Error::InvalidInput(_))
        ));

        fs::write(&path, "start_date = \"2025-01-01\"\n").unwrap();
        assert!(matches!(
            AnalysisConfig::load_from(&path),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "confidence = \"high\"\n").unwrap();

        assert!(matches!(AnalysisConfig::load_from(&path), Err(Error::Toml(_))));
    }
}
