use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

use crate::model::Coordinates;

pub const DEFAULT_USER_AGENT: &str = "WhatWeather/1.0 github.com/ChrVage/WhatWeather";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// user_agent = "WhatWeather/1.0 github.com/ChrVage/WhatWeather"
/// nominatim_rate_limit_secs = 1.0
/// output_dir = "outputs"
///
/// [default_location]
/// lat = 60.0
/// lon = 5.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sent on every request; MET Norway and Nominatim reject anonymous clients.
    pub user_agent: String,

    /// Timeout for the MET, BarentsWatch and Nominatim endpoints.
    pub request_timeout_secs: u64,

    /// The tide service is slower; it gets its own timeout.
    pub tide_timeout_secs: u64,

    /// Minimum spacing between two Nominatim requests.
    pub nominatim_rate_limit_secs: f64,

    /// Where the collector writes its files.
    pub output_dir: PathBuf,

    pub tide_days_ahead: u32,

    /// `nb`, `nn` or `en`.
    pub text_forecast_language: String,

    /// Without a key the BarentsWatch source answers with a demo response.
    pub barentswatch_api_key: Option<String>,

    /// Kept last: TOML tables have to follow the plain keys.
    pub default_location: Coordinates,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 10,
            tide_timeout_secs: 30,
            nominatim_rate_limit_secs: 1.0,
            output_dir: PathBuf::from("outputs"),
            tide_days_ahead: 7,
            text_forecast_language: "en".to_string(),
            barentswatch_api_key: None,
            default_location: Coordinates::default(),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tide_timeout(&self) -> Duration {
        Duration::from_secs(self.tide_timeout_secs)
    }

    /// Negative or non-finite values in the file are treated as "no throttling".
    pub fn nominatim_rate_limit(&self) -> Duration {
        Duration::try_from_secs_f64(self.nominatim_rate_limit_secs).unwrap_or(Duration::ZERO)
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "ChrVage", "whatweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Blank keys are stored as "no key".
    pub fn set_barentswatch_api_key(&mut self, key: Option<String>) {
        self.barentswatch_api_key = key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_public_api_etiquette() {
        let cfg = Config::default();
        assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(cfg.nominatim_rate_limit(), Duration::from_secs(1));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.tide_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.default_location, Coordinates::new(60.0, 5.0));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from_path(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config {
            user_agent: "Test/0.1 example.org".into(),
            ..Config::default()
        };
        cfg.set_barentswatch_api_key(Some("  KEY  ".into()));
        cfg.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.barentswatch_api_key.as_deref(), Some("KEY"));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "nominatim_rate_limit_secs = 2.5\n").unwrap();

        let cfg = Config::load_from_path(&path).unwrap();
        assert_eq!(cfg.nominatim_rate_limit(), Duration::from_millis(2500));
        assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "user_agent = [").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn blank_api_key_is_cleared() {
        let mut cfg = Config::default();
        cfg.set_barentswatch_api_key(Some("   ".into()));
        assert!(cfg.barentswatch_api_key.is_none());
    }

    #[test]
    fn negative_rate_limit_disables_throttle() {
        let cfg = Config {
            nominatim_rate_limit_secs: -1.0,
            ..Config::default()
        };
        assert_eq!(cfg.nominatim_rate_limit(), Duration::ZERO);
    }
}
