use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// API key for the remote weather API.
    pub api_key: Option<String>,

    /// Place used when a command is run without one, e.g. "Melbourne".
    pub default_place: Option<String>,
}

impl Config {
    /// Return the API key, or a hint about how to set one.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `skycast configure` and enter your weather API key."
            )
        })
    }

    /// Resolve the place to query: an explicit argument wins, then the
    /// configured default.
    pub fn resolve_place<'a>(&'a self, explicit: Option<&'a str>) -> Result<&'a str> {
        explicit.or(self.default_place.as_deref()).ok_or_else(|| {
            anyhow!(
                "No place given and no default configured.\n\
                 Hint: pass a place name (or \"lat,lon\"), or set a default with `skycast configure`."
            )
        })
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "skycast", "skycast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_api_key_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.require_api_key().unwrap_err();

        assert!(err.to_string().contains("No API key configured"));
        assert!(err.to_string().contains("Hint: run `skycast configure`"));
    }

    #[test]
    fn require_api_key_returns_configured_key() {
        let cfg = Config { api_key: Some("KEY".to_string()), default_place: None };
        assert_eq!(cfg.require_api_key().expect("key must exist"), "KEY");
    }

    #[test]
    fn explicit_place_wins_over_default() {
        let cfg = Config { api_key: None, default_place: Some("Melbourne".to_string()) };

        assert_eq!(cfg.resolve_place(Some("Oslo")).expect("explicit"), "Oslo");
        assert_eq!(cfg.resolve_place(None).expect("default"), "Melbourne");
    }

    #[test]
    fn resolve_place_errors_with_nothing_to_fall_back_on() {
        let cfg = Config::default();
        let err = cfg.resolve_place(None).unwrap_err();

        assert!(err.to_string().contains("No place given"));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let cfg = Config {
            api_key: Some("KEY".to_string()),
            default_place: Some("Melbourne".to_string()),
        };

        let serialized = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&serialized).expect("parse");

        assert_eq!(parsed.api_key.as_deref(), Some("KEY"));
        assert_eq!(parsed.default_place.as_deref(), Some("Melbourne"));
    }

    #[test]
    fn empty_file_parses_to_defaults() {
        let parsed: Config = toml::from_str("").expect("parse empty config");
        assert!(parsed.api_key.is_none());
        assert!(parsed.default_place.is_none());
    }
}
