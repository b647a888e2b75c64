//! Client configuration — TOML-based, platform-aware paths.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::registry::RegistryOptions;

/// Header comment prepended to saved config files.
const CONFIG_HEADER: &str = "# xusb configuration\n\n";

/// Filter levels accepted by `log_level`.
pub const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Use the player number shown by a controller's LED as its user index
    /// during discovery. When off, devices get the lowest free index.
    #[serde(default = "default_true")]
    pub led_hint: bool,

    /// Rediscover devices after a power-off, since the slot may vanish.
    #[serde(default = "default_true")]
    pub refresh_after_power_off: bool,

    /// Print JSON instead of text from the CLI by default.
    #[serde(default)]
    pub json: bool,

    /// Default log filter for the CLI. One of [`LOG_LEVELS`].
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            led_hint: true,
            refresh_after_power_off: true,
            json: false,
            log_level: default_log_level(),
        }
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// `log_level` is not one of [`LOG_LEVELS`].
    InvalidLogLevel(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidLogLevel(l) => write!(
                f,
                "Invalid log_level \"{l}\" (expected one of: {})",
                LOG_LEVELS.join(", ")
            ),
        }
    }
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        #[cfg(windows)]
        {
            dirs::config_dir().map(|p| p.join("Xusb"))
        }
        #[cfg(not(windows))]
        {
            dirs::config_dir().map(|p| p.join("xusb"))
        }
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Load config from disk, or return defaults if not found.
    pub fn load() -> Self {
        let (config, warnings) = Self::load_with_warnings();
        for w in &warnings {
            log::warn!("{w}");
        }
        config
    }

    /// Save config to an arbitrary path atomically (write to temp file, then rename).
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let serialized = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        let contents = format!("{CONFIG_HEADER}{serialized}");
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &contents)?;
        match std::fs::rename(&tmp, path) {
            Ok(()) => Ok(()),
            Err(_) => {
                // Rename can fail across filesystems; fall back to direct write + cleanup
                let result = std::fs::write(path, &contents);
                let _ = std::fs::remove_file(&tmp);
                result
            }
        }
    }

    /// Save config to the default platform path.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config directory",
            ));
        };
        self.save_to(&path)
    }

    /// Load config from an arbitrary path, returning the config and any parse warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(_) => (Self::default(), vec![]),
        }
    }

    /// Load config from the default path, returning the config and any parse warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// Check every field, returning all problems found.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let level = self.log_level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            errors.push(ValidationError::InvalidLogLevel(self.log_level.clone()));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Discovery options for [`crate::registry::Registry`].
    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            led_hint: self.led_hint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Defaults ──

    #[test]
    fn defaults() {
        let c = Config::default();
        assert!(c.led_hint);
        assert!(c.refresh_after_power_off);
        assert!(!c.json);
        assert_eq!(c.log_level, "warn");
        assert_eq!(c.registry_options(), RegistryOptions::default());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c: Config = toml::from_str("led_hint = false").unwrap();
        assert!(!c.led_hint);
        assert!(c.refresh_after_power_off);
        assert_eq!(c.log_level, "warn");
        assert!(!c.registry_options().led_hint);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let c: Config = toml::from_str("").unwrap();
        assert_eq!(c, Config::default());
    }

    #[test]
    fn wrong_type_toml_is_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("json = \"yes\"");
        assert!(result.is_err());
    }

    // ── Paths ──

    #[test]
    fn config_path_ends_with_toml() {
        if let Some(p) = Config::path() {
            assert!(p.ends_with("config.toml"));
        }
    }

    // ── Load / save ──

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (c, warnings) = Config::load_from(&dir.path().join("nope.toml"));
        assert_eq!(c, Config::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn load_malformed_file_warns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is { not valid toml").unwrap();
        let (c, warnings) = Config::load_from(&path);
        assert_eq!(c, Config::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("using defaults"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let c = Config {
            led_hint: false,
            json: true,
            log_level: "debug".into(),
            ..Config::default()
        };
        c.save_to(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(CONFIG_HEADER));
        assert!(!path.with_extension("toml.tmp").exists());
        let (loaded, warnings) = Config::load_from(&path);
        assert!(warnings.is_empty());
        assert_eq!(loaded, c);
    }

    // ── Validation ──

    #[test]
    fn validate_default_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_log_level_case_insensitive() {
        let c = Config {
            log_level: " Trace ".into(),
            ..Config::default()
        };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn validate_unknown_log_level() {
        let c = Config {
            log_level: "loud".into(),
            ..Config::default()
        };
        let errs = c.validate().unwrap_err();
        assert_eq!(errs, vec![ValidationError::InvalidLogLevel("loud".into())]);
        assert!(errs[0].to_string().contains("expected one of"));
    }
}
