//! Configuration management for pastemill.
//!
//! Parses `pastemill.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`

mod expand;

use std::path::{Path, PathBuf};

use pastemill_core::{HeadingHint, PrepareOptions, TableMode};
use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "pastemill.toml";

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded
/// config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Default normalization options.
    pub prepare: PrepareConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7878,
        }
    }
}

/// Default normalization options applied when a request omits them.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PrepareConfig {
    /// Deepest heading level (1-6).
    pub max_heading_depth: u8,
    /// Table handling mode: "keep" or "kv".
    pub table_mode: String,
    /// Merge or discard adjacent duplicate headings.
    pub dedupe_headings: bool,
    /// Drop attachment-artifact lines.
    pub drop_artifacts: bool,
    /// Drop recognized noise lines.
    pub drop_noise_lines: bool,
    /// Input length cap in characters.
    pub max_chars: usize,
    /// Promote pseudo-headings.
    pub promote_pseudo_headings: bool,
    /// Heading hints (literal substrings, or `/regex/`).
    pub heading_hints: Vec<String>,
    /// Split mixed numbered/bulleted blocks into labelled groups.
    pub restructure_process_blocks: bool,
    /// Unwrap unlabelled fenced blocks holding plain language.
    pub unwrap_accidental_fences: bool,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        let defaults = PrepareOptions::default();
        Self {
            max_heading_depth: defaults.max_heading_depth,
            table_mode: "keep".to_owned(),
            dedupe_headings: defaults.dedupe_headings,
            drop_artifacts: defaults.drop_artifacts,
            drop_noise_lines: defaults.drop_noise_lines,
            max_chars: defaults.max_chars,
            promote_pseudo_headings: defaults.promote_pseudo_headings,
            heading_hints: Vec::new(),
            restructure_process_blocks: defaults.restructure_process_blocks,
            unwrap_accidental_fences: defaults.unwrap_accidental_fences,
        }
    }
}

impl PrepareConfig {
    /// Build pipeline options from the configured defaults.
    #[must_use]
    pub fn to_options(&self) -> PrepareOptions {
        let mut options = PrepareOptions::default();
        options.max_heading_depth = self.max_heading_depth.clamp(1, 6);
        options.table_mode = if self.table_mode.eq_ignore_ascii_case("kv") {
            TableMode::Kv
        } else {
            TableMode::Keep
        };
        options.dedupe_headings = self.dedupe_headings;
        options.drop_artifacts = self.drop_artifacts;
        options.drop_noise_lines = self.drop_noise_lines;
        options.max_chars = self.max_chars;
        options.promote_pseudo_headings = self.promote_pseudo_headings;
        options.heading_hints = self
            .heading_hints
            .iter()
            .map(|hint| HeadingHint::from_spec(hint))
            .collect();
        options.restructure_process_blocks = self.restructure_process_blocks;
        options.unwrap_accidental_fences = self.unwrap_accidental_fences;
        options
    }

    /// Validate configured values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` when a value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=6).contains(&self.max_heading_depth) {
            return Err(ConfigError::Validation(format!(
                "prepare.max_heading_depth must be between 1 and 6, got {}",
                self.max_heading_depth
            )));
        }
        if !self.table_mode.eq_ignore_ascii_case("keep") && !self.table_mode.eq_ignore_ascii_case("kv")
        {
            return Err(ConfigError::Validation(format!(
                "prepare.table_mode must be \"keep\" or \"kv\", got {:?}",
                self.table_mode
            )));
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`PASTEMILL_HOST`} not set").
        message: String,
    },
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise,
    /// searches for `pastemill.toml` in the current directory and its
    /// parents. CLI settings are applied after loading so CLI arguments
    /// take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit `config_path` does not exist,
    /// parsing fails, or a value is out of range.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.server.host = expand::expand_env(&config.server.host, "server.host")?;
        config.prepare.validate()?;

        Ok(config)
    }

    /// Load and parse a config file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Search for `pastemill.toml` in the current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let candidate = dir.join(CONFIG_FILENAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 7878);
        assert_eq!(config.prepare.max_heading_depth, 4);
        assert_eq!(config.prepare.table_mode, "keep");
    }

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000

            [prepare]
            max_heading_depth = 3
            table_mode = "kv"
            heading_hints = ["scope", "/^Appendix [A-Z]$/"]
            "#,
        )
        .unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.prepare.max_heading_depth, 3);
        assert_eq!(config.prepare.heading_hints.len(), 2);

        let options = config.prepare.to_options();
        assert_eq!(options.max_heading_depth, 3);
        assert_eq!(options.table_mode, TableMode::Kv);
        assert_eq!(options.heading_hints.len(), 2);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str("[server]\nport = 8081\n").unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.prepare.dedupe_headings);
    }

    #[test]
    fn test_validate_rejects_bad_depth() {
        let mut config = Config::default();
        config.prepare.max_heading_depth = 0;
        assert!(config.prepare.validate().is_err());
        config.prepare.max_heading_depth = 7;
        assert!(config.prepare.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_table_mode() {
        let mut config = Config::default();
        config.prepare.table_mode = "markdown".to_owned();
        assert!(config.prepare.validate().is_err());
    }

    #[test]
    fn test_cli_settings_override() {
        let mut config = Config::default();
        config.apply_cli_settings(&CliSettings {
            host: Some("0.0.0.0".to_owned()),
            port: Some(9999),
        });
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn test_missing_explicit_path_errors() {
        let result = Config::load(Some(Path::new("/nonexistent/pastemill.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
