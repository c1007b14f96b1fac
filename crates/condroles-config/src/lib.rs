//! Configuration management for condroles.
//!
//! Parses `condroles.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! The value universe is the union of the inline `values.tokens`, the tokens
//! of the value list file and any values given on the command line.
//! CLI settings are applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! `values.list_file` supports `~`, `${VAR}` (errors if unset) and
//! `${VAR:-default}`.

mod expand;

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the value list file.
    pub list_file: Option<PathBuf>,
    /// Override the role attribute.
    pub role_attribute: Option<String>,
    /// Extra value tokens.
    pub values: Vec<String>,
}

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "condroles.toml";

/// Value list file used when none is configured.
pub const DEFAULT_LIST_FILE: &str = "conditionals.lst";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Value configuration (list path is a relative string from TOML).
    values: ValuesConfigRaw,
    /// Role configuration.
    pub roles: RolesConfig,

    /// Resolved value configuration (set after loading).
    #[serde(skip)]
    pub values_resolved: ValuesConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Raw value configuration as parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ValuesConfigRaw {
    tokens: Vec<String>,
    list_file: Option<String>,
}

/// Resolved value configuration.
#[derive(Debug, Default)]
pub struct ValuesConfig {
    /// Every recognized value token.
    pub tokens: BTreeSet<String>,
    /// Value list file.
    pub list_file: PathBuf,
    /// Whether the list file was configured explicitly and so must exist.
    pub list_required: bool,
}

/// Role configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    /// Prefix for role names: `<attribute>:<value>`.
    pub attribute: Option<String>,
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
        /// Config field path (e.g., "`values.list_file`").
        field: String,
        /// Error message (e.g., "${`DOCS_ROOT`} not set").
        message: String,
    },
}

/// Parse a value list: one token per line, `#` starts a comment.
#[must_use]
pub fn parse_value_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split_once('#').map_or(line, |(before, _)| before).trim())
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Split command-line values on commas and whitespace.
pub fn split_values<I, S>(args: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .flat_map(|arg| {
            arg.as_ref()
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|part| !part.is_empty())
                .map(str::to_owned)
                .collect::<Vec<_>>()
        })
        .collect()
}

fn is_valid_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `condroles.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution; the value
    /// list is read afterwards, so `--list` takes precedence over the file.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// the value list cannot be read or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }
        config.read_value_list()?;
        config.validate()?;

        Ok(config)
    }

    /// Recognized value tokens.
    #[must_use]
    pub fn values(&self) -> &BTreeSet<String> {
        &self.values_resolved.tokens
    }

    #[must_use]
    pub fn role_attribute(&self) -> Option<&str> {
        self.roles.attribute.as_deref()
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(list_file) = &settings.list_file {
            self.values_resolved.list_file.clone_from(list_file);
            self.values_resolved.list_required = true;
        }
        if let Some(attribute) = &settings.role_attribute {
            self.roles.attribute = Some(attribute.clone());
        }
        self.values_resolved
            .tokens
            .extend(settings.values.iter().cloned());
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            values_resolved: ValuesConfig {
                tokens: BTreeSet::new(),
                list_file: base.join(DEFAULT_LIST_FILE),
                list_required: false,
            },
            ..Self::default()
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Expand and resolve the raw values section relative to `config_dir`.
    fn resolve(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let (list_file, list_required) = match &self.values.list_file {
            Some(raw) => {
                let expanded = expand::expand_env(raw, "values.list_file")?;
                (config_dir.join(expanded), true)
            }
            None => (config_dir.join(DEFAULT_LIST_FILE), false),
        };
        self.values_resolved = ValuesConfig {
            tokens: self.values.tokens.iter().map(|t| t.trim().to_owned()).collect(),
            list_file,
            list_required,
        };
        Ok(())
    }

    /// Add the tokens of the value list file.
    ///
    /// A missing default list file is skipped; a configured one must exist.
    fn read_value_list(&mut self) -> Result<(), ConfigError> {
        let path = &self.values_resolved.list_file;
        if !path.exists() {
            if self.values_resolved.list_required {
                return Err(ConfigError::NotFound(path.clone()));
            }
            return Ok(());
        }
        let content = std::fs::read_to_string(path)?;
        self.values_resolved.tokens.extend(parse_value_list(&content));
        Ok(())
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_values()?;
        self.validate_roles()?;
        Ok(())
    }

    fn validate_values(&self) -> Result<(), ConfigError> {
        let tokens = &self.values_resolved.tokens;
        if tokens.is_empty() {
            return Err(ConfigError::Validation(format!(
                "no values configured: set values.tokens, provide {} or pass --value",
                self.values_resolved.list_file.display()
            )));
        }
        if let Some(invalid) = tokens.iter().find(|token| !is_valid_token(token)) {
            return Err(ConfigError::Validation(format!(
                "invalid value token {invalid:?}: only letters, digits, '_', '.' and '-' are allowed"
            )));
        }
        Ok(())
    }

    fn validate_roles(&self) -> Result<(), ConfigError> {
        let Some(attribute) = &self.roles.attribute else {
            return Ok(());
        };
        if attribute.is_empty() {
            return Err(ConfigError::Validation(
                "roles.attribute cannot be empty".to_owned(),
            ));
        }
        if attribute
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '[' | ']' | '#'))
        {
            return Err(ConfigError::Validation(format!(
                "roles.attribute {attribute:?} cannot contain whitespace, quotes, brackets or '#'"
            )));
        }
        Ok(())
    }
}

/// Search for config file in current directory and parents.
#[must_use]
pub fn discover_config() -> Option<PathBuf> {
    let current = std::env::current_dir().ok()?;
    discover_config_from(&current)
}

/// Search for config file in `start` and its parents.
#[must_use]
pub fn discover_config_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}
