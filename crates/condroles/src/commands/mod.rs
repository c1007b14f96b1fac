//! CLI command implementations.

pub(crate) mod inspect;
pub(crate) mod process;
pub(crate) mod roles;

use std::path::{Path, PathBuf};

use clap::Args;
use condroles_config::{CliSettings, Config, split_values};
use condroles_core::{Preprocessor, RoleFormat};
use tracing::debug;

use crate::error::CliError;

pub(crate) use inspect::InspectArgs;
pub(crate) use process::ProcessArgs;
pub(crate) use roles::RolesArgs;

/// Configuration options shared by every command.
#[derive(Args)]
pub(crate) struct ConfigArgs {
    /// Path to configuration file (default: auto-discover condroles.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Value list file, one value per line (overrides config).
    #[arg(short, long, env = "CONDROLES_LIST")]
    list: Option<PathBuf>,

    /// Role prefix: roles become `<attribute>:<value>` (overrides config).
    #[arg(short, long, env = "CONDROLES_ROLE_ATTRIBUTE")]
    role_attribute: Option<String>,

    /// Extra recognized value; repeatable, comma or space separated.
    #[arg(long = "value")]
    extra_values: Vec<String>,
}

impl ConfigArgs {
    /// Load the configuration with these options applied.
    pub(crate) fn load(&self) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            list_file: self.list.clone(),
            role_attribute: self.role_attribute.clone(),
            values: split_values(&self.extra_values).into_iter().collect(),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        debug!(
            config = ?config.config_path,
            values = ?config.values(),
            role_attribute = ?config.role_attribute(),
            "configuration loaded"
        );
        Ok(config)
    }
}

pub(crate) fn role_format(config: &Config) -> RoleFormat {
    RoleFormat::new(config.role_attribute().map(str::to_owned))
}

pub(crate) fn preprocessor(config: &Config) -> Preprocessor {
    Preprocessor::new(config.values().clone(), role_format(config))
}

pub(crate) fn read_input(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::File {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_output(path: &Path, content: &str) -> Result<(), CliError> {
    std::fs::write(path, content).map_err(|source| CliError::File {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_missing_input_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.adoc");

        let err = read_input(&path).unwrap_err();

        assert!(matches!(&err, CliError::File { path: p, .. } if *p == path));
        assert!(err.to_string().starts_with(&format!("{}: ", path.display())));
    }

    #[test]
    fn test_unwritable_output_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-such-dir").join("out.adoc");

        let err = write_output(&path, "text\n").unwrap_err();

        assert!(matches!(&err, CliError::File { path: p, .. } if *p == path));
    }

    #[test]
    fn test_output_round_trips_through_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.adoc");

        write_output(&path, "Text\n").unwrap();

        assert_eq!(read_input(&path).unwrap(), "Text\n");
    }
}
