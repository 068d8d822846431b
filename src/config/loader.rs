//! Configuration loading from the process arguments and environment.
//!
//! A `.env` file in the working directory is read first; its entries only
//! fill variables the environment does not already define.

use std::ffi::OsString;
use std::path::Path;

use clap::Parser;
use thiserror::Error;

use crate::config::cli::Cli;
use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Args(#[from] clap::Error),

    #[error("failed to read env file: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Env file read by [`load_config`].
pub const ENV_FILE: &str = ".env";

/// Merge `KEY=value` lines from `path` into the process environment without
/// overriding variables that are already set. Returns `false` when the file
/// does not exist.
pub fn load_env_file(path: &Path) -> Result<bool, dotenvy::Error> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Load and validate configuration from `.env`, `std::env::args` and the
/// environment.
pub fn load_config() -> Result<ProxyConfig, ConfigError> {
    load_env_file(Path::new(ENV_FILE))?;
    load_config_from(std::env::args_os())
}

/// Load and validate configuration from an explicit argument list.
pub fn load_config_from<I, T>(args: I) -> Result<ProxyConfig, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let config = Cli::try_parse_from(args)?.into_config();
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
