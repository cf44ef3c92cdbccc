//! Profile selection for the command line

use std::path::{Path, PathBuf};

use ledlink_core::{ProfileError, SensorProfile};
use thiserror::Error;

/// Errors raised while choosing a sensor profile.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Name is not one of the predefined profiles
    #[error("Unknown profile '{0}' (expected 'comms' or 'light')")]
    UnknownProfile(String),

    /// Profile file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Profile file is not valid JSON for a profile
    #[error("Invalid profile JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Profile parsed but describes unusable timing
    #[error("Invalid profile: {0}")]
    Invalid(#[from] ProfileError),
}

/// Pick the profile from a file if one is given, otherwise by name.
///
/// # Errors
///
/// Returns [`ConfigError`] if the name is unknown, the file cannot be read or
/// parsed, or the resulting profile fails validation.
pub fn resolve_profile(name: &str, file: Option<&Path>) -> Result<SensorProfile, ConfigError> {
    let profile = match file {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            parse_profile(&text)?
        }
        None => SensorProfile::by_name(&name.to_lowercase())
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?,
    };
    profile.validate()?;
    Ok(profile)
}

/// Parse a profile from its JSON form.
///
/// # Errors
///
/// Returns [`ConfigError::Json`] if the text does not describe a profile.
pub fn parse_profile(text: &str) -> Result<SensorProfile, ConfigError> {
    Ok(serde_json::from_str(text)?)
}
