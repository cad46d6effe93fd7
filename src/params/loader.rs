//! Parameter file loading (std only).

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{bounded, ConfigError, Error, Result};

use super::ParameterSet;

/// Load a parameter set from a TOML file.
///
/// A leading `~` is expanded to the home directory.
///
/// # Errors
///
/// Returns an error if the file cannot be found, read, or parsed.
///
/// # Example
///
/// ```rust,ignore
/// use actuator_demos::params::load_parameters;
///
/// let params = load_parameters("~/params/current_control.toml")?;
/// ```
pub fn load_parameters<P: AsRef<Path>>(path: P) -> Result<ParameterSet> {
    let path = expand_home(path.as_ref());
    if !path.is_file() {
        let msg = format!("could not find parameter file: '{}'", path.display());
        return Err(Error::Config(ConfigError::IoError(bounded(&msg))));
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| Error::Config(ConfigError::IoError(bounded(&e.to_string()))))?;

    parse_parameters(&content)
}

/// Parse a parameter set from a TOML string.
///
/// No schema is applied here; see [`ParameterSchema`](super::ParameterSchema).
///
/// # Errors
///
/// Returns an error if the TOML is invalid or holds unsupported value types.
pub fn parse_parameters(content: &str) -> Result<ParameterSet> {
    toml::from_str(content).map_err(|e| Error::Config(ConfigError::ParseError(bounded(e.message()))))
}

fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}
