//! Path Utilities
//!
//! Resolution of the mailsig home directory and files inside it.

use std::path::PathBuf;

use crate::config::ConfigError;

/// Get the mailsig base directory (`~/.mailsig/`)
pub fn mailsig_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeDirUnavailable)?;
    Ok(home.join(".mailsig"))
}

/// Get the default config file path
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(mailsig_dir()?.join("config.json"))
}
