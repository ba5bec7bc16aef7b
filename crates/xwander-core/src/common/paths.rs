//! Path Utilities
//!
//! Common path resolution for the xwander directory and files.

use std::path::PathBuf;

use super::error::XwanderError;

/// Get the xwander base directory (`~/.xwander/`)
pub fn xwander_dir() -> Result<PathBuf, XwanderError> {
    let home = dirs::home_dir()
        .ok_or_else(|| XwanderError::config("Could not determine home directory"))?;
    Ok(home.join(".xwander"))
}

/// Get a path within the xwander directory
///
/// # Example
/// ```ignore
/// let config = xwander_path("config.json")?;
/// ```
pub fn xwander_path(relative_path: &str) -> Result<PathBuf, XwanderError> {
    Ok(xwander_dir()?.join(relative_path))
}

/// Get the default config file path
pub fn config_path() -> Result<PathBuf, XwanderError> {
    xwander_path("config.json")
}
