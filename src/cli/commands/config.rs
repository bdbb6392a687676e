//! Config Command

use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the effective merged configuration.
pub fn show(as_json: bool) -> Result<()> {
    ConfigLoader::show_config(as_json)
}

/// Show the configuration file locations.
pub fn path() {
    ConfigLoader::show_path();
}
