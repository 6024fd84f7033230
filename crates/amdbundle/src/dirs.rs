use std::path::PathBuf;

use etcetera::BaseStrategy;

/// Name of the settings file looked up in the project and user config directories
pub const CONFIG_FILE_NAME: &str = "amdbundle.toml";

/// Per-user configuration directory (`$XDG_CONFIG_HOME/amdbundle` or the platform equivalent)
pub fn user_amdbundle_config_dir() -> Option<PathBuf> {
    etcetera::choose_base_strategy()
        .map(|dirs| dirs.config_dir().join("amdbundle"))
        .ok()
}

/// Per-user settings file, whether or not it exists
pub fn user_config_file() -> Option<PathBuf> {
    user_amdbundle_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}
