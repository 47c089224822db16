//! XDG Base Directory utilities.

use std::path::PathBuf;

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise the platform config directory
/// (`$HOME/.config` on Linux).
pub fn config_home() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(xdg));
    }
    directories::BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf())
}

/// `$XDG_CONFIG_HOME/fsdex/config.toml`
pub fn global_config_path() -> Option<PathBuf> {
    config_home().map(|home| home.join("fsdex").join("config.toml"))
}
