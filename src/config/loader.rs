//! Configuration loading and discovery for `tilegfx.toml`

use super::schema::GfxConfig;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up by [`find_config_from`].
pub const CONFIG_FILE: &str = "tilegfx.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse tilegfx.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// Find tilegfx.toml by walking up from a directory.
///
/// # Returns
/// - `Some(path)` if a tilegfx.toml file is found
/// - `None` once the filesystem root is reached
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a tilegfx.toml file.
///
/// With no path, the configuration is searched upwards from the current
/// directory; if none is found the defaults are used.
///
/// # Example
/// ```ignore
/// let config = load_config(Some(Path::new("graphics/tilegfx.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<GfxConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => std::env::current_dir().ok().and_then(find_config_from),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(GfxConfig::default()),
    }
}

/// Load configuration from a specific file path.
///
/// A relative palette path is resolved against the directory holding the
/// configuration file.
fn load_config_file(path: &Path) -> Result<GfxConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let mut config: GfxConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    if let (Some(root), Some(palette)) = (path.parent(), config.palette.path.as_mut()) {
        *palette = resolve_path(root, palette);
    }

    Ok(config)
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}
