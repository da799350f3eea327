//! Configuration schema types for `tilegfx.toml`
//!
//! Defines the structure and validation rules for build configuration.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Environment variable that overrides the configured rasterizer executable.
pub const RASTERIZER_ENV: &str = "ASEPRITE_EXECUTABLE";

/// External rasterizer section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterizerConfig {
    /// Rasterizer command, looked up on PATH when not absolute
    #[serde(default = "default_executable")]
    pub executable: String,
}

fn default_executable() -> String {
    "aseprite".to_string()
}

impl Default for RasterizerConfig {
    fn default() -> Self {
        Self { executable: default_executable() }
    }
}

impl RasterizerConfig {
    /// Executable to invoke: the environment override if set, otherwise the
    /// configured command.
    pub fn resolved_executable(&self) -> String {
        env::var(RASTERIZER_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.executable.clone())
    }
}

/// Engine palette section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteConfig {
    /// Palette file: raw 768 bytes of RGB or a JASC-PAL text file
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Conditional-skip guard variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Engine global variable holding the active climate
    #[serde(default = "default_climate_variable")]
    pub climate_variable: u8,
    /// Build parameter holding the thin-lines switch
    #[serde(default)]
    pub thin_lines_parameter: u8,
}

fn default_climate_variable() -> u8 {
    0x83
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self { climate_variable: default_climate_variable(), thin_lines_parameter: 0 }
    }
}

/// Finished sprite output section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Crop fully transparent borders of finished sprites
    #[serde(default = "default_trim")]
    pub trim: bool,
}

fn default_trim() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { trim: default_trim() }
    }
}

/// Complete build configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GfxConfig {
    #[serde(default)]
    pub rasterizer: RasterizerConfig,
    #[serde(default)]
    pub palette: PaletteConfig,
    #[serde(default)]
    pub guards: GuardConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "guards.climate_variable")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tilegfx.toml: '{}' {}", self.field, self.message)
    }
}

impl GfxConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.rasterizer.executable.trim().is_empty() {
            errors.push(ConfigValidationError {
                field: "rasterizer.executable".to_string(),
                message: "must be a non-empty command".to_string(),
            });
        }

        // Engine globals live at 0x80 and above, build parameters below 0x40
        if self.guards.climate_variable < 0x80 {
            errors.push(ConfigValidationError {
                field: "guards.climate_variable".to_string(),
                message: format!("0x{:02X} is not a global variable (expected >= 0x80)", self.guards.climate_variable),
            });
        }
        if self.guards.thin_lines_parameter >= 0x40 {
            errors.push(ConfigValidationError {
                field: "guards.thin_lines_parameter".to_string(),
                message: format!("0x{:02X} is not a parameter number (expected < 0x40)", self.guards.thin_lines_parameter),
            });
        }

        if let Some(path) = &self.palette.path {
            if path.as_os_str().is_empty() {
                errors.push(ConfigValidationError {
                    field: "palette.path".to_string(),
                    message: "must not be empty when set".to_string(),
                });
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = GfxConfig::default();
        assert_eq!(config.rasterizer.executable, "aseprite");
        assert_eq!(config.guards.climate_variable, 0x83);
        assert_eq!(config.guards.thin_lines_parameter, 0);
        assert!(config.output.trim);
        assert!(config.palette.path.is_none());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: GfxConfig = toml::from_str(
            r#"
            [guards]
            thin_lines_parameter = 3

            [output]
            trim = false
            "#,
        )
        .unwrap();
        assert_eq!(config.guards.climate_variable, 0x83);
        assert_eq!(config.guards.thin_lines_parameter, 3);
        assert!(!config.output.trim);
        assert_eq!(config.rasterizer, RasterizerConfig::default());
    }

    #[test]
    fn test_validate_guard_ranges() {
        let mut config = GfxConfig::default();
        config.guards.climate_variable = 0x10;
        config.guards.thin_lines_parameter = 0x50;
        let errors = config.validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "guards.climate_variable");
        assert_eq!(errors[1].field, "guards.thin_lines_parameter");
    }

    #[test]
    fn test_validate_empty_executable() {
        let mut config = GfxConfig::default();
        config.rasterizer.executable = "  ".to_string();
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("rasterizer.executable"));
    }

    #[test]
    #[serial]
    fn test_executable_env_override() {
        let config = RasterizerConfig { executable: "/opt/aseprite/aseprite".to_string() };

        env::remove_var(RASTERIZER_ENV);
        assert_eq!(config.resolved_executable(), "/opt/aseprite/aseprite");

        env::set_var(RASTERIZER_ENV, "/usr/local/bin/aseprite");
        assert_eq!(config.resolved_executable(), "/usr/local/bin/aseprite");

        env::set_var(RASTERIZER_ENV, "");
        assert_eq!(config.resolved_executable(), "/opt/aseprite/aseprite");
        env::remove_var(RASTERIZER_ENV);
    }
}
