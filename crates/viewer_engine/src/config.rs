//! Viewer configuration
//!
//! TOML-backed settings for the window, shader binaries and asset paths.
//! Defaults describe the stock demo scene (800x600 window, viking room
//! model).

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Window settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in pixels
    pub width: u32,
    /// Window height in pixels
    pub height: u32,
    /// Window title
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "Model Viewer".to_string(),
        }
    }
}

/// Precompiled SPIR-V shader paths
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Path to the vertex shader SPIR-V file
    pub vertex: String,
    /// Path to the fragment shader SPIR-V file
    pub fragment: String,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            vertex: "shaders/vert.spv".to_string(),
            fragment: "shaders/frag.spv".to_string(),
        }
    }
}

/// Scene asset paths
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Path to the OBJ model file
    pub model: String,
    /// Path to the texture image file
    pub texture: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            model: "models/viking_room.obj".to_string(),
            texture: "textures/viking_room.png".to_string(),
        }
    }
}

/// Top-level viewer configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Window settings
    pub window: WindowConfig,
    /// Shader binary locations
    pub shaders: ShaderConfig,
    /// Model and texture locations
    pub assets: AssetConfig,
    /// Enable Vulkan validation layers
    pub validation: ValidationConfig,
}

/// Validation layer toggle
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Request validation layers at instance creation
    pub enabled: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { enabled: cfg!(debug_assertions) }
    }
}

impl ViewerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load from a TOML file if it exists, defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_describe_the_stock_scene() {
        let config = ViewerConfig::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.shaders.vertex, "shaders/vert.spv");
        assert_eq!(config.assets.model, "models/viking_room.obj");
    }

    #[test]
    fn test_partial_toml_overrides_defaults() {
        let toml = r#"
            [window]
            width = 1280
            height = 720

            [validation]
            enabled = false
        "#;
        let config: ViewerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
        assert!(!config.validation.enabled);
        // Untouched sections keep their defaults
        assert_eq!(config.shaders.fragment, "shaders/frag.spv");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let result: Result<ViewerConfig, _> = toml::from_str("window = 3");
        assert!(result.is_err());
    }
}
