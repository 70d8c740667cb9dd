//! Renderer settings, loadable from TOML.
//!
//! ```toml
//! width = 640
//! height = 400
//! fov_deg = 75.0
//! far_plane = 4096.0
//! transform_backend = "matrix"
//! brightness_levels = 16
//! master_brightness = 0.0
//! clear_color = [32, 32, 32]
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::{engine::TransformBackend, error::ConfigError, world::Rgb};

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    /// Horizontal field of view, degrees.
    pub fov_deg: f32,
    /// View-space depth of the frustum's far rectangle, world units.
    pub far_plane: f32,
    pub transform_backend: TransformBackend,
    /// Distinct shades textured spans are quantised to.
    pub brightness_levels: u8,
    /// Added to every lit channel (0–255 scale) before clamping.
    pub master_brightness: f32,
    pub clear_color: Rgb,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 400,
            fov_deg: 75.0,
            far_plane: 4096.0,
            transform_backend: TransformBackend::Scalar,
            brightness_levels: 16,
            master_brightness: 0.0,
            clear_color: [32, 32, 32],
        }
    }
}

impl RenderConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let cfg: RenderConfig = toml::from_str(toml_str)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| {
            Err(ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            })
        };
        if self.width == 0 || self.height == 0 {
            return invalid("width/height", "viewport must not be empty");
        }
        if !(self.fov_deg > 0.0 && self.fov_deg < 180.0) {
            return invalid("fov_deg", "must lie strictly between 0 and 180");
        }
        if !(self.far_plane > 1.0) {
            return invalid("far_plane", "must lie beyond the near plane at 1.0");
        }
        if self.brightness_levels < 2 {
            return invalid("brightness_levels", "need at least 2");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = RenderConfig::from_toml_str(
            r#"
            width = 320
            transform_backend = "matrix"
            clear_color = [1, 2, 3]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.width, 320);
        assert_eq!(cfg.height, 400);
        assert_eq!(cfg.transform_backend, TransformBackend::Matrix);
        assert_eq!(cfg.clear_color, [1, 2, 3]);
    }

    #[test]
    fn rejects_bad_values() {
        for bad in ["fov_deg = 180.0", "width = 0", "far_plane = 0.5", "brightness_levels = 1"] {
            assert!(
                matches!(
                    RenderConfig::from_toml_str(bad),
                    Err(ConfigError::Invalid { .. })
                ),
                "{bad}"
            );
        }
        assert!(matches!(
            RenderConfig::from_toml_str("fov = 90"),
            Err(ConfigError::Parse(_))
        ));
    }
}
