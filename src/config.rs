//! Runtime configuration, read once at startup from an optional JSON file.
//!
//! Every field has a default, so an empty object (or no file) is a valid config.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

use crate::camera::IsometricProjector;
use crate::error::ConfigError;
use crate::export::DEFAULT_BASENAME;
use crate::render::raster::supported_sample_count;
use crate::render::{BloomSettings, PipelineSettings, VignetteSettings};
use crate::scene::SceneSettings;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scene: SceneSettings,
    pub camera: CameraSettings,
    pub post: PostSettings,
    pub export: ExportSettings,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    #[serde(flatten)]
    pub projector: IsometricProjector,
    /// Vertical extent of the view in world units.
    pub zoom_scale: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            projector: IsometricProjector::default(),
            zoom_scale: 6.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PostSettings {
    pub bloom: BloomSettings,
    pub vignette: VignetteSettings,
    pub samples: u32,
    pub band_height: u32,
}

impl Default for PostSettings {
    fn default() -> Self {
        let pipeline = PipelineSettings::default();
        Self {
            bloom: pipeline.bloom,
            vignette: pipeline.vignette,
            samples: pipeline.samples,
            band_height: pipeline.band_height,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub default_basename: String,
    pub output_dir: PathBuf,
    pub presets: Vec<u32>,
    pub max_dimension: u32,
    pub preserve_drawing_buffer: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            default_basename: DEFAULT_BASENAME.to_string(),
            output_dir: PathBuf::from("."),
            presets: vec![512, 1024, 2048, 4096, 7680],
            max_dimension: 8192,
            preserve_drawing_buffer: true,
        }
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

fn finite_non_negative(name: &str, v: f32) -> Result<(), ConfigError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be finite and non-negative, got {v}")))
    }
}

impl Config {
    /// Reads `path`, or returns the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scene.validate().map_err(|e| invalid(e.0))?;
        self.camera
            .projector
            .compute_frustum(1.0, self.camera.zoom_scale)
            .map_err(|e| invalid(e.0))?;

        let bloom = &self.post.bloom;
        finite_non_negative("bloom threshold", bloom.threshold)?;
        // zero smoothing collapses the bloom knee into a hard threshold
        if !(bloom.smoothing.is_finite() && bloom.smoothing > 0.0) {
            return Err(invalid(format!(
                "bloom smoothing must be finite and positive, got {}",
                bloom.smoothing
            )));
        }
        finite_non_negative("bloom intensity", bloom.intensity)?;
        finite_non_negative("vignette offset", self.post.vignette.offset)?;
        finite_non_negative("vignette darkness", self.post.vignette.darkness)?;
        if !supported_sample_count(self.post.samples) {
            return Err(invalid(format!(
                "samples must be 1, 2, 4 or 8, got {}",
                self.post.samples
            )));
        }
        if self.post.band_height == 0 {
            return Err(invalid("band height must be positive"));
        }

        let export = &self.export;
        if export.default_basename.trim().is_empty() || export.default_basename.contains(['/', '\\']) {
            return Err(invalid(format!(
                "default basename {:?} must be a plain file name",
                export.default_basename
            )));
        }
        if export.max_dimension == 0 {
            return Err(invalid("max dimension must be positive"));
        }
        if let Some(bad) = export.presets.iter().find(|&&p| p == 0) {
            return Err(invalid(format!("export preset {bad} must be positive")));
        }
        Ok(())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            bloom: self.post.bloom,
            vignette: self.post.vignette,
            samples: self.post.samples,
            band_height: self.post.band_height,
            max_dimension: self.export.max_dimension,
            preserve_drawing_buffer: self.export.preserve_drawing_buffer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn empty_object_is_the_default() {
        assert_eq!(Config::from_json_str("{}").unwrap(), Config::default());
        assert_eq!(Config::load(None).unwrap(), Config::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_json_str(
            r#"{
                "scene": { "seed": 9, "environment": "night" },
                "camera": { "zoom_scale": 5.0, "look_at": [0.0, 1.0, 0.0] },
                "post": { "bloom": { "intensity": 0.5 } },
                "export": { "default_basename": "box", "presets": [256] }
            }"#,
        )
        .unwrap();
        assert_eq!(config.scene.seed, Some(9));
        assert_eq!(config.scene.coin_count, 42);
        assert_eq!(config.camera.zoom_scale, 5.0);
        assert_eq!(config.camera.projector.look_at, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(config.camera.projector.radius, 10.0);
        assert_eq!(config.post.bloom.intensity, 0.5);
        assert_eq!(config.post.bloom.threshold, 0.2);
        assert_eq!(config.export.presets, vec![256]);
        assert_eq!(config.pipeline_settings().max_dimension, 8192);
    }

    #[test]
    fn rejects_invalid_values() {
        for bad in [
            r#"{ "camera": { "zoom_scale": 0.0 } }"#,
            r#"{ "camera": { "near": 5.0, "far": 1.0 } }"#,
            r#"{ "post": { "samples": 3 } }"#,
            r#"{ "post": { "bloom": { "intensity": -1.0 } } }"#,
            r#"{ "post": { "bloom": { "smoothing": 0.0 } } }"#,
            r#"{ "export": { "presets": [512, 0] } }"#,
            r#"{ "export": { "default_basename": "a/b" } }"#,
            r#"{ "scene": { "environment": "" } }"#,
        ] {
            assert!(
                matches!(Config::from_json_str(bad), Err(ConfigError::Invalid(_))),
                "{bad} accepted"
            );
        }
        assert!(matches!(Config::from_json_str("[1]"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Config::load(Some(Path::new("/definitely/not/here.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
