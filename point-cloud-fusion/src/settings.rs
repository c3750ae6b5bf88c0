/// Fusion tuning loaded from JSON, defaulting to the shared constants.
use crate::frame::ConfidenceLevel;
use constants::fusion::{GRID_DENSITY, MAX_DEPTH_METERS};
use constants::render_settings::RENDER_SAMPLE_STRIDE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionSettings {
    /// Grid cells per world unit for point merging.
    pub grid_density: f32,
    /// Samples beyond this depth (metres) are skipped.
    pub max_depth: f32,
    /// Lowest confidence level accepted.
    pub min_confidence: ConfidenceLevel,
    /// Renderer receives every Nth merged vertex.
    pub render_stride: usize,
    /// Use the temporally smoothed depth map when the frame carries one.
    pub prefer_smoothed_depth: bool,
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self {
            grid_density: GRID_DENSITY,
            max_depth: MAX_DEPTH_METERS,
            min_confidence: ConfidenceLevel::High,
            render_stride: RENDER_SAMPLE_STRIDE,
            prefer_smoothed_depth: true,
        }
    }
}

impl FusionSettings {
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, SettingsError> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.grid_density.is_finite() && self.grid_density > 0.0) {
            return Err(SettingsError::Invalid(format!(
                "grid_density must be positive, got {}",
                self.grid_density
            )));
        }
        if !(self.max_depth.is_finite() && self.max_depth > 0.0) {
            return Err(SettingsError::Invalid(format!(
                "max_depth must be positive, got {}",
                self.max_depth
            )));
        }
        if self.render_stride == 0 {
            return Err(SettingsError::Invalid(
                "render_stride must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
