/// Per-frame sensor data handed over by the tracking subsystem.
use crate::buffer::PixelBuffer;
use crate::camera::InterfaceOrientation;
use bevy_math::{Mat3, Mat4};
use constants::fusion::{CONFIDENCE_HIGH, CONFIDENCE_LOW, CONFIDENCE_MEDIUM};
use serde::{Deserialize, Serialize};

/// Reliability class of a depth sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    #[default]
    High,
}

impl ConfidenceLevel {
    /// Unknown raw values yield `None`.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            CONFIDENCE_LOW => Some(Self::Low),
            CONFIDENCE_MEDIUM => Some(Self::Medium),
            CONFIDENCE_HIGH => Some(Self::High),
            _ => None,
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            Self::Low => CONFIDENCE_LOW,
            Self::Medium => CONFIDENCE_MEDIUM,
            Self::High => CONFIDENCE_HIGH,
        }
    }
}

/// A depth map (f32 metres) and its per-pixel confidence map (u8 levels).
#[derive(Debug)]
pub struct DepthData {
    pub depth: PixelBuffer,
    pub confidence: PixelBuffer,
}

/// One synchronized capture: depth, confidence, colour image and camera state.
#[derive(Debug)]
pub struct FrameSample {
    pub timestamp: f64,
    pub scene_depth: DepthData,
    pub smoothed_depth: Option<DepthData>,
    /// Bi-planar 4:2:0 colour image.
    pub image: PixelBuffer,
    pub intrinsics: Mat3,
    pub view_matrix: Mat4,
    pub orientation: InterfaceOrientation,
}

impl FrameSample {
    /// Depth source for fusion: the smoothed map when available and preferred.
    pub fn depth_data(&self, prefer_smoothed: bool) -> &DepthData {
        match &self.smoothed_depth {
            Some(smoothed) if prefer_smoothed => smoothed,
            _ => &self.scene_depth,
        }
    }
}
