/// Per-frame fusion pass: filter, colour, unproject and merge every depth pixel.
use crate::buffer::{BufferError, PlanarBufferView};
use crate::camera::{CameraError, Unprojector, map_to_color_grid};
use crate::color::YCbCrView;
use crate::frame::{ConfidenceLevel, FrameSample};
use crate::merge_store::SpatialMergeStore;
use crate::settings::FusionSettings;
use std::ops::AddAssign;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FusionError {
    #[error("depth map unavailable: {0}")]
    Depth(BufferError),
    #[error("confidence map unavailable: {0}")]
    Confidence(BufferError),
    #[error("colour image unavailable: {0}")]
    Image(BufferError),
    #[error("confidence map is {confidence:?} but depth map is {depth:?}")]
    DimensionMismatch {
        depth: (usize, usize),
        confidence: (usize, usize),
    },
    #[error(transparent)]
    Camera(#[from] CameraError),
}

/// Pixel accounting for one or more fusion passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FusionStats {
    pub pixels: usize,
    pub low_confidence: usize,
    pub out_of_range: usize,
    pub outside_image: usize,
    /// Points the pose projected to infinity or NaN.
    pub non_finite: usize,
    pub merged: usize,
    pub duplicates: usize,
}

impl AddAssign for FusionStats {
    fn add_assign(&mut self, other: Self) {
        self.pixels += other.pixels;
        self.low_confidence += other.low_confidence;
        self.out_of_range += other.out_of_range;
        self.outside_image += other.outside_image;
        self.non_finite += other.non_finite;
        self.merged += other.merged;
        self.duplicates += other.duplicates;
    }
}

/// Fold every usable pixel of `frame` into `store`.
///
/// Per-pixel rejections are counted, never raised. Accepted points are staged
/// and merged only once every pixel has been read, so an error leaves the
/// store untouched.
pub fn fuse_frame(
    frame: &FrameSample,
    settings: &FusionSettings,
    store: &mut SpatialMergeStore,
) -> Result<FusionStats, FusionError> {
    let depth_data = frame.depth_data(settings.prefer_smoothed_depth);
    let depth = PlanarBufferView::new(&depth_data.depth, 1).map_err(FusionError::Depth)?;
    let confidence =
        PlanarBufferView::new(&depth_data.confidence, 1).map_err(FusionError::Confidence)?;
    let image = YCbCrView::new(&frame.image).map_err(FusionError::Image)?;

    let depth_size = (depth.width(), depth.height());
    let confidence_size = (confidence.width(), confidence.height());
    if depth_size != confidence_size {
        return Err(FusionError::DimensionMismatch {
            depth: depth_size,
            confidence: confidence_size,
        });
    }
    let color_size = (image.width(), image.height());

    let unprojector = Unprojector::new(frame.intrinsics, frame.view_matrix, frame.orientation)?;

    let mut stats = FusionStats::default();
    let mut accepted = Vec::with_capacity(depth_size.0 * depth_size.1);
    for row in 0..depth_size.1 {
        for col in 0..depth_size.0 {
            stats.pixels += 1;

            let raw = confidence
                .sample::<u8>(0, col, row)
                .map_err(FusionError::Confidence)?;
            match ConfidenceLevel::from_raw(raw) {
                Some(level) if level >= settings.min_confidence => {}
                _ => {
                    stats.low_confidence += 1;
                    continue;
                }
            }

            let sample = depth.sample::<f32>(0, col, row).map_err(FusionError::Depth)?;
            if !sample.is_finite() || sample > settings.max_depth {
                stats.out_of_range += 1;
                continue;
            }

            let Some(mapping) = map_to_color_grid(col, row, depth_size, color_size) else {
                stats.outside_image += 1;
                continue;
            };
            let Ok(color) = image.color(mapping.pixel.0, mapping.pixel.1) else {
                stats.outside_image += 1;
                continue;
            };

            let position = unprojector.unproject(mapping.screen, sample);
            if !position.is_finite() {
                stats.non_finite += 1;
                continue;
            }
            accepted.push((position, color));
        }
    }

    for (position, color) in accepted {
        if store.try_insert(position, color) {
            stats.merged += 1;
        } else {
            stats.duplicates += 1;
        }
    }

    debug!(
        "Fused frame at {:.3}s: {} merged, {} duplicates, {} low confidence, {} out of range, {} outside image, {} non-finite",
        frame.timestamp,
        stats.merged,
        stats.duplicates,
        stats.low_confidence,
        stats.out_of_range,
        stats.outside_image,
        stats.non_finite
    );

    Ok(stats)
}

/// Owns the merged point set and applies fusion passes to it.
#[derive(Debug, Clone, Default)]
pub struct FusionEngine {
    settings: FusionSettings,
    store: SpatialMergeStore,
}

impl FusionEngine {
    pub fn new(settings: FusionSettings) -> Self {
        let store = SpatialMergeStore::new(settings.grid_density);
        Self { settings, store }
    }

    pub fn settings(&self) -> &FusionSettings {
        &self.settings
    }

    pub fn store(&self) -> &SpatialMergeStore {
        &self.store
    }

    pub fn process(&mut self, frame: &FrameSample) -> Result<FusionStats, FusionError> {
        fuse_frame(frame, &self.settings, &mut self.store)
    }

    pub fn reset(&mut self) {
        self.store.reset();
    }
}
