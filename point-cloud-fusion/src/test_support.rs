/// Synthetic frames shared by unit tests.
use crate::buffer::PixelBuffer;
use crate::camera::{InterfaceOrientation, intrinsics_matrix};
use crate::frame::{DepthData, FrameSample};
use bevy_math::Mat4;

pub const SIDE: usize = 4;

/// 4x4 depth frame over a white image; intrinsics map colour pixel (4, 4) to the optical axis.
pub fn synthetic_frame(depth: &[f32], confidence: &[u8], color_size: (usize, usize)) -> FrameSample {
    let (w, h) = color_size;
    let chroma = w.div_ceil(2) * h.div_ceil(2) * 2;
    FrameSample {
        timestamp: 0.0,
        scene_depth: DepthData {
            depth: PixelBuffer::depth(SIDE, SIDE, depth),
            confidence: PixelBuffer::single_u8(SIDE, SIDE, confidence),
        },
        smoothed_depth: None,
        image: PixelBuffer::nv12(w, h, vec![235; w * h], vec![128; chroma]),
        intrinsics: intrinsics_matrix(2.0, 2.0, 4.0, 4.0),
        view_matrix: Mat4::IDENTITY,
        orientation: InterfaceOrientation::LandscapeRight,
    }
}

pub fn uniform_frame() -> FrameSample {
    synthetic_frame(&[1.0; SIDE * SIDE], &[2; SIDE * SIDE], (8, 8))
}
