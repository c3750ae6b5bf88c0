/// Camera model: orientation correction and depth unprojection into world space.
use bevy_math::{Mat3, Mat4, Vec2, Vec3};
use constants::coordinate_system::{
    CAMERA_FLIP_YZ, LANDSCAPE_LEFT_ROTATION, LANDSCAPE_RIGHT_ROTATION, PORTRAIT_ROTATION,
    PORTRAIT_UPSIDE_DOWN_ROTATION,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("camera intrinsics matrix is not invertible")]
    SingularIntrinsics,
    #[error("camera view matrix is not invertible")]
    SingularViewMatrix,
}

/// Interface orientation the frame was captured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterfaceOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

impl InterfaceOrientation {
    /// Rotation about the sensor Z axis, in radians.
    pub fn rotation_angle(self) -> f32 {
        match self {
            Self::Portrait => PORTRAIT_ROTATION,
            Self::PortraitUpsideDown => PORTRAIT_UPSIDE_DOWN_ROTATION,
            Self::LandscapeLeft => LANDSCAPE_LEFT_ROTATION,
            Self::LandscapeRight => LANDSCAPE_RIGHT_ROTATION,
        }
    }

    /// Sensor-to-camera correction: the fixed Y/Z flip composed with the orientation rotation.
    pub fn camera_correction(self) -> Mat4 {
        Mat4::from_cols_array_2d(&CAMERA_FLIP_YZ) * Mat4::from_rotation_z(self.rotation_angle())
    }
}

/// Pinhole intrinsics matrix `[[fx, 0, cx], [0, fy, cy], [0, 0, 1]]`.
pub fn intrinsics_matrix(fx: f32, fy: f32, cx: f32, cy: f32) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(fx, 0.0, 0.0),
        Vec3::new(0.0, fy, 0.0),
        Vec3::new(cx, cy, 1.0),
    )
}

pub fn mat3_from_rows(rows: &[[f32; 3]; 3]) -> Mat3 {
    Mat3::from_cols_array_2d(rows).transpose()
}

pub fn mat4_from_rows(rows: &[[f32; 4]; 4]) -> Mat4 {
    Mat4::from_cols_array_2d(rows).transpose()
}

/// Depth pixel mapped onto the colour image grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorGridMapping {
    /// Rounded colour pixel used for sampling.
    pub pixel: (usize, usize),
    /// Continuous colour-space coordinate used for unprojection.
    pub screen: Vec2,
}

/// Map depth pixel `(col, row)` onto a colour image of a possibly different resolution.
/// Returns `None` when the rounded pixel falls outside the colour image.
pub fn map_to_color_grid(
    col: usize,
    row: usize,
    depth_size: (usize, usize),
    color_size: (usize, usize),
) -> Option<ColorGridMapping> {
    let normalized = Vec2::new(
        col as f32 / depth_size.0 as f32,
        row as f32 / depth_size.1 as f32,
    );
    let screen = normalized * Vec2::new(color_size.0 as f32, color_size.1 as f32);

    let px = screen.x.round();
    let py = screen.y.round();
    if !(px >= 0.0 && py >= 0.0) {
        return None;
    }

    let (px, py) = (px as usize, py as usize);
    if px >= color_size.0 || py >= color_size.1 {
        return None;
    }

    Some(ColorGridMapping {
        pixel: (px, py),
        screen,
    })
}

/// Per-frame unprojection state: inverse intrinsics plus the composed camera-to-world transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unprojector {
    inverse_intrinsics: Mat3,
    camera_to_world: Mat4,
}

impl Unprojector {
    /// Invert the intrinsics and the view matrix once for a whole frame.
    pub fn new(
        intrinsics: Mat3,
        view_matrix: Mat4,
        orientation: InterfaceOrientation,
    ) -> Result<Self, CameraError> {
        if intrinsics.determinant() == 0.0 {
            return Err(CameraError::SingularIntrinsics);
        }
        let inverse_intrinsics = intrinsics.inverse();
        if !inverse_intrinsics.is_finite() {
            return Err(CameraError::SingularIntrinsics);
        }

        if view_matrix.determinant() == 0.0 {
            return Err(CameraError::SingularViewMatrix);
        }
        let view_inverse = view_matrix.inverse();
        if !view_inverse.is_finite() {
            return Err(CameraError::SingularViewMatrix);
        }

        Ok(Self {
            inverse_intrinsics,
            camera_to_world: view_inverse * orientation.camera_correction(),
        })
    }

    /// Camera-space point for colour-grid coordinate `screen` at `depth` metres.
    pub fn to_camera(&self, screen: Vec2, depth: f32) -> Vec3 {
        self.inverse_intrinsics * screen.extend(1.0) * depth
    }

    /// World-space point for colour-grid coordinate `screen` at `depth` metres.
    pub fn unproject(&self, screen: Vec2, depth: f32) -> Vec3 {
        let world = self.camera_to_world * self.to_camera(screen, depth).extend(1.0);
        world.truncate() / world.w
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn test_intrinsics() -> Mat3 {
        intrinsics_matrix(2.0, 2.0, 4.0, 4.0)
    }

    #[test]
    fn landscape_right_is_a_pure_flip() {
        let unprojector = Unprojector::new(
            test_intrinsics(),
            Mat4::IDENTITY,
            InterfaceOrientation::LandscapeRight,
        )
        .unwrap();

        let point = unprojector.unproject(Vec2::new(4.0, 2.0), 1.5);
        assert!(point.abs_diff_eq(Vec3::new(0.0, 1.5, -1.5), EPS), "{point}");
    }

    #[test]
    fn portrait_rotates_before_flip() {
        let unprojector = Unprojector::new(
            test_intrinsics(),
            Mat4::IDENTITY,
            InterfaceOrientation::Portrait,
        )
        .unwrap();

        // Camera space (0, -1.5, 1.5) -> rotate +90 about Z -> (1.5, 0, 1.5) -> flip.
        let point = unprojector.unproject(Vec2::new(4.0, 2.0), 1.5);
        assert!(point.abs_diff_eq(Vec3::new(1.5, 0.0, -1.5), EPS), "{point}");
    }

    #[test]
    fn landscape_left_and_upside_down() {
        let camera = Vec3::new(1.0, 2.0, 3.0).extend(1.0);

        let left = InterfaceOrientation::LandscapeLeft.camera_correction() * camera;
        assert!(left.truncate().abs_diff_eq(Vec3::new(-1.0, 2.0, -3.0), EPS));

        let upside_down = InterfaceOrientation::PortraitUpsideDown.camera_correction() * camera;
        assert!(
            upside_down
                .truncate()
                .abs_diff_eq(Vec3::new(2.0, 1.0, -3.0), EPS)
        );
    }

    #[test]
    fn view_matrix_is_inverted_to_camera_to_world() {
        // Camera sits at (1, 2, 3); the view matrix is the inverse of that pose.
        let pose = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let unprojector = Unprojector::new(
            test_intrinsics(),
            pose.inverse(),
            InterfaceOrientation::LandscapeRight,
        )
        .unwrap();

        // Principal point at depth 1 is straight down the optical axis.
        let point = unprojector.unproject(Vec2::new(4.0, 4.0), 1.0);
        assert!(point.abs_diff_eq(Vec3::new(1.0, 2.0, 2.0), EPS), "{point}");
    }

    #[test]
    fn singular_matrices_are_rejected() {
        let flat = Mat3::from_cols(Vec3::X, Vec3::X, Vec3::Z);
        assert_eq!(
            Unprojector::new(flat, Mat4::IDENTITY, InterfaceOrientation::Portrait),
            Err(CameraError::SingularIntrinsics)
        );
        assert_eq!(
            Unprojector::new(
                test_intrinsics(),
                Mat4::ZERO,
                InterfaceOrientation::Portrait
            ),
            Err(CameraError::SingularViewMatrix)
        );
    }

    #[test]
    fn color_grid_mapping_rescales_and_bounds_checks() {
        let mapping = map_to_color_grid(2, 1, (4, 4), (8, 8)).unwrap();
        assert_eq!(mapping.pixel, (4, 2));
        assert_eq!(mapping.screen, Vec2::new(4.0, 2.0));

        // 3/4 * 6 = 4.5 rounds away from zero to 5.
        let mapping = map_to_color_grid(3, 0, (4, 4), (6, 6)).unwrap();
        assert_eq!(mapping.pixel, (5, 0));

        // 5/6 * 3 = 2.5 rounds to 3, outside a 3 pixel wide image.
        assert!(map_to_color_grid(5, 0, (6, 6), (3, 3)).is_none());
    }

    #[test]
    fn row_major_helpers_transpose() {
        let k = mat3_from_rows(&[[2.0, 0.0, 4.0], [0.0, 3.0, 5.0], [0.0, 0.0, 1.0]]);
        assert_eq!(k, intrinsics_matrix(2.0, 3.0, 4.0, 5.0));

        let view = mat4_from_rows(&[
            [1.0, 0.0, 0.0, 7.0],
            [0.0, 1.0, 0.0, 8.0],
            [0.0, 0.0, 1.0, 9.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        assert_eq!(view, Mat4::from_translation(Vec3::new(7.0, 8.0, 9.0)));
    }
}
