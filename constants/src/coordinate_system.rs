/// Camera sensor to display axis flip (column-major, same layout as `Mat4::from_cols_array_2d`).
/// Default: Y and Z negated (X→X, Y→-Y, Z→-Z)
pub const CAMERA_FLIP_YZ: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],  // X = X
    [0.0, -1.0, 0.0, 0.0], // Y = -Y
    [0.0, 0.0, -1.0, 0.0], // Z = -Z
    [0.0, 0.0, 0.0, 1.0],
];

/// Z rotation applied before the flip for each declared interface orientation (radians).
pub const PORTRAIT_ROTATION: f32 = std::f32::consts::FRAC_PI_2;
pub const PORTRAIT_UPSIDE_DOWN_ROTATION: f32 = -std::f32::consts::FRAC_PI_2;
pub const LANDSCAPE_LEFT_ROTATION: f32 = std::f32::consts::PI;
pub const LANDSCAPE_RIGHT_ROTATION: f32 = 0.0;
