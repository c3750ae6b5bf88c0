/// Grid cells per world unit used to derive merge keys (0.01 m cells)
pub const GRID_DENSITY: f32 = 100.0;

/// Depth samples further than this (metres) are discarded as noise
pub const MAX_DEPTH_METERS: f32 = 2.0;

/// Raw confidence byte values reported by the depth sensor
pub const CONFIDENCE_LOW: u8 = 0;
pub const CONFIDENCE_MEDIUM: u8 = 1;
pub const CONFIDENCE_HIGH: u8 = 2;
