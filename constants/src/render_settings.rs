/// Only every Nth merged vertex is handed to the renderer
pub const RENDER_SAMPLE_STRIDE: usize = 10;

/// Upper bound on the on-screen point radius (pixels)
pub const MAX_POINT_SCREEN_RADIUS: f32 = 15.0;
