/// Renderer-facing geometry: downsampled positions, colours and point indices.
use crate::merge_store::Vertex;
use constants::render_settings::MAX_POINT_SCREEN_RADIUS;
use tracing::warn;

/// Points beyond what a `u32` index buffer can address are left out.
fn renderable_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Flat vertex attribute arrays for a point-list draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct PointGeometry {
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
    /// One index per point, in order.
    pub indices: Vec<u32>,
    pub max_point_screen_radius: f32,
}

impl PointGeometry {
    pub fn from_vertices(vertices: &[Vertex]) -> Self {
        let count = renderable_count(vertices.len());
        if count as usize != vertices.len() {
            warn!(
                "Rendering {} of {} points, index buffer is full",
                count,
                vertices.len()
            );
        }
        let vertices = &vertices[..count as usize];

        Self {
            positions: vertices.iter().map(|v| v.position.to_array()).collect(),
            colors: vertices.iter().map(|v| v.color.to_array()).collect(),
            indices: (0..count).collect(),
            max_point_screen_radius: MAX_POINT_SCREEN_RADIUS,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
