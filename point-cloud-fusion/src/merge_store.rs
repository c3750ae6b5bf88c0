/// Spatial-hash point deduplication: one representative vertex per grid cell.
use bevy_math::{Vec3, Vec4};
use constants::fusion::GRID_DENSITY;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};

/// A fused point: world position and normalised RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub color: Vec4,
}

/// Hash of a position quantised to `1 / density` world units per axis.
///
/// Distinct cells can collide, so two far apart points may merge. That false
/// merge rate is accepted at the default density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridKey(u64);

impl GridKey {
    pub fn new(position: Vec3, density: f32) -> Self {
        let mut hasher = FxHasher::default();
        for component in position.to_array() {
            // Saturating float-to-int cast; NaN maps to 0.
            ((component * density).round() as i64).hash(&mut hasher);
        }
        Self(hasher.finish())
    }

    /// Integer cell coordinates a position falls into.
    pub fn cell(position: Vec3, density: f32) -> [i64; 3] {
        (position * density).round().to_array().map(|c| c as i64)
    }
}

/// Canonical point-cloud state: grid key to first vertex seen in that cell.
#[derive(Debug, Clone)]
pub struct SpatialMergeStore {
    density: f32,
    vertices: FxHashMap<GridKey, Vertex>,
}

impl Default for SpatialMergeStore {
    fn default() -> Self {
        Self::new(GRID_DENSITY)
    }
}

impl SpatialMergeStore {
    pub fn new(density: f32) -> Self {
        Self {
            density,
            vertices: FxHashMap::default(),
        }
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    pub fn key(&self, position: Vec3) -> GridKey {
        GridKey::new(position, self.density)
    }

    /// Insert a vertex unless its cell is already occupied. Returns whether it was stored.
    pub fn try_insert(&mut self, position: Vec3, color: Vec4) -> bool {
        let key = self.key(position);
        if self.vertices.contains_key(&key) {
            return false;
        }
        self.vertices.insert(key, Vertex { position, color });
        true
    }

    pub fn get(&self, position: Vec3) -> Option<&Vertex> {
        self.vertices.get(&self.key(position))
    }

    pub fn contains(&self, position: Vec3) -> bool {
        self.vertices.contains_key(&self.key(position))
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Copy of every stored vertex. Order is stable for a given store state.
    pub fn snapshot(&self) -> Vec<Vertex> {
        self.vertices.values().copied().collect()
    }

    /// Every `stride`-th vertex of the snapshot order.
    pub fn sampled(&self, stride: usize) -> Vec<Vertex> {
        self.vertices
            .values()
            .step_by(stride.max(1))
            .copied()
            .collect()
    }

    pub fn reset(&mut self) {
        self.vertices.clear();
    }
}
