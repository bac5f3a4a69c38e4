//! Cached world model matrix.
//!
//! Position changes patch the translation column in place. Rotation and scale
//! changes invalidate the cache, and the full matrix is rebuilt the next time
//! it is resolved.

use glam::{Mat4, Quat, Vec3};

/// State of the cached matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheState {
    /// The matrix matches the last committed rotation, scale and position.
    Clean,
    /// Rotation or scale changed since the matrix was last rebuilt.
    Dirty,
}

/// World model matrix with explicit clean/dirty tracking.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelCache {
    matrix: Mat4,
    state: CacheState,
}

impl Default for ModelCache {
    fn default() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
            state: CacheState::Dirty,
        }
    }
}

impl ModelCache {
    /// Current cache state.
    pub fn state(&self) -> CacheState {
        self.state
    }

    /// Whether the next resolve has to rebuild the matrix.
    pub fn is_dirty(&self) -> bool {
        self.state == CacheState::Dirty
    }

    /// The stored matrix, which may be stale when dirty.
    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    /// The stored matrix, only if it is up to date.
    pub fn clean_matrix(&self) -> Option<&Mat4> {
        match self.state {
            CacheState::Clean => Some(&self.matrix),
            CacheState::Dirty => None,
        }
    }

    /// Overwrite the translation column. Does not change the cache state.
    pub fn patch_translation(&mut self, position: Vec3) {
        self.matrix.w_axis = position.extend(1.0);
    }

    /// Force a full rebuild on the next resolve.
    pub fn invalidate(&mut self) {
        self.state = CacheState::Dirty;
    }

    /// Return the up-to-date matrix, rebuilding it first when dirty.
    pub fn resolve(&mut self, position: Vec3, rotation: Quat, scale: Vec3) -> &Mat4 {
        if self.state == CacheState::Dirty {
            self.matrix = Mat4::from_quat(rotation) * Mat4::from_scale(scale);
            self.patch_translation(position);
            self.state = CacheState::Clean;
        }
        &self.matrix
    }
}
