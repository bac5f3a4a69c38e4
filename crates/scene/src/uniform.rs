//! Plain-data matrix blocks handed to the render collaborator.
//!
//! The layouts use `#[repr(C)]` and implement `Pod` and `Zeroable` so they can
//! be copied into uniform buffers byte for byte.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Per-frame camera data.
///
/// # Memory Layout
///
/// - Offset 0: view matrix (64 bytes)
/// - Offset 64: projection matrix (64 bytes)
/// - Offset 128: view-projection matrix (64 bytes)
/// - Offset 192: camera position (12 bytes)
/// - Offset 204: padding (4 bytes)
/// - Total size: 208 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    /// View matrix (world to view space).
    pub view: Mat4,
    /// Projection matrix (view to clip space).
    pub projection: Mat4,
    /// Combined view-projection matrix.
    pub view_projection: Mat4,
    /// Camera world position.
    pub camera_position: Vec3,
    /// Padding for 16-byte alignment.
    pub _padding: f32,
}

impl CameraUniform {
    /// Size of the struct in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Raw bytes for a buffer upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Per-object model matrix.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ModelUniform {
    pub model: Mat4,
}

impl Default for ModelUniform {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
        }
    }
}

impl From<Mat4> for ModelUniform {
    fn from(model: Mat4) -> Self {
        Self { model }
    }
}
