//! Camera configuration.

use glam::Vec3;
use tracing::warn;

use crate::error::{SceneError, SceneResult};

/// Clip-space convention of the consuming graphics API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClipSpace {
    /// Depth in [-1, 1], Y up.
    #[default]
    OpenGl,
    /// Depth in [0, 1], Y flipped.
    Vulkan,
}

/// Initial state of a [`Camera`](crate::Camera).
///
/// # Example
///
/// ```
/// use gimbal_scene::{Camera, CameraConfig, ClipSpace};
///
/// let config = CameraConfig::default()
///     .with_clip_planes(0.1, 500.0)
///     .with_clip_space(ClipSpace::Vulkan);
/// let camera = Camera::with_config(config)?;
/// assert_eq!(camera.projection_info().z_far, 500.0);
/// # Ok::<(), gimbal_scene::SceneError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_y: f32,
    pub aspect_ratio: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// Width of the view volume used until an orthographic projection is set
    pub ortho_width: f32,
    /// Lower bound for runtime speed changes
    pub min_speed: f32,
    /// Upper bound for runtime speed changes
    pub max_speed: f32,
    pub sensitivity_x: f32,
    pub sensitivity_y: f32,
    /// Units per second
    pub translation_speed: f32,
    /// Degrees per second
    pub rotation_speed: f32,
    /// Scale of the camera's own transform
    pub scale: Vec3,
    pub clip_space: ClipSpace,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y: 40.0,
            aspect_ratio: 1.6,
            z_near: 0.01,
            z_far: 50.0,
            ortho_width: 10.0,
            min_speed: 0.1,
            max_speed: 100.0,
            sensitivity_x: 0.002,
            sensitivity_y: 0.002,
            translation_speed: 20.0,
            rotation_speed: 50.0,
            scale: Vec3::splat(0.1),
            clip_space: ClipSpace::OpenGl,
        }
    }
}

impl CameraConfig {
    /// Set the vertical field of view (degrees) and aspect ratio.
    pub fn with_perspective(mut self, fov_y: f32, aspect_ratio: f32) -> Self {
        self.fov_y = fov_y;
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Set the near and far clip planes.
    pub fn with_clip_planes(mut self, z_near: f32, z_far: f32) -> Self {
        self.z_near = z_near;
        self.z_far = z_far;
        self
    }

    /// Set the bounds for runtime speed changes.
    pub fn with_speed_bounds(mut self, min_speed: f32, max_speed: f32) -> Self {
        self.min_speed = min_speed;
        self.max_speed = max_speed;
        self
    }

    /// Set the mouse-look sensitivities.
    pub fn with_sensitivity(mut self, x: f32, y: f32) -> Self {
        self.sensitivity_x = x;
        self.sensitivity_y = y;
        self
    }

    /// Set the initial movement speed in units per second.
    pub fn with_translation_speed(mut self, units_per_second: f32) -> Self {
        self.translation_speed = units_per_second;
        self
    }

    /// Set the rotation speed in degrees per second.
    pub fn with_rotation_speed(mut self, degrees_per_second: f32) -> Self {
        self.rotation_speed = degrees_per_second;
        self
    }

    /// Set the clip-space convention of the projection.
    pub fn with_clip_space(mut self, clip_space: ClipSpace) -> Self {
        self.clip_space = clip_space;
        self
    }

    /// Check that the configuration describes a usable camera.
    ///
    /// # Errors
    /// [`SceneError::InvalidConfig`] naming the first offending value.
    pub fn validate(&self) -> SceneResult<()> {
        if self.z_near <= 0.0 {
            return Err(invalid(format!("near plane must be positive, got {}", self.z_near)));
        }
        if self.z_far <= self.z_near {
            return Err(invalid(format!(
                "far plane {} must lie beyond near plane {}",
                self.z_far, self.z_near
            )));
        }
        if self.aspect_ratio <= 0.0 {
            return Err(invalid(format!(
                "aspect ratio must be positive, got {}",
                self.aspect_ratio
            )));
        }
        if self.min_speed > self.max_speed {
            return Err(invalid(format!(
                "min speed {} exceeds max speed {}",
                self.min_speed, self.max_speed
            )));
        }
        if !(self.min_speed..=self.max_speed).contains(&self.translation_speed) {
            return Err(invalid(format!(
                "translation speed {} outside [{}, {}]",
                self.translation_speed, self.min_speed, self.max_speed
            )));
        }
        Ok(())
    }
}

fn invalid(message: String) -> SceneError {
    warn!("Invalid camera configuration: {}", message);
    SceneError::InvalidConfig(message)
}
