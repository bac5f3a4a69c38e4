//! First-person camera built on a [`Transform`].
//!
//! The camera owns one root transform. Its view matrix is derived from the
//! transform's world position and orientation and is only recomputed by
//! [`Camera::update`] when the transform reports motion. The projection matrix
//! is recomputed whenever a projection setter is called.
//!
//! # Example
//!
//! ```
//! use gimbal_scene::Camera;
//! use glam::Vec3;
//!
//! let mut camera = Camera::new();
//! camera.set_perspective(60.0, 16.0 / 9.0, 0.1, 200.0);
//! camera.set_position(Vec3::new(0.0, 1.6, 2.5));
//!
//! // Per frame: move, refresh the view, then mark the frame as consumed
//! camera.move_forward(0.016);
//! camera.update();
//! let view_projection = camera.view_projection_matrix();
//! camera.end_frame();
//! # let _ = view_projection;
//! ```

use glam::{Mat4, Quat, Vec3};
use tracing::{debug, info, warn};

use crate::config::{CameraConfig, ClipSpace};
use crate::error::SceneResult;
use crate::transform::{Axis, Transform, UP};
use crate::uniform::CameraUniform;

/// Projection type for the camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectionMode {
    /// Perspective projection
    Perspective,
    /// Orthographic projection
    Orthographic,
}

/// All projection parameters as one value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionInfo {
    /// Vertical field of view in degrees
    pub fov_y: f32,
    pub aspect_ratio: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// Orthographic view volume width
    pub width: f32,
    /// Orthographic view volume height
    pub height: f32,
    pub mode: ProjectionMode,
}

impl ProjectionInfo {
    /// Check whether these parameters describe a perspective projection.
    pub fn is_perspective(&self) -> bool {
        self.mode == ProjectionMode::Perspective
    }
}

/// A camera for rendering the scene.
#[derive(Clone, Debug)]
pub struct Camera {
    transform: Transform,
    view: Mat4,
    projection: Mat4,
    mode: ProjectionMode,
    /// Degrees
    fov_y: f32,
    aspect_ratio: f32,
    z_near: f32,
    z_far: f32,
    ortho_width: f32,
    min_speed: f32,
    max_speed: f32,
    sensitivity_x: f32,
    sensitivity_y: f32,
    clip_space: ClipSpace,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(CameraConfig::default())
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a camera from a validated configuration.
    ///
    /// # Errors
    /// [`SceneError::InvalidConfig`](crate::SceneError::InvalidConfig) if the
    /// configuration fails [`CameraConfig::validate`].
    pub fn with_config(config: CameraConfig) -> SceneResult<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: CameraConfig) -> Self {
        let mut transform = Transform::new();
        transform.set_translation_speed(config.translation_speed);
        transform.set_rotation_speed(config.rotation_speed);
        transform.set_scale(config.scale);

        let mut camera = Self {
            transform,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            mode: ProjectionMode::Perspective,
            fov_y: config.fov_y,
            aspect_ratio: config.aspect_ratio,
            z_near: config.z_near,
            z_far: config.z_far,
            ortho_width: config.ortho_width,
            min_speed: config.min_speed,
            max_speed: config.max_speed,
            sensitivity_x: config.sensitivity_x,
            sensitivity_y: config.sensitivity_y,
            clip_space: config.clip_space,
        };
        camera.set_perspective(config.fov_y, config.aspect_ratio, config.z_near, config.z_far);
        camera.update();
        camera
    }

    /// Recompute the view matrix if the transform moved since the motion
    /// state was last cleared. Returns whether the view was recomputed.
    pub fn update(&mut self) -> bool {
        if !self.transform.motion_state() {
            return false;
        }

        let eye = self.transform.world_position();
        let center = eye - self.transform.local_oz();
        let up = self.transform.local_oy();
        self.view = Mat4::look_at_rh(eye, center, up);
        true
    }

    /// Mark the current state as consumed, so the next [`update`](Self::update)
    /// is skipped unless the camera moves again.
    pub fn end_frame(&mut self) {
        self.transform.clear_motion_state();
    }

    // Matrices

    /// Get the view matrix (world to view space).
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// Get the projection matrix (view to clip space).
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// Get the combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Matrices and eye position packed for a uniform buffer.
    pub fn uniform(&self) -> CameraUniform {
        CameraUniform {
            view: self.view,
            projection: self.projection,
            view_projection: self.view_projection_matrix(),
            camera_position: self.transform.world_position(),
            _padding: 0.0,
        }
    }

    // Transform access

    /// Get the camera's transform.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Direct access to the camera's transform. Call [`update`](Self::update)
    /// afterwards to refresh the view.
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Get the forward direction vector.
    pub fn forward(&self) -> Vec3 {
        -self.transform.local_oz()
    }

    /// Get the right direction vector.
    pub fn right(&self) -> Vec3 {
        self.transform.local_ox()
    }

    /// Get the up direction vector.
    pub fn up(&self) -> Vec3 {
        self.transform.local_oy()
    }

    // Placement

    /// Move the camera to a world position and refresh the view.
    pub fn set_position(&mut self, position: Vec3) {
        self.transform.set_world_position(position);
        self.update();
    }

    /// Set the camera orientation and refresh the view.
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.transform.set_world_rotation(rotation);
        self.update();
    }

    /// Set position and orientation together, refreshing the view once.
    pub fn set_position_and_rotation(&mut self, position: Vec3, rotation: Quat) {
        self.transform.set_world_position(position);
        self.transform.set_world_rotation(rotation);
        self.update();
    }

    // Movement along the camera's own axes

    /// Move along the view direction.
    pub fn move_forward(&mut self, delta_time: f32) {
        self.step(-self.transform.local_oz(), delta_time);
    }

    /// Move against the view direction.
    pub fn move_backward(&mut self, delta_time: f32) {
        self.step(self.transform.local_oz(), delta_time);
    }

    /// Move along the camera's right axis.
    pub fn move_right(&mut self, delta_time: f32) {
        self.step(self.transform.local_ox(), delta_time);
    }

    /// Move against the camera's right axis.
    pub fn move_left(&mut self, delta_time: f32) {
        self.step(-self.transform.local_ox(), delta_time);
    }

    // Movement along the world vertical

    /// Move up along world +Y, regardless of orientation.
    pub fn move_up(&mut self, delta_time: f32) {
        self.step(UP, delta_time);
    }

    /// Move down along world -Y, regardless of orientation.
    pub fn move_down(&mut self, delta_time: f32) {
        self.step(-UP, delta_time);
    }

    /// Move along an arbitrary direction.
    ///
    /// # Errors
    /// [`SceneError::ZeroDirection`](crate::SceneError::ZeroDirection) for a
    /// zero-length direction.
    pub fn move_in_direction(&mut self, direction: Vec3, delta_time: f32) -> SceneResult<()> {
        self.transform.move_along(direction, delta_time)
    }

    fn step(&mut self, direction: Vec3, delta_time: f32) {
        // Axis vectors are unit length unless the rotation itself is corrupt.
        if let Err(err) = self.transform.move_along(direction, delta_time) {
            warn!("Camera move skipped: {}", err);
        }
    }

    // FPS rotation

    /// Turn about the world up axis.
    pub fn update_yaw(&mut self, delta_angle: f32) {
        self.transform.rotate_world_axis(Axis::Y, delta_angle);
    }

    /// Tilt about the camera's own right axis.
    pub fn update_pitch(&mut self, delta_angle: f32) {
        self.transform.rotate_local_axis(Axis::X, delta_angle);
    }

    /// Roll about the camera's own forward axis.
    pub fn update_roll(&mut self, delta_angle: f32) {
        self.transform.rotate_local_axis(Axis::Z, delta_angle);
    }

    /// Pitch by a raw input delta scaled by the horizontal-axis sensitivity.
    pub fn rotate_ox(&mut self, delta: f32) {
        if delta != 0.0 {
            self.update_pitch(delta * self.sensitivity_x);
        }
    }

    /// Yaw by a raw input delta scaled by the vertical-axis sensitivity.
    pub fn rotate_oy(&mut self, delta: f32) {
        if delta != 0.0 {
            self.update_yaw(delta * self.sensitivity_y);
        }
    }

    // Speed

    /// Change the movement speed by `offset`.
    ///
    /// The change is applied only if the resulting speed stays within
    /// `[min_speed, max_speed]`. Returns whether it was applied.
    pub fn update_speed(&mut self, offset: f32) -> bool {
        let speed = self.transform.translation_speed() + offset;
        if (self.min_speed..=self.max_speed).contains(&speed) {
            self.transform.set_translation_speed(speed);
            true
        } else {
            debug!(
                "Rejected camera speed {} outside [{}, {}]",
                speed, self.min_speed, self.max_speed
            );
            false
        }
    }

    /// Get the movement speed in units per second.
    pub fn speed(&self) -> f32 {
        self.transform.translation_speed()
    }

    /// Get the lower bound for [`update_speed`](Self::update_speed).
    pub fn min_speed(&self) -> f32 {
        self.min_speed
    }

    /// Get the upper bound for [`update_speed`](Self::update_speed).
    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    /// Set the bounds used by [`update_speed`](Self::update_speed).
    pub fn set_speed_bounds(&mut self, min_speed: f32, max_speed: f32) {
        self.min_speed = min_speed;
        self.max_speed = max_speed;
    }

    /// Get the input scale applied by [`rotate_ox`](Self::rotate_ox).
    pub fn sensitivity_x(&self) -> f32 {
        self.sensitivity_x
    }

    /// Get the input scale applied by [`rotate_oy`](Self::rotate_oy).
    pub fn sensitivity_y(&self) -> f32 {
        self.sensitivity_y
    }

    /// Set the input scales for both mouse-look axes.
    pub fn set_sensitivity(&mut self, x: f32, y: f32) {
        self.sensitivity_x = x;
        self.sensitivity_y = y;
    }

    // Projection

    /// Get the current projection mode.
    pub fn projection_mode(&self) -> ProjectionMode {
        self.mode
    }

    /// Set the perspective projection. `fov_y` is in degrees.
    pub fn set_perspective(&mut self, fov_y: f32, aspect_ratio: f32, z_near: f32, z_far: f32) {
        self.mode = ProjectionMode::Perspective;
        self.fov_y = fov_y;
        self.aspect_ratio = aspect_ratio;
        self.z_near = z_near;
        self.z_far = z_far;

        let fov_y = fov_y.to_radians();
        self.projection = match self.clip_space {
            ClipSpace::OpenGl => Mat4::perspective_rh_gl(fov_y, aspect_ratio, z_near, z_far),
            ClipSpace::Vulkan => {
                flip_y(Mat4::perspective_rh(fov_y, aspect_ratio, z_near, z_far))
            }
        };
    }

    /// Set an orthographic projection centered on the view axis.
    pub fn set_orthographic(&mut self, width: f32, height: f32, z_near: f32, z_far: f32) {
        let (half_width, half_height) = (width / 2.0, height / 2.0);
        self.set_orthographic_bounds(
            -half_width,
            half_width,
            -half_height,
            half_height,
            z_near,
            z_far,
        );
    }

    /// Set an orthographic projection with explicit bounds.
    pub fn set_orthographic_bounds(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        z_near: f32,
        z_far: f32,
    ) {
        self.mode = ProjectionMode::Orthographic;
        self.ortho_width = right - left;
        self.aspect_ratio = (right - left) / (top - bottom);
        self.z_near = z_near;
        self.z_far = z_far;

        self.projection = match self.clip_space {
            ClipSpace::OpenGl => Mat4::orthographic_rh_gl(left, right, bottom, top, z_near, z_far),
            ClipSpace::Vulkan => {
                flip_y(Mat4::orthographic_rh(left, right, bottom, top, z_near, z_far))
            }
        };
    }

    /// Apply all projection parameters at once.
    pub fn set_projection(&mut self, info: &ProjectionInfo) {
        match info.mode {
            ProjectionMode::Perspective => {
                self.set_perspective(info.fov_y, info.aspect_ratio, info.z_near, info.z_far)
            }
            ProjectionMode::Orthographic => {
                self.set_orthographic(info.width, info.height, info.z_near, info.z_far)
            }
        }
    }

    /// Get all projection parameters.
    pub fn projection_info(&self) -> ProjectionInfo {
        ProjectionInfo {
            fov_y: self.fov_y,
            aspect_ratio: self.aspect_ratio,
            z_near: self.z_near,
            z_far: self.z_far,
            width: self.ortho_width,
            height: self.ortho_width / self.aspect_ratio,
            mode: self.mode,
        }
    }

    /// Update the aspect ratio, keeping the current projection mode.
    pub fn set_aspect(&mut self, aspect_ratio: f32) {
        let mut info = self.projection_info();
        info.aspect_ratio = aspect_ratio;
        info.height = info.width / aspect_ratio;
        self.set_projection(&info);
    }

    /// Vertical field of view in degrees.
    pub fn field_of_view_y(&self) -> f32 {
        self.fov_y
    }

    /// Horizontal field of view, approximated as `aspect_ratio * fov_y`.
    pub fn field_of_view_x(&self) -> f32 {
        self.aspect_ratio * self.fov_y
    }

    /// Log the camera's orientation and position.
    pub fn log_state(&self) {
        info!("Camera =>");
        info!("Rotation: {:?}", self.transform.rotation_euler_radians());
        info!("Position: {:?}", self.transform.world_position());
        info!("Forward : {:?}", self.transform.local_oz());
        info!("Up      : {:?}", self.transform.local_oy());
    }
}

/// Flip Y for the Vulkan coordinate system.
fn flip_y(mut projection: Mat4) -> Mat4 {
    projection.y_axis.y *= -1.0;
    projection
}
