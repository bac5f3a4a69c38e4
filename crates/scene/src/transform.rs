//! Transform component for scene objects.
//!
//! A [`Transform`] holds the spatial state of one node: local and world
//! position, world and parent-relative rotation, per-node scale, and the cached
//! world model matrix. Hierarchy links live in [`TransformTree`], which feeds
//! each node the [`Frame`] of its parent when an update has to cross a
//! parent/child boundary.
//!
//! A free-standing `Transform` behaves as a root: local and world state are
//! identical.
//!
//! # Example
//!
//! ```
//! use gimbal_scene::{Axis, Transform};
//! use glam::{Mat4, Vec3};
//!
//! let mut transform = Transform::new();
//! assert_eq!(transform.model(), Mat4::IDENTITY);
//!
//! transform.set_rotation_speed(90.0);
//! transform.rotate_world_axis(Axis::Y, 1.0);
//! transform.set_world_position(Vec3::new(0.0, 2.0, 0.0));
//!
//! let model = transform.model();
//! assert_eq!(model.w_axis.truncate(), Vec3::new(0.0, 2.0, 0.0));
//! ```
//!
//! [`TransformTree`]: crate::TransformTree

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::error::{SceneError, SceneResult};
use crate::model::ModelCache;

/// Canonical right vector.
pub const RIGHT: Vec3 = Vec3::X;
/// Canonical up vector.
pub const UP: Vec3 = Vec3::Y;
/// Canonical forward vector. Cameras look down the opposite direction.
pub const FORWARD: Vec3 = Vec3::Z;

/// Principal axis used by the incremental rotation helpers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Right axis (OX)
    X,
    /// Up axis (OY)
    Y,
    /// Forward axis (OZ)
    Z,
}

impl Axis {
    /// Unit vector of this axis.
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => RIGHT,
            Axis::Y => UP,
            Axis::Z => FORWARD,
        }
    }
}

/// World-space frame of a parent node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    /// World position of the parent.
    pub position: Vec3,
    /// World rotation of the parent.
    pub rotation: Quat,
    /// Cached inverse of `rotation`.
    pub inverse_rotation: Quat,
}

impl Frame {
    /// Map a point from this frame's local space into world space.
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// Map a world-space point into this frame's local space.
    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.inverse_rotation * (world - self.position)
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            inverse_rotation: Quat::IDENTITY,
        }
    }
}

/// Position, rotation and scale of a scene node.
#[derive(Clone, Debug)]
pub struct Transform {
    local_position: Vec3,
    world_position: Vec3,
    world_rotation: Quat,
    relative_rotation: Quat,
    inverse_world_rotation: Quat,
    /// Scale relative to the object, not inherited by children
    local_scale: Vec3,
    /// Units per second
    translation_speed: f32,
    /// Degrees per second
    rotation_speed: f32,
    /// Units per second
    scale_speed: f32,
    model: ModelCache,
    in_motion: bool,
    propagate_to_children: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            local_position: Vec3::ZERO,
            world_position: Vec3::ZERO,
            world_rotation: Quat::IDENTITY,
            relative_rotation: Quat::IDENTITY,
            inverse_world_rotation: Quat::IDENTITY,
            local_scale: Vec3::ONE,
            translation_speed: 1.0,
            rotation_speed: 1.0,
            scale_speed: 0.02,
            model: ModelCache::default(),
            in_motion: true,
            propagate_to_children: true,
        }
    }
}

impl Transform {
    /// Create a new transform at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform with the given world position.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.set_world_position(position);
        self
    }

    /// Create a transform with the given world rotation.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.set_world_rotation(rotation);
        self
    }

    /// Create a transform with the given scale.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.set_scale(scale);
        self
    }

    // Getters

    /// Get the offset from the parent, in the parent's rotated frame.
    pub fn local_position(&self) -> Vec3 {
        self.local_position
    }

    /// Get the world-space position.
    pub fn world_position(&self) -> Vec3 {
        self.world_position
    }

    /// Get the world-space rotation.
    pub fn world_rotation(&self) -> Quat {
        self.world_rotation
    }

    /// Rotation relative to the parent's world rotation.
    pub fn relative_rotation(&self) -> Quat {
        self.relative_rotation
    }

    /// Get the cached inverse of the world rotation.
    pub fn inverse_world_rotation(&self) -> Quat {
        self.inverse_world_rotation
    }

    /// World rotation as (pitch, yaw, roll) in radians.
    pub fn rotation_euler_radians(&self) -> Vec3 {
        let (z, y, x) = self.world_rotation.to_euler(EulerRot::ZYX);
        Vec3::new(x, y, z)
    }

    /// World rotation as (pitch, yaw, roll) in degrees.
    pub fn rotation_euler_degrees(&self) -> Vec3 {
        let radians = self.rotation_euler_radians();
        Vec3::new(
            radians.x.to_degrees(),
            radians.y.to_degrees(),
            radians.z.to_degrees(),
        )
    }

    /// The node's right axis in world space.
    pub fn local_ox(&self) -> Vec3 {
        self.world_rotation * RIGHT
    }

    /// The node's up axis in world space.
    pub fn local_oy(&self) -> Vec3 {
        self.world_rotation * UP
    }

    /// The node's forward axis in world space.
    pub fn local_oz(&self) -> Vec3 {
        self.world_rotation * FORWARD
    }

    /// Get the scale. It applies to this node only.
    pub fn scale(&self) -> Vec3 {
        self.local_scale
    }

    /// Get the movement speed in units per second.
    pub fn translation_speed(&self) -> f32 {
        self.translation_speed
    }

    /// Get the rotation speed in degrees per second.
    pub fn rotation_speed(&self) -> f32 {
        self.rotation_speed
    }

    /// Get the scale rate in units per second.
    pub fn scale_speed(&self) -> f32 {
        self.scale_speed
    }

    /// Whether position, rotation or the model changed since the motion state
    /// was last cleared.
    pub fn motion_state(&self) -> bool {
        self.in_motion
    }

    /// Check whether updates are carried to children.
    pub fn propagates_to_children(&self) -> bool {
        self.propagate_to_children
    }

    /// Whether the next [`model`](Self::model) call rebuilds the matrix.
    pub fn is_model_dirty(&self) -> bool {
        self.model.is_dirty()
    }

    /// This node's world frame, as seen by its children.
    pub fn frame(&self) -> Frame {
        Frame {
            position: self.world_position,
            rotation: self.world_rotation,
            inverse_rotation: self.inverse_world_rotation,
        }
    }

    /// Get the world model matrix, rebuilding it first if rotation or scale
    /// changed since the last call.
    pub fn model(&mut self) -> Mat4 {
        *self
            .model
            .resolve(self.world_position, self.world_rotation, self.local_scale)
    }

    /// The cached model matrix, if it is up to date.
    pub fn cached_model(&self) -> Option<&Mat4> {
        self.model.clean_matrix()
    }

    pub(crate) fn model_cache(&self) -> &ModelCache {
        &self.model
    }

    // Root-space mutation

    /// Set the local position. On a free-standing transform this is also the
    /// world position.
    pub fn set_local_position(&mut self, position: Vec3) {
        self.apply_local_position(None, position);
    }

    /// Set the world position. For a root this is also the local position.
    pub fn set_world_position(&mut self, position: Vec3) {
        self.apply_world_position(None, position);
    }

    /// Set the world rotation. The rotation is stored normalized.
    pub fn set_world_rotation(&mut self, rotation: Quat) {
        self.apply_world_rotation(None, rotation);
    }

    /// Set the world rotation from (pitch, yaw, roll) in degrees.
    pub fn set_world_rotation_euler(&mut self, degrees: Vec3) {
        self.set_world_rotation(quat_from_euler_degrees(degrees));
    }

    /// Set the rotation relative to the parent. Without a parent this is the
    /// world rotation.
    pub fn set_relative_rotation(&mut self, rotation: Quat) {
        self.set_world_rotation(compose_relative(None, rotation));
    }

    /// Set the relative rotation from (pitch, yaw, roll) in degrees.
    pub fn set_relative_rotation_euler(&mut self, degrees: Vec3) {
        self.set_relative_rotation(quat_from_euler_degrees(degrees));
    }

    /// Set the scale, then the world rotation.
    pub fn set_world_rotation_and_scale(&mut self, rotation: Quat, scale: Vec3) {
        self.assign_scale(scale);
        self.set_world_rotation(rotation);
    }

    /// Set the scale. Marks the model matrix dirty.
    pub fn set_scale(&mut self, scale: Vec3) {
        self.assign_scale(scale);
    }

    /// Move the world position by an absolute offset.
    pub fn translate(&mut self, offset: Vec3) {
        self.set_world_position(self.world_position + offset);
    }

    /// Move `translation_speed * delta_time` units along `direction`.
    ///
    /// # Errors
    /// [`SceneError::ZeroDirection`] if `direction` cannot be normalized.
    pub fn move_along(&mut self, direction: Vec3, delta_time: f32) -> SceneResult<()> {
        let target = self.world_position + self.move_offset(direction, delta_time)?;
        self.set_world_position(target);
        Ok(())
    }

    /// Grow all three scale axes by `scale_speed * delta_time`.
    pub fn scale_by(&mut self, delta_time: f32) {
        let scale = self.scale_step(delta_time);
        self.assign_scale(scale);
    }

    /// Rotate about a fixed world axis.
    pub fn rotate_world_axis(&mut self, axis: Axis, delta_time: f32) {
        self.set_world_rotation(self.world_axis_rotation(axis, delta_time));
    }

    /// Rotate about one of the node's own axes.
    pub fn rotate_local_axis(&mut self, axis: Axis, delta_time: f32) {
        self.set_world_rotation(self.local_axis_rotation(axis, delta_time));
    }

    /// Set the movement speed in units per second.
    pub fn set_translation_speed(&mut self, units_per_second: f32) {
        self.translation_speed = units_per_second;
    }

    /// Set the rotation speed in degrees per second.
    pub fn set_rotation_speed(&mut self, degrees_per_second: f32) {
        self.rotation_speed = degrees_per_second;
    }

    /// Set the scale rate in units per second.
    pub fn set_scale_speed(&mut self, units_per_second: f32) {
        self.scale_speed = units_per_second;
    }

    /// Reset the motion flag. Inside a [`TransformTree`](crate::TransformTree)
    /// use the tree's method, which also clears descendants.
    pub fn clear_motion_state(&mut self) {
        self.in_motion = false;
    }

    /// Enable or disable propagation of updates to children.
    pub fn set_hierarchy_update(&mut self, enabled: bool) {
        self.propagate_to_children = enabled;
    }

    /// Get the distance to another transform.
    pub fn distance_to(&self, other: &Transform) -> f32 {
        self.distance_to_point(other.world_position)
    }

    /// Get the distance to a world-space point.
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        (point - self.world_position).length()
    }

    /// Get the squared distance to another transform.
    pub fn distance_squared_to(&self, other: &Transform) -> f32 {
        self.distance_squared_to_point(other.world_position)
    }

    /// Get the squared distance to a world-space point.
    pub fn distance_squared_to_point(&self, point: Vec3) -> f32 {
        (point - self.world_position).length_squared()
    }

    // Parent-aware building blocks used by the tree

    pub(crate) fn apply_local_position(&mut self, parent: Option<&Frame>, position: Vec3) {
        self.local_position = position;
        self.world_position = match parent {
            Some(frame) => frame.to_world(position),
            None => position,
        };
        self.mark_moved();
    }

    pub(crate) fn apply_world_position(&mut self, parent: Option<&Frame>, position: Vec3) {
        self.world_position = position;
        self.local_position = match parent {
            Some(frame) => frame.to_local(position),
            None => position,
        };
        self.mark_moved();
    }

    pub(crate) fn apply_world_rotation(&mut self, parent: Option<&Frame>, rotation: Quat) {
        self.world_rotation = rotation.normalize();
        self.inverse_world_rotation = self.world_rotation.inverse();
        self.relative_rotation = match parent {
            Some(frame) => frame.inverse_rotation * self.world_rotation,
            None => self.world_rotation,
        };
        self.mark_rotated();
    }

    /// Recompute world position and rotation from the parent's frame, holding
    /// local position and relative rotation fixed.
    pub(crate) fn rederive_under(&mut self, parent: &Frame) {
        self.world_position = parent.to_world(self.local_position);
        self.world_rotation = (parent.rotation * self.relative_rotation).normalize();
        self.inverse_world_rotation = self.world_rotation.inverse();
        self.model.patch_translation(self.world_position);
        self.mark_rotated();
    }

    pub(crate) fn assign_scale(&mut self, scale: Vec3) {
        self.local_scale = scale;
        self.mark_rotated();
    }

    pub(crate) fn scale_step(&self, delta_time: f32) -> Vec3 {
        self.local_scale + Vec3::splat(self.scale_speed * delta_time)
    }

    pub(crate) fn world_axis_rotation(&self, axis: Axis, delta_time: f32) -> Quat {
        self.axis_increment(axis, delta_time) * self.world_rotation
    }

    pub(crate) fn local_axis_rotation(&self, axis: Axis, delta_time: f32) -> Quat {
        self.world_rotation * self.axis_increment(axis, delta_time)
    }

    pub(crate) fn move_offset(&self, direction: Vec3, delta_time: f32) -> SceneResult<Vec3> {
        let direction = direction
            .try_normalize()
            .ok_or(SceneError::ZeroDirection)?;
        Ok(self.translation_speed * delta_time * direction)
    }

    fn axis_increment(&self, axis: Axis, delta_time: f32) -> Quat {
        let angle = (delta_time * self.rotation_speed).to_radians();
        Quat::from_axis_angle(axis.unit(), angle)
    }

    fn mark_moved(&mut self) {
        self.model.patch_translation(self.world_position);
        self.in_motion = true;
    }

    fn mark_rotated(&mut self) {
        self.model.invalidate();
        self.in_motion = true;
    }
}

/// Quaternion from (pitch, yaw, roll) in degrees, applied X first, then Y, then Z.
pub fn quat_from_euler_degrees(degrees: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::ZYX,
        degrees.z.to_radians(),
        degrees.y.to_radians(),
        degrees.x.to_radians(),
    )
}

/// World rotation for a rotation expressed relative to `parent`.
pub(crate) fn compose_relative(parent: Option<&Frame>, rotation: Quat) -> Quat {
    match parent {
        Some(frame) => frame.rotation * rotation,
        None => rotation,
    }
}
