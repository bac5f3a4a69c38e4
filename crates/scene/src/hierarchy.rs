//! Transform hierarchy stored in an arena.
//!
//! Nodes are addressed by [`TransformId`] handles. Parent and child links are
//! handles, so removing a node can never leave a dangling reference: its parent
//! forgets it and its children become roots that keep their world placement.
//!
//! Updates follow the rigid-attachment rule. Moving or rotating a node
//! re-derives every descendant's world position and rotation from the
//! descendant's local position and relative rotation, unless propagation is
//! disabled on the node with [`TransformTree::set_hierarchy_update`].
//!
//! # Example
//!
//! ```
//! use gimbal_scene::{Transform, TransformTree};
//! use glam::{Quat, Vec3};
//!
//! let mut tree = TransformTree::new();
//! let parent = tree.insert(Transform::new().with_position(Vec3::new(10.0, 0.0, 0.0)));
//! let child = tree.insert(Transform::new().with_position(Vec3::new(10.0, 5.0, 0.0)));
//! tree.add_child(parent, child)?;
//!
//! // World placement survives reparenting; the local offset is re-derived
//! assert_eq!(tree.transform(child)?.local_position(), Vec3::new(0.0, 5.0, 0.0));
//!
//! tree.set_world_rotation(parent, Quat::from_rotation_z(std::f32::consts::FRAC_PI_2))?;
//! let world = tree.transform(child)?.world_position();
//! assert!((world - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-5);
//! # Ok::<(), gimbal_scene::SceneError>(())
//! ```

use std::collections::HashMap;
use std::fmt;

use glam::{Mat4, Quat, Vec3};
use tracing::{debug, warn};

use crate::error::{SceneError, SceneResult};
use crate::observer::{TransformObserver, TransformState};
use crate::transform::{Axis, Frame, Transform, compose_relative, quat_from_euler_degrees};

/// Stable handle to a node in a [`TransformTree`]. Handles are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransformId(u64);

impl TransformId {
    /// Raw index of the handle.
    pub fn index(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug)]
struct Node {
    transform: Transform,
    parent: Option<TransformId>,
    children: Vec<TransformId>,
}

/// Arena of transforms linked into a forest.
#[derive(Default)]
pub struct TransformTree {
    nodes: HashMap<TransformId, Node>,
    next_id: u64,
    observer: Option<Box<dyn TransformObserver>>,
}

impl fmt::Debug for TransformTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformTree")
            .field("nodes", &self.nodes.len())
            .field("next_id", &self.next_id)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

impl TransformTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an observer, returning the previous one.
    pub fn set_observer(
        &mut self,
        observer: Box<dyn TransformObserver>,
    ) -> Option<Box<dyn TransformObserver>> {
        self.observer.replace(observer)
    }

    /// Remove and return the installed observer.
    pub fn take_observer(&mut self) -> Option<Box<dyn TransformObserver>> {
        self.observer.take()
    }

    // Node lifecycle

    /// Add a transform as a new root.
    ///
    /// The transform's world position and rotation are kept as they are.
    pub fn insert(&mut self, transform: Transform) -> TransformId {
        let id = TransformId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                transform,
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    /// Add a default transform as a new root.
    pub fn spawn(&mut self) -> TransformId {
        self.insert(Transform::new())
    }

    /// Add a transform directly under `parent`, keeping its world placement.
    pub fn insert_child(
        &mut self,
        parent: TransformId,
        transform: Transform,
    ) -> SceneResult<TransformId> {
        self.node(parent)?;
        let id = self.insert(transform);
        self.add_child(parent, id)?;
        Ok(id)
    }

    /// Remove a node from the tree and return its transform.
    ///
    /// The node is detached from its parent. Its children become roots and
    /// keep their world position and rotation.
    pub fn remove(&mut self, id: TransformId) -> SceneResult<Transform> {
        let last = if self.observer.is_some() {
            Some(self.snapshot(id)?)
        } else {
            None
        };

        let (parent, children) = {
            let node = self.node(id)?;
            (node.parent, node.children.clone())
        };

        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|c| *c != id);
        }
        for child in &children {
            self.node_mut(*child)?.parent = None;
            self.refresh(*child)?;
        }

        let node = self.nodes.remove(&id).ok_or(SceneError::UnknownTransform(id))?;
        debug!(
            "Removed transform {} ({} child(ren) promoted to roots)",
            id,
            children.len()
        );

        if let (Some(observer), Some(last)) = (self.observer.as_mut(), last) {
            observer.on_removed(id, &last);
        }
        Ok(node.transform)
    }

    // Queries

    /// Check whether `id` refers to a live node.
    pub fn contains(&self, id: TransformId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Get the number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a transform by handle.
    pub fn get(&self, id: TransformId) -> Option<&Transform> {
        self.nodes.get(&id).map(|node| &node.transform)
    }

    /// Like [`get`](Self::get), but a stale handle is an error.
    pub fn transform(&self, id: TransformId) -> SceneResult<&Transform> {
        Ok(&self.node(id)?.transform)
    }

    /// Get the parent of `id`, or `None` for a root.
    pub fn parent(&self, id: TransformId) -> SceneResult<Option<TransformId>> {
        Ok(self.node(id)?.parent)
    }

    /// Children of `id`, in insertion order.
    pub fn children(&self, id: TransformId) -> SceneResult<&[TransformId]> {
        Ok(&self.node(id)?.children)
    }

    /// All nodes without a parent, sorted by handle.
    pub fn roots(&self) -> Vec<TransformId> {
        let mut roots: Vec<_> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| *id)
            .collect();
        roots.sort();
        roots
    }

    /// Every node below `id`, depth first.
    pub fn descendants(&self, id: TransformId) -> SceneResult<Vec<TransformId>> {
        let mut out = Vec::new();
        let mut stack: Vec<_> = self.node(id)?.children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.node(current)?.children.iter().rev().copied());
        }
        Ok(out)
    }

    /// Whether `ancestor` appears on the parent chain of `id`.
    pub fn is_ancestor(&self, ancestor: TransformId, id: TransformId) -> SceneResult<bool> {
        let mut current = self.node(id)?.parent;
        while let Some(parent) = current {
            if parent == ancestor {
                return Ok(true);
            }
            current = self.node(parent)?.parent;
        }
        Ok(false)
    }

    /// Full snapshot of a node, hierarchy links included.
    pub fn snapshot(&self, id: TransformId) -> SceneResult<TransformState> {
        let node = self.node(id)?;
        let t = &node.transform;
        let cache = t.model_cache();
        Ok(TransformState {
            model: *cache.matrix(),
            model_state: cache.state(),
            world_rotation: t.world_rotation(),
            relative_rotation: t.relative_rotation(),
            inverse_world_rotation: t.inverse_world_rotation(),
            world_position: t.world_position(),
            local_position: t.local_position(),
            scale: t.scale(),
            rotation_speed: t.rotation_speed(),
            translation_speed: t.translation_speed(),
            scale_speed: t.scale_speed(),
            in_motion: t.motion_state(),
            propagate_to_children: t.propagates_to_children(),
            parent: node.parent,
            children: node.children.clone(),
        })
    }

    /// Get the world model matrix of `id`, rebuilding it first if dirty.
    ///
    /// A rebuild is reported to the observer as a `"model"` mutation.
    pub fn model(&mut self, id: TransformId) -> SceneResult<Mat4> {
        if !self.node(id)?.transform.is_model_dirty() {
            return Ok(self.node_mut(id)?.transform.model());
        }
        let before = self.observer_snapshot(id)?;
        let model = self.node_mut(id)?.transform.model();
        self.report(id, "model", before)?;
        Ok(model)
    }

    /// Check whether `id` moved since its motion state was last cleared.
    pub fn motion_state(&self, id: TransformId) -> SceneResult<bool> {
        Ok(self.node(id)?.transform.motion_state())
    }

    /// Whether `id` or any of its descendants is in motion.
    pub fn subtree_in_motion(&self, id: TransformId) -> SceneResult<bool> {
        if self.motion_state(id)? {
            return Ok(true);
        }
        for descendant in self.descendants(id)? {
            if self.motion_state(descendant)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Get the distance between the world positions of two nodes.
    pub fn distance(&self, a: TransformId, b: TransformId) -> SceneResult<f32> {
        Ok(self.transform(a)?.distance_to(self.transform(b)?))
    }

    /// Get the squared distance between the world positions of two nodes.
    pub fn distance_squared(&self, a: TransformId, b: TransformId) -> SceneResult<f32> {
        Ok(self.transform(a)?.distance_squared_to(self.transform(b)?))
    }

    /// Get the distance from `id` to a world-space point.
    pub fn distance_to_point(&self, id: TransformId, point: Vec3) -> SceneResult<f32> {
        Ok(self.transform(id)?.distance_to_point(point))
    }

    /// Get the squared distance from `id` to a world-space point.
    pub fn distance_squared_to_point(&self, id: TransformId, point: Vec3) -> SceneResult<f32> {
        Ok(self.transform(id)?.distance_squared_to_point(point))
    }

    // Hierarchy links

    /// Attach `child` under `parent`.
    ///
    /// A child that already has a parent is moved. The child's world position
    /// and rotation are preserved; its local position and relative rotation
    /// are re-derived under the new parent.
    ///
    /// # Errors
    /// [`SceneError::HierarchyCycle`] if `child` is `parent` or one of its
    /// ancestors.
    pub fn add_child(&mut self, parent: TransformId, child: TransformId) -> SceneResult<()> {
        self.node(parent)?;
        self.node(child)?;
        if parent == child || self.is_ancestor(child, parent)? {
            warn!("Refusing to attach {} under {}: would create a cycle", child, parent);
            return Err(SceneError::HierarchyCycle { parent, child });
        }

        self.observed(child, "add_child", |tree| {
            let previous = tree.node(child)?.parent;
            if let Some(previous) = previous {
                tree.node_mut(previous)?.children.retain(|c| *c != child);
            }
            tree.node_mut(parent)?.children.push(child);
            tree.node_mut(child)?.parent = Some(parent);
            tree.refresh(child)
        })?;

        debug!("Attached transform {} under {}", child, parent);
        Ok(())
    }

    /// Detach `child` from `parent`, making it a root in place.
    ///
    /// # Errors
    /// [`SceneError::NotAChild`] if `child` is not in `parent`'s child list.
    pub fn remove_child(&mut self, parent: TransformId, child: TransformId) -> SceneResult<()> {
        let position = self
            .node(parent)?
            .children
            .iter()
            .position(|c| *c == child)
            .ok_or(SceneError::NotAChild { parent, child })?;

        self.observed(child, "remove_child", |tree| {
            tree.node_mut(parent)?.children.remove(position);
            tree.node_mut(child)?.parent = None;
            tree.refresh(child)
        })?;

        debug!("Detached transform {} from {}", child, parent);
        Ok(())
    }

    /// Enable or disable propagation of updates from `id` to its children.
    pub fn set_hierarchy_update(&mut self, id: TransformId, enabled: bool) -> SceneResult<()> {
        self.observed(id, "set_hierarchy_update", |tree| {
            tree.node_mut(id)?.transform.set_hierarchy_update(enabled);
            Ok(())
        })
    }

    /// Reset the motion flag on `id` and all of its descendants.
    pub fn clear_motion_state(&mut self, id: TransformId) -> SceneResult<()> {
        self.observed(id, "clear_motion_state", |tree| tree.clear_motion_recursive(id))
    }

    /// Reset the motion flag on every node.
    pub fn clear_all_motion_states(&mut self) {
        for node in self.nodes.values_mut() {
            node.transform.clear_motion_state();
        }
    }

    // Positions

    /// Set the offset of `id` from its parent, carrying descendants along.
    pub fn set_local_position(&mut self, id: TransformId, position: Vec3) -> SceneResult<()> {
        self.observed(id, "set_local_position", |tree| {
            tree.apply_local_position(id, position)
        })
    }

    /// Set the world position of `id`, carrying descendants along.
    pub fn set_world_position(&mut self, id: TransformId, position: Vec3) -> SceneResult<()> {
        self.observed(id, "set_world_position", |tree| {
            tree.apply_world_position(id, position)
        })
    }

    /// Move the world position by an absolute offset.
    pub fn translate(&mut self, id: TransformId, offset: Vec3) -> SceneResult<()> {
        self.observed(id, "translate", |tree| {
            let target = tree.node(id)?.transform.world_position() + offset;
            tree.apply_world_position(id, target)
        })
    }

    /// Move `translation_speed * delta_time` units along `direction`.
    ///
    /// # Errors
    /// [`SceneError::ZeroDirection`] if `direction` cannot be normalized.
    pub fn move_along(
        &mut self,
        id: TransformId,
        direction: Vec3,
        delta_time: f32,
    ) -> SceneResult<()> {
        self.observed(id, "move_along", |tree| {
            let transform = &tree.node(id)?.transform;
            let target = transform.world_position() + transform.move_offset(direction, delta_time)?;
            tree.apply_world_position(id, target)
        })
    }

    // Rotations

    /// Set the world rotation of `id`, carrying descendants along.
    pub fn set_world_rotation(&mut self, id: TransformId, rotation: Quat) -> SceneResult<()> {
        self.observed(id, "set_world_rotation", |tree| {
            tree.apply_world_rotation(id, rotation)
        })
    }

    /// Set the world rotation from (pitch, yaw, roll) in degrees.
    pub fn set_world_rotation_euler(&mut self, id: TransformId, degrees: Vec3) -> SceneResult<()> {
        self.set_world_rotation(id, quat_from_euler_degrees(degrees))
    }

    /// Set the rotation relative to the parent's world rotation.
    pub fn set_relative_rotation(&mut self, id: TransformId, rotation: Quat) -> SceneResult<()> {
        self.observed(id, "set_relative_rotation", |tree| {
            let frame = tree.parent_frame(id)?;
            tree.apply_world_rotation(id, compose_relative(frame.as_ref(), rotation))
        })
    }

    /// Set the parent-relative rotation from (pitch, yaw, roll) in degrees.
    pub fn set_relative_rotation_euler(
        &mut self,
        id: TransformId,
        degrees: Vec3,
    ) -> SceneResult<()> {
        self.set_relative_rotation(id, quat_from_euler_degrees(degrees))
    }

    /// Set the scale of `id`, then its world rotation.
    pub fn set_world_rotation_and_scale(
        &mut self,
        id: TransformId,
        rotation: Quat,
        scale: Vec3,
    ) -> SceneResult<()> {
        self.observed(id, "set_world_rotation_and_scale", |tree| {
            tree.node_mut(id)?.transform.assign_scale(scale);
            tree.apply_world_rotation(id, rotation)
        })
    }

    /// Rotate `id` about a fixed world axis.
    pub fn rotate_world_axis(
        &mut self,
        id: TransformId,
        axis: Axis,
        delta_time: f32,
    ) -> SceneResult<()> {
        self.observed(id, "rotate_world_axis", |tree| {
            let rotation = tree.node(id)?.transform.world_axis_rotation(axis, delta_time);
            tree.apply_world_rotation(id, rotation)
        })
    }

    /// Rotate `id` about one of its own axes.
    pub fn rotate_local_axis(
        &mut self,
        id: TransformId,
        axis: Axis,
        delta_time: f32,
    ) -> SceneResult<()> {
        self.observed(id, "rotate_local_axis", |tree| {
            let rotation = tree.node(id)?.transform.local_axis_rotation(axis, delta_time);
            tree.apply_world_rotation(id, rotation)
        })
    }

    // Scale and speeds

    /// Set the scale of `id`. Scale does not propagate to children.
    pub fn set_scale(&mut self, id: TransformId, scale: Vec3) -> SceneResult<()> {
        self.observed(id, "set_scale", |tree| {
            tree.node_mut(id)?.transform.assign_scale(scale);
            Ok(())
        })
    }

    /// Grow all three scale axes by `scale_speed * delta_time`.
    pub fn scale_by(&mut self, id: TransformId, delta_time: f32) -> SceneResult<()> {
        self.observed(id, "scale_by", |tree| {
            let transform = &mut tree.node_mut(id)?.transform;
            let scale = transform.scale_step(delta_time);
            transform.assign_scale(scale);
            Ok(())
        })
    }

    /// Set the movement speed of `id` in units per second.
    pub fn set_translation_speed(&mut self, id: TransformId, units_per_second: f32) -> SceneResult<()> {
        self.observed(id, "set_translation_speed", |tree| {
            tree.node_mut(id)?.transform.set_translation_speed(units_per_second);
            Ok(())
        })
    }

    /// Set the rotation speed of `id` in degrees per second.
    pub fn set_rotation_speed(&mut self, id: TransformId, degrees_per_second: f32) -> SceneResult<()> {
        self.observed(id, "set_rotation_speed", |tree| {
            tree.node_mut(id)?.transform.set_rotation_speed(degrees_per_second);
            Ok(())
        })
    }

    /// Set the scale rate of `id` in units per second.
    pub fn set_scale_speed(&mut self, id: TransformId, units_per_second: f32) -> SceneResult<()> {
        self.observed(id, "set_scale_speed", |tree| {
            tree.node_mut(id)?.transform.set_scale_speed(units_per_second);
            Ok(())
        })
    }

    // Internals

    fn node(&self, id: TransformId) -> SceneResult<&Node> {
        self.nodes.get(&id).ok_or(SceneError::UnknownTransform(id))
    }

    fn node_mut(&mut self, id: TransformId) -> SceneResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(SceneError::UnknownTransform(id))
    }

    fn parent_frame(&self, id: TransformId) -> SceneResult<Option<Frame>> {
        match self.node(id)?.parent {
            Some(parent) => Ok(Some(self.node(parent)?.transform.frame())),
            None => Ok(None),
        }
    }

    /// Run `operation` and report before/after snapshots to the observer.
    fn observed<F>(&mut self, id: TransformId, operation: &'static str, f: F) -> SceneResult<()>
    where
        F: FnOnce(&mut Self) -> SceneResult<()>,
    {
        let before = self.observer_snapshot(id)?;
        f(self)?;
        self.report(id, operation, before)
    }

    /// Snapshot of `id` if an observer is installed.
    fn observer_snapshot(&self, id: TransformId) -> SceneResult<Option<TransformState>> {
        if self.observer.is_some() {
            self.snapshot(id).map(Some)
        } else {
            self.node(id).map(|_| None)
        }
    }

    fn report(
        &mut self,
        id: TransformId,
        operation: &'static str,
        before: Option<TransformState>,
    ) -> SceneResult<()> {
        if let Some(before) = before {
            let after = self.snapshot(id)?;
            if let Some(observer) = self.observer.as_mut() {
                observer.on_mutation(operation, id, &before, &after);
            }
        }
        Ok(())
    }

    fn apply_local_position(&mut self, id: TransformId, position: Vec3) -> SceneResult<()> {
        let frame = self.parent_frame(id)?;
        self.node_mut(id)?
            .transform
            .apply_local_position(frame.as_ref(), position);
        self.propagate_position(id)
    }

    fn apply_world_position(&mut self, id: TransformId, position: Vec3) -> SceneResult<()> {
        let frame = self.parent_frame(id)?;
        self.node_mut(id)?
            .transform
            .apply_world_position(frame.as_ref(), position);
        self.propagate_position(id)
    }

    fn apply_world_rotation(&mut self, id: TransformId, rotation: Quat) -> SceneResult<()> {
        let frame = self.parent_frame(id)?;
        self.node_mut(id)?
            .transform
            .apply_world_rotation(frame.as_ref(), rotation);
        self.propagate_rotation(id)
    }

    /// Re-apply the node's own world placement so local state is re-derived
    /// under its current parent.
    fn refresh(&mut self, id: TransformId) -> SceneResult<()> {
        let (position, rotation) = {
            let transform = &self.node(id)?.transform;
            (transform.world_position(), transform.world_rotation())
        };
        self.apply_world_position(id, position)?;
        self.apply_world_rotation(id, rotation)
    }

    /// Carry descendants along after `id` moved, keeping their local offsets.
    fn propagate_position(&mut self, id: TransformId) -> SceneResult<()> {
        let Some((frame, children)) = self.propagation_targets(id)? else {
            return Ok(());
        };
        for child in children {
            let before = self.observer_snapshot(child)?;
            let transform = &mut self.node_mut(child)?.transform;
            let local = transform.local_position();
            transform.apply_local_position(Some(&frame), local);
            self.report(child, "propagate_position", before)?;
            self.propagate_position(child)?;
        }
        Ok(())
    }

    /// Carry descendants along after `id` rotated, keeping their local offsets
    /// and relative rotations.
    fn propagate_rotation(&mut self, id: TransformId) -> SceneResult<()> {
        let Some((frame, children)) = self.propagation_targets(id)? else {
            return Ok(());
        };
        for child in children {
            let before = self.observer_snapshot(child)?;
            self.node_mut(child)?.transform.rederive_under(&frame);
            self.report(child, "propagate_rotation", before)?;
            self.propagate_rotation(child)?;
        }
        Ok(())
    }

    fn propagation_targets(&self, id: TransformId) -> SceneResult<Option<(Frame, Vec<TransformId>)>> {
        let node = self.node(id)?;
        if !node.transform.propagates_to_children() || node.children.is_empty() {
            return Ok(None);
        }
        Ok(Some((node.transform.frame(), node.children.clone())))
    }

    fn clear_motion_recursive(&mut self, id: TransformId) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        node.transform.clear_motion_state();
        let children = node.children.clone();
        for child in children {
            self.clear_motion_recursive(child)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    const EPSILON: f32 = 1e-4;

    fn approx_eq_vec3(a: Vec3, b: Vec3) -> bool {
        a.abs_diff_eq(b, EPSILON)
    }

    fn approx_eq_quat(a: Quat, b: Quat) -> bool {
        a.abs_diff_eq(b, EPSILON) || a.abs_diff_eq(-b, EPSILON)
    }

    fn world(tree: &TransformTree, id: TransformId) -> Vec3 {
        tree.transform(id).unwrap().world_position()
    }

    #[test]
    fn test_insert_and_get() {
        let mut tree = TransformTree::new();
        assert!(tree.is_empty());

        let a = tree.spawn();
        let b = tree.insert(Transform::new().with_position(Vec3::X));

        assert_eq!(tree.len(), 2);
        assert_ne!(a, b);
        assert_eq!(tree.get(b).unwrap().world_position(), Vec3::X);
        assert_eq!(tree.roots(), vec![a, b]);
    }

    #[test]
    fn test_handles_are_not_reused() {
        let mut tree = TransformTree::new();
        let a = tree.spawn();
        let b = tree.spawn();
        tree.remove(b).unwrap();
        let c = tree.spawn();

        assert_eq!((a.index(), c.index()), (0, 2));
        assert!(!tree.contains(b));
        assert_eq!(tree.transform(b).unwrap_err(), SceneError::UnknownTransform(b));

        // The counter is 64-bit, so ids past the u32 range stay distinct
        tree.next_id = u64::from(u32::MAX);
        let high = tree.spawn();
        let higher = tree.spawn();
        assert_eq!(high.index(), u64::from(u32::MAX));
        assert_eq!(higher.index(), u64::from(u32::MAX) + 1);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_reparenting_preserves_world_position() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(
            Transform::new()
                .with_position(Vec3::new(2.0, 1.0, -3.0))
                .with_rotation(Quat::from_rotation_y(0.8)),
        );
        let child = tree.insert(Transform::new().with_position(Vec3::new(5.0, 5.0, 5.0)));

        tree.add_child(parent, child).unwrap();

        assert!(approx_eq_vec3(world(&tree, child), Vec3::new(5.0, 5.0, 5.0)));
        assert_eq!(tree.parent(child).unwrap(), Some(parent));
        assert_eq!(tree.children(parent).unwrap(), &[child]);

        let frame = tree.transform(parent).unwrap().frame();
        let local = tree.transform(child).unwrap().local_position();
        assert!(approx_eq_vec3(frame.to_world(local), Vec3::new(5.0, 5.0, 5.0)));
    }

    #[test]
    fn test_reparenting_preserves_world_rotation() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(Transform::new().with_rotation(Quat::from_rotation_x(0.5)));
        let child = tree.insert(Transform::new().with_rotation(Quat::from_rotation_z(1.0)));

        tree.add_child(parent, child).unwrap();

        let t = tree.transform(child).unwrap();
        assert!(approx_eq_quat(t.world_rotation(), Quat::from_rotation_z(1.0)));
        assert!(approx_eq_quat(
            t.relative_rotation(),
            Quat::from_rotation_x(0.5).inverse() * Quat::from_rotation_z(1.0)
        ));
    }

    #[test]
    fn test_child_under_rotated_parent() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(
            Transform::new()
                .with_position(Vec3::new(1.0, 0.0, 1.0))
                .with_rotation(Quat::from_rotation_y(FRAC_PI_4)),
        );
        let child = tree.insert_child(parent, Transform::new()).unwrap();
        tree.set_local_position(child, Vec3::new(0.0, 1.0, 0.0)).unwrap();

        let expected = Vec3::new(1.0, 0.0, 1.0) + Quat::from_rotation_y(FRAC_PI_4) * Vec3::Y;
        assert!(approx_eq_vec3(world(&tree, child), expected));
    }

    #[test]
    fn test_rotation_propagates_rigidly() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(Transform::new().with_position(Vec3::new(3.0, 0.0, 0.0)));
        let a = tree.insert_child(parent, Transform::new().with_position(Vec3::new(4.0, 0.0, 0.0))).unwrap();
        let b = tree.insert_child(parent, Transform::new().with_position(Vec3::new(3.0, 2.0, 0.0))).unwrap();

        let offsets: Vec<Vec3> = [a, b].iter().map(|id| world(&tree, *id) - Vec3::new(3.0, 0.0, 0.0)).collect();
        let q = Quat::from_rotation_z(FRAC_PI_2);
        tree.set_world_rotation(parent, q).unwrap();

        for (id, offset) in [a, b].iter().zip(offsets) {
            let expected = Vec3::new(3.0, 0.0, 0.0) + q * offset;
            assert!(approx_eq_vec3(world(&tree, *id), expected));
            assert!(approx_eq_quat(tree.transform(*id).unwrap().world_rotation(), q));
        }
    }

    #[test]
    fn test_rotation_reaches_grandchildren() {
        let mut tree = TransformTree::new();
        let root = tree.spawn();
        let mid = tree.insert_child(root, Transform::new().with_position(Vec3::X)).unwrap();
        let leaf = tree.insert_child(mid, Transform::new().with_position(Vec3::new(2.0, 0.0, 0.0))).unwrap();

        tree.set_world_rotation(root, Quat::from_rotation_y(FRAC_PI_2)).unwrap();

        // +X turns into -Z under a quarter turn about +Y
        assert!(approx_eq_vec3(world(&tree, mid), Vec3::new(0.0, 0.0, -1.0)));
        assert!(approx_eq_vec3(world(&tree, leaf), Vec3::new(0.0, 0.0, -2.0)));
    }

    #[test]
    fn test_rotation_keeps_relative_rotation() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(
            Transform::new()
                .with_position(Vec3::new(2.0, 1.0, 0.0))
                .with_rotation(Quat::from_rotation_y(0.4)),
        );
        let child = tree.insert_child(parent, Transform::new()).unwrap();
        let relative = Quat::from_rotation_x(0.7);
        tree.set_relative_rotation(child, relative).unwrap();
        tree.set_local_position(child, Vec3::new(0.0, 0.0, 3.0)).unwrap();

        let q = Quat::from_rotation_z(1.1);
        tree.set_world_rotation(parent, q).unwrap();

        let t = tree.transform(child).unwrap();
        assert!(approx_eq_quat(t.world_rotation(), q * relative));
        assert!(approx_eq_quat(t.relative_rotation(), relative));
        assert!(approx_eq_quat(
            t.world_rotation() * t.inverse_world_rotation(),
            Quat::IDENTITY
        ));
        let expected = Vec3::new(2.0, 1.0, 0.0) + q * Vec3::new(0.0, 0.0, 3.0);
        assert!(approx_eq_vec3(t.world_position(), expected));

        // A second rotation composes with the new parent rotation only
        tree.rotate_world_axis(parent, Axis::Y, 30.0).unwrap();
        let parent_rotation = tree.transform(parent).unwrap().world_rotation();
        let t = tree.transform(child).unwrap();
        assert!(approx_eq_quat(t.world_rotation(), parent_rotation * relative));
        assert!(approx_eq_quat(t.relative_rotation(), relative));
    }

    #[test]
    fn test_parent_local_position_propagates() {
        let q = Quat::from_rotation_y(FRAC_PI_2);
        let mut tree = TransformTree::new();
        let root = tree.insert(Transform::new().with_position(Vec3::X).with_rotation(q));
        let mid = tree.insert_child(root, Transform::new().with_rotation(q)).unwrap();
        tree.set_local_position(mid, Vec3::new(0.0, 2.0, 0.0)).unwrap();
        let leaf = tree.insert_child(mid, Transform::new().with_rotation(q)).unwrap();
        tree.set_local_position(leaf, Vec3::Z).unwrap();

        tree.set_local_position(mid, Vec3::new(3.0, 0.0, 0.0)).unwrap();

        // +X turns into -Z and +Z into +X under the quarter turn
        assert!(approx_eq_vec3(world(&tree, mid), Vec3::new(1.0, 0.0, -3.0)));
        assert!(approx_eq_vec3(world(&tree, leaf), Vec3::new(2.0, 0.0, -3.0)));
        assert_eq!(tree.transform(leaf).unwrap().local_position(), Vec3::Z);

        let mid_model = tree.model(mid).unwrap();
        let leaf_model = tree.model(leaf).unwrap();
        assert!(mid_model.abs_diff_eq(
            Mat4::from_rotation_translation(q, Vec3::new(1.0, 0.0, -3.0)),
            EPSILON
        ));
        assert!(leaf_model.abs_diff_eq(
            Mat4::from_rotation_translation(q, Vec3::new(2.0, 0.0, -3.0)),
            EPSILON
        ));
    }

    #[test]
    fn test_position_propagates_to_descendants() {
        let mut tree = TransformTree::new();
        let root = tree.spawn();
        let mid = tree.insert_child(root, Transform::new().with_position(Vec3::Y)).unwrap();
        let leaf = tree.insert_child(mid, Transform::new().with_position(Vec3::new(0.0, 2.0, 0.0))).unwrap();

        tree.set_world_position(root, Vec3::new(10.0, 0.0, 0.0)).unwrap();

        assert!(approx_eq_vec3(world(&tree, mid), Vec3::new(10.0, 1.0, 0.0)));
        assert!(approx_eq_vec3(world(&tree, leaf), Vec3::new(10.0, 2.0, 0.0)));
        assert_eq!(tree.transform(leaf).unwrap().local_position(), Vec3::Y);
    }

    #[test]
    fn test_hierarchy_update_disabled() {
        let mut tree = TransformTree::new();
        let root = tree.spawn();
        let child = tree.insert_child(root, Transform::new().with_position(Vec3::Y)).unwrap();

        tree.set_hierarchy_update(root, false).unwrap();
        tree.set_world_position(root, Vec3::new(5.0, 0.0, 0.0)).unwrap();
        tree.set_world_rotation(root, Quat::from_rotation_x(1.0)).unwrap();

        assert_eq!(world(&tree, child), Vec3::Y);
        assert_eq!(tree.transform(child).unwrap().world_rotation(), Quat::IDENTITY);
    }

    #[test]
    fn test_set_relative_rotation() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(Transform::new().with_rotation(Quat::from_rotation_y(0.6)));
        let child = tree.insert_child(parent, Transform::new()).unwrap();

        tree.set_relative_rotation(child, Quat::from_rotation_x(0.3)).unwrap();

        let t = tree.transform(child).unwrap();
        assert!(approx_eq_quat(
            t.world_rotation(),
            Quat::from_rotation_y(0.6) * Quat::from_rotation_x(0.3)
        ));
        assert!(approx_eq_quat(t.relative_rotation(), Quat::from_rotation_x(0.3)));
    }

    #[test]
    fn test_scale_is_not_inherited() {
        let mut tree = TransformTree::new();
        let parent = tree.spawn();
        let child = tree.insert_child(parent, Transform::new().with_position(Vec3::X)).unwrap();

        tree.set_scale(parent, Vec3::splat(4.0)).unwrap();

        assert_eq!(tree.transform(child).unwrap().scale(), Vec3::ONE);
        assert_eq!(world(&tree, child), Vec3::X);
    }

    #[test]
    fn test_remove_child() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(Transform::new().with_position(Vec3::new(1.0, 1.0, 1.0)));
        let child = tree.insert_child(parent, Transform::new().with_position(Vec3::new(2.0, 2.0, 2.0))).unwrap();

        tree.remove_child(parent, child).unwrap();

        assert_eq!(tree.parent(child).unwrap(), None);
        assert!(tree.children(parent).unwrap().is_empty());
        let t = tree.transform(child).unwrap();
        assert!(approx_eq_vec3(t.world_position(), Vec3::new(2.0, 2.0, 2.0)));
        assert_eq!(t.local_position(), t.world_position());
    }

    #[test]
    fn test_remove_child_not_a_child() {
        let mut tree = TransformTree::new();
        let a = tree.spawn();
        let b = tree.spawn();

        assert_eq!(
            tree.remove_child(a, b),
            Err(SceneError::NotAChild { parent: a, child: b })
        );
    }

    #[test]
    fn test_add_child_rejects_cycles() {
        let mut tree = TransformTree::new();
        let a = tree.spawn();
        let b = tree.insert_child(a, Transform::new()).unwrap();
        let c = tree.insert_child(b, Transform::new()).unwrap();

        assert_eq!(
            tree.add_child(c, a),
            Err(SceneError::HierarchyCycle { parent: c, child: a })
        );
        assert_eq!(
            tree.add_child(a, a),
            Err(SceneError::HierarchyCycle { parent: a, child: a })
        );
        assert_eq!(tree.parent(a).unwrap(), None);
    }

    #[test]
    fn test_add_child_moves_between_parents() {
        let mut tree = TransformTree::new();
        let first = tree.spawn();
        let second = tree.insert(Transform::new().with_position(Vec3::Z));
        let child = tree.insert_child(first, Transform::new().with_position(Vec3::X)).unwrap();

        tree.add_child(second, child).unwrap();

        assert!(tree.children(first).unwrap().is_empty());
        assert_eq!(tree.children(second).unwrap(), &[child]);
        assert!(approx_eq_vec3(world(&tree, child), Vec3::X));
    }

    #[test]
    fn test_remove_promotes_children() {
        let mut tree = TransformTree::new();
        let root = tree.spawn();
        let mid = tree.insert_child(root, Transform::new().with_position(Vec3::new(0.0, 3.0, 0.0))).unwrap();
        let leaf = tree.insert_child(mid, Transform::new().with_position(Vec3::new(1.0, 3.0, 0.0))).unwrap();

        let removed = tree.remove(mid).unwrap();

        assert_eq!(removed.world_position(), Vec3::new(0.0, 3.0, 0.0));
        assert!(!tree.contains(mid));
        assert!(tree.children(root).unwrap().is_empty());
        assert_eq!(tree.parent(leaf).unwrap(), None);
        assert!(approx_eq_vec3(world(&tree, leaf), Vec3::new(1.0, 3.0, 0.0)));
        assert_eq!(tree.transform(leaf).unwrap().local_position(), world(&tree, leaf));

        // Handles are not reused
        assert_eq!(tree.transform(mid).unwrap_err(), SceneError::UnknownTransform(mid));
        let fresh = tree.spawn();
        assert_ne!(fresh, mid);
    }

    #[test]
    fn test_move_along_zero_direction() {
        let mut tree = TransformTree::new();
        let id = tree.spawn();
        assert_eq!(tree.move_along(id, Vec3::ZERO, 1.0), Err(SceneError::ZeroDirection));
    }

    #[test]
    fn test_move_along_and_translate() {
        let mut tree = TransformTree::new();
        let parent = tree.spawn();
        let child = tree.insert_child(parent, Transform::new().with_position(Vec3::Y)).unwrap();

        tree.set_translation_speed(parent, 2.0).unwrap();
        tree.move_along(parent, Vec3::new(3.0, 0.0, 0.0), 1.5).unwrap();
        tree.translate(parent, Vec3::new(0.0, 0.0, 1.0)).unwrap();

        assert!(approx_eq_vec3(world(&tree, parent), Vec3::new(3.0, 0.0, 1.0)));
        assert!(approx_eq_vec3(world(&tree, child), Vec3::new(3.0, 1.0, 1.0)));
    }

    #[test]
    fn test_rotate_axis_helpers() {
        let mut tree = TransformTree::new();
        let id = tree.spawn();
        tree.set_rotation_speed(id, 90.0).unwrap();

        tree.rotate_world_axis(id, Axis::Y, 1.0).unwrap();
        tree.rotate_local_axis(id, Axis::X, 1.0).unwrap();

        let expected = Quat::from_rotation_y(FRAC_PI_2) * Quat::from_rotation_x(FRAC_PI_2);
        assert!(approx_eq_quat(tree.transform(id).unwrap().world_rotation(), expected));
    }

    #[test]
    fn test_scale_by_and_speeds() {
        let mut tree = TransformTree::new();
        let id = tree.spawn();
        tree.set_scale_speed(id, 1.0).unwrap();
        tree.scale_by(id, 0.5).unwrap();

        assert_eq!(tree.transform(id).unwrap().scale(), Vec3::splat(1.5));

        tree.set_world_rotation_and_scale(id, Quat::IDENTITY, Vec3::splat(2.0)).unwrap();
        assert_eq!(tree.transform(id).unwrap().scale(), Vec3::splat(2.0));
    }

    #[test]
    fn test_model_matrix() {
        let mut tree = TransformTree::new();
        let id = tree.spawn();
        assert_eq!(tree.model(id).unwrap(), Mat4::IDENTITY);

        tree.set_world_rotation_euler(id, Vec3::new(0.0, 30.0, 0.0)).unwrap();
        tree.set_world_position(id, Vec3::new(1.0, 2.0, 3.0)).unwrap();

        let expected = Mat4::from_scale_rotation_translation(
            Vec3::ONE,
            Quat::from_rotation_y(30.0_f32.to_radians()),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let first = tree.model(id).unwrap();
        assert!(first.abs_diff_eq(expected, EPSILON));
        assert_eq!(first, tree.model(id).unwrap());
        assert!(!tree.transform(id).unwrap().is_model_dirty());
    }

    #[test]
    fn test_child_model_rebuilt_after_parent_rotation() {
        let mut tree = TransformTree::new();
        let parent = tree.spawn();
        let child = tree.insert_child(parent, Transform::new().with_position(Vec3::X)).unwrap();
        tree.model(child).unwrap();

        tree.set_world_rotation(parent, Quat::from_rotation_z(FRAC_PI_2)).unwrap();

        assert!(tree.transform(child).unwrap().is_model_dirty());
        let model = tree.model(child).unwrap();
        assert!(approx_eq_vec3(model.w_axis.truncate(), Vec3::Y));
        assert!(approx_eq_vec3(model.x_axis.truncate(), Vec3::Y));
    }

    #[test]
    fn test_motion_state_is_recursive() {
        let mut tree = TransformTree::new();
        let root = tree.spawn();
        let child = tree.insert_child(root, Transform::new()).unwrap();
        let other = tree.spawn();

        tree.clear_motion_state(root).unwrap();
        assert!(!tree.motion_state(root).unwrap());
        assert!(!tree.motion_state(child).unwrap());
        assert!(tree.motion_state(other).unwrap());

        tree.set_local_position(child, Vec3::X).unwrap();
        assert!(!tree.motion_state(root).unwrap());
        assert!(tree.subtree_in_motion(root).unwrap());

        tree.clear_all_motion_states();
        assert!(!tree.subtree_in_motion(root).unwrap());
        assert!(!tree.motion_state(other).unwrap());
    }

    #[test]
    fn test_distances() {
        let mut tree = TransformTree::new();
        let a = tree.spawn();
        let b = tree.insert(Transform::new().with_position(Vec3::new(0.0, 3.0, 4.0)));

        assert!((tree.distance(a, b).unwrap() - 5.0).abs() < EPSILON);
        assert!((tree.distance_squared(a, b).unwrap() - 25.0).abs() < EPSILON);
        assert!((tree.distance_to_point(b, Vec3::new(0.0, 3.0, 0.0)).unwrap() - 4.0).abs() < EPSILON);
        assert!((tree.distance_squared_to_point(b, Vec3::ZERO).unwrap() - 25.0).abs() < EPSILON);
    }

    #[test]
    fn test_descendants_depth_first() {
        let mut tree = TransformTree::new();
        let root = tree.spawn();
        let a = tree.insert_child(root, Transform::new()).unwrap();
        let a1 = tree.insert_child(a, Transform::new()).unwrap();
        let b = tree.insert_child(root, Transform::new()).unwrap();

        assert_eq!(tree.descendants(root).unwrap(), vec![a, a1, b]);
        assert!(tree.is_ancestor(root, a1).unwrap());
        assert!(!tree.is_ancestor(b, a1).unwrap());
    }

    #[test]
    fn test_unknown_handle() {
        let mut tree = TransformTree::new();
        let id = tree.spawn();
        tree.remove(id).unwrap();

        assert_eq!(
            tree.set_world_position(id, Vec3::ONE),
            Err(SceneError::UnknownTransform(id))
        );
        assert!(tree.get(id).is_none());
    }
}
