//! Observation hooks for transform hierarchies.
//!
//! A [`TransformTree`](crate::TransformTree) can carry one observer. After every
//! mutating call the observer receives snapshots of each affected node taken
//! before and after the change, descendants included. [`TracingObserver`] logs
//! what changed.

use glam::{Mat4, Quat, Vec3};
use tracing::{debug, trace};

use crate::hierarchy::TransformId;
use crate::model::CacheState;

/// Point-in-time copy of a node's full state, hierarchy links included.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformState {
    pub model: Mat4,
    pub model_state: CacheState,
    pub world_rotation: Quat,
    pub relative_rotation: Quat,
    pub inverse_world_rotation: Quat,
    pub world_position: Vec3,
    pub local_position: Vec3,
    pub scale: Vec3,
    pub rotation_speed: f32,
    pub translation_speed: f32,
    pub scale_speed: f32,
    pub in_motion: bool,
    pub propagate_to_children: bool,
    pub parent: Option<TransformId>,
    pub children: Vec<TransformId>,
}

/// One field that differs between two snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateChange {
    /// Field name as it appears on [`TransformState`].
    pub field: &'static str,
    pub before: String,
    pub after: String,
}

macro_rules! diff_fields {
    ($before:expr, $after:expr, $changes:expr; $($field:ident),+ $(,)?) => {
        $(
            if $before.$field != $after.$field {
                $changes.push(StateChange {
                    field: stringify!($field),
                    before: format!("{:?}", $before.$field),
                    after: format!("{:?}", $after.$field),
                });
            }
        )+
    };
}

impl TransformState {
    /// Fields whose value differs in `after`, in declaration order.
    pub fn changes(&self, after: &TransformState) -> Vec<StateChange> {
        let mut changes = Vec::new();
        diff_fields!(self, after, changes;
            model,
            model_state,
            world_rotation,
            relative_rotation,
            inverse_world_rotation,
            world_position,
            local_position,
            scale,
            rotation_speed,
            translation_speed,
            scale_speed,
            in_motion,
            propagate_to_children,
            parent,
            children,
        );
        changes
    }
}

/// Receives a callback after each mutating tree operation.
pub trait TransformObserver {
    /// Called after `operation` completed successfully on `id`.
    ///
    /// Descendants rewritten by propagation are reported first, each as a
    /// `"propagate_position"` or `"propagate_rotation"` mutation, followed by
    /// the node named in the call. A lazy model rebuild is reported as
    /// `"model"`.
    fn on_mutation(
        &mut self,
        operation: &'static str,
        id: TransformId,
        before: &TransformState,
        after: &TransformState,
    );

    /// Called after `id` was removed from the tree.
    fn on_removed(&mut self, _id: TransformId, _last: &TransformState) {}
}

/// Logs every mutation and each changed field through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl TracingObserver {
    /// Create a new tracing observer.
    pub fn new() -> Self {
        Self
    }
}

impl TransformObserver for TracingObserver {
    fn on_mutation(
        &mut self,
        operation: &'static str,
        id: TransformId,
        before: &TransformState,
        after: &TransformState,
    ) {
        let changes = before.changes(after);
        debug!("{} on transform {}: {} field(s) changed", operation, id, changes.len());
        for change in changes {
            trace!(
                "--> {} changed: {} -> {}",
                change.field, change.before, change.after
            );
        }
    }

    fn on_removed(&mut self, id: TransformId, last: &TransformState) {
        debug!(
            "Transform {} removed at {:?} with {} orphaned child(ren)",
            id,
            last.world_position,
            last.children.len()
        );
    }
}
