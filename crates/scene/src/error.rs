//! Scene-specific error types.

use thiserror::Error;

use crate::hierarchy::TransformId;

/// Scene-specific error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// The handle does not refer to a live node (never issued, or removed)
    #[error("Unknown transform: {0}")]
    UnknownTransform(TransformId),

    /// A direction with zero length cannot be normalized
    #[error("Cannot move along a zero-length direction")]
    ZeroDirection,

    /// `child` is not in the child list of `parent`
    #[error("Transform {child} is not a child of {parent}")]
    NotAChild {
        /// Node whose child list was searched.
        parent: TransformId,
        /// Node that was expected in it.
        child: TransformId,
    },

    /// Linking would make a node its own ancestor
    #[error("Attaching {child} under {parent} would create a cycle")]
    HierarchyCycle {
        /// Requested parent.
        parent: TransformId,
        /// Requested child.
        child: TransformId,
    },

    /// Camera configuration rejected by validation
    #[error("Invalid camera configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for scene operations.
pub type SceneResult<T> = std::result::Result<T, SceneError>;

impl From<SceneError> for gimbal_core::Error {
    fn from(err: SceneError) -> Self {
        match err {
            SceneError::InvalidConfig(message) => gimbal_core::Error::Config(message),
            other => gimbal_core::Error::Scene(other.to_string()),
        }
    }
}
