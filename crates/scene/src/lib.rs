//! Scene graph and camera.
//!
//! This crate provides:
//! - Transform component with cached model matrix
//! - Transform hierarchy with rigid parent/child propagation
//! - First-person camera with perspective and orthographic projections
//! - Observation hooks for transform mutations

pub mod camera;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod model;
pub mod observer;
pub mod transform;
pub mod uniform;

pub use camera::{Camera, ProjectionInfo, ProjectionMode};
pub use config::{CameraConfig, ClipSpace};
pub use error::{SceneError, SceneResult};
pub use hierarchy::{TransformId, TransformTree};
pub use model::{CacheState, ModelCache};
pub use observer::{StateChange, TracingObserver, TransformObserver, TransformState};
pub use transform::{Axis, FORWARD, Frame, RIGHT, Transform, UP, quat_from_euler_degrees};
pub use uniform::{CameraUniform, ModelUniform};
