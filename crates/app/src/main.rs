//! Gimbal - headless scene demo
//!
//! Builds a small transform hierarchy (a turntable carrying an orbiting
//! satellite), flies a camera around it for a fixed number of simulated
//! frames, and logs the matrices a renderer would upload each frame.
//!
//! Usage: `gimbal [FRAMES]`. Set `RUST_LOG=trace` to see every transform
//! field change reported by the observer.

use anyhow::{Context, Result};
use glam::Vec3;
use tracing::{debug, info};

use gimbal_core::Timer;
use gimbal_scene::{
    Axis, Camera, CameraConfig, ModelUniform, TracingObserver, Transform, TransformId,
    TransformTree,
};

/// Simulated frame length in seconds.
const FRAME_TIME: f32 = 1.0 / 60.0;
const DEFAULT_FRAMES: u32 = 120;

struct App {
    tree: TransformTree,
    camera: Camera,
    timer: Timer,
    turntable: TransformId,
    satellite: TransformId,
}

impl App {
    fn new() -> gimbal_core::Result<Self> {
        let mut tree = TransformTree::new();
        tree.set_observer(Box::new(TracingObserver::new()));

        let turntable = tree.insert(Transform::new());
        let satellite = tree.insert_child(
            turntable,
            Transform::new()
                .with_position(Vec3::new(3.0, 0.5, 0.0))
                .with_scale(Vec3::splat(0.5)),
        )?;
        tree.set_rotation_speed(turntable, 45.0)?;
        tree.set_rotation_speed(satellite, 180.0)?;

        let config = CameraConfig::default()
            .with_perspective(60.0, 16.0 / 9.0)
            .with_clip_planes(0.1, 100.0)
            .with_translation_speed(2.0)
            .with_rotation_speed(30.0);
        let mut camera = Camera::with_config(config)?;
        camera.set_position(Vec3::new(0.0, 2.0, 8.0));
        camera.log_state();

        Ok(Self {
            tree,
            camera,
            timer: Timer::new(),
            turntable,
            satellite,
        })
    }

    fn frame(&mut self, index: u32) -> Result<()> {
        self.timer.tick();
        let dt = FRAME_TIME;

        // Scene animation
        self.tree.rotate_world_axis(self.turntable, Axis::Y, dt)?;
        self.tree.rotate_local_axis(self.satellite, Axis::Z, dt)?;

        // Scripted camera input: back away for a second, then pan right
        if index < 60 {
            self.camera.move_backward(dt);
        } else {
            self.camera.move_right(dt);
            self.camera.update_yaw(dt);
        }
        self.camera.rotate_ox(if index % 30 == 0 { -5.0 } else { 0.0 });

        if self.camera.update() {
            debug!("Frame {}: view recomputed", index);
        }

        let view_projection = self.camera.view_projection_matrix();
        for id in [self.turntable, self.satellite] {
            let model = ModelUniform::from(self.tree.model(id)?);
            let clip = view_projection * model.model.w_axis;
            debug!(
                "Frame {}: transform {} at {:?}, clip {:?}",
                index,
                id,
                model.model.w_axis.truncate(),
                clip
            );
        }

        self.camera.end_frame();
        self.tree.clear_all_motion_states();
        Ok(())
    }
}

fn main() -> Result<()> {
    gimbal_core::init_logging();
    info!("Starting gimbal demo");

    let frames = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<u32>()
            .with_context(|| format!("invalid frame count: {arg}"))?,
        None => DEFAULT_FRAMES,
    };

    let mut app = App::new().context("failed to set up scene")?;
    for index in 0..frames {
        app.frame(index)?;
    }

    let satellite = app.tree.transform(app.satellite)?;
    info!(
        "Ran {} frames in {:.3}s; satellite at {:?}, {:.2} units from camera",
        app.timer.frame_count(),
        app.timer.elapsed_secs(),
        satellite.world_position(),
        satellite.distance_to(app.camera.transform())
    );
    app.camera.log_state();

    Ok(())
}
