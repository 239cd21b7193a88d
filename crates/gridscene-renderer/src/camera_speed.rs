//! Camera movement speed as a function of zoom depth.
//!
//! Close to the surface the camera crawls at a fixed speed; further out the
//! speed grows linearly with distance. The two branches do not meet at the
//! threshold: `move_speed(0.0999..)` is `0.2` while `move_speed(0.1)` would be
//! about `0.0006` if the formula applied there. The fixed branch owns the
//! threshold itself.

use std::f64::consts::PI;

use gridscene_core::TransformEvent;
use serde::Serialize;

use crate::renderer::Renderer;

/// Move speed the camera starts with, and the scale of every computed speed.
pub const BASE_MOVE_SPEED: f64 = 200.0;
/// Rotation speed; independent of zoom.
pub const ROTATION_SPEED: f64 = PI / 500.0;
/// Depths at or below this use `NEAR_SPEED_FACTOR`.
pub const NEAR_DEPTH: f64 = 0.1;
pub const NEAR_SPEED_FACTOR: f64 = 0.001;

pub fn speed_factor(zoom_depth: f64) -> f64 {
    let z = zoom_depth.abs();
    if z <= NEAR_DEPTH {
        NEAR_SPEED_FACTOR
    } else {
        PI / 1000.0 * (z / 100.0)
    }
}

pub fn move_speed(zoom_depth: f64) -> f64 {
    speed_factor(zoom_depth) * BASE_MOVE_SPEED
}

/// Whether the renderer's camera accepts speed changes. Decided once, at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CameraCapability {
    Adjustable,
    Fixed,
}

impl CameraCapability {
    pub fn detect(renderer: &mut dyn Renderer) -> Self {
        if renderer.speed_control().is_some() {
            CameraCapability::Adjustable
        } else {
            CameraCapability::Fixed
        }
    }
}

/// Snapshot of the camera's speed-related state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraState {
    pub zoom_depth: f64,
    pub move_speed: f64,
    pub rotation_speed: f64,
    pub slowed: bool,
}

/// Applies the speed law to a renderer's camera on every transform.
#[derive(Debug)]
pub struct CameraSpeedAdapter {
    capability: CameraCapability,
    zoom_depth: f64,
    move_speed: f64,
}

impl CameraSpeedAdapter {
    /// Detect the capability and, if present, set the initial move and rotation speeds.
    pub fn attach(renderer: &mut dyn Renderer) -> Self {
        let capability = CameraCapability::detect(renderer);
        if let Some(control) = renderer.speed_control() {
            control.set_move_speed(BASE_MOVE_SPEED);
            control.set_rotation_speed(ROTATION_SPEED);
        }
        log::debug!("camera speed capability: {:?}", capability);
        Self {
            capability,
            zoom_depth: 0.0,
            move_speed: BASE_MOVE_SPEED,
        }
    }

    pub fn capability(&self) -> CameraCapability {
        self.capability
    }

    /// Recompute the move speed for a transform. Returns the applied speed, or
    /// `None` for fixed-speed cameras.
    pub fn on_transform(&mut self, renderer: &mut dyn Renderer, event: &TransformEvent) -> Option<f64> {
        if self.capability == CameraCapability::Fixed {
            return None;
        }
        self.zoom_depth = event.zoom_depth();
        self.move_speed = move_speed(self.zoom_depth);
        renderer.speed_control()?.set_move_speed(self.move_speed);
        Some(self.move_speed)
    }

    /// Apply a speed multiplier (the modifier-key slow down).
    pub fn apply_multiplier(&self, renderer: &mut dyn Renderer, multiplier: f64) {
        if self.capability == CameraCapability::Fixed {
            return;
        }
        if let Some(control) = renderer.speed_control() {
            control.set_speed(multiplier);
        }
    }

    pub fn state(&self, slowed: bool) -> CameraState {
        CameraState {
            zoom_depth: self.zoom_depth,
            move_speed: self.move_speed,
            rotation_speed: ROTATION_SPEED,
            slowed,
        }
    }
}
