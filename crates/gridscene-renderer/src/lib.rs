//! # GridScene Renderer
//!
//! The boundary between the scene controller and a rendering engine, the
//! zoom-dependent camera speed law, and a headless renderer that records what
//! a GPU renderer would draw.

pub mod camera_speed;
pub mod frame;
pub mod headless;
pub mod renderer;
pub mod viewport;

pub use camera_speed::{CameraCapability, CameraSpeedAdapter, CameraState};
pub use frame::FrameReport;
pub use headless::HeadlessRenderer;
pub use renderer::{DrawableId, Renderer, SpeedControl};
pub use viewport::Viewport;
