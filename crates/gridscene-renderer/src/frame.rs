use serde::{Deserialize, Serialize};

use crate::viewport::Viewport;

/// What one drawable contributed to a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawableReport {
    pub id: u64,
    pub color: [f32; 4], // RGBA
    pub segments: usize,
    pub visible_segments: usize,
}

/// Summary of one rendered frame, as produced by the headless renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameReport {
    pub frame: u64,
    pub forced: bool,
    pub clear_color: [f32; 4],
    pub viewport: Viewport,
    pub drawables: Vec<DrawableReport>,
}

impl FrameReport {
    pub fn empty(viewport: Viewport, clear_color: [f32; 4]) -> Self {
        Self {
            frame: 0,
            forced: false,
            clear_color,
            viewport,
            drawables: Vec::new(),
        }
    }

    pub fn visible_segments(&self) -> usize {
        self.drawables.iter().map(|d| d.visible_segments).sum()
    }
}
