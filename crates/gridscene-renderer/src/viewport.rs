use gridscene_core::{BBox, Point, TransformEvent};
use serde::{Deserialize, Serialize};

/// Camera placement over the scene plane.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    /// Center X in scene coordinates.
    pub center_x: f64,
    /// Center Y in scene coordinates.
    pub center_y: f64,
    /// Zoom level (pixels per scene unit).
    pub zoom: f64,
    /// Surface width in pixels.
    pub canvas_width: f64,
    /// Surface height in pixels.
    pub canvas_height: f64,
}

impl Viewport {
    pub fn new(canvas_width: f64, canvas_height: f64) -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            zoom: 1.0,
            canvas_width,
            canvas_height,
        }
    }

    /// Pan the viewport by a delta in screen pixels, scaled by `speed`.
    pub fn pan(&mut self, dx: f64, dy: f64, speed: f64) {
        self.center_x -= dx * speed / self.zoom;
        self.center_y -= dy * speed / self.zoom;
    }

    /// Zoom in/out centered on a screen position.
    pub fn zoom_at(&mut self, screen_x: f64, screen_y: f64, factor: f64) {
        let scene_x = self.screen_to_scene_x(screen_x);
        let scene_y = self.screen_to_scene_y(screen_y);

        self.zoom = (self.zoom * factor).clamp(0.001, 1_000_000.0);

        // Keep the point under the cursor fixed.
        self.center_x -= self.screen_to_scene_x(screen_x) - scene_x;
        self.center_y -= self.screen_to_scene_y(screen_y) - scene_y;
    }

    /// Zoom to fit a bounding box with a 10% margin. A box flat on one axis is
    /// fitted on the other; a single point only re-centers.
    pub fn fit_bbox(&mut self, bbox: &BBox) {
        let center = bbox.center();
        self.center_x = center.x;
        self.center_y = center.y;

        let (width, height) = (bbox.width(), bbox.height());
        let zoom_x = (width > 0.0).then(|| self.canvas_width / width * 0.9);
        let zoom_y = (height > 0.0).then(|| self.canvas_height / height * 0.9);
        let zoom = match (zoom_x, zoom_y) {
            (Some(x), Some(y)) => x.min(y),
            (Some(x), None) => x,
            (None, Some(y)) => y,
            (None, None) => return,
        };
        self.zoom = zoom.clamp(0.001, 1_000_000.0);
    }

    pub fn screen_to_scene_x(&self, screen_x: f64) -> f64 {
        (screen_x - self.canvas_width / 2.0) / self.zoom + self.center_x
    }

    pub fn screen_to_scene_y(&self, screen_y: f64) -> f64 {
        (screen_y - self.canvas_height / 2.0) / self.zoom + self.center_y
    }

    /// Visible region in scene coordinates.
    pub fn visible_bounds(&self) -> BBox {
        let half_w = self.canvas_width / (2.0 * self.zoom);
        let half_h = self.canvas_height / (2.0 * self.zoom);
        BBox::new(
            Point::new(self.center_x - half_w, self.center_y - half_h),
            Point::new(self.center_x + half_w, self.center_y + half_h),
        )
    }

    /// Camera distance along the view axis for the current zoom.
    pub fn distance(&self) -> f64 {
        self.canvas_height / (2.0 * self.zoom)
    }

    pub fn transform_event(&self) -> TransformEvent {
        TransformEvent::new(self.center_x, self.center_y, self.distance())
    }
}
