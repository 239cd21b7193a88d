//! A renderer without a GPU. It keeps the scene state a real renderer would
//! upload and reports what each frame would have drawn.

use std::collections::BTreeMap;

use gridscene_core::spatial::SegmentIndex;
use gridscene_core::{BBox, Color, Grid, Segment, TransformEvent};

use crate::frame::{DrawableReport, FrameReport};
use crate::renderer::{DrawableId, Renderer, SpeedControl};
use crate::viewport::Viewport;

/// Camera speeds as last set by the scene.
#[derive(Debug, Clone, Default)]
pub struct HeadlessCamera {
    pub move_speed: f64,
    pub rotation_speed: f64,
    pub speed_multiplier: f64,
    /// Every multiplier passed to `set_speed`, in order.
    pub speed_history: Vec<f64>,
}

impl SpeedControl for HeadlessCamera {
    fn set_move_speed(&mut self, speed: f64) {
        self.move_speed = speed;
    }

    fn set_rotation_speed(&mut self, speed: f64) {
        self.rotation_speed = speed;
    }

    fn set_speed(&mut self, multiplier: f64) {
        self.speed_multiplier = multiplier;
        self.speed_history.push(multiplier);
    }
}

struct Drawable {
    color: Color,
    segments: Vec<Segment>,
    index: SegmentIndex,
}

pub struct HeadlessRenderer {
    viewport: Viewport,
    camera: HeadlessCamera,
    adjustable_camera: bool,
    clear_color: Color,
    drawables: BTreeMap<DrawableId, Drawable>,
    next_drawable: u64,
    view_box: Option<BBox>,
    view_box_calls: usize,
    frames: u64,
    clears: usize,
    released: Vec<DrawableId>,
    last_frame: Option<FrameReport>,
    disposed: bool,
}

impl HeadlessRenderer {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            viewport: Viewport::new(width, height),
            camera: HeadlessCamera {
                speed_multiplier: 1.0,
                ..HeadlessCamera::default()
            },
            adjustable_camera: true,
            clear_color: Color::BLACK,
            drawables: BTreeMap::new(),
            next_drawable: 0,
            view_box: None,
            view_box_calls: 0,
            frames: 0,
            clears: 0,
            released: Vec::new(),
            last_frame: None,
            disposed: false,
        }
    }

    /// A renderer whose camera does not expose speed control.
    pub fn with_fixed_camera(width: f64, height: f64) -> Self {
        Self {
            adjustable_camera: false,
            ..Self::new(width, height)
        }
    }

    // ── Camera movement (host side) ──────────────────────────────────

    /// Pan by screen pixels. Returns the transform to forward to the scene.
    pub fn pan(&mut self, dx: f64, dy: f64) -> TransformEvent {
        let speed = self.pan_speed();
        self.viewport.pan(dx, dy, speed);
        self.viewport.transform_event()
    }

    /// Zoom around a screen point. Returns the transform to forward to the scene.
    pub fn zoom_at(&mut self, screen_x: f64, screen_y: f64, factor: f64) -> TransformEvent {
        self.viewport.zoom_at(screen_x, screen_y, factor);
        self.viewport.transform_event()
    }

    fn pan_speed(&self) -> f64 {
        if !self.adjustable_camera || self.camera.move_speed <= 0.0 {
            return 1.0;
        }
        self.camera.move_speed * self.camera.speed_multiplier / crate::camera_speed::BASE_MOVE_SPEED
    }

    // ── Inspection ───────────────────────────────────────────────────

    pub fn camera(&self) -> &HeadlessCamera {
        &self.camera
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn view_box(&self) -> Option<BBox> {
        self.view_box
    }

    pub fn view_box_calls(&self) -> usize {
        self.view_box_calls
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn clear_count(&self) -> usize {
        self.clears
    }

    pub fn drawable_count(&self) -> usize {
        self.drawables.len()
    }

    pub fn drawable_color(&self, id: DrawableId) -> Option<Color> {
        self.drawables.get(&id).map(|d| d.color)
    }

    pub fn drawable_segments(&self, id: DrawableId) -> Option<usize> {
        self.drawables.get(&id).map(|d| d.segments.len())
    }

    /// Drawables released through `release_drawable`, in release order.
    pub fn released(&self) -> &[DrawableId] {
        &self.released
    }

    pub fn last_frame(&self) -> Option<&FrameReport> {
        self.last_frame.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn check_live(&self, op: &str) -> bool {
        if self.disposed {
            log::warn!("{} called on a disposed renderer", op);
        }
        !self.disposed
    }
}

impl Renderer for HeadlessRenderer {
    fn speed_control(&mut self) -> Option<&mut dyn SpeedControl> {
        if self.adjustable_camera {
            Some(&mut self.camera)
        } else {
            None
        }
    }

    fn set_clear_color(&mut self, color: Color) {
        if self.check_live("set_clear_color") {
            self.clear_color = color;
        }
    }

    fn render_frame(&mut self, force: bool) {
        if !self.check_live("render_frame") {
            return;
        }
        self.frames += 1;
        let view = self.viewport.visible_bounds();
        let drawables = self
            .drawables
            .iter()
            .map(|(id, d)| DrawableReport {
                id: id.0,
                color: d.color.to_f32_array(),
                segments: d.segments.len(),
                visible_segments: d.index.query_view(&view).len(),
            })
            .collect();
        self.last_frame = Some(FrameReport {
            frame: self.frames,
            forced: force,
            drawables,
            ..FrameReport::empty(self.viewport, self.clear_color.to_f32_array())
        });
    }

    fn clear(&mut self) {
        if !self.check_live("clear") {
            return;
        }
        self.clears += 1;
        self.drawables.clear();
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        log::debug!("disposing headless renderer ({} drawables)", self.drawables.len());
        self.drawables.clear();
        self.last_frame = None;
        self.disposed = true;
    }

    fn set_view_box(&mut self, view_box: BBox) {
        if self.check_live("set_view_box") {
            self.view_box = Some(view_box);
            self.view_box_calls += 1;
            self.viewport.fit_bbox(&view_box);
        }
    }

    fn create_drawable(&mut self) -> DrawableId {
        let id = DrawableId(self.next_drawable);
        self.next_drawable += 1;
        if self.check_live("create_drawable") {
            self.drawables.insert(
                id,
                Drawable {
                    color: Color::TRANSPARENT,
                    segments: Vec::new(),
                    index: SegmentIndex::new(),
                },
            );
        }
        id
    }

    fn update_drawable(&mut self, id: DrawableId, grid: Option<&Grid>, color: Color) {
        if !self.check_live("update_drawable") {
            return;
        }
        let Some(drawable) = self.drawables.get_mut(&id) else {
            log::warn!("update of unknown drawable {:?}", id);
            return;
        };
        drawable.color = color;
        if let Some(grid) = grid {
            drawable.segments = grid.segments().to_vec();
            drawable.index = SegmentIndex::build(&drawable.segments);
        }
    }

    fn release_drawable(&mut self, id: DrawableId) {
        self.released.push(id);
        self.drawables.remove(&id);
    }
}
