use gridscene_core::{BBox, Color, Grid};

/// Handle to a GPU-side drawable owned by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DrawableId(pub u64);

/// Runtime speed adjustment for cameras that support it.
pub trait SpeedControl {
    fn set_move_speed(&mut self, speed: f64);
    fn set_rotation_speed(&mut self, speed: f64);
    /// Multiplier applied on top of the move speed.
    fn set_speed(&mut self, multiplier: f64);
}

/// The rendering engine bound to one drawable surface.
///
/// The scene controller drives everything through this trait; transform
/// events travel the other way and are forwarded by the host into
/// `SceneController::handle_transform`.
pub trait Renderer {
    /// Camera speed capability. `None` means the camera has fixed speeds.
    fn speed_control(&mut self) -> Option<&mut dyn SpeedControl> {
        None
    }

    fn set_clear_color(&mut self, color: Color);

    /// Draw a frame. `force` redraws even when nothing changed.
    fn render_frame(&mut self, force: bool);

    /// Remove everything drawn on the surface.
    fn clear(&mut self);

    /// Release the GPU context. The renderer is unusable afterwards.
    fn dispose(&mut self);

    /// Frame the camera on a region of the scene.
    fn set_view_box(&mut self, view_box: BBox);

    fn create_drawable(&mut self) -> DrawableId;

    /// Upload (or reset, when `grid` is `None`) a drawable's content and color.
    fn update_drawable(&mut self, id: DrawableId, grid: Option<&Grid>, color: Color);

    fn release_drawable(&mut self, id: DrawableId);
}
