use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use gridscene_core::{BBox, Color, Grid, Projector};
use gridscene_renderer::{DrawableId, Renderer};

/// A named visual unit holding loaded grid content, drawn as lines of one color.
#[derive(Debug)]
pub struct GridLayer {
    /// Identifier used by layer queries. Not unique.
    pub id: String,
    color: Color,
    grid: Option<Grid>,
    drawable: Option<DrawableId>,
    destroyed: bool,
}

impl GridLayer {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            color: Color::BLACK,
            grid: None,
            drawable: None,
            destroyed: false,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_grid(mut self, grid: Grid) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color, renderer: &mut dyn Renderer) {
        self.color = color;
        self.upload(renderer);
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn has_grid(&self) -> bool {
        self.grid.is_some()
    }

    /// Replace the layer content. Uploads immediately when bound.
    pub fn set_grid(&mut self, grid: Grid, renderer: &mut dyn Renderer) {
        if self.destroyed {
            log::warn!("set_grid on destroyed layer '{}' ignored", self.id);
            return;
        }
        self.grid = Some(grid);
        self.upload(renderer);
    }

    pub fn projector(&self) -> Option<Rc<dyn Projector>> {
        self.grid.as_ref().and_then(Grid::projector)
    }

    /// Allocate a drawable for this layer and upload whatever it holds.
    pub fn bind_to_scene(&mut self, renderer: &mut dyn Renderer) {
        if self.drawable.is_some() {
            return;
        }
        self.destroyed = false;
        self.drawable = Some(renderer.create_drawable());
        self.upload(renderer);
    }

    pub fn is_bound(&self) -> bool {
        self.drawable.is_some()
    }

    pub fn drawable(&self) -> Option<DrawableId> {
        self.drawable
    }

    /// Bounds of the loaded content in scene space.
    pub fn view_box(&self) -> Option<BBox> {
        self.grid.as_ref().and_then(Grid::bbox)
    }

    /// Release the drawable and drop the content. Repeated calls do nothing.
    pub fn destroy(&mut self, renderer: &mut dyn Renderer) {
        if let Some(id) = self.drawable.take() {
            renderer.release_drawable(id);
        }
        self.grid = None;
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn upload(&self, renderer: &mut dyn Renderer) {
        if let Some(id) = self.drawable {
            renderer.update_drawable(id, self.grid.as_ref(), self.color);
        }
    }
}

/// Shared reference to a layer. Equality is identity: two handles are equal
/// only if they point at the same layer instance.
#[derive(Debug, Clone)]
pub struct LayerHandle(Rc<RefCell<GridLayer>>);

impl LayerHandle {
    pub fn new(layer: GridLayer) -> Self {
        Self(Rc::new(RefCell::new(layer)))
    }

    pub fn ptr_eq(&self, other: &LayerHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn borrow(&self) -> Ref<'_, GridLayer> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, GridLayer> {
        self.0.borrow_mut()
    }

    pub fn id(&self) -> String {
        self.0.borrow().id.clone()
    }

    pub fn color(&self) -> Color {
        self.0.borrow().color()
    }

    pub fn has_grid(&self) -> bool {
        self.0.borrow().has_grid()
    }
}

impl PartialEq for LayerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for LayerHandle {}

impl From<GridLayer> for LayerHandle {
    fn from(layer: GridLayer) -> Self {
        Self::new(layer)
    }
}
