use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

use gridscene_core::{
    Color, ColorError, EventBus, GridQuery, LoadDefaults, LoadOptions, Phase, QueryError,
    RawLoadOptions, SceneConfig, SceneEvent, Subscription, TransformEvent,
};
use gridscene_core::Grid;
use gridscene_renderer::{CameraSpeedAdapter, CameraState, Renderer};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::input::{InputModifierTracker, InputSurface, KeyEvent, KeyEventKind};
use crate::layer::{GridLayer, LayerHandle};
use crate::load::{LoadError, LoadHandle, LoadOutcome};
use crate::registry::LayerRegistry;

/// Everything the controller mutates. Lives behind one `RefCell`; no borrow is
/// ever held across an `.await`.
struct SceneState<R> {
    renderer: R,
    registry: LayerRegistry,
    camera: CameraSpeedAdapter,
    modifiers: InputModifierTracker,
    config: SceneConfig,
    background: Color,
    /// The first layer ever added; framing only ever derives from it.
    first_layer: Option<LayerHandle>,
    framed: bool,
    /// Bumped by `clear`/`dispose`; loads spawned under an older value are stale.
    generation: u64,
    disposed: bool,
}

impl<R: Renderer> SceneState<R> {
    fn frame_from(&mut self, layer: &LayerHandle) {
        if self.framed || !self.first_layer.as_ref().is_some_and(|f| f.ptr_eq(layer)) {
            return;
        }
        if let Some(view_box) = layer.borrow().view_box() {
            log::debug!("framing camera on layer '{}'", layer.borrow().id);
            self.renderer.set_view_box(view_box);
            self.framed = true;
        }
    }

    fn on_key(&mut self, event: &KeyEvent) {
        if let Some(multiplier) = self.modifiers.handle(event) {
            log::trace!("camera speed multiplier -> {}", multiplier);
            self.camera.apply_multiplier(&mut self.renderer, multiplier);
        }
    }
}

/// Owns the renderer and every registered layer, runs grid loads, and keeps the
/// camera speed in step with zoom and modifier keys.
///
/// Everything runs on one thread. `load` spawns onto the current
/// `tokio::task::LocalSet`.
pub struct SceneController<R: Renderer + 'static> {
    state: Rc<RefCell<SceneState<R>>>,
    query: Rc<dyn GridQuery>,
    bus: EventBus,
    input_subscriptions: RefCell<Vec<Subscription>>,
}

impl<R: Renderer + 'static> SceneController<R> {
    pub fn new(
        mut renderer: R,
        config: SceneConfig,
        query: Rc<dyn GridQuery>,
        bus: EventBus,
        input: &InputSurface,
    ) -> Self {
        let background = config.background_color();
        renderer.set_clear_color(background);
        let camera = CameraSpeedAdapter::attach(&mut renderer);

        let state = Rc::new(RefCell::new(SceneState {
            renderer,
            registry: LayerRegistry::new(),
            camera,
            modifiers: InputModifierTracker::new(),
            config,
            background,
            first_layer: None,
            framed: false,
            generation: 0,
            disposed: false,
        }));

        let input_subscriptions = [KeyEventKind::Down, KeyEventKind::Up]
            .into_iter()
            .map(|kind| {
                let weak = Rc::downgrade(&state);
                input.listen(kind, Phase::Capture, move |event| {
                    if let Some(state) = weak.upgrade() {
                        match state.try_borrow_mut() {
                            Ok(mut state) => state.on_key(event),
                            Err(_) => log::warn!("key event during scene update dropped"),
                        }
                    }
                })
            })
            .collect();

        log::info!("scene created (v{})", Self::version());
        Self {
            state,
            query,
            bus,
            input_subscriptions: RefCell::new(input_subscriptions),
        }
    }

    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Borrow the renderer for inspection.
    ///
    /// # Panics
    ///
    /// The guard borrows the whole scene. Calling any mutating controller
    /// method while it is alive panics, as does a load completing while it is
    /// held across an `.await`. Prefer [`Self::with_renderer`] for anything
    /// longer than a single expression.
    pub fn renderer(&self) -> Ref<'_, R> {
        Ref::map(self.state.borrow(), |s| &s.renderer)
    }

    /// Run `f` against the renderer. The scene is only borrowed for the call.
    pub fn with_renderer<T>(&self, f: impl FnOnce(&R) -> T) -> T {
        f(&self.state.borrow().renderer)
    }

    /// Run `f` with mutable access to the renderer, e.g. to move its camera.
    /// Transforms it returns still have to go through [`Self::handle_transform`].
    pub fn with_renderer_mut<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        f(&mut self.state.borrow_mut().renderer)
    }

    // ── Rendering ────────────────────────────────────────────────────

    /// Draw one frame now.
    pub fn render(&self) {
        self.state.borrow_mut().renderer.render_frame(true);
    }

    /// Destroy and unregister every layer, then clear the surface. In-flight
    /// loads become stale.
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        state.generation += 1;
        let layers = state.registry.drain();
        if !layers.is_empty() {
            log::debug!("clearing {} layers", layers.len());
        }
        for layer in layers {
            layer.borrow_mut().destroy(&mut state.renderer);
        }
        if !state.disposed {
            state.renderer.clear();
        }
    }

    /// Clear every layer, release the renderer, and stop listening for input.
    pub fn dispose(&self) {
        if self.state.borrow().disposed {
            return;
        }
        self.clear();
        {
            let mut state = self.state.borrow_mut();
            state.renderer.dispose();
            state.disposed = true;
        }
        self.input_subscriptions.borrow_mut().clear();
        log::info!("scene disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.state.borrow().disposed
    }

    // ── Layers ───────────────────────────────────────────────────────

    /// Every layer in insertion order, or those whose id equals `filter`.
    pub fn query_layer_all(&self, filter: Option<&str>) -> Vec<LayerHandle> {
        self.state.borrow().registry.query_all(filter)
    }

    pub fn query_layer(&self, filter: Option<&str>) -> Option<LayerHandle> {
        self.state.borrow().registry.query(filter)
    }

    pub fn layer_count(&self) -> usize {
        self.state.borrow().registry.len()
    }

    /// Bind `layer` to the scene and append it. Returns `false` when this exact
    /// layer is already registered. The first layer ever added frames the camera.
    pub fn add(&self, layer: &LayerHandle) -> bool {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        if state.disposed {
            log::warn!("add on disposed scene ignored");
            return false;
        }
        if state.registry.contains(layer) {
            return false;
        }

        layer.borrow_mut().bind_to_scene(&mut state.renderer);
        state.registry.insert(layer.clone());

        if state.first_layer.is_none() {
            state.first_layer = Some(layer.clone());
            state.frame_from(layer);
        }
        true
    }

    /// Destroy `layer` and drop it from the registry.
    pub fn remove(&self, layer: &LayerHandle) -> bool {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        if !state.registry.remove(layer) {
            return false;
        }
        layer.borrow_mut().destroy(&mut state.renderer);
        true
    }

    /// Register a new, empty layer for `query_filter` and load its grid in the background.
    ///
    /// The layer is in the registry when this returns. The query runs on the
    /// current `LocalSet`; its projector is bound to the grid before the grid is
    /// assigned to the layer. On failure the layer is destroyed and, unless
    /// `retain_failed_layers` is set, removed again.
    ///
    /// # Panics
    ///
    /// Panics when called outside a `tokio::task::LocalSet`.
    pub fn load(&self, query_filter: &str, raw_options: RawLoadOptions) -> Result<LoadHandle, LoadError> {
        let (options, generation, color) = {
            let state = self.state.borrow();
            if state.disposed {
                return Err(LoadError::Disposed);
            }
            let defaults = LoadDefaults {
                timeout: state.config.query_timeout(),
                projector: state.registry.first_projector(),
            };
            (
                LoadOptions::parse(&defaults, query_filter, raw_options)?,
                state.generation,
                state.config.default_line_color(),
            )
        };

        let layer = LayerHandle::new(GridLayer::new(&options.place).with_color(color));
        self.add(&layer);

        let id = Uuid::new_v4();
        log::info!("load {} started: '{}' -> layer '{}'", id, query_filter, options.place);

        let query = self.query.run(&options);
        let ticket = LoadTicket {
            id,
            generation,
            filter: query_filter.to_string(),
            layer: layer.clone(),
            state: Rc::downgrade(&self.state),
        };
        let (tx, rx) = oneshot::channel();
        let task = tokio::task::spawn_local(async move {
            let timeout = options.params.timeout;
            let result = match tokio::time::timeout(timeout, query).await {
                Ok(result) => result,
                Err(_) => Err(QueryError::Timeout {
                    place: options.place.clone(),
                    timeout,
                }),
            };
            let outcome = ticket.complete(options, result);
            // The caller may have dropped the handle.
            let _ = tx.send(outcome);
        });

        Ok(LoadHandle::new(id, layer, task.abort_handle(), rx))
    }

    // ── Colors ───────────────────────────────────────────────────────

    /// Color of the first layer, or the configured default when there are none.
    pub fn line_color(&self) -> Color {
        let state = self.state.borrow();
        state
            .registry
            .first()
            .map(LayerHandle::color)
            .unwrap_or_else(|| state.config.default_line_color())
    }

    /// Apply `color` to every registered layer, then publish it.
    pub fn set_line_color(&self, color: Color) {
        {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            for layer in state.registry.iter() {
                layer.borrow_mut().set_color(color, &mut state.renderer);
            }
        }
        self.bus.publish(SceneEvent::LineColor(color));
    }

    pub fn set_line_color_str(&self, color: &str) -> Result<(), ColorError> {
        self.set_line_color(color.parse()?);
        Ok(())
    }

    pub fn background(&self) -> Color {
        self.state.borrow().background
    }

    /// Update the clear color, redraw immediately, then publish it.
    pub fn set_background(&self, color: Color) {
        {
            let mut state = self.state.borrow_mut();
            state.background = color;
            state.renderer.set_clear_color(color);
            state.renderer.render_frame(true);
        }
        self.bus.publish(SceneEvent::BackgroundColor(color));
    }

    pub fn set_background_str(&self, color: &str) -> Result<(), ColorError> {
        self.set_background(color.parse()?);
        Ok(())
    }

    // ── Camera ───────────────────────────────────────────────────────

    /// Renderer transform hook: publishes the transform and retunes the move speed.
    pub fn handle_transform(&self, event: &TransformEvent) {
        self.bus.publish(SceneEvent::SceneTransform(*event));
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        if state.disposed {
            return;
        }
        if let Some(speed) = state.camera.on_transform(&mut state.renderer, event) {
            log::trace!("zoom depth {:.3} -> move speed {:.5}", event.zoom_depth(), speed);
        }
    }

    pub fn camera_state(&self) -> CameraState {
        let state = self.state.borrow();
        state.camera.state(state.modifiers.is_slowed())
    }
}

/// What a spawned load needs to apply its result back on the scene.
struct LoadTicket<R> {
    id: Uuid,
    generation: u64,
    filter: String,
    layer: LayerHandle,
    state: Weak<RefCell<SceneState<R>>>,
}

impl<R: Renderer> LoadTicket<R> {
    fn complete(self, options: LoadOptions, result: Result<Grid, QueryError>) -> LoadOutcome {
        let Some(state) = self.state.upgrade() else {
            log::debug!("load {} finished after the scene was dropped", self.id);
            return LoadOutcome::Stale;
        };
        let mut state = state.borrow_mut();
        let state = &mut *state;
        if state.disposed || state.generation != self.generation || self.layer.borrow().is_destroyed() {
            log::debug!("load {} finished after its layer was torn down; result dropped", self.id);
            return LoadOutcome::Stale;
        }

        match result {
            Ok(mut grid) => {
                grid.set_projector(options.projector);
                log::info!(
                    "load {} done: layer '{}' has {} ways",
                    self.id,
                    options.place,
                    grid.way_count()
                );
                self.layer.borrow_mut().set_grid(grid, &mut state.renderer);
                state.frame_from(&self.layer);
                state.renderer.render_frame(false);
                LoadOutcome::Loaded
            }
            Err(err) => {
                log::error!("Could not execute:\n  {}\nThe error was: {}", self.filter, err);
                self.layer.borrow_mut().destroy(&mut state.renderer);
                if !state.config.retain_failed_layers {
                    state.registry.remove(&self.layer);
                }
                LoadOutcome::Failed(err)
            }
        }
    }
}
