use std::cell::RefCell;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::rc::Rc;
use std::time::Duration;

use futures_util::future::LocalBoxFuture;
use gridscene_core::{
    Color, EventBus, Grid, GridQuery, LoadOptions, QueryError, RawLoadOptions, SceneConfig,
    SceneEvent, Topic, TransformEvent,
};
use gridscene_renderer::HeadlessRenderer;
use gridscene_scene::{
    GridLayer, InputSurface, KeyEvent, LayerHandle, LoadError, LoadOutcome, Modifiers,
    SceneController,
};
use tokio::sync::oneshot;
use tokio::task::LocalSet;

const SQUARE: &str = r#"{
    "nodes": [
        {"id": 1, "lon": 0, "lat": 0},
        {"id": 2, "lon": 10, "lat": 0},
        {"id": 3, "lon": 10, "lat": 10},
        {"id": 4, "lon": 0, "lat": 10}
    ],
    "ways": [{"nodes": [1, 2, 3, 4, 1]}]
}"#;

fn square() -> Grid {
    Grid::from_json(SQUARE).unwrap()
}

/// Query whose results are released by the test, one place at a time.
#[derive(Default)]
struct StubQuery {
    pending: RefCell<HashMap<String, oneshot::Sender<Result<Grid, QueryError>>>>,
}

impl StubQuery {
    fn resolve(&self, place: &str, result: Result<Grid, QueryError>) {
        let tx = self
            .pending
            .borrow_mut()
            .remove(place)
            .unwrap_or_else(|| panic!("no pending query for {place}"));
        let _ = tx.send(result);
    }
}

impl GridQuery for StubQuery {
    fn run(&self, options: &LoadOptions) -> LocalBoxFuture<'static, Result<Grid, QueryError>> {
        let (tx, rx) = oneshot::channel();
        self.pending.borrow_mut().insert(options.place.clone(), tx);
        Box::pin(async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => std::future::pending().await,
            }
        })
    }
}

struct Fixture {
    scene: SceneController<HeadlessRenderer>,
    query: Rc<StubQuery>,
    input: InputSurface,
    events: Rc<RefCell<Vec<SceneEvent>>>,
    _subscriptions: Vec<gridscene_core::Subscription>,
}

fn fixture_with(renderer: HeadlessRenderer, config: SceneConfig) -> Fixture {
    let query = Rc::new(StubQuery::default());
    let input = InputSurface::new();
    let bus = EventBus::new();
    let events = Rc::new(RefCell::new(Vec::new()));
    let subscriptions = [Topic::LineColor, Topic::BackgroundColor, Topic::SceneTransform]
        .into_iter()
        .map(|topic| {
            let events = Rc::clone(&events);
            bus.subscribe(topic, move |e| events.borrow_mut().push(e.clone()))
        })
        .collect();
    let scene = SceneController::new(renderer, config, query.clone(), bus, &input);
    Fixture {
        scene,
        query,
        input,
        events,
        _subscriptions: subscriptions,
    }
}

fn fixture() -> Fixture {
    fixture_with(HeadlessRenderer::new(800.0, 600.0), SceneConfig::default())
}

/// Let spawned load tasks run until they block again.
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

// ── Construction ─────────────────────────────────────────────────────

#[test]
fn test_construction_applies_config_and_camera_speeds() {
    let config = SceneConfig {
        background_color: Color::from_rgb_u32(0x102030),
        ..SceneConfig::default()
    };
    let f = fixture_with(HeadlessRenderer::new(100.0, 100.0), config);
    let renderer = f.scene.renderer();
    assert_eq!(renderer.clear_color(), Color::from_rgb_u32(0x102030));
    assert_eq!(renderer.camera().move_speed, 200.0);
    assert!((renderer.camera().rotation_speed - PI / 500.0).abs() < 1e-15);
    assert_eq!(f.scene.background(), Color::from_rgb_u32(0x102030));
    assert_eq!(f.input.listener_count(), 2);
}

// ── add / query ──────────────────────────────────────────────────────

#[test]
fn test_add_same_instance_twice_binds_once() {
    let f = fixture();
    let layer = LayerHandle::new(GridLayer::new("a"));
    assert!(f.scene.add(&layer));
    assert!(!f.scene.add(&layer));
    assert_eq!(f.scene.layer_count(), 1);
    assert_eq!(f.scene.renderer().drawable_count(), 1);
}

#[test]
fn test_distinct_layers_may_share_an_id() {
    let f = fixture();
    let a = LayerHandle::new(GridLayer::new("dup"));
    let b = LayerHandle::new(GridLayer::new("dup"));
    f.scene.add(&a);
    f.scene.add(&b);
    assert_eq!(f.scene.query_layer_all(Some("dup")), vec![a.clone(), b]);
    assert_eq!(f.scene.query_layer(Some("dup")), Some(a));
}

#[test]
fn test_query_layer_is_first_of_query_layer_all() {
    let f = fixture();
    for id in ["x", "y", "x"] {
        f.scene.add(&LayerHandle::new(GridLayer::new(id)));
    }
    for filter in [None, Some(""), Some("x"), Some("y"), Some("nope")] {
        assert_eq!(
            f.scene.query_layer(filter),
            f.scene.query_layer_all(filter).first().cloned()
        );
    }
    assert_eq!(f.scene.query_layer_all(None).len(), 3);
    assert!(f.scene.query_layer_all(Some("nope")).is_empty());
}

#[test]
fn test_first_layer_frames_camera_once() {
    let f = fixture();
    f.scene.add(&LayerHandle::new(GridLayer::new("a").with_grid(square())));
    assert_eq!(f.scene.renderer().view_box_calls(), 1);

    f.scene.clear();
    f.scene.add(&LayerHandle::new(GridLayer::new("b").with_grid(square())));
    assert_eq!(f.scene.renderer().view_box_calls(), 1);
}

#[test]
fn test_straight_street_is_fully_framed() {
    let street = Grid::from_json(
        r#"{"nodes":[{"id":1,"lon":0,"lat":0},{"id":2,"lon":10000,"lat":0}],
            "ways":[{"nodes":[1,2]}]}"#,
    )
    .unwrap();
    let f = fixture();
    f.scene.add(&LayerHandle::new(GridLayer::new("street").with_grid(street)));

    let renderer = f.scene.renderer();
    assert_eq!(renderer.view_box_calls(), 1);
    let visible = renderer.viewport().visible_bounds();
    assert!(visible.width() >= 10_000.0);
    assert!(visible.min.x <= 0.0 && visible.max.x >= 10_000.0);
}

#[test]
fn test_first_layer_without_content_never_frames_from_later_layers() {
    let f = fixture();
    f.scene.add(&LayerHandle::new(GridLayer::new("empty")));
    f.scene.add(&LayerHandle::new(GridLayer::new("full").with_grid(square())));
    assert_eq!(f.scene.renderer().view_box_calls(), 0);
}

// ── clear / dispose ──────────────────────────────────────────────────

#[test]
fn test_clear_destroys_every_layer_once() {
    let f = fixture();
    let layers: Vec<LayerHandle> = (0..3)
        .map(|i| LayerHandle::new(GridLayer::new(&format!("l{i}"))))
        .collect();
    for l in &layers {
        f.scene.add(l);
    }
    let drawables: Vec<_> = layers.iter().map(|l| l.borrow().drawable().unwrap()).collect();

    f.scene.clear();
    f.scene.clear();

    assert_eq!(f.scene.layer_count(), 0);
    assert!(layers.iter().all(|l| l.borrow().is_destroyed()));
    assert_eq!(f.scene.renderer().released(), drawables.as_slice());
    assert_eq!(f.scene.renderer().clear_count(), 2);
}

#[test]
fn test_dispose_clears_layers_then_releases_renderer() {
    let f = fixture();
    let layer = LayerHandle::new(GridLayer::new("a"));
    f.scene.add(&layer);

    f.scene.dispose();
    f.scene.dispose();

    assert!(f.scene.is_disposed());
    assert!(layer.borrow().is_destroyed());
    assert_eq!(f.scene.renderer().released().len(), 1);
    assert!(f.scene.renderer().is_disposed());
    assert_eq!(f.input.listener_count(), 0);
    assert_eq!(
        f.scene.load("late", RawLoadOptions::default()).unwrap_err(),
        LoadError::Disposed
    );
}

// ── Colors ───────────────────────────────────────────────────────────

#[test]
fn test_line_color_applies_to_all_layers() {
    let f = fixture();
    assert_eq!(f.scene.line_color(), SceneConfig::default().default_line_color());

    let a = LayerHandle::new(GridLayer::new("a"));
    let b = LayerHandle::new(GridLayer::new("b"));
    f.scene.add(&a);
    f.scene.add(&b);

    let red = Color::from_rgb_u32(0xFF0000);
    f.scene.set_line_color(red);

    assert_eq!(f.scene.layer_count(), 2);
    assert_eq!(a.color(), red);
    assert_eq!(b.color(), red);
    assert_eq!(f.scene.line_color(), red);
    let drawable = a.borrow().drawable().unwrap();
    assert_eq!(f.scene.renderer().drawable_color(drawable), Some(red));
    assert_eq!(*f.events.borrow(), vec![SceneEvent::LineColor(red)]);
}

#[test]
fn test_background_updates_clear_color_and_renders() {
    let f = fixture();
    f.scene.set_background_str("#000000").unwrap();

    assert_eq!(f.scene.background(), Color::BLACK);
    let renderer = f.scene.renderer();
    assert_eq!(renderer.clear_color(), Color::BLACK);
    assert_eq!(renderer.frames_rendered(), 1);
    assert!(renderer.last_frame().unwrap().forced);
    assert_eq!(*f.events.borrow(), vec![SceneEvent::BackgroundColor(Color::BLACK)]);
}

#[test]
fn test_invalid_color_string_leaves_state_untouched() {
    let f = fixture();
    let before = f.scene.background();
    assert!(f.scene.set_background_str("not-a-color").is_err());
    assert_eq!(f.scene.background(), before);
    assert!(f.events.borrow().is_empty());
}

// ── Camera speed and modifiers ───────────────────────────────────────

#[test]
fn test_transform_retunes_move_speed() {
    let f = fixture();
    f.scene.handle_transform(&TransformEvent::new(0.0, 0.0, 0.05));
    assert!((f.scene.renderer().camera().move_speed - 0.2).abs() < 1e-12);

    f.scene.handle_transform(&TransformEvent::new(0.0, 0.0, -10.0));
    let expected = PI / 1000.0 * (10.0 / 100.0) * 200.0;
    assert!((f.scene.renderer().camera().move_speed - expected).abs() < 1e-12);
    assert_eq!(f.scene.camera_state().zoom_depth, 10.0);
    assert_eq!(f.events.borrow().len(), 2);
}

#[test]
fn test_fixed_camera_ignores_transforms_but_still_publishes() {
    let f = fixture_with(HeadlessRenderer::with_fixed_camera(100.0, 100.0), SceneConfig::default());
    f.scene.handle_transform(&TransformEvent::new(0.0, 0.0, 50.0));
    assert_eq!(f.scene.renderer().camera().move_speed, 0.0);
    assert_eq!(f.events.borrow().len(), 1);
}

#[test]
fn test_renderer_zoom_feeds_back_into_speed() {
    let f = fixture();
    // 600px tall at zoom 3 puts the camera 100 units out.
    let event = f.scene.with_renderer_mut(|r| r.zoom_at(400.0, 300.0, 3.0));
    assert!((event.zoom_depth() - 100.0).abs() < 1e-9);
    f.scene.handle_transform(&event);
    let expected = PI / 1000.0 * 200.0;
    assert!((f.scene.renderer().camera().move_speed - expected).abs() < 1e-9);
}

#[tokio::test]
async fn test_renderer_access_does_not_block_load_completion() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            let handle = f.scene.load("region-A", RawLoadOptions::default()).unwrap();
            let frames_before = f.scene.with_renderer(|r| r.frames_rendered());
            settle().await;

            f.query.resolve("region-A", Ok(square()));
            assert!(handle.outcome().await.is_loaded());

            f.scene.with_renderer_mut(|r| r.pan(5.0, 0.0));
            f.scene.render();
            assert_eq!(f.scene.with_renderer(|r| r.frames_rendered()), frames_before + 2);
        })
        .await;
}

#[test]
fn test_shift_slow_down() {
    let f = fixture();
    f.input.dispatch(&KeyEvent::down("Shift", Modifiers::SHIFT));
    f.input.dispatch(&KeyEvent::down("Shift", Modifiers::SHIFT));
    assert_eq!(f.scene.renderer().camera().speed_history, vec![0.1]);
    assert!(f.scene.camera_state().slowed);

    f.input.dispatch(&KeyEvent::up("Shift", Modifiers::NONE));
    assert_eq!(f.scene.renderer().camera().speed_history, vec![0.1, 1.0]);

    f.input.dispatch(&KeyEvent::up("a", Modifiers::NONE));
    assert_eq!(f.scene.renderer().camera().speed_history.len(), 2);
}

#[test]
fn test_input_ignored_after_dispose() {
    let f = fixture();
    f.scene.dispose();
    f.input.dispatch(&KeyEvent::down("Shift", Modifiers::SHIFT));
    assert!(f.scene.renderer().camera().speed_history.is_empty());
}

// ── Loads ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_load_registers_empty_layer_then_populates_it() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            let handle = f.scene.load("region-A", RawLoadOptions::default()).unwrap();

            let layer = handle.layer().clone();
            assert_eq!(layer.id(), "region-A");
            assert!(!layer.has_grid());
            assert_eq!(f.scene.query_layer_all(None), vec![layer.clone()]);

            settle().await;
            f.query.resolve("region-A", Ok(square()));
            assert!(handle.outcome().await.is_loaded());

            let populated = layer.borrow();
            let grid = populated.grid().unwrap();
            assert!(grid.has_projector());
            assert_eq!(grid.segments().len(), 4);
            let drawable = populated.drawable().unwrap();
            assert_eq!(f.scene.renderer().drawable_segments(drawable), Some(4));
            // The first layer frames the camera once its content arrives.
            assert_eq!(f.scene.renderer().view_box_calls(), 1);
        })
        .await;
}

#[tokio::test]
async fn test_failed_load_removes_layer_by_default() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            let handle = f.scene.load("region-A", RawLoadOptions::default()).unwrap();
            let layer = handle.layer().clone();

            settle().await;
            f.query.resolve("region-A", Err(QueryError::NotFound("region-A".into())));
            let outcome = handle.outcome().await;

            assert!(matches!(outcome, LoadOutcome::Failed(QueryError::NotFound(_))));
            assert!(f.scene.query_layer_all(None).is_empty());
            assert!(layer.borrow().is_destroyed());
            assert_eq!(f.scene.renderer().drawable_count(), 0);
        })
        .await;
}

#[tokio::test]
async fn test_failed_load_keeps_placeholder_when_configured() {
    LocalSet::new()
        .run_until(async {
            let config = SceneConfig {
                retain_failed_layers: true,
                ..SceneConfig::default()
            };
            let f = fixture_with(HeadlessRenderer::new(100.0, 100.0), config);
            let handle = f.scene.load("region-A", RawLoadOptions::default()).unwrap();
            let layer = handle.layer().clone();

            settle().await;
            f.query.resolve("region-A", Err(QueryError::Other("boom".into())));
            assert!(matches!(handle.outcome().await, LoadOutcome::Failed(_)));

            assert_eq!(f.scene.query_layer_all(None), vec![layer.clone()]);
            assert!(!layer.has_grid());
            assert_eq!(f.scene.renderer().released().len(), 1);

            // Clearing the placeholder does not release it a second time.
            f.scene.clear();
            assert_eq!(f.scene.renderer().released().len(), 1);
        })
        .await;
}

#[tokio::test]
async fn test_completion_after_clear_is_dropped() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            let handle = f.scene.load("region-A", RawLoadOptions::default()).unwrap();
            let layer = handle.layer().clone();
            settle().await;

            f.scene.clear();
            let fresh = LayerHandle::new(GridLayer::new("fresh"));
            f.scene.add(&fresh);

            f.query.resolve("region-A", Ok(square()));
            assert!(matches!(handle.outcome().await, LoadOutcome::Stale));
            assert!(!layer.has_grid());
            assert_eq!(f.scene.query_layer_all(None), vec![fresh]);
        })
        .await;
}

#[tokio::test]
async fn test_completion_after_dispose_is_dropped() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            let handle = f.scene.load("region-A", RawLoadOptions::default()).unwrap();
            settle().await;
            f.scene.dispose();
            f.query.resolve("region-A", Ok(square()));
            assert!(matches!(handle.outcome().await, LoadOutcome::Stale));
        })
        .await;
}

#[tokio::test]
async fn test_cancelled_load_leaves_layer_empty() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            let handle = f.scene.load("region-A", RawLoadOptions::default()).unwrap();
            let layer = handle.layer().clone();
            settle().await;

            handle.cancel();
            assert!(matches!(handle.outcome().await, LoadOutcome::Cancelled));
            assert!(!layer.has_grid());
            assert!(f.scene.remove(&layer));
            assert_eq!(f.scene.layer_count(), 0);
        })
        .await;
}

#[tokio::test]
async fn test_concurrent_loads_complete_out_of_order() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            let first = f.scene.load("north", RawLoadOptions::default()).unwrap();
            let second = f.scene.load("south", RawLoadOptions::default()).unwrap();
            let (north, south) = (first.layer().clone(), second.layer().clone());
            settle().await;

            f.query.resolve("south", Ok(square()));
            assert!(second.outcome().await.is_loaded());
            assert!(south.has_grid());
            assert!(!north.has_grid());

            f.query.resolve("north", Err(QueryError::NotFound("north".into())));
            assert!(matches!(first.outcome().await, LoadOutcome::Failed(_)));
            assert_eq!(f.scene.query_layer_all(None), vec![south]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_query_timeout_fails_the_load() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            let raw = RawLoadOptions {
                timeout_secs: Some(2),
                ..RawLoadOptions::default()
            };
            let handle = f.scene.load("slow", raw).unwrap();
            let outcome = handle.outcome().await;
            match outcome {
                LoadOutcome::Failed(QueryError::Timeout { place, timeout }) => {
                    assert_eq!(place, "slow");
                    assert_eq!(timeout, Duration::from_secs(2));
                }
                other => panic!("expected timeout, got {other:?}"),
            }
        })
        .await;
}

#[tokio::test]
async fn test_second_load_reuses_first_projector() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            let first = f.scene.load("a", RawLoadOptions::default()).unwrap();
            let a = first.layer().clone();
            settle().await;
            f.query.resolve("a", Ok(square()));
            first.outcome().await;

            let second = f.scene.load("b", RawLoadOptions::default()).unwrap();
            let b = second.layer().clone();
            settle().await;
            f.query.resolve("b", Ok(square()));
            second.outcome().await;

            let pa = a.borrow().projector().unwrap();
            let pb = b.borrow().projector().unwrap();
            assert!(Rc::ptr_eq(&pa, &pb));
        })
        .await;
}

#[test]
fn test_load_rejects_empty_place() {
    let f = fixture();
    assert!(matches!(
        f.scene.load("   ", RawLoadOptions::default()),
        Err(LoadError::Options(_))
    ));
    assert_eq!(f.scene.layer_count(), 0);
}
