//! GridScene headless driver.
//!
//! Loads one grid document per place into a scene backed by the headless
//! renderer, renders a frame, and prints the resulting frame report as JSON.
//!
//! ```text
//! gridscene [--config scene.json] [--dir grids/] [--zoom FACTOR] <place>...
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use gridscene_core::{EventBus, RawLoadOptions, SceneEvent, Topic};
use gridscene_io::{load_config_or_default, FileGridSource};
use gridscene_renderer::HeadlessRenderer;
use gridscene_scene::{InputSurface, SceneController};
use tokio::task::LocalSet;

#[derive(Parser, Debug)]
#[command(name = "gridscene", version, about = "Load grid documents into a headless scene and report the frame")]
struct Cli {
    /// Scene config file; defaults apply when it does not exist.
    #[arg(long, env = "GRIDSCENE_CONFIG", default_value = "gridscene.json")]
    config: PathBuf,

    /// Directory holding `<place>.json` grid documents. Overrides `grid_dir` from the config.
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Zoom factor applied around the surface center before rendering.
    #[arg(long)]
    zoom: Option<f64>,

    #[arg(required = true)]
    places: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    LocalSet::new().run_until(run(cli)).await
}

async fn run(args: Cli) -> ExitCode {
    let config = match load_config_or_default(&args.config) {
        Ok(config) => config,
        Err(err) => {
            log::error!("could not read {}: {}", args.config.display(), err);
            return ExitCode::FAILURE;
        }
    };
    let dir = args
        .dir
        .or_else(|| config.grid_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    log::info!("GridScene v{} reading grids from {}", SceneController::<HeadlessRenderer>::version(), dir.display());

    let bus = EventBus::new();
    let _transforms = bus.subscribe(Topic::SceneTransform, |event| {
        if let SceneEvent::SceneTransform(t) = event {
            log::debug!("camera at depth {:.3}", t.zoom_depth());
        }
    });
    let input = InputSurface::new();
    let scene = SceneController::new(
        HeadlessRenderer::new(1280.0, 720.0),
        config,
        Rc::new(FileGridSource::new(dir)),
        bus,
        &input,
    );

    let mut handles = Vec::new();
    for place in &args.places {
        match scene.load(place, RawLoadOptions::default()) {
            Ok(handle) => handles.push((place.clone(), handle)),
            Err(err) => log::error!("load '{}' rejected: {}", place, err),
        }
    }

    let mut failures = 0;
    for (place, handle) in handles {
        let outcome = handle.outcome().await;
        if !outcome.is_loaded() {
            log::warn!("'{}' did not load: {:?}", place, outcome);
            failures += 1;
        }
    }

    if let Some(factor) = args.zoom {
        let event = scene.with_renderer_mut(|r| r.zoom_at(640.0, 360.0, factor));
        scene.handle_transform(&event);
    }
    scene.render();

    let report = scene.with_renderer(|r| r.last_frame().cloned());
    let state = scene.camera_state();
    log::info!(
        "{} layers, move speed {:.4}, rotation speed {:.5}",
        scene.layer_count(),
        state.move_speed,
        state.rotation_speed
    );
    if let Some(report) = report {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(err) => log::error!("could not encode frame report: {}", err),
        }
    }

    scene.dispose();
    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
