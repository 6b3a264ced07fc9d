//! Culling group demo
//!
//! Scatters targets along a corridor, flies a camera down it and logs the
//! visibility and distance band changes reported for each target.
//!
//! Usage: `vision_demo [settings.toml|settings.ron]`

use std::cell::Cell;
use std::rc::Rc;

use rand::prelude::*;
use vision_engine::foundation::logging;
use vision_engine::prelude::*;

// Demo configuration
const TARGET_COUNT: usize = 40;
const CORRIDOR_LENGTH: f32 = 200.0;
const CORRIDOR_WIDTH: f32 = 20.0;
const CAMERA_SPEED: f32 = 2.5;
const FAR_CLIP_DISTANCE: f32 = 60.0;
const TICKS: usize = 80;

#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error("Settings error: {0}")]
    Config(#[from] ConfigError),

    #[error("Culling error: {0}")]
    Culling(#[from] CullingError),
}

fn load_settings() -> Result<VisionSettings, DemoError> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading settings from {}", path);
            Ok(VisionSettings::load_from_file(&path)?)
        }
        None => Ok(VisionSettings::default()),
    }
}

fn spawn_targets(directory: &GroupDirectory, key: GroupKey) -> Vec<Rc<CullingTargetBehaviour>> {
    let mut rng = rand::thread_rng();
    (0..TARGET_COUNT)
        .map(|i| {
            // Every fourth target drifts, the rest stay put
            let mode = if i % 4 == 0 {
                TransformUpdateMode::Dynamic
            } else {
                TransformUpdateMode::Static
            };
            let position = Vec3::new(
                rng.gen_range(0.0..CORRIDOR_LENGTH),
                rng.gen_range(-CORRIDOR_WIDTH..CORRIDOR_WIDTH),
                0.0,
            );
            let target = CullingTargetBehaviour::new(key, mode, position);
            target.set_radius(rng.gen_range(0.5..3.0));
            target.enable(directory);
            target
        })
        .collect()
}

fn run() -> Result<(), DemoError> {
    let settings = load_settings()?;
    let key = settings.keys().next().map_or(GroupKey::new(0), |(key, _)| key);
    log::info!("Using culling group '{}' ({})", settings.key_name(key).unwrap_or("unnamed"), key);

    let proxy_settings = ProxySettings {
        key,
        bounding_distances: vec![15.0, 40.0],
        ..ProxySettings::default()
    };
    proxy_settings.validate()?;

    let mut directory = GroupDirectory::new();
    let proxy = directory.activate_new(CullingGroupProxy::from_settings(
        &proxy_settings,
        Box::new(SimpleVisibilityEngine::new()),
    ))?;

    let appeared = Rc::new(Cell::new(0usize));
    {
        let appeared = appeared.clone();
        proxy.borrow().on_state_changed().subscribe(move |event| {
            if event.has_become_visible() {
                appeared.set(appeared.get() + 1);
            }
        });
    }

    let mut targets = spawn_targets(&directory, key);
    for (i, target) in targets.iter().enumerate() {
        target.state_changed().subscribe(move |event| {
            log::debug!(
                "target {:>2}: visible {} -> {}, band {} -> {}",
                i,
                event.was_visible,
                event.is_visible,
                event.previous_band,
                event.current_band
            );
        });
    }

    let mut rng = rand::thread_rng();
    for tick in 0..TICKS {
        #[allow(clippy::cast_precision_loss)]
        let camera_position = Vec3::new(tick as f32 * CAMERA_SPEED, 0.0, 5.0);
        directory.link_target_camera(key, Camera::new(camera_position, FAR_CLIP_DISTANCE));

        for target in targets.iter().filter(|target| target.bounding_sphere_update_mode() == TransformUpdateMode::Dynamic) {
            let drift = Vec3::new(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5), 0.0);
            target.set_position(target.position() + drift);
        }

        directory.rebuild_all();
        proxy.borrow_mut().update();
        let changes = CullingGroupProxy::dispatch_state_changes(&proxy);

        let visible: TemporaryArray<usize> = targets
            .iter()
            .enumerate()
            .filter(|(_, target)| target.is_visible())
            .map(|(i, _)| i)
            .collect();
        let near = targets
            .iter()
            .filter(|target| target.distance_band() == Some(0))
            .count();

        if changes > 0 {
            log::info!(
                "tick {:>2}: camera x {:>6.1}, {} changes, {} visible, {} near",
                tick,
                camera_position.x,
                changes,
                visible.len(),
                near
            );
        }
    }

    // Drop half the targets and let the group pick up the removals
    let removed = targets.split_off(targets.len() / 2);
    drop(removed);
    directory.rebuild_all();

    let stats = ArrayPool::<usize>::shared().stats();
    log::info!(
        "{} targets tracked after cleanup, {} became visible overall, pool hits {} misses {}",
        proxy.borrow().targets().len(),
        appeared.get(),
        stats.hits,
        stats.misses
    );

    directory.deactivate(&proxy);
    Ok(())
}

fn main() {
    logging::init("info");

    if let Err(e) = run() {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}
