//! Photo Globe headless demo
//!
//! Drives a scripted session against the simulation core: cards stream in from
//! a loader thread, a synthetic sensor tilts and jolts the device, and the
//! shake / fly-out / memory flows run to completion.

use std::time::Duration;

use glam::{Vec2, Vec3};

use photo_globe::sim::{ImageHandle, MotionSample, MotionSensor, ParticleKind, ShakeDetector};
use photo_globe::{InstanceBuffer, Parameters, Scene, SceneConfig, SceneEvent};

/// Simulated display refresh
const FRAME: f64 = 1.0 / 60.0;

/// Sensor that sways gently and jolts once after two seconds
struct SyntheticSensor {
    t: f32,
}

impl MotionSensor for SyntheticSensor {
    fn read(&mut self) -> Option<MotionSample> {
        self.t += 0.01;
        let jolt = if (2.0..2.1).contains(&self.t) { 4.0 } else { 0.0 };
        Some(MotionSample::new(
            Vec3::new((self.t * 0.8).sin() * 0.1, jolt, 0.0),
            Vec3::new(0.0, (self.t * 0.5).cos() * 0.2, 0.0),
        ))
    }
}

fn main() {
    env_logger::init();
    log::info!("Photo Globe (headless) starting...");

    let config = match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(json) => SceneConfig::from_json(&json).unwrap_or_else(|e| {
                log::warn!("Bad scene config {}: {}, using defaults", path, e);
                SceneConfig::default()
            }),
            Err(e) => {
                log::warn!("Cannot read {}: {}, using defaults", path, e);
                SceneConfig::default()
            }
        },
        None => SceneConfig::default(),
    };
    let mut scene = Scene::new(config);

    // Thumbnails trickle in from the media layer
    let images = scene.image_sender();
    let loader = std::thread::spawn(move || {
        for i in 0..24 {
            if images.send(ImageHandle(i)).is_err() {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    });

    let sampler = scene
        .motion_source()
        .spawn_sampler(SyntheticSensor { t: 0.0 }, 100.0);
    let mut detector = ShakeDetector::default();

    // A tuning surface nudging a knob from elsewhere
    let store = scene.parameters();
    store.set(&Parameters {
        separation_strength: 1.2,
        ..Parameters::default()
    });

    let mut buffer = InstanceBuffer::default();
    let mut clock = 0.0f64;
    let mut fly_out = None;
    let mut memory_requested = false;

    for frame in 0..900u32 {
        scene.tick(clock);

        let sample = scene.motion_source().latest();
        if detector.observe(&sample, clock as f32) {
            scene.on_shake();
        }

        match frame {
            120 => scene.on_pan(Vec2::new(60.0, -10.0)),
            300 => fly_out = scene.begin_fly_out(),
            _ => {}
        }
        if !memory_requested && fly_out.as_ref().is_some_and(|s| s.is_complete()) {
            memory_requested = scene.show_memory(ImageHandle(1000));
        }
        if frame == 780 {
            scene.dismiss_memory();
        }

        for event in scene.drain_events() {
            match event {
                SceneEvent::MemoryRevealed { image } => log::info!("Showing memory {:?}", image),
                other => log::debug!("Event: {:?}", other),
            }
        }

        scene.render(&mut buffer);
        clock += FRAME;
        // Let the sensor thread keep pace with simulated time
        std::thread::sleep(Duration::from_micros(500));
    }

    sampler.stop();
    if loader.join().is_err() {
        log::warn!("Image loader thread panicked");
    }

    let center = scene.config().sphere_center;
    let radius = scene.config().sphere_radius;
    let contained = scene
        .transforms()
        .iter()
        .filter(|t| t.kind != ParticleKind::Memory)
        .filter(|t| (t.position - center).length() <= radius + 1e-4)
        .count();
    log::info!(
        "Done: {} cards, {} contained, {} frames presented, phase {:?}",
        scene.particle_count(),
        contained,
        buffer.frames,
        scene.phase()
    );
}
