//! In-process API for the host
//!
//! The host calls [`Scene::tick`] once per display refresh with a monotonically
//! increasing timestamp. Everything else is a gesture or life-cycle signal that
//! may arrive at any tick boundary.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use glam::{Vec2, Vec3};

use crate::bridge::RenderBridge;
use crate::config::SceneConfig;
use crate::consts::MAX_DT;
use crate::params::{ParameterStore, Parameters};
use crate::sim::phase::{self, FlyOutSignal, SceneEvent, ScenePhase};
use crate::sim::{
    ImageHandle, MotionSample, MotionSource, Particle, ParticleTransform, SceneState, TickInput,
};

/// The photo globe
#[derive(Debug)]
pub struct Scene {
    state: SceneState,
    params: Arc<ParameterStore>,
    motion: MotionSource,
    inbox_tx: Sender<ImageHandle>,
    inbox_rx: Receiver<ImageHandle>,
    /// Timestamp of the previous tick; `None` until the first tick after (re)start
    last_elapsed: Option<f64>,
    running: bool,
    pending_pan: Vec2,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}

impl Scene {
    pub fn new(config: SceneConfig) -> Self {
        Self::with_parameters(config, Arc::new(ParameterStore::default()))
    }

    /// Scene reading its knobs from a store shared with a tuning surface
    pub fn with_parameters(config: SceneConfig, params: Arc<ParameterStore>) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::channel();
        log::info!(
            "Scene created: radius={}, seed={:#x}",
            config.sphere_radius,
            config.seed
        );
        Self {
            state: SceneState::new(config),
            params,
            motion: MotionSource::new(),
            inbox_tx,
            inbox_rx,
            last_elapsed: None,
            running: true,
            pending_pan: Vec2::ZERO,
        }
    }

    // === Cards ===

    /// Append an ambient card for `image`; returns its stable index
    pub fn add_particle(&mut self, image: ImageHandle) -> u32 {
        self.state.spawn_particle(image)
    }

    /// Append an ambient card at a given spot (pulled inside the glass)
    pub fn add_particle_at(&mut self, image: ImageHandle, position: Vec3) -> u32 {
        self.state.spawn_particle_at(image, position)
    }

    /// Sender for images arriving from another thread
    ///
    /// Queued images become cards at the end of the next tick.
    pub fn image_sender(&self) -> Sender<ImageHandle> {
        self.inbox_tx.clone()
    }

    fn drain_inbox(&mut self) {
        while let Ok(image) = self.inbox_rx.try_recv() {
            self.state.spawn_particle(image);
        }
    }

    pub fn particle_count(&self) -> usize {
        self.state.pool.len()
    }

    pub fn particle(&self, index: usize) -> Option<&Particle> {
        self.state.pool.get(index)
    }

    pub fn memory(&self) -> Option<&Particle> {
        self.state.memory.as_ref()
    }

    // === Frame ===

    /// Advance by one frame; `elapsed` is the host clock in seconds
    ///
    /// The first tick after creation or [`Scene::start`] only records the
    /// baseline. Steps are capped at [`MAX_DT`].
    pub fn tick(&mut self, elapsed: f64) {
        if !self.running {
            return;
        }
        let Some(previous) = self.last_elapsed.replace(elapsed) else {
            return;
        };
        if elapsed < previous {
            log::warn!(
                "Tick time went backwards ({:.4} -> {:.4}), rebasing",
                previous,
                elapsed
            );
            return;
        }

        let dt = ((elapsed - previous) as f32).min(MAX_DT);
        let input = TickInput {
            params: self.params.snapshot(),
            motion: self.motion.latest(),
            pan: std::mem::take(&mut self.pending_pan),
        };
        crate::sim::tick(&mut self.state, &input, dt);
        self.drain_inbox();
    }

    /// Per-card transforms, pool order, memory card last
    pub fn transforms(&self) -> Vec<ParticleTransform> {
        self.state
            .pool
            .iter()
            .chain(self.state.memory.iter())
            .map(Particle::transform)
            .collect()
    }

    /// Hand the current transforms to the renderer
    pub fn render<B: RenderBridge + ?Sized>(&self, bridge: &mut B) {
        bridge.present(&self.transforms(), self.is_memory_active());
    }

    // === Gestures ===

    /// Shake every ambient card
    pub fn on_shake(&mut self) {
        let params = self.params.snapshot();
        phase::start_shake(&mut self.state, &params);
    }

    /// Send a random card toward the viewer; `None` if one is already out,
    /// a memory is on stage, or there are no cards
    pub fn begin_fly_out(&mut self) -> Option<FlyOutSignal> {
        phase::begin_fly_out(&mut self.state)
    }

    /// Reveal `image` as the memory card; false if one already exists
    pub fn show_memory(&mut self, image: ImageHandle) -> bool {
        phase::show_memory(&mut self.state, image)
    }

    /// Take the memory card away; false if there is none
    pub fn dismiss_memory(&mut self) -> bool {
        phase::dismiss_memory(&mut self.state)
    }

    /// Accumulate a pan delta (points); applied on the next tick
    pub fn on_pan(&mut self, delta: Vec2) {
        self.pending_pan += delta;
    }

    // === Inputs ===

    pub fn set_parameters(&self, params: &Parameters) {
        self.params.set(params);
    }

    /// Shared parameter store, for handing to a tuning surface
    pub fn parameters(&self) -> Arc<ParameterStore> {
        Arc::clone(&self.params)
    }

    pub fn set_motion_sample(&self, acceleration: Vec3, rotation_rate: Vec3) {
        self.motion
            .set_sample(MotionSample::new(acceleration, rotation_rate));
    }

    /// Handle to the motion slot, for a sensor thread
    pub fn motion_source(&self) -> MotionSource {
        self.motion.clone()
    }

    // === Life cycle ===

    /// Resume after [`Scene::stop`]; the next tick is a baseline tick
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_elapsed = None;
        self.motion.start();
        log::info!("Scene started");
    }

    /// Pause simulation and motion sensing
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.last_elapsed = None;
        self.motion.stop();
        log::info!("Scene stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // === State ===

    pub fn phase(&self) -> ScenePhase {
        phase::phase(&self.state)
    }

    /// True from `show_memory` until the memory card is gone
    pub fn is_memory_active(&self) -> bool {
        self.state.memory.is_some()
    }

    /// Take all events raised since the last call
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.state.events)
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    pub fn config(&self) -> &SceneConfig {
        &self.state.config
    }
}
