//! Particle records and the append-only pool
//!
//! Indices handed out by the pool are stable for the life of the scene: cards
//! are never removed or reordered. The memory card is kept outside the pool.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::anim::{Fade, Pose, Tween};
use super::boundary::SphereBoundary;
use super::phase::{SceneEvent, Stage};
use crate::config::SceneConfig;
use crate::consts::BASE_SPIN_MAX;
use crate::{euler_to_quat, random_point_in_sphere, random_symmetric};

/// `id` carried by the memory card, which has no pool slot
pub const MEMORY_ID: u32 = u32::MAX;

/// Opaque reference to an image owned by the media layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageHandle(pub u64);

/// What currently drives a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParticleKind {
    /// Ordinary physics
    #[default]
    Ambient,
    /// Scripted toward the viewer, excluded from physics
    FlyingOut,
    /// The selected memory card, excluded from physics
    Memory,
}

impl ParticleKind {
    /// Whether physics (forces, integration, containment) applies
    #[inline]
    pub fn is_simulated(self) -> bool {
        self == ParticleKind::Ambient
    }
}

/// Stages of the scripted shake sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShakeStage {
    Scatter,
    Drift,
    Settle,
}

impl ShakeStage {
    pub fn next(self) -> Option<ShakeStage> {
        match self {
            ShakeStage::Scatter => Some(ShakeStage::Drift),
            ShakeStage::Drift => Some(ShakeStage::Settle),
            ShakeStage::Settle => None,
        }
    }

    /// How far from the center (fraction of the radius) targets may land
    pub fn reach(self) -> f32 {
        match self {
            ShakeStage::Scatter => 0.9,
            ShakeStage::Drift => 0.7,
            ShakeStage::Settle => 0.5,
        }
    }
}

/// A card's in-progress shake move
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShakeScript {
    pub stage: ShakeStage,
    pub tween: Tween,
}

/// One photo card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    /// Index in the pool ([`MEMORY_ID`] for the memory card)
    pub id: u32,
    pub image: ImageHandle,
    pub kind: ParticleKind,
    pub position: Vec3,
    pub velocity: Vec3,
    /// XYZ Euler angles (radians)
    pub rotation: Vec3,
    pub rotation_speed: Vec3,
    /// Spin that `rotation_speed` relaxes toward
    pub base_rotation_speed: Vec3,
    pub turbulence_phase: f32,
    pub turbulence_offset: Vec3,
    pub scale: f32,
    pub opacity: f32,
    /// Scripted shake move overriding the position, if any
    #[serde(skip)]
    pub script: Option<ShakeScript>,
    /// Opacity fade in progress, if any
    #[serde(skip)]
    pub fade: Option<Fade>,
}

impl Particle {
    /// Fresh ambient card at a random point inside the sphere
    pub fn spawn<R: Rng>(
        id: u32,
        image: ImageHandle,
        rng: &mut R,
        config: &SceneConfig,
    ) -> Self {
        let position = random_point_in_sphere(rng, config.sphere_center, config.sphere_radius * 0.8);
        Self::spawn_at(id, image, position, rng, config)
    }

    /// Fresh ambient card at `position`
    pub fn spawn_at<R: Rng>(
        id: u32,
        image: ImageHandle,
        position: Vec3,
        rng: &mut R,
        config: &SceneConfig,
    ) -> Self {
        let base_rotation_speed = random_symmetric(rng, BASE_SPIN_MAX);
        let turbulence_phase = rng.random_range(0.0..std::f32::consts::TAU);
        let turbulence_offset = random_symmetric(rng, std::f32::consts::PI);
        let rotation = random_symmetric(rng, std::f32::consts::PI);

        Self {
            id,
            image,
            kind: ParticleKind::Ambient,
            position,
            velocity: Vec3::ZERO,
            rotation,
            rotation_speed: base_rotation_speed,
            base_rotation_speed,
            turbulence_phase,
            turbulence_offset,
            scale: config.card_scale,
            opacity: 1.0,
            script: None,
            fade: None,
        }
    }

    /// Put the card back into circulation with a new random pose
    pub fn reset<R: Rng>(&mut self, rng: &mut R, config: &SceneConfig) {
        self.kind = ParticleKind::Ambient;
        self.position = random_point_in_sphere(rng, config.sphere_center, config.sphere_radius * 0.8);
        self.velocity = Vec3::ZERO;
        self.rotation = random_symmetric(rng, std::f32::consts::PI);
        self.rotation_speed = self.base_rotation_speed;
        self.scale = config.card_scale * rng.random_range(0.9..=1.1);
        self.script = None;
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation, self.scale)
    }

    pub fn set_pose(&mut self, pose: &Pose) {
        self.position = pose.position;
        self.rotation = pose.rotation;
        self.scale = pose.scale;
    }

    pub fn transform(&self) -> ParticleTransform {
        ParticleTransform {
            id: self.id,
            image: self.image,
            kind: self.kind,
            position: self.position,
            rotation: euler_to_quat(self.rotation),
            scale: self.scale,
            opacity: self.opacity,
        }
    }
}

/// What the renderer needs to place one card
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleTransform {
    pub id: u32,
    pub image: ImageHandle,
    pub kind: ParticleKind,
    pub position: Vec3,
    pub rotation: glam::Quat,
    pub scale: f32,
    pub opacity: f32,
}

/// Append-only card storage
#[derive(Debug, Clone, Default)]
pub struct ParticlePool {
    particles: Vec<Particle>,
}

impl ParticlePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next pushed card will get
    pub fn next_id(&self) -> u32 {
        self.particles.len() as u32
    }

    /// Append a card; its `id` must equal [`ParticlePool::next_id`]
    pub fn push(&mut self, particle: Particle) -> u32 {
        debug_assert_eq!(particle.id, self.next_id());
        let id = self.next_id();
        self.particles.push(particle);
        id
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Particle> {
        self.particles.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Particle> {
        self.particles.iter_mut()
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Positions of the first `count` cards; excluded cards are `None`
    pub fn position_snapshot(&self, count: usize) -> Vec<Option<Vec3>> {
        self.particles[..count.min(self.particles.len())]
            .iter()
            .map(|p| p.kind.is_simulated().then_some(p.position))
            .collect()
    }

    /// Indices of ambient cards, in pool order
    pub fn ambient_indices(&self) -> Vec<usize> {
        self.particles
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind == ParticleKind::Ambient)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Complete simulation state (deterministic given seed and inputs)
#[derive(Debug, Clone)]
pub struct SceneState {
    pub config: SceneConfig,
    pub rng: Pcg32,
    /// Simulation clock in seconds (sum of clamped timesteps)
    pub time: f32,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub pool: ParticlePool,
    /// The memory card, while one exists
    pub memory: Option<Particle>,
    /// Current scripted stage of the scene
    pub stage: Stage,
    /// Whether ambient cards are (being) dimmed
    pub dimmed: bool,
    /// Notifications for the host, drained by the caller
    pub events: Vec<SceneEvent>,
}

impl SceneState {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(config.seed),
            config,
            time: 0.0,
            time_ticks: 0,
            pool: ParticlePool::new(),
            memory: None,
            stage: Stage::Idle,
            dimmed: false,
            events: Vec::new(),
        }
    }

    pub fn boundary(&self) -> SphereBoundary {
        SphereBoundary::new(
            self.config.sphere_center,
            self.config.sphere_radius,
            self.config.wall_retention,
        )
    }

    /// Append a card at a random spot; returns its index
    pub fn spawn_particle(&mut self, image: ImageHandle) -> u32 {
        let particle = Particle::spawn(self.pool.next_id(), image, &mut self.rng, &self.config);
        self.push_particle(particle)
    }

    /// Append a card at `position` (pulled inside the sphere if needed)
    pub fn spawn_particle_at(&mut self, image: ImageHandle, position: Vec3) -> u32 {
        let mut position = position;
        let mut velocity = Vec3::ZERO;
        self.boundary().constrain(&mut position, &mut velocity, 0.0);
        let particle =
            Particle::spawn_at(self.pool.next_id(), image, position, &mut self.rng, &self.config);
        self.push_particle(particle)
    }

    fn push_particle(&mut self, mut particle: Particle) -> u32 {
        if self.dimmed {
            particle.opacity = crate::consts::DIM_OPACITY;
        }
        self.pool.push(particle)
    }
}
