//! Net acceleration on one card
//!
//! Every term is a tunable heuristic; they are summed with no precedence.

use glam::Vec3;

use super::motion::MotionSample;
use super::state::Particle;
use crate::consts::{SEPARATION_EPSILON, SWIRL_FACTOR};
use crate::params::Parameters;

/// Read-only inputs shared by every card during one tick
#[derive(Debug, Clone, Copy)]
pub struct ForceContext<'a> {
    pub params: &'a Parameters,
    pub motion: &'a MotionSample,
    pub sphere_center: Vec3,
    pub turbulence_amplitude: f32,
    /// Simulation time in seconds
    pub time: f32,
}

/// Constant vertical pull (net of buoyancy)
#[inline]
pub fn gravity(params: &Parameters) -> Vec3 {
    Vec3::new(0.0, params.gravity, 0.0)
}

/// Linear drag opposing the current velocity
#[inline]
pub fn drag(velocity: Vec3, params: &Parameters) -> Vec3 {
    -velocity * params.drag_coefficient
}

/// Device acceleration mapped straight into the world
#[inline]
pub fn device_forcing(motion: &MotionSample, params: &Parameters) -> Vec3 {
    motion.acceleration * params.motion_sensitivity
}

/// Tangential swirl from device rotation, growing with distance from center
#[inline]
pub fn device_swirl(motion: &MotionSample, relative: Vec3, params: &Parameters) -> Vec3 {
    motion.rotation_rate.cross(relative) * params.motion_sensitivity * SWIRL_FACTOR
}

/// Smooth per-card drift, bounded by `amplitude` on each axis
pub fn turbulence(time: f32, phase: f32, offset: Vec3, amplitude: f32) -> Vec3 {
    Vec3::new(
        (time * 0.7 + phase + offset.x).sin(),
        (time * 0.9 + phase + offset.y).cos(),
        (time * 1.1 + phase + offset.z).sin(),
    ) * amplitude
}

/// Short-range push away from every neighbor inside the separation radius
///
/// `neighbors` holds one entry per card; `None` marks cards that neither push
/// nor get pushed. `self_index` is skipped.
pub fn separation(
    position: Vec3,
    self_index: usize,
    neighbors: &[Option<Vec3>],
    params: &Parameters,
) -> Vec3 {
    let radius = params.separation_radius;
    if radius <= 0.0 || params.separation_strength == 0.0 {
        return Vec3::ZERO;
    }

    let mut force = Vec3::ZERO;
    for (j, other) in neighbors.iter().enumerate() {
        let Some(other) = other else { continue };
        if j == self_index {
            continue;
        }
        let away = position - *other;
        let dist = away.length();
        if dist < SEPARATION_EPSILON || dist >= radius {
            continue;
        }
        let falloff = (radius - dist) / radius;
        force += (away / dist) * falloff * params.separation_strength;
    }
    force
}

/// Sum of all terms for `particle`
pub fn net_force(
    particle: &Particle,
    self_index: usize,
    neighbors: &[Option<Vec3>],
    ctx: &ForceContext<'_>,
) -> Vec3 {
    let relative = particle.position - ctx.sphere_center;

    gravity(ctx.params)
        + drag(particle.velocity, ctx.params)
        + device_forcing(ctx.motion, ctx.params)
        + device_swirl(ctx.motion, relative, ctx.params)
        + turbulence(
            ctx.time,
            particle.turbulence_phase,
            particle.turbulence_offset,
            ctx.turbulence_amplitude,
        )
        + separation(particle.position, self_index, neighbors, ctx.params)
}
