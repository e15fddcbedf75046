//! One simulation frame
//!
//! Order within a tick: gestures, physics over the cards present at the start
//! of the tick, per-card scripts, then the scene-wide script.

use glam::{Vec2, Vec3};

use super::forces::ForceContext;
use super::integrate::{clamp_speed, step};
use super::motion::MotionSample;
use super::phase::{advance_cards, advance_stage};
use super::state::{ParticleKind, SceneState};
use crate::consts::PAN_STIR_GAIN;
use crate::params::Parameters;

/// Inputs for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Parameter snapshot taken for this tick
    pub params: Parameters,
    /// Motion sample copied out for this tick
    pub motion: MotionSample,
    /// Pan gesture accumulated since the previous tick (points)
    pub pan: Vec2,
}

/// Advance the scene by `dt` seconds (already clamped by the caller)
pub fn tick(state: &mut SceneState, input: &TickInput, dt: f32) {
    // Cards appended after this point join next tick
    let count = state.pool.len();

    state.time_ticks += 1;
    state.time += dt;

    if input.pan != Vec2::ZERO {
        stir(state, count, input.pan);
    }

    let ctx = ForceContext {
        params: &input.params,
        motion: &input.motion,
        sphere_center: state.config.sphere_center,
        turbulence_amplitude: state.config.turbulence_amplitude,
        time: state.time,
    };
    let boundary = state.boundary();
    let max_speed = state.config.max_speed;
    step(&mut state.pool, count, &ctx, &boundary, max_speed, dt);

    advance_cards(state, count, dt);
    advance_stage(state);
}

/// Pan swirls the ambient cards around the axis perpendicular to the drag
fn stir(state: &mut SceneState, count: usize, pan: Vec2) {
    // Horizontal drag spins about Y, vertical drag about X
    let omega = Vec3::new(pan.y, pan.x, 0.0) * PAN_STIR_GAIN;
    let center = state.config.sphere_center;
    let max_speed = state.config.max_speed;

    for p in state.pool.as_mut_slice()[..count].iter_mut() {
        if p.kind != ParticleKind::Ambient {
            continue;
        }
        p.velocity = clamp_speed(p.velocity + omega.cross(p.position - center), max_speed);
    }
}
