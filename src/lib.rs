//! Photo Globe - floating photo cards inside a glass sphere
//!
//! Core modules:
//! - `sim`: Deterministic simulation (forces, integration, containment, scripted phases)
//! - `scene`: In-process API driven by the host once per display refresh
//! - `params`: Live tunable physics coefficients
//! - `config`: Construction-time scene settings
//! - `bridge`: Hand-off of per-card transforms to the renderer

pub mod bridge;
pub mod config;
pub mod params;
pub mod scene;
pub mod sim;

pub use bridge::{InstanceBuffer, InstanceRaw, RenderBridge};
pub use config::SceneConfig;
pub use params::{ParameterStore, Parameters};
pub use scene::Scene;
pub use sim::{FlyOutSignal, ScenePhase, SceneEvent};

use glam::{EulerRot, Quat, Vec3};
use rand::Rng;

/// Simulation constants
pub mod consts {
    /// Largest timestep a single tick may integrate (frame hitch guard)
    pub const MAX_DT: f32 = 1.0 / 30.0;

    /// Neighbors closer than this are skipped by separation (no direction)
    pub const SEPARATION_EPSILON: f32 = 1e-4;
    /// Device rotation -> tangential swirl scaling (on top of motion sensitivity)
    pub const SWIRL_FACTOR: f32 = 0.2;
    /// Rate at which spin relaxes toward its base value (per second)
    pub const ROTATION_RELAX_RATE: f32 = 2.0;

    /// Base spin of an ambient card, per axis (radians/s)
    pub const BASE_SPIN_MAX: f32 = 0.25;
    /// Extra spin handed out by each shake stage, per axis (radians/s)
    pub const SHAKE_SPIN_MAX: f32 = 3.0;
    /// Horizontal shake kick, as a fraction of the upward force
    pub const SHAKE_LATERAL_FRACTION: f32 = 0.5;
    /// Upward shake impulse range, as a fraction of the upward force
    pub const SHAKE_UPWARD_MIN: f32 = 0.9;
    pub const SHAKE_UPWARD_MAX: f32 = 1.2;

    /// Opacity of ambient cards while something else holds the stage
    pub const DIM_OPACITY: f32 = 0.3;
    /// Pan delta (points) -> tangential velocity gain
    pub const PAN_STIR_GAIN: f32 = 0.004;
}

/// Uniform random point inside a sphere of `radius` around `center`
pub fn random_point_in_sphere<R: Rng>(rng: &mut R, center: Vec3, radius: f32) -> Vec3 {
    // Rejection sampling keeps the distribution uniform
    loop {
        let p = Vec3::new(
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
        );
        if p.length_squared() <= 1.0 {
            return center + p * radius;
        }
    }
}

/// Random vector with every component in `[-max, max]`
pub fn random_symmetric<R: Rng>(rng: &mut R, max: f32) -> Vec3 {
    if max <= 0.0 {
        return Vec3::ZERO;
    }
    Vec3::new(
        rng.random_range(-max..=max),
        rng.random_range(-max..=max),
        rng.random_range(-max..=max),
    )
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Wrap every Euler angle to [-π, π) so tweens take the short way round
#[inline]
pub fn wrap_euler(euler: Vec3) -> Vec3 {
    Vec3::new(
        normalize_angle(euler.x),
        normalize_angle(euler.y),
        normalize_angle(euler.z),
    )
}

/// Convert XYZ Euler angles (radians) to a quaternion
#[inline]
pub fn euler_to_quat(euler: Vec3) -> Quat {
    Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z)
}
