//! Deterministic simulation module
//!
//! All card physics and scripted animation live here. This module must be
//! pure and deterministic:
//! - Caller-supplied timestep only
//! - Seeded RNG only
//! - Stable iteration order (by pool index)
//! - No rendering or platform dependencies

pub mod anim;
pub mod boundary;
pub mod forces;
pub mod integrate;
pub mod motion;
pub mod phase;
pub mod state;
pub mod tick;

pub use anim::{Easing, Fade, Pose, Tween};
pub use boundary::{SphereBoundary, WallContact};
pub use forces::{ForceContext, net_force};
pub use motion::{MotionSample, MotionSensor, MotionSource, SamplerHandle, ShakeDetector};
pub use phase::{FlyOutSignal, SceneEvent, ScenePhase, Stage};
pub use state::{
    ImageHandle, MEMORY_ID, Particle, ParticleKind, ParticlePool, ParticleTransform, SceneState,
};
pub use tick::{TickInput, tick};
