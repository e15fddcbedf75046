//! Live tunable physics coefficients
//!
//! Written from a tuning surface at any time, read once per tick. Each field is
//! an independent scalar, so a tick may observe a mix of old and new values.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Tunable physics knobs (all heuristics, deliberately unconstrained)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Parameters {
    /// Net vertical acceleration (already net of buoyancy; negative sinks)
    pub gravity: f32,
    /// Linear drag opposing velocity
    pub drag_coefficient: f32,
    /// Device acceleration/rotation -> world force scaling
    pub motion_sensitivity: f32,
    /// Upward velocity kick handed out by a shake
    pub shake_upward_force: f32,
    /// Extra downhill slide along the glass (0 = off)
    pub wall_slide_down_speed: f32,
    /// Neighbor distance inside which cards push apart
    pub separation_radius: f32,
    /// Push strength at zero distance
    pub separation_strength: f32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            gravity: -0.05,
            drag_coefficient: 0.6,
            motion_sensitivity: 1.0,
            shake_upward_force: 2.0,
            wall_slide_down_speed: 0.0,
            separation_radius: 0.35,
            separation_strength: 0.8,
        }
    }
}

impl Parameters {
    /// Parse a parameter preset; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parameters with every force switched off (useful for isolating one term)
    pub fn inert() -> Self {
        Self {
            gravity: 0.0,
            drag_coefficient: 0.0,
            motion_sensitivity: 0.0,
            shake_upward_force: 0.0,
            wall_slide_down_speed: 0.0,
            separation_radius: 0.0,
            separation_strength: 0.0,
        }
    }
}

/// Lock-free f32 cell
#[derive(Debug, Default)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Shared, externally writable parameter storage
///
/// Share as `Arc<ParameterStore>`; the simulation only ever calls
/// [`ParameterStore::snapshot`].
#[derive(Debug)]
pub struct ParameterStore {
    gravity: AtomicF32,
    drag_coefficient: AtomicF32,
    motion_sensitivity: AtomicF32,
    shake_upward_force: AtomicF32,
    wall_slide_down_speed: AtomicF32,
    separation_radius: AtomicF32,
    separation_strength: AtomicF32,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(Parameters::default())
    }
}

impl ParameterStore {
    pub fn new(params: Parameters) -> Self {
        Self {
            gravity: AtomicF32::new(params.gravity),
            drag_coefficient: AtomicF32::new(params.drag_coefficient),
            motion_sensitivity: AtomicF32::new(params.motion_sensitivity),
            shake_upward_force: AtomicF32::new(params.shake_upward_force),
            wall_slide_down_speed: AtomicF32::new(params.wall_slide_down_speed),
            separation_radius: AtomicF32::new(params.separation_radius),
            separation_strength: AtomicF32::new(params.separation_strength),
        }
    }

    /// Replace every coefficient (field by field, not atomically as a group)
    pub fn set(&self, params: &Parameters) {
        self.gravity.store(params.gravity);
        self.drag_coefficient.store(params.drag_coefficient);
        self.motion_sensitivity.store(params.motion_sensitivity);
        self.shake_upward_force.store(params.shake_upward_force);
        self.wall_slide_down_speed.store(params.wall_slide_down_speed);
        self.separation_radius.store(params.separation_radius);
        self.separation_strength.store(params.separation_strength);
    }

    /// Copy out the current values
    pub fn snapshot(&self) -> Parameters {
        Parameters {
            gravity: self.gravity.load(),
            drag_coefficient: self.drag_coefficient.load(),
            motion_sensitivity: self.motion_sensitivity.load(),
            shake_upward_force: self.shake_upward_force.load(),
            wall_slide_down_speed: self.wall_slide_down_speed.load(),
            separation_radius: self.separation_radius.load(),
            separation_strength: self.separation_strength.load(),
        }
    }

    pub fn set_gravity(&self, value: f32) {
        self.gravity.store(value);
    }

    pub fn set_drag_coefficient(&self, value: f32) {
        self.drag_coefficient.store(value);
    }

    pub fn set_motion_sensitivity(&self, value: f32) {
        self.motion_sensitivity.store(value);
    }

    pub fn set_shake_upward_force(&self, value: f32) {
        self.shake_upward_force.store(value);
    }

    pub fn set_wall_slide_down_speed(&self, value: f32) {
        self.wall_slide_down_speed.store(value);
    }

    pub fn set_separation_radius(&self, value: f32) {
        self.separation_radius.store(value);
    }

    pub fn set_separation_strength(&self, value: f32) {
        self.separation_strength.store(value);
    }
}
