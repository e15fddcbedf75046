//! Construction-time scene settings
//!
//! Unlike [`crate::Parameters`] these are fixed for the lifetime of a scene.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Duration of each scripted stage, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Shake stage 1: large scatter
    pub shake_scatter: f32,
    /// Shake stage 2: medium drift
    pub shake_drift: f32,
    /// Shake stage 3: settle
    pub shake_settle: f32,
    /// Fly-out card travelling toward the viewer
    pub fly_out: f32,
    /// Fly-out card held in front of the viewer before it is reset
    pub fly_out_hold: f32,
    /// Memory card travelling into place
    pub memory_reveal: f32,
    /// Memory card shrinking and fading away
    pub memory_dismiss: f32,
    /// Ambient cards dimming / undimming
    pub dim: f32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            shake_scatter: 0.5,
            shake_drift: 0.7,
            shake_settle: 0.9,
            fly_out: 0.8,
            fly_out_hold: 1.2,
            memory_reveal: 1.0,
            memory_dismiss: 0.5,
            dim: 0.4,
        }
    }
}

/// Scene settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// RNG seed (spawn positions, turbulence seeds, shake targets)
    pub seed: u64,
    pub sphere_center: Vec3,
    pub sphere_radius: f32,
    /// Hard cap on card speed
    pub max_speed: f32,
    /// Magnitude of the per-axis turbulence drift
    pub turbulence_amplitude: f32,
    /// Tangential velocity kept after touching the glass (0..1)
    pub wall_retention: f32,
    /// Scale of an ambient card
    pub card_scale: f32,
    /// Where the fly-out card stops, at the front of the glass facing the viewer
    pub fly_out_anchor: Vec3,
    pub fly_out_scale: f32,
    /// Where the memory card is displayed
    pub memory_anchor: Vec3,
    pub memory_scale: f32,
    pub timings: Timings,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_C0DE,
            sphere_center: Vec3::ZERO,
            sphere_radius: 2.0,
            max_speed: 5.0,
            turbulence_amplitude: 0.02,
            wall_retention: 0.6,
            card_scale: 0.25,
            fly_out_anchor: Vec3::new(0.0, 0.0, 1.5),
            fly_out_scale: 3.0,
            memory_anchor: Vec3::new(0.0, 0.0, 3.5),
            memory_scale: 4.0,
            timings: Timings::default(),
        }
    }
}

impl SceneConfig {
    /// Parse settings; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Same settings with a different seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = SceneConfig::default();
        assert!(config.sphere_radius > 0.0);
        assert!(config.wall_retention > 0.0 && config.wall_retention < 1.0);
        // Memory card sits outside the glass, the fly-out card stays inside it
        assert!(config.memory_anchor.z > config.sphere_radius);
        assert!((config.fly_out_anchor - config.sphere_center).length() <= config.sphere_radius);
    }

    #[test]
    fn test_json_overrides() {
        let config = SceneConfig::from_json(r#"{ "sphere_radius": 5.0, "timings": { "dim": 1.0 } }"#)
            .unwrap();
        assert_eq!(config.sphere_radius, 5.0);
        assert_eq!(config.timings.dim, 1.0);
        assert_eq!(config.timings.fly_out, Timings::default().fly_out);
        assert_eq!(config.max_speed, SceneConfig::default().max_speed);
    }
}
