//! Timed, eased animation records
//!
//! A scripted move is a plain value advanced by the tick. Replacing it is all
//! it takes to cancel one.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Easing curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Easing {
    Linear,
    EaseIn,
    #[default]
    EaseOut,
    EaseInOut,
}

impl Easing {
    /// Map linear progress `t` in [0, 1] onto the curve
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// Position, Euler rotation and uniform scale of a card
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: f32,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Vec3, scale: f32) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn lerp(&self, other: &Pose, t: f32) -> Pose {
        Pose {
            position: self.position.lerp(other.position, t),
            rotation: self.rotation.lerp(other.rotation, t),
            scale: self.scale + (other.scale - self.scale) * t,
        }
    }
}

/// A move from one pose to another over a fixed time window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tween {
    pub start_time: f32,
    pub duration: f32,
    pub from: Pose,
    pub to: Pose,
    pub easing: Easing,
}

impl Tween {
    pub fn new(start_time: f32, duration: f32, from: Pose, to: Pose, easing: Easing) -> Self {
        Self {
            start_time,
            duration,
            from,
            to,
            easing,
        }
    }

    /// Linear progress at `time`, clamped to [0, 1]
    pub fn progress(&self, time: f32) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((time - self.start_time) / self.duration).clamp(0.0, 1.0)
    }

    pub fn sample(&self, time: f32) -> Pose {
        self.from.lerp(&self.to, self.easing.apply(self.progress(time)))
    }

    pub fn is_finished(&self, time: f32) -> bool {
        time >= self.start_time + self.duration
    }
}

/// Scalar fade (opacity) over a time window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fade {
    pub start_time: f32,
    pub duration: f32,
    pub from: f32,
    pub to: f32,
}

impl Fade {
    pub fn new(start_time: f32, duration: f32, from: f32, to: f32) -> Self {
        Self {
            start_time,
            duration,
            from,
            to,
        }
    }

    pub fn sample(&self, time: f32) -> f32 {
        let t = if self.duration <= 0.0 {
            1.0
        } else {
            ((time - self.start_time) / self.duration).clamp(0.0, 1.0)
        };
        self.from + (self.to - self.from) * Easing::EaseInOut.apply(t)
    }

    pub fn is_finished(&self, time: f32) -> bool {
        time >= self.start_time + self.duration
    }
}
