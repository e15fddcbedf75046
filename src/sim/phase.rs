//! Scripted scene phases
//!
//! Shake, fly-out and the memory reveal/dismiss flow. Each in-progress script
//! is a plain record advanced once per tick; starting a new one overwrites
//! whatever it replaces.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use glam::Vec3;
use rand::Rng;

use super::anim::{Easing, Fade, Pose, Tween};
use super::integrate::clamp_speed;
use super::state::{
    ImageHandle, MEMORY_ID, Particle, ParticleKind, SceneState, ShakeScript, ShakeStage,
};
use crate::consts::{
    DIM_OPACITY, SHAKE_LATERAL_FRACTION, SHAKE_SPIN_MAX, SHAKE_UPWARD_MAX, SHAKE_UPWARD_MIN,
};
use crate::params::Parameters;
use crate::{random_point_in_sphere, random_symmetric, wrap_euler};

/// Externally visible phase of the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenePhase {
    /// Everything under ordinary physics
    Ambient,
    /// At least one card still running its shake script
    Shaking,
    /// One card out in front of the viewer
    FlyingOut,
    /// Memory card travelling into place
    Revealing,
    /// Memory card on display
    MemoryShown,
    /// Memory card shrinking away
    Dismissing,
}

/// Notifications for the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    ShakeStarted,
    FlyOutStarted { index: u32 },
    FlyOutCompleted { index: u32 },
    MemoryRevealed { image: ImageHandle },
    MemoryDismissed { image: ImageHandle },
}

/// Completion flag for a fly-out; cheap to clone and poll from anywhere
#[derive(Debug, Clone, Default)]
pub struct FlyOutSignal(Arc<AtomicBool>);

impl FlyOutSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the card has rejoined the ambient flow
    pub fn is_complete(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn complete(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Fly-out sub-steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlyOutStep {
    Outbound,
    /// Parked in front of the viewer until the given scene time
    Hold { until: f32 },
}

/// Scene-wide script in progress
#[derive(Debug, Clone, Default)]
pub enum Stage {
    #[default]
    Idle,
    FlyingOut {
        index: usize,
        step: FlyOutStep,
        tween: Tween,
        signal: FlyOutSignal,
    },
    Revealing {
        tween: Tween,
        /// Dismissal requested before the card arrived
        dismiss_requested: bool,
    },
    MemoryShown,
    Dismissing {
        tween: Tween,
        fade: Fade,
    },
}

/// Current phase derived from the stage and per-card scripts
pub fn phase(state: &SceneState) -> ScenePhase {
    match state.stage {
        Stage::Idle => {
            if state.pool.iter().any(|p| p.script.is_some()) {
                ScenePhase::Shaking
            } else {
                ScenePhase::Ambient
            }
        }
        Stage::FlyingOut { .. } => ScenePhase::FlyingOut,
        Stage::Revealing { .. } => ScenePhase::Revealing,
        Stage::MemoryShown => ScenePhase::MemoryShown,
        Stage::Dismissing { .. } => ScenePhase::Dismissing,
    }
}

/// Fade every ambient card toward `target` opacity
fn fade_ambient(state: &mut SceneState, target: f32) {
    let now = state.time;
    let duration = state.config.timings.dim;
    for p in state.pool.iter_mut() {
        if p.kind == ParticleKind::Ambient {
            p.fade = Some(Fade::new(now, duration, p.opacity, target));
        }
    }
    state.dimmed = target < 1.0;
}

/// Start the next leg of a card's shake from where it is now
fn shake_leg<R: Rng>(
    particle: &mut Particle,
    stage: ShakeStage,
    now: f32,
    duration: f32,
    center: Vec3,
    radius: f32,
    rng: &mut R,
) {
    let target = random_point_in_sphere(rng, center, radius * stage.reach());
    let from = particle.pose();
    let to = Pose::new(target, from.rotation, from.scale);
    particle.rotation_speed += random_symmetric(rng, SHAKE_SPIN_MAX * stage.reach());
    particle.script = Some(ShakeScript {
        stage,
        tween: Tween::new(now, duration, from, to, Easing::EaseOut),
    });
}

/// Abort a running fly-out: the card resets and rejoins ambient physics
fn cancel_fly_out(state: &mut SceneState) {
    let Stage::FlyingOut { index, signal, .. } = &state.stage else {
        return;
    };
    let (index, signal) = (*index, signal.clone());
    finish_fly_out(state, index, &signal);
    log::debug!("Fly-out of card {} cancelled", index);
}

fn finish_fly_out(state: &mut SceneState, index: usize, signal: &FlyOutSignal) {
    if let Some(p) = state.pool.get_mut(index) {
        p.reset(&mut state.rng, &state.config);
    }
    state.stage = Stage::Idle;
    fade_ambient(state, 1.0);
    signal.complete();
    state.events.push(SceneEvent::FlyOutCompleted {
        index: index as u32,
    });
}

/// Shake every ambient card: upward kick, spin, and a three-leg scripted scatter
pub fn start_shake(state: &mut SceneState, params: &Parameters) {
    cancel_fly_out(state);

    let now = state.time;
    let duration = state.config.timings.shake_scatter;
    let center = state.config.sphere_center;
    let radius = state.config.sphere_radius;
    let up = params.shake_upward_force;

    let mut shaken = 0;
    for p in state.pool.iter_mut() {
        if p.kind != ParticleKind::Ambient {
            continue;
        }
        let rng = &mut state.rng;
        p.velocity.y += up * rng.random_range(SHAKE_UPWARD_MIN..=SHAKE_UPWARD_MAX);
        let lateral = up.abs() * SHAKE_LATERAL_FRACTION;
        p.velocity.x += random_symmetric(rng, lateral).x;
        p.velocity.z += random_symmetric(rng, lateral).z;
        shake_leg(p, ShakeStage::Scatter, now, duration, center, radius, rng);
        shaken += 1;
    }

    state.events.push(SceneEvent::ShakeStarted);
    log::info!("Shake: {} cards scattered", shaken);
}

/// Send one random ambient card toward the viewer
///
/// Returns `None` if a fly-out or memory is already on stage, or there is no
/// ambient card to pick.
pub fn begin_fly_out(state: &mut SceneState) -> Option<FlyOutSignal> {
    if !matches!(state.stage, Stage::Idle) || state.memory.is_some() {
        return None;
    }
    let candidates = state.pool.ambient_indices();
    if candidates.is_empty() {
        return None;
    }
    let index = candidates[state.rng.random_range(0..candidates.len())];

    let now = state.time;
    let config = &state.config;
    let target = Pose::new(config.fly_out_anchor, Vec3::ZERO, config.fly_out_scale);
    let duration = config.timings.fly_out;

    let p = state.pool.get_mut(index)?;
    p.kind = ParticleKind::FlyingOut;
    p.script = None;
    p.velocity = Vec3::ZERO;
    p.rotation = wrap_euler(p.rotation);
    p.fade = None;
    p.opacity = 1.0;
    let tween = Tween::new(now, duration, p.pose(), target, Easing::EaseInOut);

    fade_ambient(state, DIM_OPACITY);

    let signal = FlyOutSignal::new();
    state.stage = Stage::FlyingOut {
        index,
        step: FlyOutStep::Outbound,
        tween,
        signal: signal.clone(),
    };
    state.events.push(SceneEvent::FlyOutStarted {
        index: index as u32,
    });
    log::info!("Fly-out: card {}", index);
    Some(signal)
}

/// Create the memory card and bring it in front of the viewer
///
/// No-op (returns false) while a memory card already exists. A fly-out in
/// progress is cut short first.
pub fn show_memory(state: &mut SceneState, image: ImageHandle) -> bool {
    if state.memory.is_some() {
        return false;
    }
    cancel_fly_out(state);

    let mut card = Particle::spawn(MEMORY_ID, image, &mut state.rng, &state.config);
    card.kind = ParticleKind::Memory;
    card.rotation = wrap_euler(card.rotation);

    let config = &state.config;
    let target = Pose::new(config.memory_anchor, Vec3::ZERO, config.memory_scale);
    let tween = Tween::new(
        state.time,
        config.timings.memory_reveal,
        card.pose(),
        target,
        Easing::EaseInOut,
    );

    state.memory = Some(card);
    state.stage = Stage::Revealing {
        tween,
        dismiss_requested: false,
    };
    fade_ambient(state, DIM_OPACITY);
    log::info!("Memory reveal started ({:?})", image);
    true
}

/// Start taking the memory card away
///
/// No-op (returns false) without a memory card. While the card is still
/// arriving the request is latched and honoured once it lands.
pub fn dismiss_memory(state: &mut SceneState) -> bool {
    match state.stage {
        Stage::MemoryShown => {
            begin_dismiss(state);
            true
        }
        Stage::Revealing {
            ref mut dismiss_requested,
            ..
        } => {
            *dismiss_requested = true;
            true
        }
        _ => false,
    }
}

fn begin_dismiss(state: &mut SceneState) {
    let Some(card) = state.memory.as_ref() else {
        state.stage = Stage::Idle;
        return;
    };
    let from = card.pose();
    let to = Pose::new(from.position, from.rotation, 0.0);
    let now = state.time;
    let duration = state.config.timings.memory_dismiss;

    state.stage = Stage::Dismissing {
        tween: Tween::new(now, duration, from, to, Easing::EaseIn),
        fade: Fade::new(now, duration, card.opacity, 0.0),
    };
    fade_ambient(state, 1.0);
    log::info!("Memory dismiss started");
}

/// Advance per-card shake scripts and fades
///
/// Runs after physics: a scripted card's position is replaced by its tween and
/// its velocity by the tween's rate over the last `dt`. Legs ease out, so the
/// card is at rest when the last one ends.
pub fn advance_cards(state: &mut SceneState, count: usize, dt: f32) {
    let now = state.time;
    let timings = state.config.timings;
    let center = state.config.sphere_center;
    let radius = state.config.sphere_radius;
    let max_speed = state.config.max_speed;
    let count = count.min(state.pool.len());

    for p in state.pool.as_mut_slice()[..count].iter_mut() {
        if let Some(fade) = p.fade {
            p.opacity = fade.sample(now);
            if fade.is_finished(now) {
                p.fade = None;
            }
        }

        if p.kind != ParticleKind::Ambient {
            continue;
        }
        let Some(script) = p.script else { continue };

        p.position = script.tween.sample(now).position;
        if dt > 0.0 {
            let previous = script.tween.sample(now - dt).position;
            p.velocity = clamp_speed((p.position - previous) / dt, max_speed);
        }

        if script.tween.is_finished(now) {
            match script.stage.next() {
                Some(stage) => {
                    let duration = match stage {
                        ShakeStage::Scatter => timings.shake_scatter,
                        ShakeStage::Drift => timings.shake_drift,
                        ShakeStage::Settle => timings.shake_settle,
                    };
                    shake_leg(p, stage, now, duration, center, radius, &mut state.rng);
                }
                None => {
                    p.script = None;
                    p.velocity = Vec3::ZERO;
                    log::debug!("Card {} settled after shake", p.id);
                }
            }
        }
    }
}

/// Advance the scene-wide script (fly-out, reveal, dismiss)
pub fn advance_stage(state: &mut SceneState) {
    let now = state.time;

    match std::mem::take(&mut state.stage) {
        Stage::Idle => {}
        Stage::FlyingOut {
            index,
            step,
            tween,
            signal,
        } => {
            if let Some(p) = state.pool.get_mut(index) {
                p.set_pose(&tween.sample(now));
            }
            let step = match step {
                FlyOutStep::Outbound if tween.is_finished(now) => {
                    let hold = state.config.timings.fly_out_hold;
                    FlyOutStep::Hold { until: now + hold }
                }
                other => other,
            };
            match step {
                FlyOutStep::Hold { until } if now >= until => {
                    finish_fly_out(state, index, &signal);
                    log::info!("Fly-out of card {} complete", index);
                }
                _ => {
                    state.stage = Stage::FlyingOut {
                        index,
                        step,
                        tween,
                        signal,
                    };
                }
            }
        }
        Stage::Revealing {
            tween,
            dismiss_requested,
        } => {
            if let Some(card) = state.memory.as_mut() {
                card.set_pose(&tween.sample(now));
            }
            if tween.is_finished(now) {
                state.stage = Stage::MemoryShown;
                if let Some(card) = state.memory.as_ref() {
                    state.events.push(SceneEvent::MemoryRevealed { image: card.image });
                }
                log::info!("Memory shown");
                if dismiss_requested {
                    begin_dismiss(state);
                }
            } else {
                state.stage = Stage::Revealing {
                    tween,
                    dismiss_requested,
                };
            }
        }
        Stage::MemoryShown => state.stage = Stage::MemoryShown,
        Stage::Dismissing { tween, fade } => {
            if let Some(card) = state.memory.as_mut() {
                card.set_pose(&tween.sample(now));
                card.opacity = fade.sample(now);
            }
            if tween.is_finished(now) && fade.is_finished(now) {
                if let Some(card) = state.memory.take() {
                    state.events.push(SceneEvent::MemoryDismissed { image: card.image });
                }
                log::info!("Memory dismissed");
            } else {
                state.stage = Stage::Dismissing { tween, fade };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;

    fn state_with(n: u64) -> SceneState {
        let mut state = SceneState::new(SceneConfig::default().with_seed(21));
        for i in 0..n {
            state.spawn_particle(ImageHandle(i));
        }
        state
    }

    fn run_for(state: &mut SceneState, seconds: f32) {
        let dt = 1.0 / 60.0;
        let steps = (seconds / dt).ceil() as usize;
        for _ in 0..steps {
            state.time += dt;
            let count = state.pool.len();
            advance_cards(state, count, dt);
            advance_stage(state);
        }
    }

    #[test]
    fn test_shake_kicks_upward_within_range() {
        let mut state = state_with(10);
        let params = Parameters::default();
        start_shake(&mut state, &params);
        for p in state.pool.iter() {
            let ratio = p.velocity.y / params.shake_upward_force;
            assert!((0.85..=1.25).contains(&ratio), "ratio {}", ratio);
            assert!(p.script.is_some());
        }
        assert_eq!(phase(&state), ScenePhase::Shaking);
        assert_eq!(state.events, vec![SceneEvent::ShakeStarted]);
    }

    #[test]
    fn test_shake_runs_three_legs_then_returns_to_ambient() {
        let mut state = state_with(3);
        start_shake(&mut state, &Parameters::default());
        let t = state.config.timings;

        run_for(&mut state, t.shake_scatter + 0.05);
        assert!(state.pool.iter().all(|p| p.script.map(|s| s.stage) == Some(ShakeStage::Drift)));

        run_for(&mut state, t.shake_drift + t.shake_settle + 0.1);
        assert_eq!(phase(&state), ScenePhase::Ambient);
        for p in state.pool.iter() {
            assert!(p.position.length() <= state.config.sphere_radius);
        }
    }

    #[test]
    fn test_reshake_restarts_scripts() {
        let mut state = state_with(2);
        start_shake(&mut state, &Parameters::default());
        let d = state.config.timings.shake_scatter + 0.05;
        run_for(&mut state, d);
        start_shake(&mut state, &Parameters::default());
        assert!(state.pool.iter().all(|p| p.script.map(|s| s.stage) == Some(ShakeStage::Scatter)));
    }

    #[test]
    fn test_fly_out_guarded() {
        let mut state = state_with(2);
        let first = begin_fly_out(&mut state);
        assert!(first.is_some());
        assert!(begin_fly_out(&mut state).is_none());
        assert_eq!(phase(&state), ScenePhase::FlyingOut);

        let mut empty = state_with(0);
        assert!(begin_fly_out(&mut empty).is_none());
    }

    #[test]
    fn test_fly_out_dims_others_then_restores() {
        let mut state = state_with(3);
        let signal = begin_fly_out(&mut state).unwrap();
        let Stage::FlyingOut { index, .. } = state.stage else {
            panic!("expected fly-out stage");
        };
        let d = state.config.timings.fly_out;
        run_for(&mut state, d);
        for (i, p) in state.pool.iter().enumerate() {
            if i == index {
                assert_eq!(p.opacity, 1.0);
                assert_eq!(p.kind, ParticleKind::FlyingOut);
            } else {
                assert!((p.opacity - DIM_OPACITY).abs() < 1e-5);
            }
        }
        let t = state.config.timings;
        run_for(&mut state, t.fly_out_hold + t.dim + 0.1);
        assert!(signal.is_complete());
        assert!(state.pool.iter().all(|p| (p.opacity - 1.0).abs() < 1e-5));
        assert_eq!(state.pool.get(index).unwrap().kind, ParticleKind::Ambient);
    }

    #[test]
    fn test_shake_cancels_fly_out() {
        let mut state = state_with(4);
        let signal = begin_fly_out(&mut state).unwrap();
        run_for(&mut state, 0.2);
        start_shake(&mut state, &Parameters::default());
        assert!(signal.is_complete());
        assert!(matches!(state.stage, Stage::Idle));
        assert!(state.pool.iter().all(|p| p.kind == ParticleKind::Ambient && p.script.is_some()));
    }

    #[test]
    fn test_memory_single_instance() {
        let mut state = state_with(2);
        assert!(show_memory(&mut state, ImageHandle(100)));
        assert!(!show_memory(&mut state, ImageHandle(101)));
        assert_eq!(state.memory.as_ref().map(|m| m.image), Some(ImageHandle(100)));
        assert!(begin_fly_out(&mut state).is_none());
    }

    #[test]
    fn test_memory_full_cycle() {
        let mut state = state_with(2);
        show_memory(&mut state, ImageHandle(7));
        assert_eq!(phase(&state), ScenePhase::Revealing);
        let d = state.config.timings.memory_reveal + 0.05;
        run_for(&mut state, d);
        assert_eq!(phase(&state), ScenePhase::MemoryShown);
        let card = state.memory.as_ref().unwrap();
        assert!((card.position - state.config.memory_anchor).length() < 1e-4);
        assert!((card.scale - state.config.memory_scale).abs() < 1e-4);

        assert!(dismiss_memory(&mut state));
        assert_eq!(phase(&state), ScenePhase::Dismissing);
        let d = state.config.timings.memory_dismiss + 0.05;
        run_for(&mut state, d);
        assert!(state.memory.is_none());
        assert_eq!(phase(&state), ScenePhase::Ambient);
        assert!(state.events.contains(&SceneEvent::MemoryRevealed { image: ImageHandle(7) }));
        assert!(state.events.contains(&SceneEvent::MemoryDismissed { image: ImageHandle(7) }));
    }

    #[test]
    fn test_dismiss_without_memory_is_noop() {
        let mut state = state_with(1);
        assert!(!dismiss_memory(&mut state));
        assert!(matches!(state.stage, Stage::Idle));
        assert!(state.events.is_empty());
    }

    #[test]
    fn test_dismiss_during_reveal_is_latched() {
        let mut state = state_with(1);
        show_memory(&mut state, ImageHandle(3));
        run_for(&mut state, 0.1);
        assert!(dismiss_memory(&mut state));
        assert_eq!(phase(&state), ScenePhase::Revealing);
        let d = state.config.timings.memory_reveal;
        run_for(&mut state, d);
        assert_eq!(phase(&state), ScenePhase::Dismissing);
    }

    #[test]
    fn test_memory_cancels_fly_out() {
        let mut state = state_with(2);
        let signal = begin_fly_out(&mut state).unwrap();
        assert!(show_memory(&mut state, ImageHandle(9)));
        assert!(signal.is_complete());
        assert_eq!(
            state.pool.iter().filter(|p| p.kind != ParticleKind::Ambient).count(),
            0
        );
    }
}
