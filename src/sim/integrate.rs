//! Semi-implicit Euler step for ambient cards

use glam::Vec3;

use super::boundary::SphereBoundary;
use super::forces::{ForceContext, net_force};
use super::state::{Particle, ParticlePool};
use crate::consts::ROTATION_RELAX_RATE;

/// Scale `velocity` down (keeping direction) so it never exceeds `max_speed`
#[inline]
pub fn clamp_speed(velocity: Vec3, max_speed: f32) -> Vec3 {
    let speed_sq = velocity.length_squared();
    if speed_sq > max_speed * max_speed && speed_sq > 0.0 {
        velocity * (max_speed / speed_sq.sqrt())
    } else {
        velocity
    }
}

/// Relax spin toward its base value; never overshoots for any `dt`
#[inline]
pub fn relax_spin(rotation_speed: Vec3, base: Vec3, dt: f32) -> Vec3 {
    let k = ROTATION_RELAX_RATE * dt;
    if k >= 1.0 {
        return base;
    }
    rotation_speed + (base - rotation_speed) * k
}

/// Advance one card by `dt` given its net acceleration
pub fn integrate_particle(particle: &mut Particle, force: Vec3, dt: f32, max_speed: f32) {
    particle.velocity = clamp_speed(particle.velocity + force * dt, max_speed);
    particle.position += particle.velocity * dt;

    particle.rotation_speed = relax_spin(particle.rotation_speed, particle.base_rotation_speed, dt);
    particle.rotation += particle.rotation_speed * dt;
}

/// One physics step over the first `count` cards of the pool
///
/// Forces for every card are evaluated against the same position snapshot
/// before anything moves, so update order does not matter. Cards that are not
/// ambient are left alone. Returns how many cards touched the glass.
pub fn step(
    pool: &mut ParticlePool,
    count: usize,
    ctx: &ForceContext<'_>,
    boundary: &SphereBoundary,
    max_speed: f32,
    dt: f32,
) -> usize {
    let count = count.min(pool.len());
    let snapshot = pool.position_snapshot(count);

    let forces: Vec<Option<Vec3>> = pool.as_slice()[..count]
        .iter()
        .enumerate()
        .map(|(i, p)| {
            p.kind
                .is_simulated()
                .then(|| net_force(p, i, &snapshot, ctx))
        })
        .collect();

    let mut contacts = 0;
    for (particle, force) in pool.as_mut_slice()[..count].iter_mut().zip(forces) {
        let Some(force) = force else { continue };
        integrate_particle(particle, force, dt, max_speed);
        if boundary.constrain(
            &mut particle.position,
            &mut particle.velocity,
            ctx.params.wall_slide_down_speed,
        ) {
            contacts += 1;
            // Wall slide may add speed back
            particle.velocity = clamp_speed(particle.velocity, max_speed);
        }
    }
    contacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use crate::params::Parameters;
    use crate::sim::motion::MotionSample;
    use crate::sim::state::{ImageHandle, ParticleKind};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn card_at(pool: &mut ParticlePool, pos: Vec3) {
        let config = SceneConfig::default();
        let mut rng = Pcg32::seed_from_u64(pool.len() as u64);
        let p = Particle::spawn_at(pool.next_id(), ImageHandle(0), pos, &mut rng, &config);
        pool.push(p);
    }

    fn ctx<'a>(params: &'a Parameters, motion: &'a MotionSample) -> ForceContext<'a> {
        ForceContext {
            params,
            motion,
            sphere_center: Vec3::ZERO,
            turbulence_amplitude: 0.0,
            time: 0.0,
        }
    }

    #[test]
    fn test_clamp_speed_preserves_direction() {
        let v = clamp_speed(Vec3::new(30.0, 40.0, 0.0), 5.0);
        assert!((v.length() - 5.0).abs() < 1e-5);
        assert!((v.normalize() - Vec3::new(0.6, 0.8, 0.0)).length() < 1e-5);
        assert_eq!(clamp_speed(Vec3::new(1.0, 0.0, 0.0), 5.0), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_relax_spin_never_overshoots() {
        let base = Vec3::new(0.1, 0.0, 0.0);
        let fast = Vec3::new(5.0, 0.0, 0.0);
        // Huge dt lands exactly on the base value
        assert_eq!(relax_spin(fast, base, 10.0), base);
        let small = relax_spin(fast, base, 0.1);
        assert!(small.x < fast.x && small.x > base.x);
    }

    #[test]
    fn test_step_skips_excluded_cards() {
        let mut pool = ParticlePool::new();
        card_at(&mut pool, Vec3::ZERO);
        card_at(&mut pool, Vec3::new(0.1, 0.0, 0.0));
        pool.get_mut(1).unwrap().kind = ParticleKind::Memory;

        let params = Parameters {
            gravity: -1.0,
            ..Parameters::inert()
        };
        let motion = MotionSample::ZERO;
        let boundary = SphereBoundary::new(Vec3::ZERO, 2.0, 0.6);
        step(&mut pool, 2, &ctx(&params, &motion), &boundary, 5.0, 0.1);

        assert!(pool.get(0).unwrap().velocity.y < 0.0);
        assert_eq!(pool.get(1).unwrap().velocity, Vec3::ZERO);
        assert_eq!(pool.get(1).unwrap().position, Vec3::new(0.1, 0.0, 0.0));
    }

    #[test]
    fn test_excluded_card_does_not_repel() {
        let mut pool = ParticlePool::new();
        card_at(&mut pool, Vec3::ZERO);
        card_at(&mut pool, Vec3::new(0.1, 0.0, 0.0));
        pool.get_mut(1).unwrap().kind = ParticleKind::FlyingOut;

        let params = Parameters {
            separation_radius: 1.0,
            separation_strength: 5.0,
            ..Parameters::inert()
        };
        let motion = MotionSample::ZERO;
        let boundary = SphereBoundary::new(Vec3::ZERO, 2.0, 0.6);
        step(&mut pool, 2, &ctx(&params, &motion), &boundary, 5.0, 0.1);
        assert_eq!(pool.get(0).unwrap().velocity, Vec3::ZERO);
    }

    #[test]
    fn test_step_only_touches_counted_range() {
        let mut pool = ParticlePool::new();
        card_at(&mut pool, Vec3::ZERO);
        card_at(&mut pool, Vec3::ZERO + Vec3::X);

        let params = Parameters {
            gravity: -1.0,
            ..Parameters::inert()
        };
        let motion = MotionSample::ZERO;
        let boundary = SphereBoundary::new(Vec3::ZERO, 2.0, 0.6);
        step(&mut pool, 1, &ctx(&params, &motion), &boundary, 5.0, 0.1);
        assert!(pool.get(0).unwrap().velocity.y < 0.0);
        assert_eq!(pool.get(1).unwrap().velocity, Vec3::ZERO);
    }

    #[test]
    fn test_separation_increases_distance() {
        let mut pool = ParticlePool::new();
        card_at(&mut pool, Vec3::new(-0.1, 0.0, 0.0));
        card_at(&mut pool, Vec3::new(0.1, 0.0, 0.0));

        let params = Parameters {
            separation_radius: 0.5,
            separation_strength: 1.0,
            ..Parameters::inert()
        };
        let motion = MotionSample::ZERO;
        let boundary = SphereBoundary::new(Vec3::ZERO, 2.0, 0.6);
        let before = pool.get(0).unwrap().position.distance(pool.get(1).unwrap().position);
        step(&mut pool, 2, &ctx(&params, &motion), &boundary, 5.0, 1.0 / 60.0);
        let after = pool.get(0).unwrap().position.distance(pool.get(1).unwrap().position);
        assert!(after > before);
    }

    proptest! {
        #[test]
        fn prop_step_bounds_speed_and_position(
            gravity in -1000.0f32..1000.0,
            drag in -50.0f32..50.0,
            sensitivity in -100.0f32..100.0,
            ax in -50.0f32..50.0, ay in -50.0f32..50.0, az in -50.0f32..50.0,
            rx in -20.0f32..20.0,
            strength in 0.0f32..500.0,
            dt in 0.0f32..(1.0 / 30.0),
        ) {
            let mut pool = ParticlePool::new();
            for i in 0..6 {
                card_at(&mut pool, Vec3::new(i as f32 * 0.05, 0.0, 0.0));
            }
            let params = Parameters {
                gravity,
                drag_coefficient: drag,
                motion_sensitivity: sensitivity,
                separation_radius: 0.4,
                separation_strength: strength,
                ..Parameters::default()
            };
            let motion = MotionSample::new(Vec3::new(ax, ay, az), Vec3::new(rx, 0.0, 0.0));
            let boundary = SphereBoundary::new(Vec3::ZERO, 2.0, 0.6);
            let max_speed = 5.0;
            for _ in 0..20 {
                step(&mut pool, 6, &ctx(&params, &motion), &boundary, max_speed, dt);
                for p in pool.iter() {
                    prop_assert!(p.velocity.length() <= max_speed + 1e-3);
                    prop_assert!(p.position.length() <= 2.0 + 1e-4);
                }
            }
        }
    }
}
