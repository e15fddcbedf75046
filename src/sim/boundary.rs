//! Spherical containment
//!
//! Cards that end a step outside the glass are put back on the surface, lose
//! the outward part of their velocity and some of the rest.

use glam::Vec3;

/// Result of a containment check
#[derive(Debug, Clone)]
pub struct WallContact {
    /// Whether the point left the sphere
    pub hit: bool,
    /// Closest point on the sphere surface
    pub point: Vec3,
    /// Outward surface normal at `point`
    pub normal: Vec3,
    /// Distance past the surface
    pub penetration: f32,
}

impl WallContact {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec3::ZERO,
            normal: Vec3::ZERO,
            penetration: 0.0,
        }
    }
}

/// The glass sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereBoundary {
    pub center: Vec3,
    pub radius: f32,
    /// Fraction of tangential velocity kept after contact (<1)
    pub retention: f32,
}

impl SphereBoundary {
    pub fn new(center: Vec3, radius: f32, retention: f32) -> Self {
        Self {
            center,
            radius,
            retention,
        }
    }

    /// Check whether `position` lies outside the sphere
    pub fn contact(&self, position: Vec3) -> WallContact {
        let relative = position - self.center;
        let dist = relative.length();
        if dist <= self.radius {
            return WallContact::miss();
        }

        let normal = relative / dist;
        WallContact {
            hit: true,
            point: self.center + normal * self.radius,
            normal,
            penetration: dist - self.radius,
        }
    }

    /// Enforce containment on one card; returns true if it touched the glass
    ///
    /// `wall_slide` adds a downhill tangential pull along the glass when positive.
    pub fn constrain(&self, position: &mut Vec3, velocity: &mut Vec3, wall_slide: f32) -> bool {
        let contact = self.contact(*position);
        if !contact.hit {
            return false;
        }

        *position = contact.point;

        let normal_speed = velocity.dot(contact.normal);
        let tangential = if normal_speed > 0.0 {
            *velocity - contact.normal * normal_speed
        } else {
            *velocity
        };
        *velocity = tangential * self.retention;

        if wall_slide > 0.0 {
            *velocity += downhill(contact.normal) * wall_slide;
        }
        true
    }
}

/// Unit-ish direction of steepest descent along the surface with `normal`
#[inline]
pub fn downhill(normal: Vec3) -> Vec3 {
    let down = Vec3::NEG_Y;
    down - normal * down.dot(normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn globe() -> SphereBoundary {
        SphereBoundary::new(Vec3::ZERO, 2.0, 0.6)
    }

    #[test]
    fn test_inside_is_untouched() {
        let b = globe();
        let mut pos = Vec3::new(1.0, 0.5, 0.0);
        let mut vel = Vec3::new(0.3, 0.0, 0.0);
        assert!(!b.constrain(&mut pos, &mut vel, 0.0));
        assert_eq!(pos, Vec3::new(1.0, 0.5, 0.0));
        assert_eq!(vel, Vec3::new(0.3, 0.0, 0.0));
    }

    #[test]
    fn test_contact_reports_depth_past_glass() {
        let b = SphereBoundary::new(Vec3::new(0.0, 1.0, 0.0), 2.0, 0.6);
        let contact = b.contact(Vec3::new(0.0, 3.5, 0.0));
        assert!(contact.hit);
        assert!((contact.penetration - 0.5).abs() < 1e-6);
        assert_eq!(contact.normal, Vec3::Y);
        assert_eq!(b.contact(Vec3::new(0.0, 2.5, 0.0)).penetration, 0.0);
    }

    #[test]
    fn test_outside_is_projected_to_surface() {
        let b = globe();
        let mut pos = Vec3::new(3.0, 0.0, 0.0);
        let mut vel = Vec3::new(1.0, 0.5, 0.0);
        assert!(b.constrain(&mut pos, &mut vel, 0.0));
        assert!((pos - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-6);
        // Outward x removed, tangential y damped
        assert!(vel.x.abs() < 1e-6);
        assert!((vel.y - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_inward_velocity_kept_but_damped() {
        let b = globe();
        let mut pos = Vec3::new(0.0, -2.1, 0.0);
        let mut vel = Vec3::new(0.0, 1.0, 0.0);
        b.constrain(&mut pos, &mut vel, 0.0);
        assert!(vel.dot(Vec3::NEG_Y) <= 0.0);
    }

    #[test]
    fn test_wall_slide_pulls_downhill() {
        let b = globe();
        let mut pos = Vec3::new(2.1, 0.5, 0.0);
        let mut vel = Vec3::ZERO;
        b.constrain(&mut pos, &mut vel, 0.5);
        assert!(vel.y < 0.0);
        // Still tangential
        assert!(vel.dot(pos.normalize()).abs() < 1e-5);
    }

    #[test]
    fn test_downhill_at_pole_is_zero() {
        assert!(downhill(Vec3::NEG_Y).length() < 1e-6);
        assert!(downhill(Vec3::X).y < 0.0);
    }

    proptest! {
        #[test]
        fn prop_constrain_contains_and_never_pushes_out(
            px in -10.0f32..10.0, py in -10.0f32..10.0, pz in -10.0f32..10.0,
            vx in -20.0f32..20.0, vy in -20.0f32..20.0, vz in -20.0f32..20.0,
            slide in 0.0f32..2.0,
        ) {
            let b = globe();
            let mut pos = Vec3::new(px, py, pz);
            let mut vel = Vec3::new(vx, vy, vz);
            let touched = b.constrain(&mut pos, &mut vel, slide);
            prop_assert!(pos.length() <= b.radius + 1e-4);
            if touched {
                let normal = pos.normalize_or_zero();
                prop_assert!(vel.dot(normal) <= 1e-3);
            }
        }
    }
}
