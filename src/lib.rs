//! Astro Skirmish - simulation core of a small arcade space shooter
//!
//! Core modules:
//! - `sim`: Fixed-tick simulation (entity store, collision, AI, tick driver)
//! - `persistence`: Flat binary save states with a strict layout gate
//! - `tuning`: Data-driven game balance

pub mod persistence;
pub mod sim;
pub mod tuning;

pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation rate
    pub const TICKS_PER_SECOND: u32 = 60;
    /// Fixed simulation timestep in seconds (~16.67ms)
    pub const SIM_DT: f64 = 1.0 / TICKS_PER_SECOND as f64;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame the clock will accept before clamping (seconds)
    pub const MAX_FRAME_TIME: f64 = 0.25;

    /// Fixed capacity of the entity array
    pub const MAX_ENTITIES: usize = 1 << 12;

    /// Save state format tag, bumped whenever the record layout changes
    pub const SAVE_FORMAT_VERSION: u64 = 3;
}

/// Normalized angle to [-π, π]. Non-finite angles become 0.
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    if (-PI..PI).contains(&angle) {
        return angle;
    }
    if !angle.is_finite() {
        return 0.0;
    }
    (angle + PI).rem_euclid(TAU) - PI
}

/// Unit facing vector for an entity angle.
///
/// Angle 0 faces +y; positive angles turn toward +x.
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    Vec2::new(angle.sin(), angle.cos())
}

/// Inverse of [`heading`]: the angle that faces along `dir`
#[inline]
pub fn angle_of(dir: Vec2) -> f32 {
    dir.x.atan2(dir.y)
}

/// Linear interpolation
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    (1.0 - t) * a + t * b
}

/// Interpolate between two angles along the shorter arc
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    let delta = normalize_angle(to - from);
    normalize_angle(from + delta * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_heading_roundtrip() {
        for &a in &[0.0, 0.5, -1.2, 2.9, -3.0] {
            let back = angle_of(heading(a));
            assert!((normalize_angle(back - a)).abs() < 1e-5, "angle {a} came back as {back}");
        }
        let east = heading(FRAC_PI_2);
        assert!((east.x - 1.0).abs() < 1e-6 && east.y.abs() < 1e-6);
    }

    #[test]
    fn test_lerp_angle_takes_short_way() {
        // From just below +π to just above -π should cross the seam, not sweep through 0
        let from = PI - 0.1;
        let to = -PI + 0.1;
        let mid = lerp_angle(from, to, 0.5);
        assert!(mid.abs() > PI - 0.01);
    }

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(2.5 * PI) - FRAC_PI_2).abs() < 1e-5);
        assert!((normalize_angle(-1.5 * PI) - FRAC_PI_2).abs() < 1e-5);
        assert!((normalize_angle(-0.5) + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_angle_extremes() {
        for angle in [1e10, -1e10, f32::MAX, f32::MIN, 1e6 + 0.25] {
            let n = normalize_angle(angle);
            assert!((-PI..=PI).contains(&n), "{angle} -> {n}");
        }
        assert_eq!(normalize_angle(f32::INFINITY), 0.0);
        assert_eq!(normalize_angle(f32::NEG_INFINITY), 0.0);
        assert_eq!(normalize_angle(f32::NAN), 0.0);
    }
}
