//! Data-driven game balance
//!
//! Every gameplay constant that is not structural lives here so balance can
//! be tweaked from a JSON file without rebuilding. Missing fields fall back
//! to the defaults, so partial files are fine.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TuningError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid tuning JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Game balance knobs, all in world units per tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Physics ===
    /// Velocity multiplier applied to non-projectiles every tick
    pub drag: f32,
    /// Weight a projectile loses every tick
    pub projectile_weight_decay: f32,
    /// Maximum contacts resolved for one entity in one tick
    pub max_contacts_per_tick: u32,

    // === Player ===
    pub player_turn_rate: f32,
    pub player_accel: f32,
    pub player_max_speed: f32,

    // === Weapons ===
    /// Muzzle speed added to the shooter's velocity
    pub laser_speed: f32,
    /// Spawn distance ahead of the shooter
    pub laser_muzzle_offset: f32,
    pub laser_radius: f32,
    pub laser_weight: f32,

    // === AI ===
    pub ai_detect_radius: f32,
    /// Minimum dot(facing, direction to player) to notice it (0.5 ~ 60° cone)
    pub ai_detect_cone: f32,
    /// Fraction of the remaining turn covered per tick
    pub ai_turn_rate: f32,
    pub ai_accel: f32,
    pub ai_max_speed: f32,
    /// Distance at which a mover starts its attack windup
    pub ai_strike_range: f32,
    /// Distance at which an attacker goes back to chasing
    pub ai_disengage_range: f32,
    /// Distance at which a chaser gives up
    pub ai_lose_interest_range: f32,
    /// Velocity multiplier while winding up
    pub ai_windup_brake: f32,

    // === Death ===
    /// Size (and weight) lost per split generation
    pub split_step: f32,
    /// Entities at or below this size drop pickups instead of splitting
    pub split_min_size: f32,
    /// Split step for gunships, large enough that one ends in four fragments
    pub gunship_split_step: f32,

    // === Pickups ===
    pub pickup_delay_ticks: u64,
    pub pickup_capture_radius: f32,
    pub pickup_collect_distance: f32,
    pub pickup_bob_amplitude: f32,

    // === Waves ===
    /// Ticks with no enemies before the next wave arrives
    pub wave_quiet_ticks: u32,
    /// Enemies per wave number
    pub wave_growth: f32,
    pub wave_spawn_distance: f32,
    /// Every this many waves one more fighter is replaced by a gunship
    /// (0 = fighters only)
    pub wave_gunship_every: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            drag: 0.96,
            projectile_weight_decay: 0.01,
            max_contacts_per_tick: 4,

            player_turn_rate: 0.05,
            player_accel: 0.004,
            player_max_speed: 0.4,

            laser_speed: 0.8,
            laser_muzzle_offset: 2.5,
            laser_radius: 0.2,
            laser_weight: 1.0,

            ai_detect_radius: 50.0,
            ai_detect_cone: 0.5,
            ai_turn_rate: 0.04,
            ai_accel: 0.025,
            ai_max_speed: 0.2,
            ai_strike_range: 10.0,
            ai_disengage_range: 25.0,
            ai_lose_interest_range: 80.0,
            ai_windup_brake: 0.9,

            split_step: 0.3,
            split_min_size: 0.5,
            gunship_split_step: 1.25,

            pickup_delay_ticks: 10,
            pickup_capture_radius: 6.0,
            pickup_collect_distance: 0.3,
            pickup_bob_amplitude: 0.3,

            wave_quiet_ticks: 200,
            wave_growth: 1.5,
            wave_spawn_distance: 40.0,
            wave_gunship_every: 3,
        }
    }
}

impl Tuning {
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a tuning file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.as_ref().display());
        Ok(tuning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let t = Tuning::from_json(r#"{ "drag": 0.5, "wave_quiet_ticks": 10 }"#).unwrap();
        assert_eq!(t.drag, 0.5);
        assert_eq!(t.wave_quiet_ticks, 10);
        assert_eq!(t.ai_strike_range, Tuning::default().ai_strike_range);
    }

    #[test]
    fn test_json_roundtrip() {
        let t = Tuning {
            laser_speed: 1.25,
            ..Default::default()
        };
        let back = Tuning::from_json(&t.to_json().unwrap()).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(
            Tuning::from_json("{ drag: "),
            Err(TuningError::Json(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Tuning::load("/definitely/not/here.json"),
            Err(TuningError::Io(_))
        ));
    }
}
