//! Enemy waves
//!
//! Once the arena has been free of AI entities for a while, a new wave of
//! fighters arrives on a ring around the player. Each wave is a bit larger
//! than the last.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::ai::AiKind;
use super::entity::Prop;
use super::rng::RngExt;
use super::scenario;
use super::state::World;
use crate::{angle_of, heading};

/// Wave progress, part of the saved world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveDirector {
    /// Number of the next wave to spawn, starting at 1
    pub wave: u32,
    /// Consecutive ticks with no AI entity alive
    pub quiet_ticks: u32,
    pub enabled: bool,
}

impl Default for WaveDirector {
    fn default() -> Self {
        Self {
            wave: 1,
            quiet_ticks: 0,
            enabled: true,
        }
    }
}

/// Enemies in a given wave
pub fn wave_size(wave: u32, growth: f32) -> u32 {
    (wave as f32 * growth).ceil() as u32
}

/// How many of a wave's enemies are gunships
pub fn gunship_count(wave: u32, every: u32, size: u32) -> u32 {
    if every == 0 {
        return 0;
    }
    (wave / every).min(size)
}

/// Once-per-tick wave bookkeeping
pub fn update(world: &mut World) {
    let enemies = world.entities.iter().filter(|e| e.has(Prop::HasAi)).count();
    if enemies > 0 {
        world.waves.quiet_ticks = 0;
        return;
    }

    world.waves.quiet_ticks += 1;
    if world.waves.quiet_ticks >= world.tuning.wave_quiet_ticks {
        world.waves.quiet_ticks = 0;
        spawn_wave(world);
    }
}

/// Spawn the next wave, facing the player
pub fn spawn_wave(world: &mut World) -> u32 {
    let count = wave_size(world.waves.wave, world.tuning.wave_growth);
    let gunships = gunship_count(world.waves.wave, world.tuning.wave_gunship_every, count);
    let center = world.player_entity().map_or(Vec2::ZERO, |p| p.pos);
    let radius = world.tuning.wave_spawn_distance;
    let offset = world.rng.randf() * std::f32::consts::TAU;

    let mut spawned = 0;
    for i in 0..count {
        let around = offset + i as f32 / count as f32 * std::f32::consts::TAU;
        let pos = center + heading(around) * radius;
        let (mut ship, kind) = if i < gunships {
            (scenario::gunship(pos), AiKind::Gunship)
        } else {
            (scenario::fighter(pos), AiKind::Fighter)
        };
        ship.angle = angle_of(center - pos);
        if world.spawn_ai(ship, kind).is_some() {
            spawned += 1;
        }
    }

    log::info!(
        "wave {} arrives: {spawned}/{count} ships ({gunships} gunships)",
        world.waves.wave
    );
    world.waves.wave += 1;
    spawned
}
