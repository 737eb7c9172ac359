//! Entity templates and the starting arena

use glam::{Vec2, Vec3};

use super::ai::AiKind;
use super::entity::{Art, Collider, Entity, Prop, Props};
use super::rng::RngExt;
use super::state::World;
use crate::heading;

const ASTEROID_RINGS: usize = 3;
const ASTEROIDS_PER_RING: usize = 7;
const ASTEROID_FIRST_RING: f32 = 12.0;
const ASTEROID_RING_SPACING: f32 = 20.0;
const ASTEROID_RING_JITTER: f32 = 3.0;

pub fn player_ship(pos: Vec2) -> Entity {
    Entity {
        props: Props::empty().with(Prop::Destructible),
        art: Art::Ship,
        pos,
        collider: Collider::circle(2.0, 0.4),
        health: 10,
        max_health: 10,
        damage: 1,
        ..Default::default()
    }
}

/// Light AI ship; give it AI with [`World::spawn_ai`]
pub fn fighter(pos: Vec2) -> Entity {
    Entity {
        props: Props::empty().with(Prop::Destructible),
        art: Art::Ship,
        pos,
        collider: Collider::circle(2.0, 0.4),
        health: 3,
        max_health: 3,
        damage: 1,
        ..Default::default()
    }
}

/// Heavy AI ship that breaks into smaller gunships
pub fn gunship(pos: Vec2) -> Entity {
    Entity {
        props: Props::empty()
            .with(Prop::Destructible)
            .with(Prop::SplitsOnDeath),
        art: Art::Ship,
        pos,
        scale: Vec3::splat(1.5),
        collider: Collider::circle(3.0, 1.2),
        health: 8,
        max_health: 8,
        damage: 2,
        ..Default::default()
    }
}

pub fn asteroid(pos: Vec2, size: f32, axis: Vec3) -> Entity {
    Entity {
        props: Props::empty()
            .with(Prop::Destructible)
            .with(Prop::PassiveRotate)
            .with(Prop::SplitsOnDeath),
        art: Art::Asteroid,
        pos,
        scale: Vec3::splat(size),
        collider: Collider::circle(size, size),
        passive_rotate_axis: axis,
        health: 1,
        max_health: 1,
        ..Default::default()
    }
}

/// Heavy segment wall
pub fn force_field(pos: Vec2, angle: f32) -> Entity {
    Entity {
        art: Art::Plane,
        pos,
        angle,
        height: -1.0,
        scale: Vec3::new(5.0, 4.0, 1.0),
        collider: Collider::line(5.0, 1000.0),
        ..Default::default()
    }
}

/// Decoration only
pub fn pillar(pos: Vec2) -> Entity {
    Entity {
        props: Props::empty().with(Prop::PassiveRotate),
        art: Art::Pillar,
        pos,
        ..Default::default()
    }
}

/// Fill an empty world with the starting arena and make the player
pub fn populate_arena(world: &mut World) {
    world.player = world.spawn(player_ship(Vec2::new(-1.0, 2.5)));
    world.spawn(force_field(Vec2::new(-1.5, 6.5), std::f32::consts::FRAC_PI_2));
    for side in [-1.0, 1.0] {
        world.spawn(pillar(Vec2::new(-1.5 + side * 4.2, 6.5)));
    }

    for ring in 0..ASTEROID_RINGS {
        for i in 0..ASTEROIDS_PER_RING {
            let mut dist = ASTEROID_FIRST_RING + ring as f32 * ASTEROID_RING_SPACING;
            let mut around = i as f32 / ASTEROIDS_PER_RING as f32 * std::f32::consts::TAU;
            around += world.rng.randf() * std::f32::consts::TAU / ASTEROIDS_PER_RING as f32 * 0.8;
            dist += ASTEROID_RING_JITTER * (0.5 - world.rng.randf()) * 2.0;

            let size = 1.0 + ring as f32 * (0.1 + 0.2 * world.rng.randf());
            let axis = world.rng.unit3();
            world.spawn(asteroid(heading(around) * dist, size, axis));
        }
    }

    for pos in [Vec2::new(-1.0, 12.5), Vec2::new(-10.0, 12.5)] {
        world.spawn_ai(fighter(pos), AiKind::Fighter);
    }

    log::info!(
        "arena ready: {} entities",
        world.entities.live_count()
    );
}
