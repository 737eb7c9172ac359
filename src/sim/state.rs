//! World state and the spawn/removal helpers every pass shares
//!
//! Everything the simulation mutates lives in [`World`]. It is passed
//! explicitly to every pass, so any number of independent worlds can exist.

use glam::{Vec2, Vec3};
use rand::SeedableRng;

use super::ai::{self, AiKind};
use super::entity::{Art, Collider, Entity, Handle, Prop, Props};
use super::rng::{self, RngExt, Xoshiro128Plus};
use super::store::EntityStore;
use super::waves::WaveDirector;
use crate::tuning::Tuning;

/// Number of children a splitting entity breaks into
pub const SPLIT_COUNT: usize = 2;
/// Smallest weight a split child keeps, so it never turns immovable
const MIN_SPLIT_WEIGHT: f32 = 0.05;

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct World {
    pub entities: EntityStore,
    /// Simulation tick counter, incremented at the start of every tick
    pub tick: u64,
    /// The player's ship, if one was spawned and is still alive
    pub player: Option<Handle>,
    /// Pickups collected so far
    pub gem_count: u64,
    pub rng: Xoshiro128Plus,
    pub tuning: Tuning,
    pub waves: WaveDirector,
    /// A paused world ignores everything but the pause toggle
    pub paused: bool,
    /// Nesting depth of AI state entries within the current call chain
    pub(crate) ai_depth: u8,
}

impl Default for World {
    fn default() -> Self {
        Self::new(Tuning::default())
    }
}

impl World {
    /// Empty world with the build's fixed entity capacity
    pub fn new(tuning: Tuning) -> Self {
        Self::with_store(EntityStore::new(), tuning)
    }

    /// Empty world with a custom capacity (tests and tools)
    pub fn with_capacity(capacity: usize, tuning: Tuning) -> Self {
        Self::with_store(EntityStore::with_capacity(capacity), tuning)
    }

    fn with_store(entities: EntityStore, tuning: Tuning) -> Self {
        log::debug!("world created with {} entity slots", entities.capacity());
        Self {
            entities,
            tick: 0,
            player: None,
            gem_count: 0,
            rng: rng::default_rng(),
            tuning,
            waves: WaveDirector::default(),
            paused: false,
            ai_depth: 0,
        }
    }

    /// Reseed the world RNG
    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = Xoshiro128Plus::seed_from_u64(seed);
        self
    }

    /// Spawn an entity. `None` when the store is full.
    pub fn spawn(&mut self, template: Entity) -> Option<Handle> {
        self.entities.spawn(template)
    }

    /// Spawn an entity driven by the AI state machine, starting idle
    pub fn spawn_ai(&mut self, template: Entity, kind: AiKind) -> Option<Handle> {
        let handle = self.entities.spawn(template)?;
        let slot = handle.index();
        self.entities[slot].give(Prop::HasAi);
        ai::init(self, slot, kind);
        Some(handle)
    }

    pub fn resolve(&self, handle: Handle) -> Option<&Entity> {
        self.entities.resolve(handle)
    }

    /// Slot of the live player ship
    pub fn player_slot(&self) -> Option<usize> {
        self.player.and_then(|h| self.entities.resolve_slot(h))
    }

    pub fn player_entity(&self) -> Option<&Entity> {
        self.entities.resolve_opt(self.player)
    }

    /// Fire a laser from `shooter` along its facing.
    ///
    /// Damage and ownership are attributed to the shooter. Best effort: a
    /// full store means no shot.
    pub fn fire_laser(&mut self, shooter: usize) -> Option<Handle> {
        let t = &self.tuning;
        let e = &self.entities[shooter];
        let dir = e.facing();
        let template = Entity {
            props: Props::empty().with(Prop::Projectile),
            art: Art::Laser,
            pos: e.pos + dir * t.laser_muzzle_offset,
            vel: e.vel + dir * t.laser_speed,
            scale: Vec3::new(1.0, 1.0, 3.0),
            angle: e.angle,
            height: -0.8,
            collider: Collider::circle(t.laser_radius, t.laser_weight),
            damage: e.damage,
            parent: Some(e.handle()),
            ..Default::default()
        };
        self.entities.spawn(template)
    }

    /// Remove an entity for good, running its death behaviour.
    ///
    /// Splitting entities break into smaller copies, or into pickups once
    /// they are too small. Removing a free slot does nothing.
    pub fn kill(&mut self, slot: usize) {
        let Some(e) = self.entities.get(slot) else {
            return;
        };
        if !e.is_active() {
            return;
        }

        if e.has(Prop::SplitsOnDeath) {
            let parent = e.clone();
            if parent.collider.size > self.tuning.split_min_size {
                self.split_children(&parent);
            } else {
                self.drop_pickups(&parent);
            }
        }

        self.entities.release(slot);
    }

    /// Two smaller copies of `parent` flying apart
    fn split_children(&mut self, parent: &Entity) {
        let step = if parent.has(Prop::HasAi) && parent.ai.kind == AiKind::Gunship {
            self.tuning.gunship_split_step
        } else {
            self.tuning.split_step
        };
        let mut child = parent.clone();
        child.collider.size -= step;
        child.collider.weight = (child.collider.weight - step).max(MIN_SPLIT_WEIGHT);
        child.scale = (child.scale - Vec3::splat(step)).max(Vec3::splat(0.05));
        child.max_health = (parent.max_health / 2).max(1);
        child.health = child.max_health;
        child.passive_rotate_axis = self.rng.unit3();
        child.ai.target = None;

        log::debug!(
            "slot {} splits into {} (size {:.2})",
            parent.slot,
            SPLIT_COUNT,
            child.collider.size
        );
        self.scatter(child, parent.pos, parent.vel.length());
    }

    /// Minerals left behind by the smallest fragments
    fn drop_pickups(&mut self, parent: &Entity) {
        let mineral = Entity {
            props: Props::empty().with(Prop::Pickup),
            pick_up_after_tick: self.tick + self.tuning.pickup_delay_ticks,
            art: Art::Mineral,
            pos: parent.pos,
            ..Default::default()
        };
        self.scatter(mineral, parent.pos, parent.vel.length());
    }

    /// Spawn [`SPLIT_COUNT`] copies of `template` sent off in opposed directions.
    ///
    /// The copies' speeds add up to `speed`, so a split redistributes the
    /// parent's motion rather than adding to it.
    fn scatter(&mut self, template: Entity, origin: Vec2, speed: f32) {
        let offset = self.rng.randf() * std::f32::consts::PI;
        let share = speed / SPLIT_COUNT as f32;
        for i in 0..SPLIT_COUNT {
            let t = i as f32 / SPLIT_COUNT as f32;
            let jitter = self.rng.randf() * 0.3;
            let dir = crate::heading(jitter + offset + t * std::f32::consts::TAU);

            let mut e = template.clone();
            e.vel = dir * share;
            e.pos = origin + dir * (2.0 * e.collider.size);
            let has_ai = e.has(Prop::HasAi);
            let kind = e.ai.kind;
            if let Some(handle) = self.entities.spawn(e) {
                if has_ai {
                    ai::init(self, handle.index(), kind);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asteroid(size: f32, vel: Vec2) -> Entity {
        Entity {
            props: Props::empty()
                .with(Prop::Destructible)
                .with(Prop::SplitsOnDeath),
            art: Art::Asteroid,
            vel,
            collider: Collider::circle(size, size),
            scale: Vec3::splat(size),
            health: 1,
            max_health: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_split_produces_two_smaller_children() {
        let mut world = World::with_capacity(16, Tuning::default());
        let h = world.spawn(asteroid(1.3, Vec2::new(0.3, -0.4))).unwrap();
        let step = world.tuning.split_step;

        world.kill(h.index());
        assert!(world.resolve(h).is_none());

        let children: Vec<&Entity> = world.entities.iter().collect();
        assert_eq!(children.len(), 2);
        for c in &children {
            assert!((c.collider.size - (1.3 - step)).abs() < 1e-6);
            assert!(c.has(Prop::SplitsOnDeath));
        }
        let total_speed: f32 = children.iter().map(|c| c.vel.length()).sum();
        assert!((total_speed - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_small_fragments_drop_pickups() {
        let mut world = World::with_capacity(16, Tuning::default());
        world.tick = 40;
        let h = world.spawn(asteroid(0.4, Vec2::ZERO)).unwrap();
        world.kill(h.index());

        let drops: Vec<&Entity> = world.entities.iter().collect();
        assert_eq!(drops.len(), 2);
        for d in drops {
            assert!(d.has(Prop::Pickup));
            assert_eq!(d.art, Art::Mineral);
            assert_eq!(d.pick_up_after_tick, 40 + world.tuning.pickup_delay_ticks);
        }
    }

    #[test]
    fn test_kill_without_split_just_vanishes() {
        let mut world = World::with_capacity(4, Tuning::default());
        let h = world
            .spawn(Entity {
                props: Props::empty().with(Prop::Destructible),
                ..Default::default()
            })
            .unwrap();
        world.kill(h.index());
        world.kill(h.index());
        assert_eq!(world.entities.live_count(), 0);
        assert_eq!(world.entities[h.index()].generation, h.generation() + 1);
    }

    #[test]
    fn test_fire_laser_attributes_shooter() {
        let mut world = World::with_capacity(4, Tuning::default());
        let shooter = world
            .spawn(Entity {
                damage: 3,
                angle: std::f32::consts::FRAC_PI_2,
                ..Default::default()
            })
            .unwrap();
        let laser = world.fire_laser(shooter.index()).unwrap();
        let l = world.resolve(laser).unwrap();
        assert!(l.has(Prop::Projectile));
        assert_eq!(l.damage, 3);
        assert_eq!(l.parent, Some(shooter));
        // Facing +x, so the laser leaves along +x
        assert!(l.vel.x > 0.7 && l.vel.y.abs() < 1e-5);
        assert!((l.pos.x - world.tuning.laser_muzzle_offset).abs() < 1e-5);
    }

    #[test]
    fn test_fire_laser_with_full_store_is_silent() {
        let mut world = World::with_capacity(1, Tuning::default());
        let shooter = world.spawn(Entity::default()).unwrap();
        assert!(world.fire_laser(shooter.index()).is_none());
    }
}
