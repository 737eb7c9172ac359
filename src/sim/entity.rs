//! Entity data model
//!
//! Every simulated object is the same fixed-size struct. Behaviour is switched
//! on by [`Prop`] bits rather than by type, so any pass can ask for "all
//! entities with property X".

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::ai::Brain;
use crate::{heading, lerp};

/// Property bits that enable codepaths for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Prop {
    /// Slot is occupied. Clear means the slot is free for reuse.
    Active = 0,
    /// Slow visual tumble (asteroids, pillars)
    PassiveRotate = 1,
    /// Single-use, exempt from drag, loses weight every tick
    Projectile = 2,
    /// Can take damage and die
    Destructible = 3,
    /// Drifts toward the player and is collected
    Pickup = 4,
    /// Runs the AI state machine
    HasAi = 5,
    /// Splits into smaller copies (and finally pickups) on death
    SplitsOnDeath = 6,
}

/// Bitset of [`Prop`]s
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Props(u32);

impl Props {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Builder-style add, usable in const templates
    pub const fn with(self, prop: Prop) -> Self {
        Self(self.0 | (1 << prop as u32))
    }

    #[inline]
    pub fn has(self, prop: Prop) -> bool {
        self.0 & (1 << prop as u32) != 0
    }

    pub fn insert(&mut self, prop: Prop) {
        self.0 |= 1 << prop as u32;
    }

    pub fn remove(&mut self, prop: Prop) {
        self.0 &= !(1 << prop as u32);
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    /// Rebuild from raw bits, dropping any unknown bits
    pub fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & 0x7f)
    }
}

/// Collider shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    #[default]
    Circle,
    /// Segment centred on the entity, oriented along its facing
    Line,
}

/// Physical extent and mass of an entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub shape: Shape,
    /// Radius for circles, half-length for lines. Zero means non-physical.
    pub size: f32,
    /// Zero means immovable (infinite mass)
    pub weight: f32,
}

impl Collider {
    /// No collider: purely visual
    pub const NONE: Collider = Collider {
        shape: Shape::Circle,
        size: 0.0,
        weight: 0.0,
    };

    pub const fn circle(radius: f32, weight: f32) -> Self {
        Self {
            shape: Shape::Circle,
            size: radius,
            weight,
        }
    }

    pub const fn line(half_length: f32, weight: f32) -> Self {
        Self {
            shape: Shape::Line,
            size: half_length,
            weight,
        }
    }

    /// Takes part in collision at all
    #[inline]
    pub fn is_physical(&self) -> bool {
        self.size > 0.0
    }

    #[inline]
    pub fn is_immovable(&self) -> bool {
        self.weight == 0.0
    }
}

/// Weak reference to an entity slot.
///
/// Only resolves while the slot still carries the generation captured here,
/// so it is safe to hold across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    pub(crate) index: u32,
    pub(crate) generation: u64,
}

impl Handle {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Render-side art tag (meshes live outside the core)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum Art {
    #[default]
    Ship = 0,
    Asteroid = 1,
    Plane = 2,
    Pillar = 3,
    Laser = 4,
    Mineral = 5,
}

impl Art {
    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0 => Art::Ship,
            1 => Art::Asteroid,
            2 => Art::Plane,
            3 => Art::Pillar,
            4 => Art::Laser,
            5 => Art::Mineral,
            _ => return None,
        })
    }
}

/// Ticks over which a health bar eases down after a hit
const HEALTH_FADE_TICKS: f32 = 30.0;

/// A game entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub props: Props,
    /// Owned by the store: overwritten on allocate, bumped on release
    pub generation: u64,
    /// Owned by the store: the slot this entity lives in
    #[serde(skip)]
    pub slot: u32,

    pub pos: Vec2,
    pub vel: Vec2,
    /// Vertical offset, visual layering only
    pub height: f32,
    pub angle: f32,
    pub scale: Vec3,
    pub art: Art,

    pub collider: Collider,
    /// Tick of the last contact, drives impact animations
    pub last_collision: u64,

    /// Tied to `Prop::PassiveRotate`
    pub passive_rotate_axis: Vec3,
    /// Tied to `Prop::Pickup`
    pub pick_up_after_tick: u64,

    /// Tied to `Prop::Destructible`
    pub health: i32,
    pub max_health: i32,
    pub last_hit: u64,

    pub damage: i32,
    /// Projectile owner, for attribution
    pub parent: Option<Handle>,

    pub ai: Brain,
}

impl Default for Entity {
    fn default() -> Self {
        Self {
            props: Props::empty(),
            generation: 0,
            slot: 0,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            height: 0.0,
            angle: 0.0,
            scale: Vec3::ONE,
            art: Art::Ship,
            collider: Collider::NONE,
            last_collision: 0,
            passive_rotate_axis: Vec3::Y,
            pick_up_after_tick: 0,
            health: 0,
            max_health: 0,
            last_hit: 0,
            damage: 0,
            parent: None,
            ai: Brain::default(),
        }
    }
}

impl Entity {
    #[inline]
    pub fn has(&self, prop: Prop) -> bool {
        self.props.has(prop)
    }

    /// Set a property, returning whether it was already set
    pub fn give(&mut self, prop: Prop) -> bool {
        let before = self.has(prop);
        self.props.insert(prop);
        before
    }

    /// Clear a property, returning whether it was set
    pub fn take(&mut self, prop: Prop) -> bool {
        let before = self.has(prop);
        self.props.remove(prop);
        before
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.has(Prop::Active)
    }

    /// Handle to this entity as it currently exists
    pub fn handle(&self) -> Handle {
        Handle {
            index: self.slot,
            generation: self.generation,
        }
    }

    /// Unit vector along the entity's facing
    #[inline]
    pub fn facing(&self) -> Vec2 {
        heading(self.angle)
    }

    /// Health bar fill in [0, 1], easing down for a short while after a hit
    pub fn health_fraction(&self, tick: u64) -> f32 {
        let t = (tick.saturating_sub(self.last_hit) as f32 / HEALTH_FADE_TICKS).min(1.0);
        let shown = lerp((self.health + 1) as f32, self.health as f32, t);
        (shown / (self.max_health as f32).max(1.0)).clamp(0.0, 1.0)
    }
}
