//! On-disk layout of a save state
//!
//! Both structs are `#[repr(C)]` plain old data with every field naturally
//! aligned, so there is no padding and the byte image is fully defined.
//! Handles are stored as `index + 1` (0 = none) plus a generation. AI state is
//! stored as `StateId + 1` (0 = not under AI control).

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use super::SaveError;
use crate::sim::ai::{AiKind, Brain, StateId};
use crate::sim::entity::{Art, Collider, Entity, Handle, Props, Shape};

pub const SAVE_MAGIC: [u8; 8] = *b"ASKSAVE\0";

/// File header
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SaveHeader {
    pub magic: [u8; 8],
    pub version: u64,
    /// `size_of::<EntityRecord>()` of the writing build
    pub entity_size: u64,
    /// Entity slots that follow the header
    pub capacity: u64,
    pub gem_count: u64,
    pub tick: u64,
    pub player_index: u64,
    pub player_generation: u64,
    pub rng: [u32; 4],
    pub wave: u32,
    pub quiet_ticks: u32,
    pub waves_enabled: u32,
    pub reserved: u32,
}

pub const HEADER_SIZE: usize = std::mem::size_of::<SaveHeader>();

/// One entity slot, free or not
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct EntityRecord {
    pub props: u32,
    pub art: u32,
    pub generation: u64,
    pub pos: [f32; 2],
    pub vel: [f32; 2],
    pub height: f32,
    pub angle: f32,
    pub scale: [f32; 3],
    pub passive_rotate_axis: [f32; 3],
    pub collider_shape: u32,
    pub collider_size: f32,
    pub collider_weight: f32,
    pub health: i32,
    pub max_health: i32,
    pub damage: i32,
    pub last_hit: u64,
    pub last_collision: u64,
    pub pick_up_after_tick: u64,
    pub parent_index: u64,
    pub parent_generation: u64,
    pub ai_kind: u32,
    pub ai_state: u32,
    pub ai_tick_end: u64,
    pub target_index: u64,
    pub target_generation: u64,
}

pub const RECORD_SIZE: usize = std::mem::size_of::<EntityRecord>();

pub fn encode_handle(handle: Option<Handle>) -> (u64, u64) {
    match handle {
        Some(h) => (h.index as u64 + 1, h.generation),
        None => (0, 0),
    }
}

pub fn decode_handle(index: u64, generation: u64) -> Option<Handle> {
    let index = u32::try_from(index.checked_sub(1)?).ok()?;
    Some(Handle { index, generation })
}

impl EntityRecord {
    pub fn from_entity(e: &Entity) -> Self {
        let (parent_index, parent_generation) = encode_handle(e.parent);
        let (target_index, target_generation) = encode_handle(e.ai.target);
        Self {
            props: e.props.bits(),
            art: e.art as u32,
            generation: e.generation,
            pos: e.pos.to_array(),
            vel: e.vel.to_array(),
            height: e.height,
            angle: e.angle,
            scale: e.scale.to_array(),
            passive_rotate_axis: e.passive_rotate_axis.to_array(),
            collider_shape: match e.collider.shape {
                Shape::Circle => 0,
                Shape::Line => 1,
            },
            collider_size: e.collider.size,
            collider_weight: e.collider.weight,
            health: e.health,
            max_health: e.max_health,
            damage: e.damage,
            last_hit: e.last_hit,
            last_collision: e.last_collision,
            pick_up_after_tick: e.pick_up_after_tick,
            parent_index,
            parent_generation,
            ai_kind: e.ai.kind as u32,
            ai_state: e.ai.state.map_or(0, |s| s.index() as u32 + 1),
            ai_tick_end: e.ai.tick_end,
            target_index,
            target_generation,
        }
    }

    /// Rebuild the entity for `slot`, rejecting values this build cannot represent
    pub fn to_entity(&self, slot: usize) -> Result<Entity, SaveError> {
        let art = Art::from_u32(self.art).ok_or(SaveError::InvalidArt { slot, value: self.art })?;
        let shape = match self.collider_shape {
            0 => Shape::Circle,
            1 => Shape::Line,
            value => return Err(SaveError::InvalidShape { slot, value }),
        };
        let kind = AiKind::from_u32(self.ai_kind).ok_or(SaveError::InvalidAiKind {
            slot,
            value: self.ai_kind,
        })?;
        let state = match self.ai_state {
            0 => None,
            id => Some(
                StateId::from_index(id as usize - 1)
                    .ok_or(SaveError::UnknownAiState { slot, id: id - 1 })?,
            ),
        };

        Ok(Entity {
            props: Props::from_bits_truncate(self.props),
            generation: self.generation,
            slot: slot as u32,
            pos: Vec2::from_array(self.pos),
            vel: Vec2::from_array(self.vel),
            height: self.height,
            angle: self.angle,
            scale: Vec3::from_array(self.scale),
            art,
            collider: Collider {
                shape,
                size: self.collider_size,
                weight: self.collider_weight,
            },
            last_collision: self.last_collision,
            passive_rotate_axis: Vec3::from_array(self.passive_rotate_axis),
            pick_up_after_tick: self.pick_up_after_tick,
            health: self.health,
            max_health: self.max_health,
            last_hit: self.last_hit,
            damage: self.damage,
            parent: decode_handle(self.parent_index, self.parent_generation),
            ai: Brain {
                kind,
                state,
                tick_end: self.ai_tick_end,
                target: decode_handle(self.target_index, self.target_generation),
            },
        })
    }
}
