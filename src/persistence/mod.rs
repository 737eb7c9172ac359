//! Save/load persistence
//!
//! A save state is a flat binary dump: a [`SaveHeader`] followed by one
//! [`EntityRecord`] per slot of the entity array, free slots included. There
//! is no migration. A file from a build with a different format version,
//! record size or entity capacity is refused and the in-memory world is left
//! exactly as it was.
//!
//! Writes go to a temporary file that is renamed over the target, so a crash
//! mid-save never leaves a half-written state behind.

pub mod record;

use std::path::Path;

use thiserror::Error;

pub use record::{EntityRecord, HEADER_SIZE, RECORD_SIZE, SAVE_MAGIC, SaveHeader};

use crate::consts::SAVE_FORMAT_VERSION;
use crate::sim::entity::Entity;
use crate::sim::rng;
use crate::sim::state::World;
use crate::sim::waves::WaveDirector;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Save data truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("Not a save state (bad magic)")]
    BadMagic,

    #[error("Save format version {found} does not match {expected}")]
    VersionMismatch { expected: u64, found: u64 },

    #[error("Entity record size {found} does not match {expected}")]
    EntitySizeMismatch { expected: u64, found: u64 },

    #[error("Entity capacity {found} does not match {expected}")]
    CapacityMismatch { expected: u64, found: u64 },

    #[error("Slot {slot}: unknown AI state id {id}")]
    UnknownAiState { slot: usize, id: u32 },

    #[error("Slot {slot}: invalid art tag {value}")]
    InvalidArt { slot: usize, value: u32 },

    #[error("Slot {slot}: invalid collider shape {value}")]
    InvalidShape { slot: usize, value: u32 },

    #[error("Slot {slot}: invalid AI kind {value}")]
    InvalidAiKind { slot: usize, value: u32 },

    #[error("RNG state error: {0}")]
    RngState(#[from] serde_json::Error),
}

/// Serialize the whole world
pub fn encode(world: &World) -> Result<Vec<u8>, SaveError> {
    let (player_index, player_generation) = record::encode_handle(world.player);
    let header = SaveHeader {
        magic: SAVE_MAGIC,
        version: SAVE_FORMAT_VERSION,
        entity_size: RECORD_SIZE as u64,
        capacity: world.entities.capacity() as u64,
        gem_count: world.gem_count,
        tick: world.tick,
        player_index,
        player_generation,
        rng: rng::words(&world.rng)?,
        wave: world.waves.wave,
        quiet_ticks: world.waves.quiet_ticks,
        waves_enabled: world.waves.enabled as u32,
        reserved: 0,
    };

    let mut bytes = Vec::with_capacity(HEADER_SIZE + RECORD_SIZE * world.entities.capacity());
    bytes.extend_from_slice(bytemuck::bytes_of(&header));
    for e in world.entities.slots() {
        bytes.extend_from_slice(bytemuck::bytes_of(&EntityRecord::from_entity(e)));
    }
    Ok(bytes)
}

/// Check a header against this build
fn validate_header(header: &SaveHeader, capacity: usize) -> Result<(), SaveError> {
    if header.magic != SAVE_MAGIC {
        return Err(SaveError::BadMagic);
    }
    if header.version != SAVE_FORMAT_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_FORMAT_VERSION,
            found: header.version,
        });
    }
    if header.entity_size != RECORD_SIZE as u64 {
        return Err(SaveError::EntitySizeMismatch {
            expected: RECORD_SIZE as u64,
            found: header.entity_size,
        });
    }
    if header.capacity != capacity as u64 {
        return Err(SaveError::CapacityMismatch {
            expected: capacity as u64,
            found: header.capacity,
        });
    }
    Ok(())
}

/// Replace `world`'s state with a decoded save.
///
/// Everything is decoded and validated before the world is touched.
pub fn decode_into(world: &mut World, bytes: &[u8]) -> Result<(), SaveError> {
    if bytes.len() < HEADER_SIZE {
        return Err(SaveError::Truncated {
            expected: HEADER_SIZE,
            found: bytes.len(),
        });
    }
    let header: SaveHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_SIZE]);
    let capacity = world.entities.capacity();
    validate_header(&header, capacity)?;

    let expected = HEADER_SIZE + RECORD_SIZE * capacity;
    if bytes.len() != expected {
        return Err(SaveError::Truncated {
            expected,
            found: bytes.len(),
        });
    }

    let slots = bytes[HEADER_SIZE..]
        .chunks_exact(RECORD_SIZE)
        .enumerate()
        .map(|(slot, chunk)| {
            bytemuck::pod_read_unaligned::<EntityRecord>(chunk).to_entity(slot)
        })
        .collect::<Result<Vec<Entity>, SaveError>>()?;

    world.entities.replace_slots(slots.into_boxed_slice());
    world.tick = header.tick;
    world.gem_count = header.gem_count;
    world.player = record::decode_handle(header.player_index, header.player_generation);
    world.rng = rng::from_words(header.rng);
    world.waves = WaveDirector {
        wave: header.wave,
        quiet_ticks: header.quiet_ticks,
        enabled: header.waves_enabled != 0,
    };
    world.ai_depth = 0;
    Ok(())
}

/// Write a save state atomically
pub fn save(world: &World, path: impl AsRef<Path>) -> Result<(), SaveError> {
    let path = path.as_ref();
    let bytes = encode(world)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, path)?;
    log::info!(
        "Saved tick {} ({} entities) to {}",
        world.tick,
        world.entities.live_count(),
        path.display()
    );
    Ok(())
}

/// Load a save state into `world`, leaving it untouched on any error
pub fn load(world: &mut World, path: impl AsRef<Path>) -> Result<(), SaveError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    match decode_into(world, &bytes) {
        Ok(()) => {
            log::info!("Loaded tick {} from {}", world.tick, path.display());
            Ok(())
        }
        Err(e) => {
            log::warn!("Refusing save state {}: {e}", path.display());
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::scenario;
    use crate::sim::tick::{TickInput, tick};
    use crate::tuning::Tuning;

    fn running_world() -> World {
        let mut world = World::with_capacity(64, Tuning::default()).seeded(11);
        scenario::populate_arena(&mut world);
        let input = TickInput::default();
        for _ in 0..30 {
            tick(&mut world, &input);
        }
        world.gem_count = 3;
        world
    }

    #[test]
    fn test_save_load_roundtrip() {
        let world = running_world();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.sav");
        save(&world, &path).unwrap();
        assert!(!path.with_extension("tmp").exists());

        let mut loaded = World::with_capacity(64, Tuning::default());
        load(&mut loaded, &path).unwrap();

        assert_eq!(loaded.tick, world.tick);
        assert_eq!(loaded.gem_count, 3);
        assert_eq!(loaded.player, world.player);
        assert_eq!(loaded.rng, world.rng);
        assert_eq!(loaded.waves, world.waves);
        assert_eq!(loaded.entities.live_count(), world.entities.live_count());
        for (a, b) in world.entities.iter().zip(loaded.entities.iter()) {
            assert_eq!(a.slot, b.slot);
            assert_eq!(a.pos, b.pos);
            assert_eq!(a.vel, b.vel);
            assert_eq!(a.health, b.health);
            assert_eq!(a.ai.role(), b.ai.role());
            assert_eq!(a.ai.target, b.ai.target);
        }
    }

    #[test]
    fn test_loaded_world_keeps_running_identically() {
        let mut running = running_world();
        let mut copy = World::with_capacity(64, Tuning::default());
        decode_into(&mut copy, &encode(&running).unwrap()).unwrap();

        let input = TickInput::default();
        for _ in 0..60 {
            tick(&mut running, &input);
            tick(&mut copy, &input);
        }
        let a: Vec<_> = running.entities.iter().map(|e| (e.pos, e.ai.role())).collect();
        let b: Vec<_> = copy.entities.iter().map(|e| (e.pos, e.ai.role())).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_free_slot_generations_survive() {
        let mut world = World::with_capacity(4, Tuning::default());
        let h = world.spawn(Entity::default()).unwrap();
        world.entities.release(h.index());

        let mut loaded = World::with_capacity(4, Tuning::default());
        decode_into(&mut loaded, &encode(&world).unwrap()).unwrap();
        assert_eq!(loaded.entities[0].generation, 1);
        assert!(loaded.resolve(h).is_none());
        let fresh = loaded.spawn(Entity::default()).unwrap();
        assert_ne!(fresh, h);
    }

    #[test]
    fn test_capacity_mismatch_leaves_world_untouched() {
        let world = running_world();
        let bytes = encode(&world).unwrap();

        let mut other = World::with_capacity(32, Tuning::default());
        other.tick = 5;
        let err = decode_into(&mut other, &bytes).unwrap_err();
        assert!(matches!(
            err,
            SaveError::CapacityMismatch {
                expected: 32,
                found: 64
            }
        ));
        assert_eq!(other.tick, 5);
        assert_eq!(other.entities.live_count(), 0);
    }

    #[test]
    fn test_header_gates() {
        let world = running_world();
        let bytes = encode(&world).unwrap();
        let header: SaveHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_SIZE]);

        let patched = |h: SaveHeader| {
            let mut b = bytes.clone();
            b[..HEADER_SIZE].copy_from_slice(bytemuck::bytes_of(&h));
            b
        };
        let mut target = World::with_capacity(64, Tuning::default());

        let bad_magic = patched(SaveHeader {
            magic: *b"NOTASAVE",
            ..header
        });
        assert!(matches!(decode_into(&mut target, &bad_magic), Err(SaveError::BadMagic)));

        let old = patched(SaveHeader {
            version: SAVE_FORMAT_VERSION - 1,
            ..header
        });
        assert!(matches!(
            decode_into(&mut target, &old),
            Err(SaveError::VersionMismatch { .. })
        ));

        let resized = patched(SaveHeader {
            entity_size: RECORD_SIZE as u64 + 8,
            ..header
        });
        assert!(matches!(
            decode_into(&mut target, &resized),
            Err(SaveError::EntitySizeMismatch { .. })
        ));

        assert!(matches!(
            decode_into(&mut target, &bytes[..bytes.len() - 1]),
            Err(SaveError::Truncated { .. })
        ));
        assert!(matches!(
            decode_into(&mut target, &bytes[..10]),
            Err(SaveError::Truncated { .. })
        ));
        assert_eq!(target.entities.live_count(), 0);
    }

    #[test]
    fn test_unknown_ai_state_is_refused() {
        let world = running_world();
        let slot = world
            .entities
            .iter()
            .find(|e| e.ai.state.is_some())
            .map(|e| e.slot as usize)
            .unwrap();
        let mut bytes = encode(&world).unwrap();
        let at = HEADER_SIZE + slot * RECORD_SIZE;
        let mut rec: EntityRecord = bytemuck::pod_read_unaligned(&bytes[at..at + RECORD_SIZE]);
        rec.ai_state = 250;
        bytes[at..at + RECORD_SIZE].copy_from_slice(bytemuck::bytes_of(&rec));

        let mut target = World::with_capacity(64, Tuning::default());
        assert!(matches!(
            decode_into(&mut target, &bytes),
            Err(SaveError::UnknownAiState { .. })
        ));
        assert_eq!(target.tick, 0);
    }

    #[test]
    fn test_load_missing_file() {
        let mut world = World::default();
        assert!(matches!(
            load(&mut world, "/definitely/not/here.sav"),
            Err(SaveError::Io(_))
        ));
    }
}
