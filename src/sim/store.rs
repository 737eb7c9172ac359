//! Fixed-capacity entity store with generation-tagged handles
//!
//! Slots are never grown or shrunk. A slot with `Prop::Active` clear is free;
//! releasing a slot bumps its generation so every outstanding [`Handle`] to it
//! stops resolving, even after the slot is reused.

use super::entity::{Entity, Handle, Prop};
use crate::consts::MAX_ENTITIES;

/// The entity array
#[derive(Debug, Clone)]
pub struct EntityStore {
    slots: Box<[Entity]>,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    /// Store with the build's fixed capacity
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTITIES)
    }

    /// Store with an explicit capacity (tests and tools)
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|i| Entity {
                slot: i as u32,
                ..Default::default()
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of active slots
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|e| e.is_active()).count()
    }

    /// Copy `template` into the first free slot.
    ///
    /// The slot keeps its running generation. Returns `None` when the array
    /// is full; callers treat spawning as best effort.
    pub fn allocate(&mut self, template: Entity) -> Option<&mut Entity> {
        let Some(index) = self.slots.iter().position(|e| !e.is_active()) else {
            log::debug!("entity store full ({} slots), spawn dropped", self.capacity());
            return None;
        };

        let slot = &mut self.slots[index];
        let generation = slot.generation;
        *slot = template;
        slot.generation = generation;
        slot.slot = index as u32;
        slot.give(Prop::Active);
        Some(slot)
    }

    /// Allocate and hand back a handle instead of a borrow
    pub fn spawn(&mut self, template: Entity) -> Option<Handle> {
        self.allocate(template).map(|e| e.handle())
    }

    /// Free a slot, invalidating every handle to it.
    ///
    /// Releasing an already free slot does nothing and returns `false`, so the
    /// generation is bumped exactly once per removal.
    pub fn release(&mut self, index: usize) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        if !slot.is_active() {
            return false;
        }
        slot.generation += 1;
        slot.take(Prop::Active);
        true
    }

    /// Cursor iteration over active slots in ascending order.
    ///
    /// `None` starts from the beginning; a `None` result ends the sequence.
    /// Holding only an index lets callers mutate the store between steps.
    pub fn next_live(&self, cursor: Option<usize>) -> Option<usize> {
        let start = cursor.map_or(0, |c| c + 1);
        (start..self.slots.len()).find(|&i| self.slots[i].is_active())
    }

    /// Borrowing iterator over active entities
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.slots.iter().filter(|e| e.is_active())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> + '_ {
        self.slots.iter_mut().filter(|e| e.is_active())
    }

    /// Visit every active entity
    pub fn for_each_live(&self, mut visit: impl FnMut(&Entity)) {
        self.iter().for_each(|e| visit(e));
    }

    /// Snapshot of the active slot indices
    pub fn live_slots(&self) -> Vec<usize> {
        self.iter().map(|e| e.slot as usize).collect()
    }

    /// Handle for the entity currently in `index`, `None` past the capacity
    pub fn handle_of(&self, index: usize) -> Option<Handle> {
        self.slots.get(index).map(|e| Handle {
            index: index as u32,
            generation: e.generation,
        })
    }

    /// Slot index of a live handle
    pub fn resolve_slot(&self, handle: Handle) -> Option<usize> {
        let slot = self.slots.get(handle.index())?;
        (slot.is_active() && slot.generation == handle.generation).then_some(handle.index())
    }

    pub fn resolve(&self, handle: Handle) -> Option<&Entity> {
        let i = self.resolve_slot(handle)?;
        Some(&self.slots[i])
    }

    pub fn resolve_mut(&mut self, handle: Handle) -> Option<&mut Entity> {
        let i = self.resolve_slot(handle)?;
        Some(&mut self.slots[i])
    }

    /// Resolve an optional handle, as stored in entity fields
    pub fn resolve_opt(&self, handle: Option<Handle>) -> Option<&Entity> {
        handle.and_then(|h| self.resolve(h))
    }

    /// Raw slot access, active or not
    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.slots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.slots.get_mut(index)
    }

    /// Raw slot view, used by persistence
    pub fn slots(&self) -> &[Entity] {
        &self.slots
    }

    /// Replace every slot at once. `slots` must match the capacity.
    pub(crate) fn replace_slots(&mut self, slots: Box<[Entity]>) {
        debug_assert_eq!(slots.len(), self.slots.len());
        self.slots = slots;
    }
}

impl std::ops::Index<usize> for EntityStore {
    type Output = Entity;

    fn index(&self, index: usize) -> &Entity {
        &self.slots[index]
    }
}

impl std::ops::IndexMut<usize> for EntityStore {
    fn index_mut(&mut self, index: usize) -> &mut Entity {
        &mut self.slots[index]
    }
}
