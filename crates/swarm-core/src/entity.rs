//! Generational entity handles.
//!
//! A slot freed by a removal is handed out again later, under the next
//! generation. Anything still holding the old id (a joint, a sensor's
//! invisible set, a caller) then fails the generation check instead of
//! reaching the newcomer.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// Slot plus generation of a world entity.
///
/// Sorts by slot, then generation, which is the order entities were first
/// given their slot. Serializes as a single `u64`, the same value
/// [`to_raw`](Self::to_raw) stores in rapier's collider user data.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u64", from = "u64")]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Generation in the upper half, slot in the lower half.
    pub fn to_raw(self) -> u64 {
        u64::from(self.generation) << 32 | u64::from(self.index)
    }

    /// Inverse of [`to_raw`](Self::to_raw).
    pub fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> u64 {
        id.to_raw()
    }
}

impl From<u64> for EntityId {
    fn from(raw: u64) -> Self {
        EntityId::from_raw(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Hands out [`EntityId`]s and tracks which of them are still attached.
///
/// Released slots go to the back of a FIFO queue, so a slot is reused only
/// after every other free slot has been handed out once.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    generations: Vec<u32>,
    attached: Vec<bool>,
    free: VecDeque<u32>,
}

impl EntityAllocator {
    /// Create an allocator with no slots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id for a newly added entity.
    pub fn allocate(&mut self) -> EntityId {
        match self.free.pop_front() {
            Some(index) => {
                self.attached[index as usize] = true;
                EntityId::new(index, self.generations[index as usize])
            }
            None => {
                let index = self.generations.len() as u32;
                self.generations.push(0);
                self.attached.push(true);
                EntityId::new(index, 0)
            }
        }
    }

    /// Release an id for good. Returns `false` when the id was already stale.
    pub fn release(&mut self, id: EntityId) -> bool {
        if !self.is_attached(id) {
            return false;
        }
        let slot = id.index() as usize;
        self.attached[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push_back(id.index());
        true
    }

    /// Whether `id` still names a live entity.
    pub fn is_attached(&self, id: EntityId) -> bool {
        let slot = id.index() as usize;
        slot < self.generations.len()
            && self.attached[slot]
            && self.generations[slot] == id.generation()
    }

    /// Number of ids currently handed out.
    pub fn attached_count(&self) -> usize {
        self.attached.iter().filter(|&&a| a).count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
