//! Host-side indirection from opaque model handles to guest handles.
//!
//! The guest decides whether a model exists; this table only guarantees the
//! host never sends a handle whose destroy call already succeeded.

use std::fmt;

use ahash::RandomState;
use hashbrown::HashMap;

use crate::errors::ArgumentError;

/// Most models one registry can hold at once.
pub const MAX_MODELS: usize = u16::MAX as usize;
const MAX_GENERATION: u16 = 0x7FFF;

/// Opaque reference to a guest-owned simulation instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModelHandle {
    slot: u16,
    generation: u16,
}

impl ModelHandle {
    /// Packs into a non-negative `i32` for the C call surface.
    pub fn to_raw(self) -> i32 {
        (i32::from(self.generation) << 16) | i32::from(self.slot)
    }

    pub fn from_raw(raw: i32) -> Option<Self> {
        if raw < 0 {
            return None;
        }
        let generation = (raw >> 16) as u16;
        if generation == 0 || generation > MAX_GENERATION {
            return None;
        }
        Some(Self {
            slot: (raw & 0xFFFF) as u16,
            generation,
        })
    }
}

impl fmt::Display for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_raw())
    }
}

#[derive(Debug)]
struct Slot {
    generation: u16,
    guest: Option<i64>,
}

fn next_generation(g: u16) -> u16 {
    if g >= MAX_GENERATION { 1 } else { g + 1 }
}

#[derive(Debug)]
pub struct HandleRegistry {
    slots: Vec<Slot>,
    free: Vec<u16>,
    by_guest: HashMap<i64, u16, RandomState>,
    limit: usize,
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::with_limit(MAX_MODELS)
    }
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// At most `limit` live models, capped at [`MAX_MODELS`].
    pub fn with_limit(limit: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            by_guest: HashMap::default(),
            limit: limit.min(MAX_MODELS),
        }
    }

    pub fn len(&self) -> usize {
        self.by_guest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_guest.is_empty()
    }

    pub fn contains_guest(&self, guest: i64) -> bool {
        self.by_guest.contains_key(&guest)
    }

    pub fn insert(&mut self, guest: i64) -> Result<ModelHandle, ArgumentError> {
        if self.by_guest.len() >= self.limit {
            return Err(ArgumentError::RegistryFull);
        }
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(Slot {
                    generation: 1,
                    guest: None,
                });
                (self.slots.len() - 1) as u16
            }
        };
        let entry = &mut self.slots[slot as usize];
        entry.guest = Some(guest);
        self.by_guest.insert(guest, slot);
        Ok(ModelHandle {
            slot,
            generation: entry.generation,
        })
    }

    /// Guest handle for a live model.
    pub fn resolve(&self, handle: ModelHandle) -> Result<i64, ArgumentError> {
        self.slots
            .get(handle.slot as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.guest)
            .ok_or(ArgumentError::StaleHandle(handle.to_raw()))
    }

    /// Retires a handle. Only call once the guest confirmed the destroy.
    pub fn remove(&mut self, handle: ModelHandle) -> Result<i64, ArgumentError> {
        let guest = self.resolve(handle)?;
        let entry = &mut self.slots[handle.slot as usize];
        entry.guest = None;
        entry.generation = next_generation(entry.generation);
        self.by_guest.remove(&guest);
        self.free.push(handle.slot);
        Ok(guest)
    }

    /// Drops every live entry, returning how many were still live.
    pub fn clear(&mut self) -> usize {
        let live = self.by_guest.len();
        self.slots.clear();
        self.free.clear();
        self.by_guest.clear();
        live
    }
}
