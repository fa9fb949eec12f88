//! Index-addressed storage for handles and callbacks.
//!
//! [`Arena`] is append-only: object handles are never freed individually
//! once cached, so their IDs stay valid for the life of the process context.
//! [`SlotArena`] backs callbacks, which do come and go: its keys carry a
//! generation, and a key that outlives its entry fails the generation check
//! instead of aliasing whatever reuses the slot.

use std::marker::PhantomData;
use std::ops::Index;

/// Trait for opaque ID types used as [`Arena`] keys.
pub trait ArenaId: Copy {
    /// Creates an ID from a raw `u32` index.
    fn from_raw(index: u32) -> Self;

    /// Returns the raw `u32` index.
    fn as_raw(self) -> u32;
}

/// A dense, append-only, ID-indexed container.
#[derive(Debug, Clone)]
pub struct Arena<I: ArenaId, T> {
    items: Vec<T>,
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Allocates a new item in the arena and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = I::from_raw(self.items.len() as u32);
        self.items.push(item);
        id
    }

    /// Returns the item with the given ID, if it was allocated here.
    pub fn get(&self, id: I) -> Option<&T> {
        self.items.get(id.as_raw() as usize)
    }

    /// Returns the item with the given ID mutably, if it was allocated here.
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.items.get_mut(id.as_raw() as usize)
    }

    /// Returns the number of items in the arena.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the arena contains no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over `(ID, &T)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (I::from_raw(i as u32), item))
    }

    /// Removes every item, invalidating all IDs.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        &self.items[id.as_raw() as usize]
    }
}

/// Trait for generational keys used with [`SlotArena`].
pub trait SlotKey: Copy {
    /// Builds a key from a slot index and generation.
    fn from_parts(index: u32, generation: u32) -> Self;

    /// Returns the slot index.
    fn index(self) -> u32;

    /// Returns the generation the key was issued for.
    fn generation(self) -> u32;
}

/// What a key refers to in a [`SlotArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotProbe {
    /// The key names a live entry.
    Live,
    /// The slot exists but was freed (and possibly reused) since the key was issued.
    Stale,
    /// No slot with this index and generation was ever issued.
    Unallocated,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage addressed by `(index, generation)` keys.
///
/// Generations start at 1, so a key with generation 0 is never valid.
#[derive(Debug)]
pub struct SlotArena<K: SlotKey, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
    _marker: PhantomData<K>,
}

impl<K: SlotKey, T> Default for SlotArena<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: SlotKey, T> SlotArena<K, T> {
    /// Creates an empty slot arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Stores `value` and returns its key, reusing a freed slot if one exists.
    pub fn insert(&mut self, value: T) -> K {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return K::from_parts(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 1,
            value: Some(value),
        });
        K::from_parts(index, 1)
    }

    /// Classifies a key without borrowing the entry.
    pub fn probe(&self, key: K) -> SlotProbe {
        match self.slots.get(key.index() as usize) {
            None => SlotProbe::Unallocated,
            Some(_) if key.generation() == 0 => SlotProbe::Unallocated,
            Some(slot) if slot.generation == key.generation() && slot.value.is_some() => {
                SlotProbe::Live
            }
            Some(slot) if key.generation() > slot.generation => SlotProbe::Unallocated,
            Some(_) => SlotProbe::Stale,
        }
    }

    /// Returns the entry for a live key.
    pub fn get(&self, key: K) -> Option<&T> {
        let slot = self.slots.get(key.index() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    /// Returns the entry for a live key mutably.
    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.index() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }
        slot.value.as_mut()
    }

    /// Removes and returns the entry for a live key. The key, and every
    /// copy of it, is stale afterwards.
    pub fn remove(&mut self, key: K) -> Option<T> {
        let slot = self.slots.get_mut(key.index() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.checked_add(1).unwrap_or(1);
        self.free.push(key.index());
        self.len -= 1;
        Some(value)
    }

    /// Returns `true` if the key names a live entry.
    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if there are no live entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the keys of all live entries in slot order.
    pub fn keys(&self) -> Vec<K> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.value.is_some())
            .map(|(i, slot)| K::from_parts(i as u32, slot.generation))
            .collect()
    }
}
