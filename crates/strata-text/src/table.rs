//! Open-addressing hash table with linear probing.
//!
//! Both the font cache and the per-font glyph tables use this container.
//! Entries are never removed, so there are no tombstones: a probe sequence ends
//! at the first empty slot or after it has wrapped around to where it started.
//! Growth is explicit and all-or-nothing: a larger slot array is built, every
//! live entry is reinserted into it, and only then is it swapped in.

use std::fmt;

/// Keys stored in a [`ProbeTable`] supply their own hash.
///
/// The home slot of a key is `probe_hash() % capacity`.
pub trait ProbeHash: Eq {
    /// Hash used to pick the home slot.
    fn probe_hash(&self) -> u64;
}

impl ProbeHash for u32 {
    #[inline]
    fn probe_hash(&self) -> u64 {
        u64::from(*self)
    }
}

/// Multiplicative running string hash (`h = h * 33 + byte`, seeded with 5381).
pub fn djb2(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(5381u32, |h, &b| h.wrapping_mul(33).wrapping_add(u32::from(b)))
}

/// Returned by [`ProbeTable::insert`] when every slot is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFull {
    /// Capacity of the table.
    pub capacity: usize,
}

impl fmt::Display for TableFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table is full ({} slots)", self.capacity)
    }
}

impl std::error::Error for TableFull {}

/// Fixed-capacity open-addressing map.
pub struct ProbeTable<K, V> {
    slots: Vec<Option<(K, V)>>,
    len: usize,
}

impl<K: ProbeHash, V> ProbeTable<K, V> {
    /// Create a table with `capacity` slots (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: empty_slots(capacity.max(1)),
            len: 0,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    fn home(&self, key: &K) -> usize {
        (key.probe_hash() % self.slots.len() as u64) as usize
    }

    /// Slot index holding `key`, if present.
    fn position(&self, key: &K) -> Option<usize> {
        let cap = self.slots.len();
        let start = self.home(key);
        let mut idx = start;

        loop {
            match &self.slots[idx] {
                None => return None,
                Some((k, _)) if k == key => return Some(idx),
                Some(_) => {}
            }
            idx = (idx + 1) % cap;
            if idx == start {
                return None;
            }
        }
    }

    /// Look up a key.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.position(key)
            .and_then(|idx| self.slots[idx].as_ref())
            .map(|(_, v)| v)
    }

    /// Look up a key for modification.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let idx = self.position(key)?;
        self.slots[idx].as_mut().map(|(_, v)| v)
    }

    /// Whether the key is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.position(key).is_some()
    }

    /// Insert a key, replacing the value if the key is already present.
    ///
    /// Fails with [`TableFull`] if the key is new and no slot is free.
    pub fn insert(&mut self, key: K, value: V) -> Result<&mut V, TableFull> {
        let cap = self.slots.len();
        let start = self.home(&key);
        let mut idx = start;

        while matches!(&self.slots[idx], Some((k, _)) if *k != key) {
            idx = (idx + 1) % cap;
            if idx == start {
                return Err(TableFull { capacity: cap });
            }
        }

        if self.slots[idx].is_none() {
            self.len += 1;
        }
        let entry = self.slots[idx].insert((key, value));
        Ok(&mut entry.1)
    }

    /// Add `additional` slots, rehashing every entry into the new array.
    pub fn grow(&mut self, additional: usize) {
        let new_cap = self.slots.len() + additional;
        let mut slots = empty_slots(new_cap);

        for (key, value) in self.slots.drain(..).flatten() {
            let mut idx = (key.probe_hash() % new_cap as u64) as usize;
            while slots[idx].is_some() {
                idx = (idx + 1) % new_cap;
            }
            slots[idx] = Some((key, value));
        }

        self.slots = slots;
    }

    /// Iterate over entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.slots.iter().flatten().map(|(k, v)| (k, v))
    }

    /// Iterate over values in slot order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// Iterate mutably over values in slot order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.slots.iter_mut().flatten().map(|(_, v)| v)
    }
}

fn empty_slots<K, V>(capacity: usize) -> Vec<Option<(K, V)>> {
    std::iter::repeat_with(|| None).take(capacity).collect()
}

impl<K: ProbeHash + fmt::Debug, V> fmt::Debug for ProbeTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeTable")
            .field("capacity", &self.capacity())
            .field("len", &self.len)
            .finish()
    }
}
