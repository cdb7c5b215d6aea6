//! Growable slot table with compact payload storage.

use std::ops::{Index, IndexMut};

use super::handle::{Handle, Slot, NO_SLOT};

/// Handle-indexed storage with O(1) insert, remove and lookup.
///
/// Values live contiguously in a payload array. Removing a value moves the
/// last live value into the vacated position, so iteration over
/// [`SlotTable::values`] never hits holes. A reverse-lookup array maps each
/// payload position back to its owning slot, which keeps the fix-up after a
/// move O(1).
///
/// The table does no locking of its own; wrap it in a mutex to share it.
///
/// # Examples
///
/// ```
/// use slot_scheduler::table::SlotTable;
///
/// let mut table = SlotTable::new();
/// let a = table.insert("a");
/// let b = table.insert("b");
/// assert!(table.remove(a));
/// assert!(!table.exists(a));
/// assert_eq!(table.get(b), Some(&"b"));
/// assert_eq!(table.size(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SlotTable<T> {
    /// Validity array, addressed by `Handle::index`.
    slots: Vec<Slot>,
    /// Compact payload array.
    payload: Vec<T>,
    /// `owners[i]` is the slot whose value sits at `payload[i]`.
    owners: Vec<u32>,
    /// Head of the free-slot list, `NO_SLOT` when empty.
    free_head: u32,
    /// Table-wide stamp, wrapping after 2^32 inserts. A stale handle can only
    /// validate again if its slot is reused exactly 2^32 inserts later.
    next_generation: u32,
}

impl<T> SlotTable<T> {
    /// Create an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            payload: Vec::new(),
            owners: Vec::new(),
            free_head: NO_SLOT,
            next_generation: 0,
        }
    }

    /// Create an empty table with room for `capacity` values before reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            payload: Vec::with_capacity(capacity),
            owners: Vec::with_capacity(capacity),
            free_head: NO_SLOT,
            next_generation: 0,
        }
    }

    /// Store `value` and return the handle that addresses it.
    ///
    /// Reuses the most recently freed slot when there is one.
    pub fn insert(&mut self, value: T) -> Handle {
        let payload_index = to_u32(self.payload.len());
        self.payload.push(value);

        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        let occupied = Slot::Occupied {
            payload_index,
            generation,
        };

        let index = if self.free_head == NO_SLOT {
            self.slots.push(occupied);
            to_u32(self.slots.len() - 1)
        } else {
            let index = self.free_head;
            let slot = &mut self.slots[index as usize];
            self.free_head = match *slot {
                Slot::Free { next } => next,
                Slot::Occupied { .. } => {
                    debug_assert!(false, "free list points at an occupied slot");
                    NO_SLOT
                }
            };
            *slot = occupied;
            index
        };

        self.owners.push(index);
        Handle::from_raw_parts(index, generation)
    }

    /// Remove the value behind `handle`.
    ///
    /// Returns `false`, without touching the table, when the handle is stale
    /// or out of range.
    pub fn remove(&mut self, handle: Handle) -> bool {
        self.take(handle).is_some()
    }

    /// Remove the value behind `handle` and hand it back.
    pub fn take(&mut self, handle: Handle) -> Option<T> {
        let removed = self.payload_index(handle)?;

        let value = self.payload.swap_remove(removed);
        self.owners.swap_remove(removed);
        if removed < self.payload.len() {
            // the former last value now lives at `removed`
            let moved_owner = self.owners[removed];
            if let Slot::Occupied { payload_index, .. } = &mut self.slots[moved_owner as usize] {
                *payload_index = to_u32(removed);
            }
        }

        self.slots[handle.index() as usize] = Slot::Free {
            next: self.free_head,
        };
        self.free_head = handle.index();
        Some(value)
    }

    /// Shared reference to the value behind `handle`, if it still exists.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.payload_index(handle).map(|i| &self.payload[i])
    }

    /// Mutable reference to the value behind `handle`, if it still exists.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.payload_index(handle).map(|i| &mut self.payload[i])
    }

    /// Whether `handle` addresses a live value.
    #[must_use]
    pub fn exists(&self, handle: Handle) -> bool {
        self.payload_index(handle).is_some()
    }

    /// Number of live values.
    #[must_use]
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Alias of [`SlotTable::size`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// `true` when no value is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Length of the validity array: live plus free slots.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Live values in payload order.
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.payload
    }

    /// Live values with their handles, in payload order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.owners
            .iter()
            .zip(&self.payload)
            .filter_map(|(&slot, value)| match self.slots[slot as usize] {
                Slot::Occupied { generation, .. } => {
                    Some((Handle::from_raw_parts(slot, generation), value))
                }
                Slot::Free { .. } => None,
            })
    }

    /// Drop every value. Outstanding handles stay invalid afterwards because
    /// generations keep counting.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.payload.clear();
        self.owners.clear();
        self.free_head = NO_SLOT;
    }

    fn payload_index(&self, handle: Handle) -> Option<usize> {
        match self.slots.get(handle.index() as usize)? {
            Slot::Occupied {
                payload_index,
                generation,
            } if *generation == handle.generation() => Some(*payload_index as usize),
            _ => None,
        }
    }
}

impl<T> Default for SlotTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<Handle> for SlotTable<T> {
    type Output = T;

    fn index(&self, handle: Handle) -> &T {
        match self.get(handle) {
            Some(value) => value,
            None => panic!("no value for {handle:?}"),
        }
    }
}

impl<T> IndexMut<Handle> for SlotTable<T> {
    fn index_mut(&mut self, handle: Handle) -> &mut T {
        match self.get_mut(handle) {
            Some(value) => value,
            None => panic!("no value for {handle:?}"),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) fn to_u32(n: usize) -> u32 {
    debug_assert!(n < NO_SLOT as usize, "slot table index overflow");
    n as u32
}
