//! Fixed-capacity slot table with no heap allocation.

use std::array;

use super::handle::{Handle, Slot, NO_SLOT};
use super::slot_table::to_u32;

/// Slot table variant that holds at most `N` values in inline arrays.
///
/// Same handle semantics as [`SlotTable`](super::SlotTable), for bounded,
/// pre-sized use. Inserting into a full table is a caller bug and panics;
/// check [`StaticSlotTable::is_full`] first when in doubt.
///
/// # Examples
///
/// ```
/// use slot_scheduler::table::StaticSlotTable;
///
/// let mut table: StaticSlotTable<u32, 4> = StaticSlotTable::new();
/// let h = table.insert(7);
/// assert_eq!(table.get(h), Some(&7));
/// assert_eq!(table.capacity(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct StaticSlotTable<T, const N: usize> {
    slots: [Slot; N],
    payload: [Option<T>; N],
    owners: [u32; N],
    len: usize,
    free_head: u32,
    /// Table-wide stamp, wrapping after 2^32 inserts. A stale handle can only
    /// validate again if its slot is reused exactly 2^32 inserts later.
    next_generation: u32,
}

impl<T, const N: usize> StaticSlotTable<T, N> {
    /// Create an empty table with every slot threaded onto the free list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: array::from_fn(|i| Slot::Free {
                next: if i + 1 < N { to_u32(i + 1) } else { NO_SLOT },
            }),
            payload: array::from_fn(|_| None),
            owners: [NO_SLOT; N],
            len: 0,
            free_head: if N == 0 { NO_SLOT } else { 0 },
            next_generation: 0,
        }
    }

    /// Store `value` and return its handle.
    ///
    /// # Panics
    ///
    /// Panics when the table already holds `N` values.
    pub fn insert(&mut self, value: T) -> Handle {
        assert!(self.len < N, "StaticSlotTable capacity of {N} exceeded");

        let index = self.free_head;
        let slot = &mut self.slots[index as usize];
        self.free_head = match *slot {
            Slot::Free { next } => next,
            Slot::Occupied { .. } => NO_SLOT,
        };

        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        *slot = Slot::Occupied {
            payload_index: to_u32(self.len),
            generation,
        };

        self.payload[self.len] = Some(value);
        self.owners[self.len] = index;
        self.len += 1;
        Handle::from_raw_parts(index, generation)
    }

    /// Remove the value behind `handle`; `false` if it does not exist.
    pub fn remove(&mut self, handle: Handle) -> bool {
        self.take(handle).is_some()
    }

    /// Remove the value behind `handle` and hand it back.
    pub fn take(&mut self, handle: Handle) -> Option<T> {
        let removed = self.payload_index(handle)?;
        let value = self.payload[removed].take();

        let last = self.len - 1;
        if removed != last {
            self.payload[removed] = self.payload[last].take();
            self.owners[removed] = self.owners[last];
            let moved_owner = self.owners[removed];
            if let Slot::Occupied { payload_index, .. } = &mut self.slots[moved_owner as usize] {
                *payload_index = to_u32(removed);
            }
        }
        self.owners[last] = NO_SLOT;
        self.len = last;

        self.slots[handle.index() as usize] = Slot::Free {
            next: self.free_head,
        };
        self.free_head = handle.index();
        value
    }

    /// Shared reference to the value behind `handle`.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.payload_index(handle)
            .and_then(|i| self.payload[i].as_ref())
    }

    /// Mutable reference to the value behind `handle`.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.payload_index(handle)
            .and_then(|i| self.payload[i].as_mut())
    }

    /// Whether `handle` addresses a live value. Out-of-range indices are
    /// simply absent.
    #[must_use]
    pub fn exists(&self, handle: Handle) -> bool {
        self.payload_index(handle).is_some()
    }

    /// Number of live values.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.len
    }

    /// Alias of [`StaticSlotTable::size`].
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// `true` when no value is stored.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `true` when another insert would panic.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.len == N
    }

    /// Maximum number of values, `N`.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Live values in payload order.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.payload[..self.len].iter().flatten()
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

impl<T, const N: usize> Default for StaticSlotTable<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
