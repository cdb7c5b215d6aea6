//! Opaque handles into slot tables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel slot index marking a handle that refers to nothing.
pub(crate) const NO_SLOT: u32 = u32::MAX;

/// Opaque `(slot index, generation)` pair identifying a stored object.
///
/// A handle keeps addressing the same object while the table compacts its
/// payload storage, because it points at a slot rather than at an array
/// position. Once the object is removed the slot's generation no longer
/// matches and the handle is rejected by every lookup.
///
/// Generations are 32-bit and wrap, so a removed handle is rejected until
/// its slot has been reused 2^32 inserts later.
///
/// Handles order by slot index first, then by generation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// The handle that never refers to a stored object ("no parent").
    pub const INVALID: Self = Self {
        index: NO_SLOT,
        generation: u32::MAX,
    };

    /// Build a handle from raw parts.
    ///
    /// Mostly useful for tests and diagnostics; tables only honor handles whose
    /// generation matches the occupant of `index`.
    #[must_use]
    pub const fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the table's validity array.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation stamped at insertion time.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// `true` unless this is [`Handle::INVALID`] (or any handle with the sentinel index).
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.index != NO_SLOT
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Handle({}v{})", self.index, self.generation)
        } else {
            f.write_str("Handle(invalid)")
        }
    }
}

/// Slot state in the validity array.
///
/// A free slot links to the next free slot, forming the free list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Occupied { payload_index: u32, generation: u32 },
    Free { next: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_handle_is_invalid() {
        let handle = Handle::default();
        assert!(!handle.is_valid());
        assert_eq!(handle, Handle::INVALID);
        assert_eq!(handle.index(), u32::MAX);
    }

    #[test]
    fn test_raw_parts() {
        let handle = Handle::from_raw_parts(100, 200);
        assert!(handle.is_valid());
        assert_eq!(handle.index(), 100);
        assert_eq!(handle.generation(), 200);
    }

    #[test]
    fn test_ordering_by_index_then_generation() {
        let a = Handle::from_raw_parts(1, 9);
        let b = Handle::from_raw_parts(2, 0);
        let c = Handle::from_raw_parts(2, 1);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", Handle::from_raw_parts(3, 7)), "Handle(3v7)");
        assert_eq!(format!("{:?}", Handle::INVALID), "Handle(invalid)");
    }
}
