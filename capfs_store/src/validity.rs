//! Validity tracking
//!
//! Every cell carries a flags word. Bit `i` is set iff slot `i` of that
//! cell holds a capability token that was stored through `put_cap` and has
//! not been touched by a plain byte write since.
//!
//! All functions here are pure operations on a single flags word.

use capfs_hal::{SLOTS_PER_CELL, SLOT_SIZE};

/// Bits that may be set in a flags word. Bit 63 has no slot.
pub const VALID_BITS: u64 = (1 << SLOTS_PER_CELL) - 1;

/// Contiguous mask covering slots `from..=to`.
pub const fn slot_mask(from: usize, to: usize) -> u64 {
    debug_assert!(from <= to && to < SLOTS_PER_CELL);
    (VALID_BITS >> (SLOTS_PER_CELL - 1 - to)) & (VALID_BITS << from)
}

/// Marks slots `from..=to` as holding capabilities.
pub const fn set_valid(flags: u64, from: usize, to: usize) -> u64 {
    flags | slot_mask(from, to)
}

/// Marks slots `from..=to` as plain data.
pub const fn clear_valid(flags: u64, from: usize, to: usize) -> u64 {
    flags & !slot_mask(from, to)
}

pub const fn is_valid(flags: u64, slot: usize) -> bool {
    slot < SLOTS_PER_CELL && flags & (1 << slot) != 0
}

/// Slots touched, fully or partially, by `len` bytes starting at intra-cell
/// offset `start`. `None` for an empty range.
pub fn touched_slots(start: usize, len: usize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    Some((start / SLOT_SIZE, (start + len - 1) / SLOT_SIZE))
}
