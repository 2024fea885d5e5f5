//! Linear range decomposition
//!
//! The store exposes a flat address space of `cell_count * 504` data bytes.
//! Address `a` lives in cell `a / 504` at intra-cell offset `a % 504`.
//!
//! A byte range is split into three phases:
//!
//! - **head**: the partial cell the range starts in (if it does not start on
//!   a cell boundary, or if the whole range fits inside one cell)
//! - **interior**: cells the range covers completely
//! - **tail**: the partial cell the range ends in
//!
//! Partial cells need read-modify-write; interior cells do not.

use capfs_hal::CELL_DATA_SIZE;
use std::ops::Range;

const CELL_BYTES: u64 = CELL_DATA_SIZE as u64;

/// Cell holding data address `addr`
pub fn cell_of(addr: u64) -> u64 {
    addr / CELL_BYTES
}

/// Intra-cell offset of data address `addr`
pub fn offset_in_cell(addr: u64) -> usize {
    (addr % CELL_BYTES) as usize
}

/// A partial cell: `len` bytes starting at intra-cell offset `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSpan {
    pub cell_id: u64,
    pub start: usize,
    pub len: usize,
}

impl CellSpan {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Three-phase split of a byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangePlan {
    pub head: Option<CellSpan>,
    pub interior: Range<u64>,
    pub tail: Option<CellSpan>,
}

impl RangePlan {
    /// Splits `[addr, addr + len)`. The caller has checked that the range
    /// does not overflow.
    pub fn new(addr: u64, len: u64) -> Self {
        let empty = Self {
            head: None,
            interior: 0..0,
            tail: None,
        };
        if len == 0 {
            return empty;
        }

        let end = addr + len;
        let first = cell_of(addr);
        let start = offset_in_cell(addr);

        // Whole range inside one partial cell
        if first == cell_of(end - 1) && len < CELL_BYTES {
            return Self {
                head: Some(CellSpan {
                    cell_id: first,
                    start,
                    len: len as usize,
                }),
                ..empty
            };
        }

        let head = (start != 0).then(|| CellSpan {
            cell_id: first,
            start,
            len: CELL_DATA_SIZE - start,
        });
        let interior_start = if start != 0 { first + 1 } else { first };
        let interior_end = cell_of(end);
        let tail_len = offset_in_cell(end);
        let tail = (tail_len != 0).then(|| CellSpan {
            cell_id: interior_end,
            start: 0,
            len: tail_len,
        });

        Self {
            head,
            interior: interior_start..interior_end,
            tail,
        }
    }

    /// Last cell touched, if any.
    pub fn last_cell(&self) -> Option<u64> {
        self.tail
            .map(|span| span.cell_id)
            .or_else(|| (!self.interior.is_empty()).then(|| self.interior.end - 1))
            .or_else(|| self.head.map(|span| span.cell_id))
    }

    /// Total number of cells touched.
    pub fn cell_count(&self) -> u64 {
        self.head.is_some() as u64
            + (self.interior.end - self.interior.start)
            + self.tail.is_some() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(cell_id: u64, start: usize, len: usize) -> Option<CellSpan> {
        Some(CellSpan {
            cell_id,
            start,
            len,
        })
    }

    #[test]
    fn test_empty_range() {
        let plan = RangePlan::new(1000, 0);
        assert_eq!(plan.head, None);
        assert!(plan.interior.is_empty());
        assert_eq!(plan.tail, None);
        assert_eq!(plan.cell_count(), 0);
        assert_eq!(plan.last_cell(), None);
    }

    #[test]
    fn test_inside_one_cell() {
        // 1000 = 1 * 504 + 496
        let plan = RangePlan::new(1000, 5);
        assert_eq!(plan.head, span(1, 496, 5));
        assert!(plan.interior.is_empty());
        assert_eq!(plan.tail, None);
        assert_eq!(plan.cell_count(), 1);
    }

    #[test]
    fn test_aligned_partial_cell() {
        let plan = RangePlan::new(504, 10);
        assert_eq!(plan.head, span(1, 0, 10));
        assert!(plan.interior.is_empty());
        assert_eq!(plan.tail, None);
    }

    #[test]
    fn test_exactly_one_cell() {
        let plan = RangePlan::new(504, 504);
        assert_eq!(plan.head, None);
        assert_eq!(plan.interior, 1..2);
        assert_eq!(plan.tail, None);
        assert_eq!(plan.last_cell(), Some(1));
    }

    #[test]
    fn test_head_and_tail_without_interior() {
        let plan = RangePlan::new(500, 10);
        assert_eq!(plan.head, span(0, 500, 4));
        assert!(plan.interior.is_empty());
        assert_eq!(plan.tail, span(1, 0, 6));
        assert_eq!(plan.cell_count(), 2);
    }

    #[test]
    fn test_all_three_phases() {
        // 100..(100 + 2000) = cells 0 (head), 1..4 (interior), 4 (tail)
        let plan = RangePlan::new(100, 2000);
        assert_eq!(plan.head, span(0, 100, 404));
        assert_eq!(plan.interior, 1..4);
        assert_eq!(plan.tail, span(4, 0, 2100 - 4 * 504));
        assert_eq!(plan.cell_count(), 5);
        assert_eq!(plan.last_cell(), Some(4));
    }

    #[test]
    fn test_ends_on_cell_boundary() {
        let plan = RangePlan::new(200, 808);
        assert_eq!(plan.head, span(0, 200, 304));
        assert_eq!(plan.interior, 1..2);
        assert_eq!(plan.tail, None);
    }

    #[test]
    fn test_phase_lengths_sum_to_range() {
        for (addr, len) in [(0u64, 1u64), (3, 1500), (503, 2), (504, 1008), (777, 5000)] {
            let plan = RangePlan::new(addr, len);
            let total = plan.head.map_or(0, |s| s.len as u64)
                + (plan.interior.end - plan.interior.start) * CELL_BYTES
                + plan.tail.map_or(0, |s| s.len as u64);
            assert_eq!(total, len, "addr={addr} len={len}");
            assert_eq!(plan.last_cell(), Some(cell_of(addr + len - 1)));
        }
    }
}
