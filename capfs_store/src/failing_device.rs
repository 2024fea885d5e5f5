//! # Failing Cell Device
//!
//! Wraps a [`CellDevice`] and fails chosen operations with `CellError::Io`.
//! Tests use it to show that device errors surface as `BackendError::Io`
//! and that rejected requests never reach the device.

use capfs_hal::{CellDevice, CellError, CELL_SIZE};
use std::fmt;

/// Which operations fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Pass everything through
    Never,
    /// Let `n` writes through, then fail every write and flush
    AfterWrites(usize),
    /// Fail writes to these cells
    OnCells(Vec<u64>),
    /// Fail reads of these cells
    OnReads(Vec<u64>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Read,
    Write,
    Flush,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Op::Read => "read",
            Op::Write => "write",
            Op::Flush => "flush",
        })
    }
}

impl FailurePolicy {
    fn trips(&self, op: Op, cell_id: Option<u64>, writes: usize) -> bool {
        match (self, op) {
            (Self::AfterWrites(n), Op::Write | Op::Flush) => writes >= *n,
            (Self::OnCells(cells), Op::Write) | (Self::OnReads(cells), Op::Read) => {
                cell_id.map_or(false, |id| cells.contains(&id))
            }
            _ => false,
        }
    }
}

/// Device wrapper that counts the calls it lets through
#[derive(Debug)]
pub struct FailingCellDevice<D: CellDevice> {
    inner: D,
    policy: FailurePolicy,
    reads: usize,
    writes: usize,
}

impl<D: CellDevice> FailingCellDevice<D> {
    pub fn new(inner: D, policy: FailurePolicy) -> Self {
        Self {
            inner,
            policy,
            reads: 0,
            writes: 0,
        }
    }

    /// Reads that reached the inner device
    pub fn read_count(&self) -> usize {
        self.reads
    }

    /// Writes that reached the inner device
    pub fn write_count(&self) -> usize {
        self.writes
    }

    fn gate(&mut self, op: Op, cell_id: Option<u64>) -> Result<(), CellError> {
        if self.policy.trips(op, cell_id, self.writes) {
            return Err(CellError::Io(match cell_id {
                Some(id) => format!("injected {op} failure on cell {id}"),
                None => format!("injected {op} failure"),
            }));
        }
        match op {
            Op::Read => self.reads += 1,
            Op::Write => self.writes += 1,
            Op::Flush => {}
        }
        Ok(())
    }
}

impl<D: CellDevice> CellDevice for FailingCellDevice<D> {
    fn cell_count(&self) -> u64 {
        self.inner.cell_count()
    }

    fn read_cell(&mut self, cell_id: u64, buffer: &mut [u8; CELL_SIZE]) -> Result<(), CellError> {
        self.gate(Op::Read, Some(cell_id))?;
        self.inner.read_cell(cell_id, buffer)
    }

    fn write_cell(&mut self, cell_id: u64, buffer: &[u8; CELL_SIZE]) -> Result<(), CellError> {
        self.gate(Op::Write, Some(cell_id))?;
        self.inner.write_cell(cell_id, buffer)
    }

    fn flush(&mut self) -> Result<(), CellError> {
        self.gate(Op::Flush, None)?;
        self.inner.flush()
    }
}
