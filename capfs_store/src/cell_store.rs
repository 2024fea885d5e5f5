//! Cell store
//!
//! Whole-cell transfer plus linear byte-range I/O over a [`CellDevice`].
//!
//! ## Invariants
//!
//! - Range checks happen before the first device access.
//! - Partial cells are read-modify-write, so bytes and flags outside the
//!   range survive.
//! - Any slot overlapped by a byte write, even by one byte, loses its
//!   validity bit before the cell goes back to the device.
//!
//! A multi-cell write is not atomic: if the device fails halfway, the
//! cells already written stay written.

use crate::error::{BackendError, Result};
use crate::range::{cell_of, offset_in_cell, CellSpan, RangePlan};
use crate::validity;
use capfs_hal::{Cell, CellDevice, CELL_DATA_SIZE, CELL_SIZE, SLOT_SIZE};

/// Linear view over a cell device
#[derive(Debug)]
pub struct CellStore<D: CellDevice> {
    device: D,
}

impl<D: CellDevice> CellStore<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }

    pub fn cell_count(&self) -> u64 {
        self.device.cell_count()
    }

    /// Addressable data bytes
    pub fn capacity(&self) -> u64 {
        self.cell_count() * CELL_DATA_SIZE as u64
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    pub fn flush(&mut self) -> Result<()> {
        self.device.flush().map_err(|err| {
            tracing::warn!(error = %err, "device flush failed");
            BackendError::from(err)
        })
    }

    /// Reads cell `cell_id` from the device.
    pub fn raw_read(&mut self, cell_id: u64) -> Result<Cell> {
        let mut bytes = [0u8; CELL_SIZE];
        self.device.read_cell(cell_id, &mut bytes).map_err(|err| {
            tracing::warn!(cell_id, error = %err, "cell read failed");
            BackendError::from(err)
        })?;
        Ok(Cell::from_bytes(&bytes))
    }

    /// Writes cell `cell_id` to the device.
    pub fn raw_write(&mut self, cell_id: u64, cell: &Cell) -> Result<()> {
        self.device
            .write_cell(cell_id, &cell.to_bytes())
            .map_err(|err| {
                tracing::warn!(cell_id, error = %err, "cell write failed");
                BackendError::from(err)
            })
    }

    /// Fails with `OutOfBounds` unless `[addr, addr + len)` is addressable.
    pub fn check_range(&self, addr: u64, len: u64) -> Result<RangePlan> {
        let capacity = self.capacity();
        match addr.checked_add(len) {
            Some(end) if end <= capacity => Ok(RangePlan::new(addr, len)),
            _ => Err(BackendError::OutOfBounds {
                offset: addr,
                len,
                limit: capacity,
            }),
        }
    }

    /// Reads `len` data bytes starting at `addr`.
    pub fn linear_read(&mut self, addr: u64, len: usize) -> Result<Vec<u8>> {
        // Checked before allocating so an oversized `len` is an error
        let plan = self.check_range(addr, len as u64)?;
        let mut buffer = vec![0u8; len];
        self.read_plan(&plan, &mut buffer)?;
        Ok(buffer)
    }

    /// Fills `buffer` with data bytes starting at `addr`.
    pub fn linear_read_into(&mut self, addr: u64, buffer: &mut [u8]) -> Result<()> {
        let plan = self.check_range(addr, buffer.len() as u64)?;
        self.read_plan(&plan, buffer)
    }

    fn read_plan(&mut self, plan: &RangePlan, buffer: &mut [u8]) -> Result<()> {
        tracing::trace!(cells = plan.cell_count(), last = ?plan.last_cell(), "linear read");
        let mut copied = 0;

        if let Some(head) = plan.head {
            let cell = self.raw_read(head.cell_id)?;
            buffer[..head.len].copy_from_slice(&cell.data()[head.start..head.end()]);
            copied += head.len;
        }

        for cell_id in plan.interior.clone() {
            let cell = self.raw_read(cell_id)?;
            buffer[copied..copied + CELL_DATA_SIZE].copy_from_slice(cell.data());
            copied += CELL_DATA_SIZE;
        }

        if let Some(tail) = plan.tail {
            let cell = self.raw_read(tail.cell_id)?;
            buffer[copied..copied + tail.len].copy_from_slice(&cell.data()[..tail.len]);
            copied += tail.len;
        }

        debug_assert_eq!(copied, buffer.len());
        Ok(())
    }

    /// Writes `bytes` starting at `addr` and clears the validity bit of
    /// every slot the write overlaps. Returns the number of bytes written.
    pub fn linear_write(&mut self, addr: u64, bytes: &[u8]) -> Result<usize> {
        let plan = self.check_range(addr, bytes.len() as u64)?;
        tracing::trace!(cells = plan.cell_count(), last = ?plan.last_cell(), "linear write");
        let mut written = 0;

        if let Some(head) = plan.head {
            self.write_partial(head, &bytes[..head.len])?;
            written += head.len;
        }

        for cell_id in plan.interior.clone() {
            let mut data = [0u8; CELL_DATA_SIZE];
            data.copy_from_slice(&bytes[written..written + CELL_DATA_SIZE]);
            // Every slot is overwritten, so no flag survives
            self.raw_write(cell_id, &Cell::new(data, 0))?;
            written += CELL_DATA_SIZE;
        }

        if let Some(tail) = plan.tail {
            self.write_partial(tail, &bytes[written..written + tail.len])?;
            written += tail.len;
        }

        debug_assert_eq!(written, bytes.len());
        Ok(written)
    }

    fn write_partial(&mut self, span: CellSpan, bytes: &[u8]) -> Result<()> {
        let mut cell = self.raw_read(span.cell_id)?;
        cell.data_mut()[span.start..span.end()].copy_from_slice(bytes);
        if let Some((from, to)) = validity::touched_slots(span.start, span.len) {
            cell.set_flags(validity::clear_valid(cell.flags(), from, to));
        }
        self.raw_write(span.cell_id, &cell)
    }

    /// Loads the slot at `addr`, returning its word and validity bit.
    pub fn load_slot(&mut self, addr: u64) -> Result<(u64, bool)> {
        let (cell_id, slot) = self.locate_slot(addr)?;
        let cell = self.raw_read(cell_id)?;
        Ok((cell.slot(slot), validity::is_valid(cell.flags(), slot)))
    }

    /// Stores `value` in the slot at `addr` and marks it valid.
    pub fn store_slot(&mut self, addr: u64, value: u64) -> Result<()> {
        let (cell_id, slot) = self.locate_slot(addr)?;
        let mut cell = self.raw_read(cell_id)?;
        cell.set_slot(slot, value);
        cell.set_flags(validity::set_valid(cell.flags(), slot, slot));
        self.raw_write(cell_id, &cell)
    }

    fn locate_slot(&self, addr: u64) -> Result<(u64, usize)> {
        if addr % SLOT_SIZE as u64 != 0 {
            return Err(BackendError::InvalidArgument(format!(
                "slot address {addr:#x} is not {SLOT_SIZE}-byte aligned"
            )));
        }
        self.check_range(addr, SLOT_SIZE as u64)?;
        Ok((cell_of(addr), offset_in_cell(addr) / SLOT_SIZE))
    }
}
