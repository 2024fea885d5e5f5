//! Cell device abstraction
//!
//! Provides a minimal device API for reading and writing whole cells.
//! This is the only path by which the store reaches its backing medium.

use crate::cell::CELL_SIZE;
use thiserror::Error;

/// Cell device errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CellError {
    /// Cell index past the end of the device
    #[error("cell {cell_id} out of bounds (device has {cell_count} cells)")]
    OutOfBounds { cell_id: u64, cell_count: u64 },

    /// Backing medium has a different size than configured
    #[error("backing store is {actual} bytes, expected {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// Underlying read, write, seek or sync failed
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CellError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Cell device trait
///
/// Implementers provide cell-level read/write operations.
/// Every transfer is exactly [`CELL_SIZE`] bytes.
pub trait CellDevice {
    /// Get the total number of cells on this device
    fn cell_count(&self) -> u64;

    /// Read a cell into the provided buffer
    ///
    /// # Errors
    /// Returns `CellError::OutOfBounds` if `cell_id >= cell_count()`
    /// Returns `CellError::Io` if the medium fails
    fn read_cell(&mut self, cell_id: u64, buffer: &mut [u8; CELL_SIZE]) -> Result<(), CellError>;

    /// Write a cell from the provided buffer
    ///
    /// # Errors
    /// Returns `CellError::OutOfBounds` if `cell_id >= cell_count()`
    /// Returns `CellError::Io` if the medium fails
    fn write_cell(&mut self, cell_id: u64, buffer: &[u8; CELL_SIZE]) -> Result<(), CellError>;

    /// Flush any pending writes to persistent storage
    fn flush(&mut self) -> Result<(), CellError> {
        Ok(())
    }

    /// Checks `cell_id` against the device size.
    fn check_cell(&self, cell_id: u64) -> Result<(), CellError> {
        let cell_count = self.cell_count();
        if cell_id >= cell_count {
            return Err(CellError::OutOfBounds {
                cell_id,
                cell_count,
            });
        }
        Ok(())
    }
}

/// RAM disk - an in-memory cell device
///
/// Useful for testing. Data is lost when the disk is dropped.
#[derive(Debug, Clone)]
pub struct RamDisk {
    cells: Vec<[u8; CELL_SIZE]>,
}

impl RamDisk {
    /// Create a new RAM disk with the specified number of cells
    pub fn new(cell_count: usize) -> Self {
        Self {
            cells: vec![[0u8; CELL_SIZE]; cell_count],
        }
    }
}

impl CellDevice for RamDisk {
    fn cell_count(&self) -> u64 {
        self.cells.len() as u64
    }

    fn read_cell(&mut self, cell_id: u64, buffer: &mut [u8; CELL_SIZE]) -> Result<(), CellError> {
        self.check_cell(cell_id)?;
        buffer.copy_from_slice(&self.cells[cell_id as usize]);
        Ok(())
    }

    fn write_cell(&mut self, cell_id: u64, buffer: &[u8; CELL_SIZE]) -> Result<(), CellError> {
        self.check_cell(cell_id)?;
        self.cells[cell_id as usize].copy_from_slice(buffer);
        Ok(())
    }
}
