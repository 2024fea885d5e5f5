//! # Cell Device Layer
//!
//! This crate defines the fixed-size cell unit and the devices that store cells.
//!
//! ## Philosophy
//!
//! **The store above never sees files, only cells.**
//!
//! Everything above this crate addresses storage as a sequence of 512-byte
//! cells. Whether those cells live in a flat file or in memory is a detail
//! of the [`CellDevice`] implementation.
//!
//! ## Design Principles
//!
//! 1. **Fixed geometry**: 63 data slots plus one flags word per cell
//! 2. **Trait-based**: all cell transfer goes through [`CellDevice`]
//! 3. **Explicit byte order**: every on-disk word is little-endian
//! 4. **Testable**: [`RamDisk`] stands in for the file in unit tests

pub mod cell;
pub mod cell_device;
pub mod file_disk;

pub use cell::{Cell, CELL_DATA_SIZE, CELL_SIZE, SLOTS_PER_CELL, SLOT_SIZE};
pub use cell_device::{CellDevice, CellError, RamDisk};
pub use file_disk::FileDisk;
