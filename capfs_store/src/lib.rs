//! # Capability Store
//!
//! This crate defines capfs' storage model.
//!
//! ## Philosophy
//!
//! **Storage is addressed by capability, not by path.**
//!
//! There are no inodes, directories or file names here. Instead:
//! - A capability token names a power-of-two byte range and what may be
//!   done with it
//! - Capabilities can be stored inside the data they guard
//! - Overwriting a stored capability with plain bytes revokes it
//!
//! ## Design
//!
//! - **CapBackend**: Token-checked read, write, zero and capability slots
//! - **CellStore**: Flat address space over 512-byte cells
//! - **validity**: Per-slot bitmap kept in each cell's trailer word
//! - **RangePlan**: Head, interior and tail split of a byte range
//! - **StoreConfig**: Backing file and root capability size

pub mod backend;
pub mod cell_store;
pub mod config;
pub mod error;
pub mod failing_device;
pub mod range;
pub mod validity;

pub use backend::{request_offset, CapBackend, FileBackend, StoreStats, ZERO_CHUNK};
pub use cell_store::CellStore;
pub use config::{cells_for, ConfigError, StoreConfig, DEFAULT_SIZE_BITS, MIN_SIZE_BITS};
pub use error::{BackendError, Result};
pub use failing_device::{FailingCellDevice, FailurePolicy};
pub use range::{CellSpan, RangePlan};
