//! # Capability Backend
//!
//! The public surface of the store. Every call takes a [`CapToken`],
//! decodes it, checks permissions and bounds, and only then touches the
//! cell store.
//!
//! ## Ordering
//!
//! All storage access goes through one mutex, held for the whole call.
//! Two calls that share a cell therefore never interleave their
//! read-modify-write cycles. `zero` holds the lock across all of its chunks.
//!
//! ## Trust
//!
//! Any 64-bit value decodes to some capability. The backend checks that the
//! decoded range lies inside the store, but cannot tell a minted token from
//! a forged one. Only tokens obtained from [`CapBackend::root`],
//! [`CapBackend::mint`] or [`CapBackend::get_cap`] should be trusted.

use crate::cell_store::CellStore;
use crate::config::{cells_for, StoreConfig, MAX_SIZE_BITS, MIN_SIZE_BITS};
use crate::error::{BackendError, Result};
use capfs_hal::{CellDevice, FileDisk, CELL_DATA_SIZE, CELL_SIZE, SLOT_SIZE};
use capfs_types::{decode, encode, CapPerms, CapToken, Capability};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Size of the zero-filled chunks written by [`CapBackend::zero`]
pub const ZERO_CHUNK: usize = 256;

static ZEROES: [u8; ZERO_CHUNK] = [0; ZERO_CHUNK];

/// Geometry of an open store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Root capability covers `2^size_bits` bytes
    pub size_bits: u8,
    pub cell_count: u64,
    /// Addressable data bytes
    pub capacity: u64,
    /// Bytes on the backing device
    pub device_len: u64,
}

/// Backend over the production flat-file device
pub type FileBackend = CapBackend<FileDisk>;

/// Capability-checked store
#[derive(Debug)]
pub struct CapBackend<D: CellDevice> {
    store: Mutex<CellStore<D>>,
    root: Capability,
    capacity: u64,
    cell_count: u64,
}

impl CapBackend<FileDisk> {
    /// Opens or creates the backing file described by `config`.
    ///
    /// Any error here means the store cannot be trusted; callers should
    /// treat it as fatal.
    pub fn init(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let disk = FileDisk::open(&config.path, config.cell_count(), config.create)
            .map_err(|err| {
                tracing::error!(path = %config.path.display(), error = %err, "cannot open backing store");
                BackendError::from(err)
            })?;

        tracing::info!(
            path = %config.path.display(),
            created = disk.was_created(),
            cells = config.cell_count(),
            capacity = config.capacity(),
            "capability store initialized"
        );

        Self::with_device(disk, config.size_bits)
    }
}

impl<D: CellDevice> CapBackend<D> {
    /// Wraps an already opened device. The device must hold at least
    /// `2^size_bits` data bytes.
    pub fn with_device(device: D, size_bits: u8) -> Result<Self> {
        if !(MIN_SIZE_BITS..=MAX_SIZE_BITS).contains(&size_bits) {
            return Err(BackendError::InvalidArgument(format!(
                "size_bits {size_bits} outside {MIN_SIZE_BITS}..={MAX_SIZE_BITS}"
            )));
        }

        let store = CellStore::new(device);
        let cell_count = store.cell_count();
        let needed = cells_for(1 << size_bits);
        if cell_count < needed {
            return Err(BackendError::SizeMismatch {
                expected: needed * CELL_SIZE as u64,
                actual: cell_count * CELL_SIZE as u64,
            });
        }

        let root = Capability::new(0, size_bits, CapPerms::all())?;
        Ok(Self {
            capacity: store.capacity(),
            store: Mutex::new(store),
            root,
            cell_count,
        })
    }

    /// Token for the capability covering the whole store.
    pub fn root(&self) -> CapToken {
        encode(&self.root)
    }

    /// Decodes a token without checking it.
    pub fn capability(&self, token: CapToken) -> Capability {
        decode(token)
    }

    pub fn perms(&self, token: CapToken) -> CapPerms {
        decode(token).perms()
    }

    pub fn size(&self, token: CapToken) -> u64 {
        decode(token).size()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            size_bits: self.root.size_bits(),
            cell_count: self.cell_count,
            capacity: self.capacity,
            device_len: self.cell_count * CELL_SIZE as u64,
        }
    }

    /// Derives a narrower capability from `token`.
    pub fn mint(
        &self,
        token: CapToken,
        offset: u64,
        size_bits: u8,
        perms: CapPerms,
    ) -> Result<CapToken> {
        let parent = self.authorize(token, CapPerms::none())?;
        let child = parent.mint(offset, size_bits, perms).map_err(|err| {
            tracing::warn!(%parent, offset, size_bits, %perms, error = %err, "mint rejected");
            BackendError::from(err)
        })?;
        tracing::debug!(%parent, %child, "minted capability");
        Ok(encode(&child))
    }

    /// Reads `len` bytes at `offset` within the capability.
    pub fn read(&self, token: CapToken, offset: u64, len: usize) -> Result<Vec<u8>> {
        let cap = self.authorize(token, CapPerms::READ)?;
        check_bounds(&cap, offset, len as u64)?;
        tracing::debug!(%cap, offset, len, "read");

        self.store.lock().linear_read(cap.base() + offset, len)
    }

    /// Writes `bytes` at `offset` within the capability. Sub-capabilities
    /// overlapped by the write stop being capabilities.
    pub fn write(&self, token: CapToken, offset: u64, bytes: &[u8]) -> Result<usize> {
        let cap = self.authorize(token, CapPerms::WRITE)?;
        check_bounds(&cap, offset, bytes.len() as u64)?;
        tracing::debug!(%cap, offset, len = bytes.len(), "write");

        self.store.lock().linear_write(cap.base() + offset, bytes)
    }

    /// Overwrites the whole capability with zeroes, which also strips every
    /// sub-capability stored inside it.
    pub fn zero(&self, token: CapToken) -> Result<()> {
        let cap = self.authorize(token, CapPerms::WRITE)?;
        tracing::debug!(%cap, "zero");

        let mut store = self.store.lock();
        let size = cap.size();
        let mut offset = 0u64;
        while offset < size {
            let chunk = (size - offset).min(ZERO_CHUNK as u64) as usize;
            store.linear_write(cap.base() + offset, &ZEROES[..chunk])?;
            offset += chunk as u64;
        }
        Ok(())
    }

    /// Loads the sub-capability stored in the slot at `offset`.
    pub fn get_cap(&self, token: CapToken, offset: u64) -> Result<CapToken> {
        check_slot_offset(offset)?;
        let cap = self.authorize(token, CapPerms::READ)?;
        check_bounds(&cap, offset, SLOT_SIZE as u64)?;
        let address = slot_address(&cap, offset)?;

        let (word, valid) = self.store.lock().load_slot(address)?;
        if !valid {
            tracing::warn!(%cap, offset, address, "slot holds no capability");
            return Err(BackendError::NotACapability { address });
        }
        tracing::debug!(%cap, offset, "get_cap");
        Ok(CapToken::from_raw(word))
    }

    /// Stores `sub` in the slot at `offset` and marks the slot valid.
    pub fn put_cap(&self, token: CapToken, offset: u64, sub: CapToken) -> Result<()> {
        check_slot_offset(offset)?;
        let cap = self.authorize(token, CapPerms::WRITE)?;
        check_bounds(&cap, offset, SLOT_SIZE as u64)?;
        let address = slot_address(&cap, offset)?;
        tracing::debug!(%cap, offset, sub = %decode(sub), "put_cap");

        self.store.lock().store_slot(address, sub.raw())
    }

    /// Flushes the backing device.
    pub fn sync(&self) -> Result<()> {
        self.store.lock().flush()
    }

    /// Flushes and closes the store.
    pub fn destroy(self) -> Result<()> {
        let mut store = self.store.into_inner();
        store.flush()?;
        tracing::info!(cells = self.cell_count, "capability store closed");
        Ok(())
    }

    /// Closes the store without flushing and hands back the device.
    pub fn into_device(self) -> D {
        self.store.into_inner().into_device()
    }

    /// Decodes `token` and checks that it grants `required` and lies inside
    /// the store. Runs before any storage access.
    fn authorize(&self, token: CapToken, required: CapPerms) -> Result<Capability> {
        let cap = decode(token);

        if !cap.perms().contains(required) {
            tracing::warn!(%cap, %required, "permission denied");
            return Err(BackendError::PermissionDenied {
                required,
                granted: cap.perms(),
            });
        }

        match cap.end() {
            Some(end) if cap.size_bits() <= MAX_SIZE_BITS && end <= self.capacity => Ok(cap),
            _ => {
                tracing::warn!(%cap, capacity = self.capacity, "capability exceeds store");
                Err(BackendError::OutOfBounds {
                    offset: cap.base(),
                    len: cap.size(),
                    limit: self.capacity,
                })
            }
        }
    }
}

/// Converts a signed request offset, as handed over by filesystem
/// adapters, into a store offset.
pub fn request_offset(offset: i64) -> Result<u64> {
    u64::try_from(offset)
        .map_err(|_| BackendError::InvalidArgument(format!("negative offset {offset}")))
}

fn check_bounds(cap: &Capability, offset: u64, len: u64) -> Result<()> {
    if cap.covers(offset, len) {
        return Ok(());
    }
    tracing::warn!(%cap, offset, len, "access outside capability");
    Err(BackendError::OutOfBounds {
        offset,
        len,
        limit: cap.size(),
    })
}

fn check_slot_offset(offset: u64) -> Result<()> {
    if offset % SLOT_SIZE as u64 != 0 {
        return Err(BackendError::InvalidArgument(format!(
            "capability offset {offset} is not {SLOT_SIZE}-byte aligned"
        )));
    }
    Ok(())
}

/// Absolute slot address. A capability with an unaligned base has no
/// slots of its own.
fn slot_address(cap: &Capability, offset: u64) -> Result<u64> {
    let address = cap.base() + offset;
    if address % SLOT_SIZE as u64 != 0 {
        return Err(BackendError::InvalidArgument(format!(
            "slot address {address:#x} is not {SLOT_SIZE}-byte aligned"
        )));
    }
    Ok(address)
}

// Cells hold whole slots, so an aligned slot never straddles two cells.
const _: () = assert!(CELL_DATA_SIZE % SLOT_SIZE == 0);
