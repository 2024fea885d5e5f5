//! Cell layout
//!
//! A cell is the unit of transfer between the store and its device:
//!
//! ```text
//!  0        8        16              496      504      512
//! +--------+--------+-- ... --------+--------+--------+
//! | slot 0 | slot 1 |                | slot 62| flags  |
//! +--------+--------+-- ... --------+--------+--------+
//! ```
//!
//! Bit `i` of `flags` says whether slot `i` holds a capability token.

/// Size of one cell on the device
pub const CELL_SIZE: usize = 512;

/// Size of one slot (and of the flags word)
pub const SLOT_SIZE: usize = 8;

/// Data slots per cell
pub const SLOTS_PER_CELL: usize = 63;

/// Bytes of payload per cell
pub const CELL_DATA_SIZE: usize = SLOTS_PER_CELL * SLOT_SIZE;

/// One decoded cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    data: [u8; CELL_DATA_SIZE],
    flags: u64,
}

impl Cell {
    /// An all-zero cell: no data, no valid slots.
    pub fn zeroed() -> Self {
        Self {
            data: [0; CELL_DATA_SIZE],
            flags: 0,
        }
    }

    /// Builds a cell from a full data region and a flags word.
    pub fn new(data: [u8; CELL_DATA_SIZE], flags: u64) -> Self {
        Self { data, flags }
    }

    /// Decodes the on-device representation.
    pub fn from_bytes(bytes: &[u8; CELL_SIZE]) -> Self {
        let mut data = [0u8; CELL_DATA_SIZE];
        data.copy_from_slice(&bytes[..CELL_DATA_SIZE]);

        let mut flags = [0u8; SLOT_SIZE];
        flags.copy_from_slice(&bytes[CELL_DATA_SIZE..]);

        Self {
            data,
            flags: u64::from_le_bytes(flags),
        }
    }

    /// Encodes the cell for the device.
    pub fn to_bytes(&self) -> [u8; CELL_SIZE] {
        let mut bytes = [0u8; CELL_SIZE];
        bytes[..CELL_DATA_SIZE].copy_from_slice(&self.data);
        bytes[CELL_DATA_SIZE..].copy_from_slice(&self.flags.to_le_bytes());
        bytes
    }

    pub fn data(&self) -> &[u8; CELL_DATA_SIZE] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8; CELL_DATA_SIZE] {
        &mut self.data
    }

    pub fn flags(&self) -> u64 {
        self.flags
    }

    pub fn set_flags(&mut self, flags: u64) {
        self.flags = flags;
    }

    /// Reads slot `index` as a little-endian word.
    ///
    /// # Panics
    /// Panics if `index >= SLOTS_PER_CELL`.
    pub fn slot(&self, index: usize) -> u64 {
        let start = index * SLOT_SIZE;
        let mut word = [0u8; SLOT_SIZE];
        word.copy_from_slice(&self.data[start..start + SLOT_SIZE]);
        u64::from_le_bytes(word)
    }

    /// Overwrites slot `index`. Does not touch the flags word.
    ///
    /// # Panics
    /// Panics if `index >= SLOTS_PER_CELL`.
    pub fn set_slot(&mut self, index: usize, value: u64) {
        let start = index * SLOT_SIZE;
        self.data[start..start + SLOT_SIZE].copy_from_slice(&value.to_le_bytes());
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::zeroed()
    }
}
