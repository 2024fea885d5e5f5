//! Bounded capabilities
//!
//! A capability names a power-of-two sized byte range of the store and the
//! rights its holder has over that range.
//!
//! ## Design Principles
//!
//! 1. **Power-of-two sizes**: `size = 1 << size_bits`, so bounds checks are a shift and a compare
//! 2. **Values, not handles**: capabilities carry no reference to the store and are freely copied
//! 3. **Narrowing only**: a minted child never exceeds its parent in range or rights
//!
//! ## Example
//!
//! ```
//! use capfs_types::{Capability, CapPerms};
//!
//! let root = Capability::new(0, 24, CapPerms::all()).unwrap();
//! let child = root.mint(512, 8, CapPerms::READ).unwrap();
//!
//! assert_eq!(child.base(), 512);
//! assert_eq!(child.size(), 256);
//! assert!(child.perms().can_read());
//! assert!(!child.perms().can_write());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use thiserror::Error;

/// Number of bits available for the base address in a packed token.
pub const BASE_BITS: u32 = 48;

/// Largest encodable base address.
pub const MAX_BASE: u64 = (1 << BASE_BITS) - 1;

/// Largest `size_bits` a well-formed capability may carry.
pub const MAX_SIZE_BITS: u8 = 47;

/// Permission mask carried by a capability
///
/// Only the low three bits have a meaning. The remaining bits of the byte
/// are kept as-is so that decoding and re-encoding a token is lossless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CapPerms(u8);

impl CapPerms {
    /// Permission to read bytes and load sub-capabilities
    pub const READ: Self = Self(0x1);
    /// Permission to write bytes and store sub-capabilities
    pub const WRITE: Self = Self(0x2);
    /// Permission to execute (carried, never checked by the store)
    pub const EXEC: Self = Self(0x4);

    const KNOWN: u8 = 0x7;

    /// No permissions
    pub const fn none() -> Self {
        Self(0)
    }

    /// Read and write
    pub const fn read_write() -> Self {
        Self(Self::READ.0 | Self::WRITE.0)
    }

    /// Read, write and execute
    pub const fn all() -> Self {
        Self(Self::KNOWN)
    }

    /// Builds a mask from a raw byte, keeping unknown bits.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Returns the raw byte.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True if every bit in `other` is also set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn can_read(self) -> bool {
        self.contains(Self::READ)
    }

    pub fn can_write(self) -> bool {
        self.contains(Self::WRITE)
    }

    pub fn can_execute(self) -> bool {
        self.contains(Self::EXEC)
    }

    /// True if no meaningful permission bit is set.
    pub fn is_none(self) -> bool {
        self.0 & Self::KNOWN == 0
    }
}

impl BitOr for CapPerms {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for CapPerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.can_read() { "R" } else { "-" },
            if self.can_write() { "W" } else { "-" },
            if self.can_execute() { "X" } else { "-" }
        )
    }
}

/// Errors raised while constructing or narrowing a capability
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    /// The base does not fit in the 48-bit token field
    #[error("base {0:#x} does not fit in 48 bits")]
    BaseTooLarge(u64),

    /// The size exponent is larger than any store can address
    #[error("size_bits {0} exceeds maximum of 47")]
    SizeBitsTooLarge(u8),

    /// The requested child range leaves the parent range
    #[error("mint range {offset:#x}+{size:#x} exceeds parent size {parent_size:#x}")]
    MintOutOfRange {
        offset: u64,
        size: u64,
        parent_size: u64,
    },

    /// The requested child asks for rights the parent does not hold
    #[error("cannot mint {requested} from {granted}")]
    PermissionEscalation {
        requested: CapPerms,
        granted: CapPerms,
    },
}

/// A decoded capability
///
/// Fields are private so that [`Capability::new`] and [`Capability::mint`]
/// are the only checked ways to build one. Decoding a token goes through
/// [`Capability::from_raw_parts`], which is total and unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    base: u64,
    size_bits: u8,
    perms: CapPerms,
}

impl Capability {
    /// Creates a capability, checking that every field is encodable.
    pub fn new(base: u64, size_bits: u8, perms: CapPerms) -> Result<Self, CapabilityError> {
        if base > MAX_BASE {
            return Err(CapabilityError::BaseTooLarge(base));
        }
        if size_bits > MAX_SIZE_BITS {
            return Err(CapabilityError::SizeBitsTooLarge(size_bits));
        }
        Ok(Self {
            base,
            size_bits,
            perms,
        })
    }

    /// Assembles a capability without validation.
    ///
    /// Used by the codec, which must be total over all 64-bit values.
    pub const fn from_raw_parts(base: u64, size_bits: u8, perms: CapPerms) -> Self {
        Self {
            base,
            size_bits,
            perms,
        }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn size_bits(&self) -> u8 {
        self.size_bits
    }

    pub fn perms(&self) -> CapPerms {
        self.perms
    }

    /// Size in bytes. Saturates for exponents of 64 and above.
    pub fn size(&self) -> u64 {
        1u64.checked_shl(u32::from(self.size_bits)).unwrap_or(u64::MAX)
    }

    /// One past the last byte covered, or `None` on overflow.
    pub fn end(&self) -> Option<u64> {
        if self.size_bits >= 64 {
            return None;
        }
        self.base.checked_add(self.size())
    }

    /// True if `[offset, offset + len)` lies inside this capability.
    pub fn covers(&self, offset: u64, len: u64) -> bool {
        offset
            .checked_add(len)
            .map_or(false, |end| end <= self.size())
    }

    /// Derives a narrower capability `{base + offset, size_bits, perms}`.
    pub fn mint(
        &self,
        offset: u64,
        size_bits: u8,
        perms: CapPerms,
    ) -> Result<Self, CapabilityError> {
        if size_bits > MAX_SIZE_BITS {
            return Err(CapabilityError::SizeBitsTooLarge(size_bits));
        }
        let size = 1u64 << size_bits;
        if !self.covers(offset, size) {
            return Err(CapabilityError::MintOutOfRange {
                offset,
                size,
                parent_size: self.size(),
            });
        }
        if !self.perms.contains(perms) {
            return Err(CapabilityError::PermissionEscalation {
                requested: perms,
                granted: self.perms,
            });
        }
        let base = self
            .base
            .checked_add(offset)
            .ok_or(CapabilityError::BaseTooLarge(u64::MAX))?;
        Self::new(base, size_bits, perms)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cap{{base={:#x}, size=2^{}, perms={}}}",
            self.base, self.size_bits, self.perms
        )
    }
}
