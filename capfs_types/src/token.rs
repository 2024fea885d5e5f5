//! Capability token codec
//!
//! Packs a [`Capability`] into a 64-bit word and obscures it with a fixed salt.
//!
//! ```text
//!  63        56 55        48 47                                        0
//! +------------+------------+-------------------------------------------+
//! |   perms    | size_bits  |                   base                    |
//! +------------+------------+-------------------------------------------+
//! ```
//!
//! The salt only keeps callers from treating tokens as plain integers. Both
//! the salt and the layout are public, so a token is not proof of authority:
//! only tokens handed out by the backend should be trusted.

use crate::capability::{CapPerms, Capability, MAX_BASE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// XOR mask applied to every packed capability.
pub const SALT: u64 = 0xAAAA_AAAA_AAAA_AAAA;

const SIZE_BITS_SHIFT: u32 = 48;
const PERMS_SHIFT: u32 = 56;

/// Opaque external form of a capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapToken(u64);

impl CapToken {
    /// Wraps a raw 64-bit value, e.g. one loaded from a slot.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw 64-bit value.
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Decodes this token. Always succeeds.
    pub fn capability(self) -> Capability {
        decode(self)
    }
}

impl From<Capability> for CapToken {
    fn from(cap: Capability) -> Self {
        encode(&cap)
    }
}

impl fmt::Display for CapToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "captoken:{:016x}", self.0)
    }
}

/// Packs the fields into a word. Base bits above 47 are dropped.
pub fn pack(cap: &Capability) -> u64 {
    (cap.base() & MAX_BASE)
        | (u64::from(cap.size_bits()) << SIZE_BITS_SHIFT)
        | (u64::from(cap.perms().bits()) << PERMS_SHIFT)
}

/// Splits a word back into its fields.
pub fn unpack(word: u64) -> Capability {
    Capability::from_raw_parts(
        word & MAX_BASE,
        (word >> SIZE_BITS_SHIFT) as u8,
        CapPerms::from_bits((word >> PERMS_SHIFT) as u8),
    )
}

pub fn encode(cap: &Capability) -> CapToken {
    CapToken(pack(cap) ^ SALT)
}

pub fn decode(token: CapToken) -> Capability {
    unpack(token.0 ^ SALT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pack_layout() {
        let cap = Capability::new(0x1234_5678_9abc, 8, CapPerms::read_write()).unwrap();
        assert_eq!(pack(&cap), 0x0308_1234_5678_9abc);
    }

    #[test]
    fn test_unpack_layout() {
        let cap = unpack(0x0518_0000_0000_0200);
        assert_eq!(cap.base(), 0x200);
        assert_eq!(cap.size_bits(), 0x18);
        assert_eq!(cap.perms(), CapPerms::READ | CapPerms::EXEC);
    }

    #[test]
    fn test_encode_applies_salt() {
        let cap = Capability::new(0, 0, CapPerms::none()).unwrap();
        assert_eq!(encode(&cap).raw(), SALT);
        assert_eq!(decode(CapToken::from_raw(SALT)), cap);
    }

    #[test]
    fn test_decode_is_total() {
        for raw in [0, u64::MAX, SALT, !SALT, 0x8000_0000_0000_0001] {
            let cap = decode(CapToken::from_raw(raw));
            assert_eq!(encode(&cap).raw(), raw);
        }
    }

    #[test]
    fn test_token_display() {
        let token = CapToken::from_raw(0xdead_beef);
        assert_eq!(token.to_string(), "captoken:00000000deadbeef");
    }

    #[test]
    fn test_token_from_capability() {
        let cap = Capability::new(512, 8, CapPerms::READ).unwrap();
        let token = CapToken::from(cap);
        assert_eq!(token.capability(), cap);
    }

    proptest! {
        #[test]
        fn encode_decode_roundtrip(
            base in 0u64..=MAX_BASE,
            size_bits in 0u8..=47,
            perms in any::<u8>(),
        ) {
            let cap = Capability::new(base, size_bits, CapPerms::from_bits(perms)).unwrap();
            prop_assert_eq!(decode(encode(&cap)), cap);
        }

        #[test]
        fn decode_encode_bijection(raw in any::<u64>()) {
            let token = CapToken::from_raw(raw);
            prop_assert_eq!(encode(&decode(token)), token);
        }
    }
}
