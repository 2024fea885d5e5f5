//! # capfs Types
//!
//! Value types shared by every layer of the capability store.
//!
//! ## Philosophy
//!
//! - **Capabilities are coordinates**: a base, a power-of-two size and a permission mask.
//! - **Tokens are opaque**: callers outside the backend only ever copy them around.
//! - **Pure**: nothing in this crate touches storage.
//!
//! ## Key Types
//!
//! - [`Capability`]: a decoded, bounded, permissioned byte range
//! - [`CapPerms`]: the READ / WRITE / EXEC mask
//! - [`CapToken`]: the 64-bit external encoding of a capability

pub mod capability;
pub mod token;

pub use capability::{
    CapPerms, Capability, CapabilityError, BASE_BITS, MAX_BASE, MAX_SIZE_BITS,
};
pub use token::{decode, encode, pack, unpack, CapToken, SALT};
