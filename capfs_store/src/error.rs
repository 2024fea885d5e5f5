//! Backend error types

use crate::config::ConfigError;
use capfs_hal::CellError;
use capfs_types::{CapPerms, CapabilityError};
use thiserror::Error;

const EIO: i32 = 5;
const EACCES: i32 = 13;
const EINVAL: i32 = 22;
const ERANGE: i32 = 34;

/// Errors returned by the capability backend
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Misaligned slot offset or otherwise malformed request
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Capability lacks a required permission bit
    #[error("permission denied: requires {required}, capability grants {granted}")]
    PermissionDenied {
        required: CapPerms,
        granted: CapPerms,
    },

    /// Slot does not hold a valid sub-capability
    #[error("no capability stored at address {address:#x}")]
    NotACapability { address: u64 },

    /// Range exceeds the capability or the store
    #[error("range {offset:#x}+{len:#x} out of bounds (limit {limit:#x})")]
    OutOfBounds { offset: u64, len: u64, limit: u64 },

    /// Backing store read, write, seek or sync failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Existing backing file does not match the configured capacity
    #[error("backing store is {actual} bytes, expected {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl BackendError {
    /// Negative errno for the filesystem request adapters.
    pub fn errno(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) | Self::SizeMismatch { .. } | Self::Config(_) => -EINVAL,
            Self::PermissionDenied { .. } | Self::NotACapability { .. } => -EACCES,
            Self::OutOfBounds { .. } => -ERANGE,
            Self::Io(_) => -EIO,
        }
    }
}

impl From<CellError> for BackendError {
    fn from(err: CellError) -> Self {
        match err {
            CellError::SizeMismatch { expected, actual } => {
                Self::SizeMismatch { expected, actual }
            }
            other => Self::Io(other.to_string()),
        }
    }
}

impl From<CapabilityError> for BackendError {
    fn from(err: CapabilityError) -> Self {
        match err {
            CapabilityError::MintOutOfRange {
                offset,
                size,
                parent_size,
            } => Self::OutOfBounds {
                offset,
                len: size,
                limit: parent_size,
            },
            CapabilityError::PermissionEscalation { requested, granted } => {
                Self::PermissionDenied {
                    required: requested,
                    granted,
                }
            }
            other => Self::InvalidArgument(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(BackendError::InvalidArgument("x".into()).errno(), -22);
        assert_eq!(
            BackendError::PermissionDenied {
                required: CapPerms::WRITE,
                granted: CapPerms::READ
            }
            .errno(),
            -13
        );
        assert_eq!(BackendError::NotACapability { address: 0 }.errno(), -13);
        assert_eq!(
            BackendError::OutOfBounds {
                offset: 0,
                len: 1,
                limit: 0
            }
            .errno(),
            -34
        );
        assert_eq!(BackendError::Io("gone".into()).errno(), -5);
    }

    #[test]
    fn test_cell_error_conversion() {
        let err: BackendError = CellError::OutOfBounds {
            cell_id: 9,
            cell_count: 4,
        }
        .into();
        assert!(matches!(err, BackendError::Io(_)));

        let err: BackendError = CellError::SizeMismatch {
            expected: 1024,
            actual: 512,
        }
        .into();
        assert_eq!(
            err,
            BackendError::SizeMismatch {
                expected: 1024,
                actual: 512
            }
        );
    }

    #[test]
    fn test_capability_error_conversion() {
        let err: BackendError = CapabilityError::PermissionEscalation {
            requested: CapPerms::all(),
            granted: CapPerms::READ,
        }
        .into();
        assert!(matches!(err, BackendError::PermissionDenied { .. }));

        let err: BackendError = CapabilityError::SizeBitsTooLarge(60).into();
        assert!(matches!(err, BackendError::InvalidArgument(_)));
    }

    #[test]
    fn test_display() {
        let err = BackendError::NotACapability { address: 0x40 };
        assert_eq!(err.to_string(), "no capability stored at address 0x40");
    }
}
