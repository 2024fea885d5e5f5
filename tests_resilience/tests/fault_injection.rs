//! Fault Injection Tests
//!
//! Uses `FailingCellDevice` to check that device failures surface as I/O
//! errors, that they stay contained to the failing cell, and that rejected
//! requests never reach the device.

use capfs_hal::{RamDisk, CELL_DATA_SIZE};
use capfs_store::{cells_for, BackendError, CapBackend, FailingCellDevice, FailurePolicy};
use capfs_types::CapPerms;
use tests_resilience::{init_test_logging, pattern};

fn failing_backend(size_bits: u8, policy: FailurePolicy) -> CapBackend<FailingCellDevice<RamDisk>> {
    init_test_logging();
    let disk = RamDisk::new(cells_for(1 << size_bits) as usize);
    CapBackend::with_device(FailingCellDevice::new(disk, policy), size_bits).unwrap()
}

/// Test: Failed write reports EIO
#[test]
fn test_write_failure_is_eio() {
    let backend = failing_backend(12, FailurePolicy::AfterWrites(0));

    let err = backend.write(backend.root(), 0, b"data").unwrap_err();
    assert!(matches!(err, BackendError::Io(_)));
    assert_eq!(err.errno(), -5);
}

/// Test: Failed flush reports EIO
#[test]
fn test_sync_failure_is_eio() {
    let backend = failing_backend(12, FailurePolicy::AfterWrites(1));
    backend.write(backend.root(), 0, b"one").unwrap();

    assert!(matches!(backend.sync(), Err(BackendError::Io(_))));
}

/// Test: Failure in one cell leaves other cells intact
#[test]
fn test_failure_contained_to_cell() {
    let cell = CELL_DATA_SIZE as u64;
    let backend = failing_backend(12, FailurePolicy::OnCells(vec![2]));
    let root = backend.root();

    let before = pattern(9, CELL_DATA_SIZE);
    backend.write(root, 0, &before).unwrap();
    backend.write(root, 3 * cell, &before).unwrap();

    assert!(backend.write(root, 0, &vec![0; 4 * CELL_DATA_SIZE]).is_err());

    // Cells before the failure were rewritten, cells after it were not reached
    assert_eq!(backend.read(root, 0, CELL_DATA_SIZE).unwrap(), vec![0; CELL_DATA_SIZE]);
    assert_eq!(backend.read(root, 3 * cell, CELL_DATA_SIZE).unwrap(), before);
}

/// Test: Failed put_cap leaves the slot invalid
#[test]
fn test_failed_put_cap_not_visible() {
    let backend = failing_backend(12, FailurePolicy::OnCells(vec![1]));
    let root = backend.root();
    let slot = CELL_DATA_SIZE as u64 + 16;

    assert!(backend.put_cap(root, slot, root).is_err());
    assert!(matches!(
        backend.get_cap(root, slot),
        Err(BackendError::NotACapability { .. })
    ));
}

/// Test: Failed read reports EIO and later reads of other cells work
#[test]
fn test_read_failure_is_eio() {
    let backend = failing_backend(12, FailurePolicy::OnReads(vec![1]));
    let root = backend.root();

    let err = backend.read(root, 500, 10).unwrap_err();
    assert_eq!(err.errno(), -5);
    assert!(backend.read(root, 0, 500).is_ok());
}

/// Test: Rejected requests never touch the device
#[test]
fn test_rejections_before_io() {
    let backend = failing_backend(12, FailurePolicy::Never);
    let root = backend.root();
    let read_only = backend.mint(root, 0, 10, CapPerms::READ).unwrap();
    let write_only = backend.mint(root, 0, 10, CapPerms::WRITE).unwrap();

    assert!(backend.write(read_only, 0, b"x").is_err());
    assert!(backend.zero(read_only).is_err());
    assert!(backend.put_cap(read_only, 0, root).is_err());
    assert!(backend.read(write_only, 0, 1).is_err());
    assert!(backend.get_cap(write_only, 0).is_err());
    assert!(backend.read(read_only, 1020, 8).is_err());
    assert!(backend.get_cap(root, 5).is_err());
    assert!(backend.mint(read_only, 0, 4, CapPerms::all()).is_err());

    let device = backend.into_device();
    assert_eq!(device.read_count(), 0);
    assert_eq!(device.write_count(), 0);
}
