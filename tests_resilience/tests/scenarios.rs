//! End-to-End Scenarios
//!
//! Drives a full 2^24 byte file-backed store through the basic capability
//! operations a filesystem adapter relies on.

use capfs_store::BackendError;
use capfs_types::{encode, CapPerms, Capability};
use tests_resilience::temp_file_backend;

/// Test: Stored capability round-trips through a slot
#[test]
fn test_put_and_get_sub_capability() {
    let (_dir, _config, backend) = temp_file_backend(24);
    let root = backend.root();

    let root_cap = backend.capability(root);
    assert_eq!(root_cap.base(), 0);
    assert_eq!(root_cap.size(), 1 << 24);
    assert!(root_cap.perms().contains(CapPerms::read_write()));

    let child = Capability::new(512, 8, CapPerms::READ).unwrap();
    backend.put_cap(root, 0, encode(&child)).unwrap();

    let loaded = backend.get_cap(root, 0).unwrap();
    assert_eq!(loaded.capability(), child);
    assert_eq!(loaded.capability().size(), 256);

    backend.destroy().unwrap();
}

/// Test: Bytes written at an arbitrary offset read back unchanged
#[test]
fn test_write_then_read_hello() {
    let (_dir, _config, backend) = temp_file_backend(24);
    let root = backend.root();

    assert_eq!(backend.write(root, 1000, b"hello").unwrap(), 5);
    assert_eq!(backend.read(root, 1000, 5).unwrap(), b"hello");
}

/// Test: Misaligned slot offset is rejected
#[test]
fn test_misaligned_get_cap() {
    let (_dir, _config, backend) = temp_file_backend(24);

    let err = backend.get_cap(backend.root(), 7).unwrap_err();
    assert!(matches!(err, BackendError::InvalidArgument(_)));
    assert_eq!(err.errno(), -22);
}

/// Test: Reads may not run past the end of a capability
#[test]
fn test_read_past_capability_end() {
    let (_dir, _config, backend) = temp_file_backend(24);
    let cap = backend
        .mint(backend.root(), 4096, 12, CapPerms::READ)
        .unwrap();
    let size = backend.size(cap);

    let err = backend.read(cap, size - 2, 10).unwrap_err();
    assert!(matches!(err, BackendError::OutOfBounds { .. }));
    assert_eq!(err.errno(), -34);

    // Exactly up to the end is fine
    assert_eq!(backend.read(cap, size - 2, 2).unwrap().len(), 2);
}

/// Test: A directory-like tree of capabilities can be walked from root
#[test]
fn test_capability_tree_walk() {
    let (_dir, _config, backend) = temp_file_backend(20);
    let root = backend.root();

    let dir = backend.mint(root, 8192, 10, CapPerms::read_write()).unwrap();
    let file = backend.mint(root, 16384, 12, CapPerms::read_write()).unwrap();
    let file_ro = backend.mint(file, 0, 12, CapPerms::READ).unwrap();

    backend.put_cap(root, 0, dir).unwrap();
    backend.put_cap(dir, 0, file_ro).unwrap();
    backend.write(file, 100, b"contents").unwrap();

    let dir = backend.get_cap(root, 0).unwrap();
    let file = backend.get_cap(dir, 0).unwrap();
    assert_eq!(backend.read(file, 100, 8).unwrap(), b"contents");
    assert!(matches!(
        backend.write(file, 100, b"x"),
        Err(BackendError::PermissionDenied { .. })
    ));
}
