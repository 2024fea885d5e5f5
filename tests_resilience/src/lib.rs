//! Resilience Test Utilities
//!
//! This crate provides shared utilities for resilience and integration tests.
//!
//! ## Test Philosophy
//!
//! - **Safety under faults**: A failed cell write must never corrupt neighbours
//! - **Deterministic failures**: All faults are reproducible via `FailurePolicy`
//! - **No capability leaks**: An overwritten slot never yields a capability again
//! - **Durability**: Data written before `destroy` is visible after reopening

use capfs_hal::RamDisk;
use capfs_store::{cells_for, CapBackend, FileBackend, StoreConfig};
use std::path::Path;
use tempfile::TempDir;

/// Installs a test-friendly tracing subscriber. Safe to call from every test.
///
/// Honors `RUST_LOG`; defaults to warnings only.
pub fn init_test_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// In-memory backend whose root covers `2^size_bits` bytes.
pub fn ram_backend(size_bits: u8) -> CapBackend<RamDisk> {
    init_test_logging();
    let disk = RamDisk::new(cells_for(1 << size_bits) as usize);
    match CapBackend::with_device(disk, size_bits) {
        Ok(backend) => backend,
        Err(err) => panic!("cannot build RAM backend: {err}"),
    }
}

/// Store config pointing at `store.bin` inside `dir`.
pub fn store_config(dir: &Path, size_bits: u8) -> StoreConfig {
    StoreConfig::new(dir.join("store.bin")).with_size_bits(size_bits)
}

/// File-backed store in a fresh temporary directory. Keep the returned
/// directory alive for as long as the backend is used.
pub fn temp_file_backend(size_bits: u8) -> (TempDir, StoreConfig, FileBackend) {
    init_test_logging();
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => panic!("cannot create temp dir: {err}"),
    };
    let config = store_config(dir.path(), size_bits);
    match FileBackend::init(&config) {
        Ok(backend) => (dir, config, backend),
        Err(err) => panic!("cannot init file backend: {err}"),
    }
}

/// Deterministic, non-repeating byte pattern for `len` bytes.
pub fn pattern(seed: u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| seed.wrapping_add((i % 251) as u8).wrapping_mul(31))
        .collect()
}
