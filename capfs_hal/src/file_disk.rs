//! File-backed cell device
//!
//! The backing store is one flat file of exactly `cell_count * CELL_SIZE`
//! bytes. Cell `i` lives at byte offset `i * CELL_SIZE`. There is no header.

use crate::cell::CELL_SIZE;
use crate::cell_device::{CellDevice, CellError};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Flat file holding a fixed number of cells
#[derive(Debug)]
pub struct FileDisk {
    file: File,
    path: PathBuf,
    cell_count: u64,
    created: bool,
}

impl FileDisk {
    /// Opens `path`, creating and sizing it first when it is missing and
    /// `create` is set.
    ///
    /// # Errors
    /// Returns `CellError::SizeMismatch` if an existing file is not exactly
    /// `cell_count * CELL_SIZE` bytes long.
    pub fn open(path: impl AsRef<Path>, cell_count: u64, create: bool) -> Result<Self, CellError> {
        let path = path.as_ref().to_path_buf();
        let expected = cell_count
            .checked_mul(CELL_SIZE as u64)
            .ok_or_else(|| CellError::Io(format!("{cell_count} cells overflow a file length")))?;

        let (file, created) = match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => (file, false),
            Err(err) if err.kind() == ErrorKind::NotFound && create => {
                tracing::debug!(path = %path.display(), bytes = expected, "creating backing file");
                (create_sized(&path, expected)?, true)
            }
            Err(err) => return Err(err.into()),
        };

        let actual = file.metadata()?.len();
        if actual != expected {
            return Err(CellError::SizeMismatch { expected, actual });
        }

        Ok(Self {
            file,
            path,
            cell_count,
            created,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if this call to [`FileDisk::open`] created the file.
    pub fn was_created(&self) -> bool {
        self.created
    }

    fn seek_to(&mut self, cell_id: u64) -> Result<(), CellError> {
        self.check_cell(cell_id)?;
        self.file.seek(SeekFrom::Start(cell_id * CELL_SIZE as u64))?;
        Ok(())
    }
}

impl CellDevice for FileDisk {
    fn cell_count(&self) -> u64 {
        self.cell_count
    }

    fn read_cell(&mut self, cell_id: u64, buffer: &mut [u8; CELL_SIZE]) -> Result<(), CellError> {
        self.seek_to(cell_id)?;
        self.file.read_exact(buffer)?;
        Ok(())
    }

    fn write_cell(&mut self, cell_id: u64, buffer: &[u8; CELL_SIZE]) -> Result<(), CellError> {
        self.seek_to(cell_id)?;
        self.file.write_all(buffer)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CellError> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

/// Creates `path` with length `len`. A file that cannot be sized is
/// removed again, so the next open retries the create.
fn create_sized(path: &Path, len: u64) -> Result<File, CellError> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(path)?;
    if let Err(err) = file.set_len(len) {
        drop(file);
        if let Err(remove_err) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %remove_err, "cannot remove unsized backing file");
        }
        return Err(err.into());
    }
    Ok(file)
}
