//! Read/write engine over backing descriptors.
//!
//! A backing descriptor has one file position shared by every caller holding
//! the handle. [`BackingFile`] only exposes seek-then-transfer as a single
//! step, taken under the mount-wide I/O lock.

use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use crate::disguise::mode::Mode;
use crate::disguise::translate::{self, ReadPlan};
use crate::error::FsError;
use crate::signature::SIGNATURE;

/// The single lock of a mount instance, guarding every seek+transfer pair.
pub type IoLock = Arc<Mutex<()>>;

pub fn new_io_lock() -> IoLock {
    Arc::new(Mutex::new(()))
}

#[derive(Debug)]
pub struct BackingFile<F = File> {
    file: F,
    lock: IoLock,
}

impl<F> BackingFile<F>
where
    for<'a> &'a F: Read + Write + Seek,
{
    pub fn new(file: F, lock: IoLock) -> Self {
        BackingFile { file, lock }
    }

    /// Direct access for operations that do not depend on the file position
    /// (fsync, ftruncate, fstat).
    pub fn get_ref(&self) -> &F {
        &self.file
    }

    /// Seek to `pos` and run `op` on the descriptor without releasing the lock
    /// in between.
    pub fn seek_and<T>(
        &self,
        pos: u64,
        op: impl FnOnce(&mut &F) -> io::Result<T>,
    ) -> io::Result<T> {
        let _guard = self.lock.lock();
        let mut cursor = &self.file;
        cursor.seek(SeekFrom::Start(pos))?;
        op(&mut cursor)
    }

    fn read_at(&self, pos: u64, len: usize) -> io::Result<Vec<u8>> {
        self.seek_and(pos, |cursor| {
            let mut buf = Vec::with_capacity(len);
            cursor.take(len as u64).read_to_end(&mut buf)?;
            Ok(buf)
        })
    }
}

/// Serve a view-relative read. The result may be shorter than `len` at end of
/// file.
pub fn read<F>(mode: Mode, file: &BackingFile<F>, offset: u64, len: usize) -> io::Result<Vec<u8>>
where
    for<'a> &'a F: Read + Write + Seek,
{
    let plan = translate::plan_read(mode, offset, len);
    let needs_backing = plan.needs_backing();
    match plan {
        ReadPlan::Backing { offset, len } => file.read_at(offset, len),
        ReadPlan::Spliced {
            signature,
            backing_len,
        } => {
            let mut data = Vec::with_capacity(signature.len() + backing_len);
            data.extend_from_slice(&SIGNATURE[signature]);
            if needs_backing {
                data.extend(file.read_at(0, backing_len)?);
            }
            Ok(data)
        }
    }
}

/// Serve a view-relative write. Only the forward view is writable.
pub fn write<F>(mode: Mode, file: &BackingFile<F>, offset: u64, data: &[u8]) -> Result<usize, FsError>
where
    for<'a> &'a F: Read + Write + Seek,
{
    if mode.is_reverse() {
        return Err(FsError::Unsupported("write"));
    }

    file.seek_and(translate::write_offset(offset), |cursor| {
        cursor.write_all(data)?;
        Ok(data.len())
    })
    .map_err(FsError::from)
}
