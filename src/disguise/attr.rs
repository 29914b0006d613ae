use fuser::{FileAttr, FileType};
use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::disguise::mode::Mode;
use crate::disguise::translate;
use crate::error::FsError;
use crate::signature::SIGNATURE_LEN;

/// Size of a regular file as the view reports it.
///
/// A forward-mode backing file shorter than the signature was not written by
/// this driver; it is reported as empty rather than wrapping around.
pub fn view_size(mode: Mode, backing_size: u64) -> u64 {
    translate::to_view(mode, backing_size).unwrap_or_else(|| {
        tracing::warn!(
            "backing file of {} bytes is shorter than the signature; reporting size 0",
            backing_size
        );
        0
    })
}

/// Rewrite backing attributes into view attributes. Only regular files carry
/// the signature, so every other node type passes through unchanged.
pub fn adjust(mode: Mode, mut attr: FileAttr) -> FileAttr {
    if attr.kind == FileType::RegularFile {
        attr.size = view_size(mode, attr.size);
    }
    attr
}

/// Backing length for a truncate to `view_len`. Only the forward view can be
/// truncated; the signature always survives.
pub fn backing_len(mode: Mode, view_len: u64) -> Result<u64, FsError> {
    if mode.is_reverse() {
        return Err(FsError::Unsupported("truncate"));
    }
    translate::to_backing(mode, view_len).ok_or(FsError::Unsupported("truncate"))
}

/// Truncate through an open descriptor.
pub fn truncate_file(mode: Mode, file: &File, view_len: u64) -> Result<(), FsError> {
    let len = backing_len(mode, view_len)?;
    file.set_len(len)?;
    Ok(())
}

/// Truncate by path, for `truncate(2)` without an open handle.
pub fn truncate_path(mode: Mode, path: &Path, view_len: u64) -> Result<(), FsError> {
    let len = backing_len(mode, view_len)?;
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(len)?;
    Ok(())
}
