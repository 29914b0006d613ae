//! Offset translation between the mounted view and the backing file.
//!
//! Everything here is pure arithmetic over [`SIGNATURE_LEN`]. The splice
//! engine turns a [`ReadPlan`] into actual I/O.

use std::ops::Range;

use crate::disguise::mode::Mode;
use crate::signature::SIGNATURE_LEN;

/// How a view-relative read is satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadPlan {
    /// The whole request is served from the backing file.
    Backing { offset: u64, len: usize },
    /// The request starts inside the synthesized signature. `signature` is the
    /// slice of [`crate::signature::SIGNATURE`] to emit first, then
    /// `backing_len` bytes follow from backing offset 0.
    Spliced {
        signature: Range<usize>,
        backing_len: usize,
    },
}

impl ReadPlan {
    /// Whether serving this plan touches the backing descriptor at all.
    pub fn needs_backing(&self) -> bool {
        match self {
            ReadPlan::Backing { .. } => true,
            ReadPlan::Spliced { backing_len, .. } => *backing_len > 0,
        }
    }
}

pub fn plan_read(mode: Mode, offset: u64, len: usize) -> ReadPlan {
    match mode {
        Mode::Forward => ReadPlan::Backing {
            offset: offset.saturating_add(SIGNATURE_LEN),
            len,
        },
        Mode::Reverse if offset < SIGNATURE_LEN => {
            let start = offset as usize;
            let available = SIGNATURE_LEN as usize - start;
            let from_signature = len.min(available);
            ReadPlan::Spliced {
                signature: start..start + from_signature,
                backing_len: len - from_signature,
            }
        }
        Mode::Reverse => ReadPlan::Backing {
            offset: offset - SIGNATURE_LEN,
            len,
        },
    }
}

/// Backing offset for a forward-mode write at `offset`.
pub fn write_offset(offset: u64) -> u64 {
    offset.saturating_add(SIGNATURE_LEN)
}

/// Backing offset of the byte at `view_offset`, or `None` when the byte is
/// part of the synthesized signature and has no backing counterpart.
pub fn to_backing(mode: Mode, view_offset: u64) -> Option<u64> {
    match mode {
        Mode::Forward => Some(view_offset.saturating_add(SIGNATURE_LEN)),
        Mode::Reverse => view_offset.checked_sub(SIGNATURE_LEN),
    }
}

/// View offset of the byte at `backing_offset`, or `None` when the byte is the
/// stored signature and is hidden from the view.
pub fn to_view(mode: Mode, backing_offset: u64) -> Option<u64> {
    match mode {
        Mode::Forward => backing_offset.checked_sub(SIGNATURE_LEN),
        Mode::Reverse => Some(backing_offset.saturating_add(SIGNATURE_LEN)),
    }
}
