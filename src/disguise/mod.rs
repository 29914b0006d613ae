mod attr;
mod convert;
mod file_handle;
mod mode;
pub mod mount;
mod ops;
pub mod splice;
pub mod translate;
mod types;

pub use mode::Mode;
pub use mount::{mount_fuse, unmount_fuse, MountSettings};
pub use ops::{AttrChanges, StatFs, ViewEntry, UNKNOWN_INO};

use file_handle::HandleTable;
use splice::IoLock;
use types::InodeTable;

use fuser::{
    Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, ReplyXattr, Request, TimeOrNow,
};
use parking_lot::RwLock;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::error::{FsError, GiffsError};

pub struct GiffsFs {
    root: PathBuf,
    mode: Mode,
    io_lock: IoLock,
    inodes: RwLock<InodeTable>,
    handles: HandleTable,
    /// Attribute and entry cache timeout handed to the kernel.
    ttl: Duration,
}

impl GiffsFs {
    pub fn new(root: PathBuf, mode: Mode, ttl_secs: u64) -> crate::error::Result<Self> {
        let root = root.canonicalize().map_err(|e| {
            GiffsError::Config(format!(
                "Backing directory {} not accessible: {}",
                root.display(),
                e
            ))
        })?;
        if !root.is_dir() {
            return Err(GiffsError::Config(format!(
                "Backing directory {} is not a directory",
                root.display()
            )));
        }

        Ok(GiffsFs {
            root,
            mode,
            io_lock: splice::new_io_lock(),
            inodes: RwLock::new(InodeTable::new()),
            handles: HandleTable::new(),
            ttl: Duration::from_secs(ttl_secs),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

/// Log an operation failure at a level matching its cause and return the
/// errno for the kernel.
fn errno(op: &str, err: FsError) -> libc::c_int {
    match err {
        FsError::NotFound | FsError::PermissionDenied | FsError::Unsupported(_) => {
            tracing::debug!("{}: {}", op, err)
        }
        FsError::Backing(_) => tracing::error!("{}: {}", op, err),
    }
    err.errno()
}

impl Filesystem for GiffsFs {
    fn init(
        &mut self,
        _req: &Request,
        _config: &mut KernelConfig,
    ) -> std::result::Result<(), libc::c_int> {
        tracing::info!(
            "GIFFS filesystem initialized over {} ({} mode)",
            self.root.display(),
            self.mode
        );
        Ok(())
    }

    fn destroy(&mut self) {
        tracing::info!("GIFFS filesystem destroyed");
    }

    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        tracing::debug!("lookup(parent={}, name={:?})", parent, name);
        match self.do_lookup(parent, name) {
            Ok(attrs) => reply.entry(&self.ttl, &attrs, 0),
            Err(e) => reply.error(errno("lookup", e)),
        }
    }

    fn forget(&mut self, _req: &Request, ino: u64, nlookup: u64) {
        self.do_forget(ino, nlookup);
    }

    fn getattr(&mut self, _req: &Request, ino: u64, fh: Option<u64>, reply: ReplyAttr) {
        tracing::trace!("getattr(ino={})", ino);
        match self.do_getattr(ino, fh) {
            Ok(attrs) => reply.attr(&self.ttl, &attrs),
            Err(e) => reply.error(errno("getattr", e)),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        tracing::debug!(
            "setattr(ino={}, mode={:?}, uid={:?}, gid={:?}, size={:?})",
            ino,
            mode,
            uid,
            gid,
            size
        );
        let changes = AttrChanges {
            mode,
            uid,
            gid,
            size,
            atime,
            mtime,
        };
        match self.do_setattr(ino, changes, fh) {
            Ok(attrs) => reply.attr(&self.ttl, &attrs),
            Err(e) => reply.error(errno("setattr", e)),
        }
    }

    fn readlink(&mut self, _req: &Request, ino: u64, reply: ReplyData) {
        tracing::debug!("readlink(ino={})", ino);
        match self.do_readlink(ino) {
            Ok(target) => reply.data(target.as_os_str().as_bytes()),
            Err(e) => reply.error(errno("readlink", e)),
        }
    }

    fn mknod(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        rdev: u32,
        reply: ReplyEntry,
    ) {
        tracing::debug!(
            "mknod(parent={}, name={:?}, mode={:#o})",
            parent,
            name,
            mode
        );
        match self.do_mknod(parent, name, mode, rdev) {
            Ok(attrs) => reply.entry(&self.ttl, &attrs, 0),
            Err(e) => reply.error(errno("mknod", e)),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        tracing::debug!(
            "mkdir(parent={}, name={:?}, mode={:#o})",
            parent,
            name,
            mode
        );
        match self.do_mkdir(parent, name, mode) {
            Ok(attrs) => reply.entry(&self.ttl, &attrs, 0),
            Err(e) => reply.error(errno("mkdir", e)),
        }
    }

    fn unlink(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        tracing::debug!("unlink(parent={}, name={:?})", parent, name);
        match self.do_unlink(parent, name) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(errno("unlink", e)),
        }
    }

    fn rmdir(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        tracing::debug!("rmdir(parent={}, name={:?})", parent, name);
        match self.do_rmdir(parent, name) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(errno("rmdir", e)),
        }
    }

    fn symlink(
        &mut self,
        _req: &Request,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        tracing::debug!(
            "symlink(parent={}, name={:?}, target={:?})",
            parent,
            link_name,
            target
        );
        match self.do_symlink(parent, link_name, target) {
            Ok(attrs) => reply.entry(&self.ttl, &attrs, 0),
            Err(e) => reply.error(errno("symlink", e)),
        }
    }

    fn rename(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
        reply: ReplyEmpty,
    ) {
        tracing::debug!(
            "rename(parent={}, name={:?}, newparent={}, newname={:?})",
            parent,
            name,
            newparent,
            newname
        );
        match self.do_rename(parent, name, newparent, newname, flags) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(errno("rename", e)),
        }
    }

    fn link(
        &mut self,
        _req: &Request,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        tracing::debug!(
            "link(ino={}, newparent={}, newname={:?})",
            ino,
            newparent,
            newname
        );
        match self.do_link(ino, newparent, newname) {
            Ok(attrs) => reply.entry(&self.ttl, &attrs, 0),
            Err(e) => reply.error(errno("link", e)),
        }
    }

    fn open(&mut self, _req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        tracing::debug!("open(ino={}, flags={:#x})", ino, flags);
        match self.do_open(ino, flags) {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(errno("open", e)),
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        tracing::debug!(
            "read(ino={}, fh={}, offset={}, size={})",
            ino,
            fh,
            offset,
            size
        );
        match self.do_read(fh, offset, size) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(errno("read", e)),
        }
    }

    fn write(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        tracing::debug!(
            "write(ino={}, fh={}, offset={}, len={})",
            ino,
            fh,
            offset,
            data.len()
        );
        match self.do_write(fh, offset, data) {
            Ok(written) => reply.written(written as u32),
            Err(e) => reply.error(errno("write", e)),
        }
    }

    fn flush(&mut self, _req: &Request, ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        tracing::debug!("flush(ino={}, fh={})", ino, fh);
        match self.do_flush(fh) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(errno("flush", e)),
        }
    }

    fn release(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        tracing::debug!("release(ino={}, fh={})", ino, fh);
        match self.do_release(fh) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(errno("release", e)),
        }
    }

    fn fsync(&mut self, _req: &Request, ino: u64, fh: u64, datasync: bool, reply: ReplyEmpty) {
        tracing::debug!("fsync(ino={}, fh={}, datasync={})", ino, fh, datasync);
        match self.do_fsync(fh, datasync) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(errno("fsync", e)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        tracing::debug!("readdir(ino={}, offset={})", ino, offset);
        let entries = match self.do_readdir(ino) {
            Ok(entries) => entries,
            Err(e) => {
                reply.error(errno("readdir", e));
                return;
            }
        };

        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, entry) in entries.into_iter().enumerate().skip(skip) {
            // Offset of the next entry; the kernel resumes from it.
            if reply.add(entry.ino, (i + 1) as i64, entry.kind, &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request, ino: u64, reply: ReplyStatfs) {
        tracing::debug!("statfs(ino={})", ino);
        match self.do_statfs(ino) {
            Ok(st) => reply.statfs(
                st.blocks, st.bfree, st.bavail, st.files, st.ffree, st.bsize, st.namelen,
                st.frsize,
            ),
            Err(e) => reply.error(errno("statfs", e)),
        }
    }

    fn access(&mut self, _req: &Request, ino: u64, mask: i32, reply: ReplyEmpty) {
        tracing::trace!("access(ino={}, mask={:#o})", ino, mask);
        match self.do_access(ino, mask) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(errno("access", e)),
        }
    }

    fn create(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        tracing::debug!(
            "create(parent={}, name={:?}, mode={:#o})",
            parent,
            name,
            mode
        );
        match self.do_create(parent, name, mode, flags) {
            Ok((attrs, fh)) => reply.created(&self.ttl, &attrs, 0, fh, 0),
            Err(e) => reply.error(errno("create", e)),
        }
    }

    // Extended attributes are not offered by the view.

    fn setxattr(
        &mut self,
        _req: &Request,
        _ino: u64,
        _name: &OsStr,
        _value: &[u8],
        _flags: i32,
        _position: u32,
        reply: ReplyEmpty,
    ) {
        reply.error(libc::ENOSYS);
    }

    fn getxattr(&mut self, _req: &Request, _ino: u64, _name: &OsStr, _size: u32, reply: ReplyXattr) {
        reply.error(libc::ENOSYS);
    }

    fn listxattr(&mut self, _req: &Request, _ino: u64, _size: u32, reply: ReplyXattr) {
        reply.error(libc::ENOSYS);
    }

    fn removexattr(&mut self, _req: &Request, _ino: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(libc::ENOSYS);
    }
}
