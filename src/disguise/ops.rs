//! Operation bodies behind the `Filesystem` callbacks.
//!
//! Each operation resolves the backing path, applies the mode rules and
//! returns a typed result; `mod.rs` only turns those into kernel replies.

use fuser::{FileAttr, FileType, TimeOrNow};
use nix::sys::stat::{utimensat, Mode as PermMode, SFlag, UtimensatFlags};
use nix::sys::time::TimeSpec;
use nix::unistd::AccessFlags;
use std::ffi::{OsStr, OsString};
use std::fs::{self, DirBuilder, File, FileTimes, OpenOptions, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::disguise::attr;
use crate::disguise::convert::{metadata_to_fileattr, mode_to_filetype, std_filetype_to_fuser};
use crate::disguise::splice::{self, BackingFile};
use crate::disguise::GiffsFs;
use crate::error::FsError;
use crate::signature::SIGNATURE;

/// Inode reported for directory entries the kernel has not looked up yet, as
/// libfuse's `FUSE_UNKNOWN_INO`. The kernel resolves the real one by lookup.
pub const UNKNOWN_INO: u64 = 0xffff_ffff;

/// Changes requested by a `setattr` call. `None` leaves the attribute alone.
#[derive(Debug, Default)]
pub struct AttrChanges {
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub size: Option<u64>,
    pub atime: Option<TimeOrNow>,
    pub mtime: Option<TimeOrNow>,
}

impl AttrChanges {
    fn mutates_content_or_ownership(&self) -> bool {
        self.mode.is_some() || self.uid.is_some() || self.gid.is_some() || self.size.is_some()
    }
}

/// One directory entry as listed through the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewEntry {
    pub ino: u64,
    pub kind: FileType,
    pub name: OsString,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatFs {
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub bsize: u32,
    pub namelen: u32,
    pub frsize: u32,
}

/// What a `setattr` applies to: the name, or the descriptor once the name is gone.
#[derive(Clone, Copy)]
enum Target<'a> {
    Path(&'a Path),
    File(&'a File),
}

impl GiffsFs {
    fn require_forward(&self, op: &'static str) -> Result<(), FsError> {
        if self.mode.is_reverse() {
            return Err(FsError::Unsupported(op));
        }
        Ok(())
    }

    fn rel_path(&self, ino: u64) -> Result<PathBuf, FsError> {
        self.inodes
            .read()
            .path(ino)
            .map(Path::to_path_buf)
            .ok_or(FsError::NotFound)
    }

    /// Backing-relative path of `ino`, or `None` when the inode is detached.
    fn resolve(&self, ino: u64) -> Result<Option<PathBuf>, FsError> {
        self.inodes
            .read()
            .get(ino)
            .map(|inode| inode.path.clone())
            .ok_or(FsError::NotFound)
    }

    fn child_path(&self, parent: u64, name: &OsStr) -> Result<PathBuf, FsError> {
        Ok(self.rel_path(parent)?.join(name))
    }

    fn backing_path(&self, rel: &Path) -> PathBuf {
        if rel.as_os_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        }
    }

    fn handle(&self, fh: u64) -> Result<std::sync::Arc<BackingFile>, FsError> {
        self.handles
            .get(fh)
            .ok_or_else(|| FsError::Backing(io::Error::from_raw_os_error(libc::EBADF)))
    }

    /// Stat `rel`, register it in the inode table and return view attributes.
    fn entry_attr(&self, rel: &Path) -> Result<FileAttr, FsError> {
        let meta = fs::symlink_metadata(self.backing_path(rel))?;
        let ino = self.inodes.write().lookup(rel);
        Ok(attr::adjust(self.mode, metadata_to_fileattr(&meta, ino)))
    }

    pub fn do_lookup(&self, parent: u64, name: &OsStr) -> Result<FileAttr, FsError> {
        let rel = self.child_path(parent, name)?;
        self.entry_attr(&rel)
    }

    pub fn do_forget(&self, ino: u64, nlookup: u64) {
        self.inodes.write().forget(ino, nlookup);
    }

    pub fn do_getattr(&self, ino: u64, fh: Option<u64>) -> Result<FileAttr, FsError> {
        let rel = self.resolve(ino)?;
        let stat = match &rel {
            Some(rel) => match fs::symlink_metadata(self.backing_path(rel)) {
                Ok(meta) => Some(meta),
                Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                Err(e) => return Err(e.into()),
            },
            None => None,
        };
        // A detached or vanished name: only the open descriptor still knows the file.
        let meta = match (stat, fh) {
            (Some(meta), _) => meta,
            (None, Some(fh)) => self.handle(fh)?.get_ref().metadata()?,
            (None, None) => return Err(FsError::NotFound),
        };

        let attrs = attr::adjust(self.mode, metadata_to_fileattr(&meta, ino));
        tracing::trace!(
            "getattr: ino={} path={:?} backing_size={} view_size={}",
            ino,
            rel,
            meta.len(),
            attrs.size
        );
        Ok(attrs)
    }

    pub fn do_setattr(
        &self,
        ino: u64,
        changes: AttrChanges,
        fh: Option<u64>,
    ) -> Result<FileAttr, FsError> {
        if changes.mutates_content_or_ownership() {
            let op = if changes.size.is_some() {
                "truncate"
            } else if changes.mode.is_some() {
                "chmod"
            } else {
                "chown"
            };
            self.require_forward(op)?;
        }

        let path = self.resolve(ino)?.map(|rel| self.backing_path(&rel));
        let file = fh.and_then(|fh| self.handles.get(fh));
        let target = match (&path, &file) {
            (Some(path), _) => Target::Path(path),
            (None, Some(file)) => Target::File(file.get_ref()),
            (None, None) => return Err(FsError::NotFound),
        };

        if let Some(size) = changes.size {
            let via = file.as_ref().map_or(target, |file| Target::File(file.get_ref()));
            match via {
                Target::Path(path) => attr::truncate_path(self.mode, path, size)?,
                Target::File(file) => attr::truncate_file(self.mode, file, size)?,
            }
        }

        if let Some(mode) = changes.mode {
            let perms = Permissions::from_mode(mode & 0o7777);
            match target {
                Target::Path(path) => fs::set_permissions(path, perms)?,
                Target::File(file) => file.set_permissions(perms)?,
            }
        }

        if changes.uid.is_some() || changes.gid.is_some() {
            match target {
                Target::Path(path) => std::os::unix::fs::lchown(path, changes.uid, changes.gid)?,
                Target::File(file) => std::os::unix::fs::fchown(file, changes.uid, changes.gid)?,
            }
        }

        if changes.atime.is_some() || changes.mtime.is_some() {
            match target {
                Target::Path(path) => set_path_times(path, changes.atime, changes.mtime)?,
                Target::File(file) => set_file_times(file, changes.atime, changes.mtime)?,
            }
        }

        self.do_getattr(ino, fh)
    }

    pub fn do_readlink(&self, ino: u64) -> Result<PathBuf, FsError> {
        let rel = self.rel_path(ino)?;
        Ok(fs::read_link(self.backing_path(&rel))?)
    }

    pub fn do_mknod(
        &self,
        parent: u64,
        name: &OsStr,
        mode: u32,
        rdev: u32,
    ) -> Result<FileAttr, FsError> {
        self.require_forward("mknod")?;
        let rel = self.child_path(parent, name)?;
        let path = self.backing_path(&rel);

        if mode_to_filetype(mode) == FileType::RegularFile {
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(mode & 0o7777)
                .open(&path)?;
            file.write_all(&SIGNATURE)?;
        } else {
            nix::sys::stat::mknod(
                path.as_path(),
                SFlag::from_bits_truncate(mode as libc::mode_t),
                PermMode::from_bits_truncate((mode & 0o7777) as libc::mode_t),
                rdev as libc::dev_t,
            )?;
        }

        self.entry_attr(&rel)
    }

    pub fn do_mkdir(&self, parent: u64, name: &OsStr, mode: u32) -> Result<FileAttr, FsError> {
        self.require_forward("mkdir")?;
        let rel = self.child_path(parent, name)?;
        DirBuilder::new()
            .mode(mode & 0o7777)
            .create(self.backing_path(&rel))?;
        self.entry_attr(&rel)
    }

    pub fn do_unlink(&self, parent: u64, name: &OsStr) -> Result<(), FsError> {
        self.require_forward("unlink")?;
        let rel = self.child_path(parent, name)?;
        fs::remove_file(self.backing_path(&rel))?;
        self.inodes.write().unlink(&rel);
        Ok(())
    }

    pub fn do_rmdir(&self, parent: u64, name: &OsStr) -> Result<(), FsError> {
        self.require_forward("rmdir")?;
        let rel = self.child_path(parent, name)?;
        fs::remove_dir(self.backing_path(&rel))?;
        self.inodes.write().unlink(&rel);
        Ok(())
    }

    pub fn do_symlink(
        &self,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
    ) -> Result<FileAttr, FsError> {
        self.require_forward("symlink")?;
        let rel = self.child_path(parent, link_name)?;
        std::os::unix::fs::symlink(target, self.backing_path(&rel))?;
        self.entry_attr(&rel)
    }

    pub fn do_rename(
        &self,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
    ) -> Result<(), FsError> {
        self.require_forward("rename")?;
        if flags != 0 {
            // RENAME_NOREPLACE / RENAME_EXCHANGE; callers fall back to plain rename.
            return Err(FsError::Backing(io::Error::from_raw_os_error(libc::EINVAL)));
        }

        let from = self.child_path(parent, name)?;
        let to = self.child_path(newparent, newname)?;
        fs::rename(self.backing_path(&from), self.backing_path(&to))?;
        self.inodes.write().rename(&from, &to);
        Ok(())
    }

    pub fn do_link(&self, ino: u64, newparent: u64, newname: &OsStr) -> Result<FileAttr, FsError> {
        self.require_forward("link")?;
        let src = self.rel_path(ino)?;
        let dest = self.child_path(newparent, newname)?;
        fs::hard_link(self.backing_path(&src), self.backing_path(&dest))?;
        self.entry_attr(&dest)
    }

    pub fn do_open(&self, ino: u64, flags: i32) -> Result<u64, FsError> {
        let accmode = flags & libc::O_ACCMODE;
        let wants_write = accmode != libc::O_RDONLY;
        if wants_write {
            self.require_forward("write")?;
        }

        let rel = self.rel_path(ino)?;
        let path = self.backing_path(&rel);

        // O_TRUNC and O_APPEND are not passed down: either would reach the
        // stored signature. Truncation goes through the adjuster, appends land
        // through the shifted write offset.
        let file = File::options()
            .read(accmode != libc::O_WRONLY)
            .write(wants_write)
            .open(&path)?;

        if wants_write && flags & libc::O_TRUNC != 0 {
            attr::truncate_file(self.mode, &file, 0)?;
        }

        let fh = self
            .handles
            .insert(BackingFile::new(file, self.io_lock.clone()));
        tracing::debug!("open: {:?} -> fh={} (write={})", rel, fh, wants_write);
        Ok(fh)
    }

    pub fn do_create(
        &self,
        parent: u64,
        name: &OsStr,
        mode: u32,
        flags: i32,
    ) -> Result<(FileAttr, u64), FsError> {
        self.require_forward("create")?;
        let rel = self.child_path(parent, name)?;
        let path = self.backing_path(&rel);

        let mut options = OpenOptions::new();
        options.read(true).write(true).mode(mode & 0o7777);
        if flags & libc::O_EXCL != 0 {
            options.create_new(true);
        } else {
            options.create(true).truncate(true);
        }
        let mut file = options.open(&path)?;
        file.write_all(&SIGNATURE)?;

        let attrs = self.entry_attr(&rel)?;
        let fh = self
            .handles
            .insert(BackingFile::new(file, self.io_lock.clone()));
        tracing::debug!("create: {:?} -> fh={}", rel, fh);
        Ok((attrs, fh))
    }

    pub fn do_read(&self, fh: u64, offset: i64, size: u32) -> Result<Vec<u8>, FsError> {
        let offset = u64::try_from(offset)
            .map_err(|_| FsError::Backing(io::Error::from_raw_os_error(libc::EINVAL)))?;
        let file = self.handle(fh)?;
        Ok(splice::read(self.mode, &*file, offset, size as usize)?)
    }

    pub fn do_write(&self, fh: u64, offset: i64, data: &[u8]) -> Result<usize, FsError> {
        self.require_forward("write")?;
        let offset = u64::try_from(offset)
            .map_err(|_| FsError::Backing(io::Error::from_raw_os_error(libc::EINVAL)))?;
        let file = self.handle(fh)?;
        splice::write(self.mode, &*file, offset, data)
    }

    pub fn do_flush(&self, fh: u64) -> Result<(), FsError> {
        let file = self.handle(fh)?;
        file.get_ref().sync_all()?;
        Ok(())
    }

    pub fn do_fsync(&self, fh: u64, datasync: bool) -> Result<(), FsError> {
        let file = self.handle(fh)?;
        if datasync {
            file.get_ref().sync_data()?;
        } else {
            file.get_ref().sync_all()?;
        }
        Ok(())
    }

    pub fn do_release(&self, fh: u64) -> Result<(), FsError> {
        // Dropping the last Arc closes the descriptor.
        self.handles.remove(fh).map(|_| ()).ok_or_else(|| {
            FsError::Backing(io::Error::from_raw_os_error(libc::EBADF))
        })
    }

    pub fn do_readdir(&self, ino: u64) -> Result<Vec<ViewEntry>, FsError> {
        let rel = self.rel_path(ino)?;
        let parent_ino = {
            let inodes = self.inodes.read();
            rel.parent()
                .and_then(|p| inodes.peek(p))
                .unwrap_or(fuser::FUSE_ROOT_ID)
        };

        let mut entries = vec![
            ViewEntry {
                ino,
                kind: FileType::Directory,
                name: OsString::from("."),
            },
            ViewEntry {
                ino: parent_ino,
                kind: FileType::Directory,
                name: OsString::from(".."),
            },
        ];

        for entry in fs::read_dir(self.backing_path(&rel))? {
            let entry = entry?;
            let kind = match std_filetype_to_fuser(entry.file_type()?) {
                Some(kind) => kind,
                None => metadata_to_fileattr(&entry.metadata()?, 0).kind,
            };
            let name = entry.file_name();
            let child_ino = self
                .inodes
                .read()
                .peek(&rel.join(&name))
                .unwrap_or(UNKNOWN_INO);
            entries.push(ViewEntry {
                ino: child_ino,
                kind,
                name,
            });
        }

        Ok(entries)
    }

    pub fn do_statfs(&self, ino: u64) -> Result<StatFs, FsError> {
        let rel = self.rel_path(ino)?;
        let path = self.backing_path(&rel);
        let stat = nix::sys::statvfs::statvfs(path.as_path())?;
        Ok(StatFs {
            blocks: stat.blocks() as u64,
            bfree: stat.blocks_free() as u64,
            bavail: stat.blocks_available() as u64,
            files: stat.files() as u64,
            ffree: stat.files_free() as u64,
            bsize: stat.block_size() as u32,
            namelen: stat.name_max() as u32,
            frsize: stat.fragment_size() as u32,
        })
    }

    pub fn do_access(&self, ino: u64, mask: i32) -> Result<(), FsError> {
        let rel = self.rel_path(ino)?;
        let path = self.backing_path(&rel);
        nix::unistd::access(path.as_path(), AccessFlags::from_bits_truncate(mask))
            .map_err(|_| FsError::PermissionDenied)
    }
}

fn to_timespec(time: Option<TimeOrNow>) -> TimeSpec {
    match time {
        Some(TimeOrNow::SpecificTime(t)) => {
            TimeSpec::from_duration(t.duration_since(UNIX_EPOCH).unwrap_or_default())
        }
        Some(TimeOrNow::Now) => TimeSpec::UTIME_NOW,
        None => TimeSpec::UTIME_OMIT,
    }
}

fn set_path_times(
    path: &Path,
    atime: Option<TimeOrNow>,
    mtime: Option<TimeOrNow>,
) -> Result<(), FsError> {
    utimensat(
        None,
        path,
        &to_timespec(atime),
        &to_timespec(mtime),
        UtimensatFlags::NoFollowSymlink,
    )?;
    Ok(())
}

fn set_file_times(
    file: &File,
    atime: Option<TimeOrNow>,
    mtime: Option<TimeOrNow>,
) -> Result<(), FsError> {
    let resolve = |time: TimeOrNow| match time {
        TimeOrNow::SpecificTime(t) => t,
        TimeOrNow::Now => SystemTime::now(),
    };
    let mut times = FileTimes::new();
    if let Some(atime) = atime {
        times = times.set_accessed(resolve(atime));
    }
    if let Some(mtime) = mtime {
        times = times.set_modified(resolve(mtime));
    }
    file.set_times(times)?;
    Ok(())
}
