use fuser::FUSE_ROOT_ID;
use fxhash::FxHashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub(crate) struct InodeData {
    /// Path relative to the backing root. The root itself is the empty path.
    /// `None` once the name was unlinked or replaced by a rename; only open
    /// handles still reach the file.
    pub path: Option<PathBuf>,
    /// Outstanding kernel lookups; the entry is dropped when this reaches zero.
    pub lookups: u64,
}

/// Inode numbers handed to the kernel, and the backing path each one names.
#[derive(Debug)]
pub(crate) struct InodeTable {
    inodes: FxHashMap<u64, InodeData>,
    by_path: FxHashMap<PathBuf, u64>,
    next_ino: u64,
}

impl InodeTable {
    pub fn new() -> Self {
        let mut inodes = FxHashMap::default();
        let mut by_path = FxHashMap::default();
        inodes.insert(
            FUSE_ROOT_ID,
            InodeData {
                path: Some(PathBuf::new()),
                lookups: 1,
            },
        );
        by_path.insert(PathBuf::new(), FUSE_ROOT_ID);

        InodeTable {
            inodes,
            by_path,
            // Start at 2 because FUSE reserves inode 1 (FUSE_ROOT_ID) for the root directory
            next_ino: FUSE_ROOT_ID + 1,
        }
    }

    pub fn get(&self, ino: u64) -> Option<&InodeData> {
        self.inodes.get(&ino)
    }

    /// Current path of `ino`; `None` for unknown and detached inodes.
    pub fn path(&self, ino: u64) -> Option<&Path> {
        self.inodes.get(&ino).and_then(|i| i.path.as_deref())
    }

    /// Inode already assigned to `path`, without counting a lookup.
    pub fn peek(&self, path: &Path) -> Option<u64> {
        self.by_path.get(path).copied()
    }

    /// Return the inode for `path`, allocating one if needed, and count one
    /// kernel lookup against it.
    pub fn lookup(&mut self, path: &Path) -> u64 {
        if let Some(&ino) = self.by_path.get(path) {
            if let Some(inode) = self.inodes.get_mut(&ino) {
                inode.lookups += 1;
            }
            return ino;
        }

        let ino = self.next_ino;
        self.next_ino = self.next_ino.wrapping_add(1);
        self.inodes.insert(
            ino,
            InodeData {
                path: Some(path.to_path_buf()),
                lookups: 1,
            },
        );
        self.by_path.insert(path.to_path_buf(), ino);
        ino
    }

    pub fn forget(&mut self, ino: u64, nlookup: u64) {
        if ino == FUSE_ROOT_ID {
            return;
        }
        let Some(inode) = self.inodes.get_mut(&ino) else {
            return;
        };
        inode.lookups = inode.lookups.saturating_sub(nlookup);
        if inode.lookups == 0 {
            if let Some(path) = self.inodes.remove(&ino).and_then(|i| i.path) {
                if self.by_path.get(&path) == Some(&ino) {
                    self.by_path.remove(&path);
                }
            }
        }
    }

    /// Detach `path` from its inode after unlink/rmdir. The inode itself stays
    /// until the kernel forgets it.
    pub fn unlink(&mut self, path: &Path) {
        if let Some(ino) = self.by_path.remove(path) {
            if let Some(inode) = self.inodes.get_mut(&ino) {
                inode.path = None;
            }
        }
    }

    /// Re-point `from` and everything below it at `to`. An inode previously
    /// at `to` is detached.
    pub fn rename(&mut self, from: &Path, to: &Path) {
        if from == to {
            return;
        }
        self.unlink(to);

        let moved: Vec<(PathBuf, u64)> = self
            .by_path
            .iter()
            .filter(|(path, _)| path.starts_with(from))
            .map(|(path, &ino)| (path.clone(), ino))
            .collect();

        for (old_path, ino) in moved {
            let Ok(suffix) = old_path.strip_prefix(from) else {
                continue;
            };
            let new_path = if suffix.as_os_str().is_empty() {
                to.to_path_buf()
            } else {
                to.join(suffix)
            };
            self.by_path.remove(&old_path);
            self.by_path.insert(new_path.clone(), ino);
            if let Some(inode) = self.inodes.get_mut(&ino) {
                inode.path = Some(new_path);
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_preallocated() {
        let table = InodeTable::new();
        assert_eq!(table.path(FUSE_ROOT_ID), Some(Path::new("")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_lookup_is_stable_per_path() {
        let mut table = InodeTable::new();
        let a = table.lookup(Path::new("a.txt"));
        let b = table.lookup(Path::new("b.txt"));
        assert_ne!(a, b);
        assert_eq!(table.lookup(Path::new("a.txt")), a);
        assert_eq!(table.path(a), Some(Path::new("a.txt")));
        assert_eq!(table.peek(Path::new("b.txt")), Some(b));
        assert_eq!(table.peek(Path::new("c.txt")), None);
    }

    #[test]
    fn test_forget_drops_entry_after_last_lookup() {
        let mut table = InodeTable::new();
        let ino = table.lookup(Path::new("a.txt"));
        table.lookup(Path::new("a.txt"));

        table.forget(ino, 1);
        assert!(table.path(ino).is_some());

        table.forget(ino, 1);
        assert!(table.path(ino).is_none());

        let again = table.lookup(Path::new("a.txt"));
        assert_ne!(again, ino);
    }

    #[test]
    fn test_root_is_never_forgotten() {
        let mut table = InodeTable::new();
        table.forget(FUSE_ROOT_ID, 100);
        assert!(table.path(FUSE_ROOT_ID).is_some());
    }

    #[test]
    fn test_rename_moves_descendants() {
        let mut table = InodeTable::new();
        let dir = table.lookup(Path::new("docs"));
        let file = table.lookup(Path::new("docs/readme"));
        let other = table.lookup(Path::new("docsx"));

        table.rename(Path::new("docs"), Path::new("archive/docs"));

        assert_eq!(table.path(dir), Some(Path::new("archive/docs")));
        assert_eq!(table.path(file), Some(Path::new("archive/docs/readme")));
        assert_eq!(table.path(other), Some(Path::new("docsx")));
        assert_eq!(table.lookup(Path::new("archive/docs/readme")), file);
    }

    #[test]
    fn test_unlink_frees_path_for_new_inode() {
        let mut table = InodeTable::new();
        let old = table.lookup(Path::new("a.txt"));
        table.unlink(Path::new("a.txt"));

        let new = table.lookup(Path::new("a.txt"));
        assert_ne!(old, new);
        assert_eq!(table.path(old), None);
        assert!(table.get(old).is_some(), "Detached inode lives until forgotten");
        assert_eq!(table.path(new), Some(Path::new("a.txt")));
    }

    #[test]
    fn test_rename_over_existing_detaches_destination() {
        let mut table = InodeTable::new();
        let a = table.lookup(Path::new("a"));
        let b = table.lookup(Path::new("b"));

        table.rename(Path::new("a"), Path::new("b"));

        assert_eq!(table.path(a), Some(Path::new("b")));
        assert_eq!(table.path(b), None);
        assert_eq!(table.peek(Path::new("b")), Some(a));

        table.forget(b, 1);
        assert!(table.get(b).is_none());
        assert_eq!(table.peek(Path::new("b")), Some(a), "Forgetting the old inode keeps the new mapping");
    }

    #[test]
    fn test_rename_onto_itself_is_a_no_op() {
        let mut table = InodeTable::new();
        let a = table.lookup(Path::new("a"));
        table.rename(Path::new("a"), Path::new("a"));
        assert_eq!(table.path(a), Some(Path::new("a")));
    }
}
