use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use crate::disguise::splice::BackingFile;

/// Open backing descriptors keyed by the handle number given to the kernel.
#[derive(Debug)]
pub(crate) struct HandleTable {
    handles: RwLock<HashMap<u64, Arc<BackingFile>>>,
    next_fh: Mutex<u64>,
}

impl HandleTable {
    pub fn new() -> Self {
        HandleTable {
            handles: RwLock::new(HashMap::new()),
            next_fh: Mutex::new(1),
        }
    }

    pub fn insert(&self, file: BackingFile) -> u64 {
        let fh = {
            let mut next = self.next_fh.lock();
            let fh = *next;
            *next = next.wrapping_add(1);
            fh
        };
        self.handles.write().insert(fh, Arc::new(file));
        fh
    }

    /// Clone the handle out so the table lock is not held across I/O.
    pub fn get(&self, fh: u64) -> Option<Arc<BackingFile>> {
        self.handles.read().get(&fh).map(Arc::clone)
    }

    pub fn remove(&self, fh: u64) -> Option<Arc<BackingFile>> {
        self.handles.write().remove(&fh)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.handles.read().len()
    }
}
