use std::fs;
use std::path::{Path, PathBuf};

use giffs::{GiffsFs, Mode, SIGNATURE};
use tempfile::TempDir;

/// Get the path to the giffs binary for testing.
#[allow(dead_code)]
pub fn get_giffs_path() -> PathBuf {
    assert_cmd::cargo::cargo_bin!("giffs").to_path_buf()
}

/// A backing directory plus a driver over it. The directory lives as long as
/// the fixture.
#[allow(dead_code)]
pub struct Fixture {
    pub dir: TempDir,
    pub fs: GiffsFs,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new(mode: Mode) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let fs = GiffsFs::new(dir.path().to_path_buf(), mode, 1).expect("Failed to create GiffsFs");
        Fixture { dir, fs }
    }

    /// Create a fixture and populate its backing directory before the driver
    /// is built.
    pub fn with_backing(mode: Mode, setup: impl FnOnce(&Path)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        setup(dir.path());
        let fs = GiffsFs::new(dir.path().to_path_buf(), mode, 1).expect("Failed to create GiffsFs");
        Fixture { dir, fs }
    }

    pub fn backing(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn read_backing(&self, name: &str) -> Vec<u8> {
        fs::read(self.backing(name)).expect("Failed to read backing file")
    }

    pub fn write_backing(&self, name: &str, contents: &[u8]) {
        fs::write(self.backing(name), contents).expect("Failed to write backing file");
    }
}

#[allow(dead_code)]
pub fn signed(content: &[u8]) -> Vec<u8> {
    let mut bytes = SIGNATURE.to_vec();
    bytes.extend_from_slice(content);
    bytes
}

/// Sorted names under the backing directory.
#[allow(dead_code)]
pub fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("Failed to list directory")
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
