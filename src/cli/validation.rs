use crate::disguise::Mode;
use crate::error::{GiffsError, Result};
use std::path::{Path, PathBuf};

/// Options given with `-o`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MountOptions {
    pub mode: Mode,
    pub allow_other: bool,
}

/// Parse every `-o` value. Each value is a comma-separated list; blank items
/// are skipped and unknown items are rejected.
pub fn parse_mount_options(values: &[String]) -> Result<MountOptions> {
    let mut options = MountOptions::default();

    for item in values.iter().flat_map(|v| v.split(',')) {
        match item.trim() {
            "" => {}
            "reverse" => options.mode = Mode::Reverse,
            "allow_other" => options.allow_other = true,
            other => {
                return Err(GiffsError::Config(format!(
                    "Unknown mount option '{}'. Supported options: reverse, allow_other",
                    other
                )));
            }
        }
    }

    Ok(options)
}

/// Check the two positional paths and return them canonicalized as
/// `(root, mountpoint)`.
pub fn validate_paths(root: &Path, mountpoint: &Path) -> Result<(PathBuf, PathBuf)> {
    let root = canonical_dir(root, "Backing directory")?;
    let mountpoint = canonical_dir(mountpoint, "Mount point")?;

    if root == mountpoint {
        return Err(GiffsError::Config(format!(
            "Mount point {} cannot be the backing directory itself",
            mountpoint.display()
        )));
    }

    if mountpoint.starts_with(&root) {
        return Err(GiffsError::Config(format!(
            "Mount point {} is inside the backing directory {}",
            mountpoint.display(),
            root.display()
        )));
    }

    Ok((root, mountpoint))
}

fn canonical_dir(path: &Path, what: &str) -> Result<PathBuf> {
    let canonical = path.canonicalize().map_err(|e| {
        GiffsError::Config(format!("{} {} not accessible: {}", what, path.display(), e))
    })?;

    if !canonical.is_dir() {
        return Err(GiffsError::Config(format!(
            "{} {} is not a directory",
            what,
            path.display()
        )));
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(values: &[&str]) -> Result<MountOptions> {
        let owned: Vec<String> = values.iter().map(|s| s.to_string()).collect();
        parse_mount_options(&owned)
    }

    #[test]
    fn test_no_options_selects_forward() {
        let parsed = opts(&[]).unwrap();
        assert_eq!(parsed.mode, Mode::Forward);
        assert!(!parsed.allow_other);
    }

    #[test]
    fn test_reverse_and_allow_other() {
        let parsed = opts(&["reverse,allow_other"]).unwrap();
        assert_eq!(parsed.mode, Mode::Reverse);
        assert!(parsed.allow_other);
    }

    #[test]
    fn test_repeated_flags_and_blank_items() {
        let parsed = opts(&["allow_other,", " reverse "]).unwrap();
        assert_eq!(parsed.mode, Mode::Reverse);
        assert!(parsed.allow_other);
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let err = opts(&["reverse,ro"]).unwrap_err();
        assert!(err.to_string().contains("Unknown mount option 'ro'"));
    }

    #[test]
    fn test_validate_paths_accepts_sibling_dirs() {
        let base = tempfile::tempdir().unwrap();
        let root = base.path().join("root");
        let mnt = base.path().join("mnt");
        std::fs::create_dir(&root).unwrap();
        std::fs::create_dir(&mnt).unwrap();

        let (r, m) = validate_paths(&root, &mnt).unwrap();
        assert!(r.is_absolute());
        assert!(m.ends_with("mnt"));
    }

    #[test]
    fn test_validate_paths_rejects_missing_root() {
        let base = tempfile::tempdir().unwrap();
        let err = validate_paths(&base.path().join("nope"), base.path()).unwrap_err();
        assert!(err.to_string().contains("Backing directory"));
    }

    #[test]
    fn test_validate_paths_rejects_file_mountpoint() {
        let base = tempfile::tempdir().unwrap();
        let file = base.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        let root = base.path().join("root");
        std::fs::create_dir(&root).unwrap();

        let err = validate_paths(&root, &file).unwrap_err();
        assert!(err.to_string().contains("is not a directory"));
    }

    #[test]
    fn test_validate_paths_rejects_recursive_mounts() {
        let root = tempfile::tempdir().unwrap();
        let inner = root.path().join("mnt");
        std::fs::create_dir(&inner).unwrap();

        assert!(validate_paths(root.path(), &inner).is_err());
        assert!(validate_paths(root.path(), root.path()).is_err());
    }
}
