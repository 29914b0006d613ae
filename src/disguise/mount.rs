use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use crate::config::Config;
use crate::disguise::GiffsFs;
use crate::error::{GiffsError, Result};

const MOUNT_TIMEOUT: Duration = Duration::from_millis(2000);
const CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Mount-level settings passed to the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSettings {
    pub fsname: String,
    pub allow_other: bool,
    pub auto_unmount: bool,
}

impl MountSettings {
    pub fn from_config(config: &Config, allow_other: bool) -> Self {
        MountSettings {
            fsname: config.fuse.get_fsname(),
            allow_other,
            auto_unmount: config.fuse.get_auto_unmount(),
        }
    }

    pub fn mount_options(&self) -> Vec<fuser::MountOption> {
        // Reverse mode is not mounted read-only: mutations have to reach the
        // filesystem so they are refused with EOPNOTSUPP instead of EROFS.
        let mut options = vec![
            fuser::MountOption::FSName(self.fsname.clone()),
            fuser::MountOption::DefaultPermissions,
        ];
        if self.allow_other {
            options.push(fuser::MountOption::AllowOther);
        }
        if self.auto_unmount {
            options.push(fuser::MountOption::AutoUnmount);
        }
        options
    }
}

/// A running mount. `done` resolves once the session thread exits.
#[derive(Debug)]
pub struct MountHandle {
    pub mountpoint: PathBuf,
    pub done: oneshot::Receiver<std::result::Result<(), String>>,
}

/// Mount `fs` at `mountpoint` in a background thread and wait until the mount
/// is live.
pub fn mount_fuse(fs: GiffsFs, mountpoint: &Path, settings: &MountSettings) -> Result<MountHandle> {
    // A live mount shows up as a device change on the mountpoint.
    let unmounted_dev = fs::metadata(mountpoint)?.dev();

    let (done_tx, mut done_rx) = oneshot::channel::<std::result::Result<(), String>>();
    let mountpoint_clone = mountpoint.to_path_buf();
    let mount_options = settings.mount_options();

    std::thread::spawn(move || {
        tracing::info!(
            "Mounting {} ({} mode) at {}",
            fs.root().display(),
            fs.mode(),
            mountpoint_clone.display()
        );

        let result = match fuser::mount2(fs, &mountpoint_clone, &mount_options) {
            Ok(()) => {
                tracing::info!("FUSE filesystem unmounted");
                Ok(())
            }
            Err(e) => {
                tracing::error!("FUSE mount error: {}", e);
                Err(e.to_string())
            }
        };
        let _ = done_tx.send(result);
    });

    let start = Instant::now();
    loop {
        match done_rx.try_recv() {
            Ok(Err(e)) => {
                return Err(GiffsError::Fuse(format!("FUSE mount failed: {}", e)));
            }
            Ok(Ok(())) => {
                return Err(GiffsError::Fuse(
                    "FUSE session ended before the mount became visible".to_string(),
                ));
            }
            Err(oneshot::error::TryRecvError::Closed) => {
                return Err(GiffsError::Fuse(
                    "FUSE mount thread exited unexpectedly".to_string(),
                ));
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
        }

        if fs::metadata(mountpoint).is_ok_and(|m| m.dev() != unmounted_dev) {
            tracing::debug!("FUSE mount verified at {}", mountpoint.display());
            break;
        }

        if start.elapsed() >= MOUNT_TIMEOUT {
            return Err(GiffsError::Fuse(format!(
                "FUSE mount timed out - {} not mounted after {} ms",
                mountpoint.display(),
                MOUNT_TIMEOUT.as_millis()
            )));
        }

        std::thread::sleep(CHECK_INTERVAL);
    }

    Ok(MountHandle {
        mountpoint: mountpoint.to_path_buf(),
        done: done_rx,
    })
}

/// Unmount the filesystem at `mountpoint` with the platform's unmount tool.
///
/// Returns Ok(true) if an unmount command succeeded, Ok(false) if none did
/// (the mount may already be gone).
pub fn unmount_fuse(mountpoint: &Path) -> Result<bool> {
    let attempts: &[(&str, &[&str])] = if cfg!(target_os = "macos") {
        &[("diskutil", &["unmount", "force"]), ("umount", &[])]
    } else {
        &[
            ("fusermount", &["-u"]),
            ("fusermount3", &["-u"]),
            ("umount", &[]),
        ]
    };

    for (program, args) in attempts {
        match std::process::Command::new(program)
            .args(*args)
            .arg(mountpoint)
            .status()
        {
            Ok(status) if status.success() => {
                tracing::debug!("Unmounted {} with {}", mountpoint.display(), program);
                return Ok(true);
            }
            Ok(status) => {
                tracing::debug!("{} exited with {} for {}", program, status, mountpoint.display());
            }
            Err(e) => {
                tracing::debug!("Failed to run {}: {}", program, e);
            }
        }
    }

    tracing::warn!(
        "Failed to unmount {} (may already be unmounted)",
        mountpoint.display()
    );
    Ok(false)
}
