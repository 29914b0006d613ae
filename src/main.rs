use clap::Parser;

use giffs::cli::{parse_mount_options, validate_paths, Args};
use giffs::config::load_config;
use giffs::disguise::{mount_fuse, unmount_fuse, GiffsFs, MountSettings};
use giffs::error::{GiffsError, Result};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => {
            std::process::exit(code);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("GIFFS_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let args = Args::parse();

    let options = parse_mount_options(&args.options)?;
    let (root, mountpoint) = validate_paths(&args.root, &args.mountpoint)?;
    let config = load_config()?;

    let fs = GiffsFs::new(root, options.mode, config.fuse.get_ttl_secs())?;
    let settings = MountSettings::from_config(&config, options.allow_other);
    let mut handle = mount_fuse(fs, &mountpoint, &settings)?;

    tracing::info!(
        "Serving {} mode view at {} (Ctrl-C to unmount)",
        options.mode,
        mountpoint.display()
    );

    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    let signalled = tokio::select! {
        result = &mut handle.done => {
            return finish(result);
        }
        _ = tokio::signal::ctrl_c() => "interrupt",
        _ = terminate.recv() => "terminate",
    };

    tracing::info!("Received {} signal, unmounting {}", signalled, mountpoint.display());
    if !unmount_fuse(&mountpoint)? {
        return Err(GiffsError::Fuse(format!(
            "Could not unmount {}; unmount it manually",
            mountpoint.display()
        )));
    }
    finish(handle.done.await)
}

/// Map the end of the FUSE session to an exit code.
fn finish(
    result: std::result::Result<std::result::Result<(), String>, tokio::sync::oneshot::error::RecvError>,
) -> Result<i32> {
    match result {
        Ok(Ok(())) => Ok(0),
        Ok(Err(e)) => Err(GiffsError::Fuse(e)),
        Err(_) => Err(GiffsError::Fuse(
            "FUSE session thread exited without reporting".to_string(),
        )),
    }
}
