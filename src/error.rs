use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GiffsError>;

#[derive(Error, Debug)]
pub enum GiffsError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("FUSE error: {0}")]
    Fuse(String),
}

/// Failure of a single filesystem operation, as seen by the kernel.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("no such file or directory")]
    NotFound,

    #[error("{0} is not supported by this view")]
    Unsupported(&'static str),

    #[error("backing store error: {0}")]
    Backing(io::Error),
}

impl FsError {
    pub fn errno(&self) -> libc::c_int {
        match self {
            FsError::PermissionDenied => libc::EACCES,
            FsError::NotFound => libc::ENOENT,
            FsError::Unsupported(_) => libc::EOPNOTSUPP,
            FsError::Backing(e) => io_error_to_libc(e),
        }
    }
}

impl From<io::Error> for FsError {
    fn from(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::ENOENT) => FsError::NotFound,
            Some(libc::EACCES) => FsError::PermissionDenied,
            Some(_) => FsError::Backing(err),
            None => match err.kind() {
                io::ErrorKind::NotFound => FsError::NotFound,
                io::ErrorKind::PermissionDenied => FsError::PermissionDenied,
                _ => FsError::Backing(err),
            },
        }
    }
}

impl From<nix::Error> for FsError {
    fn from(err: nix::Error) -> Self {
        FsError::from(io::Error::from_raw_os_error(err as i32))
    }
}

/// Map std::io::Error to appropriate libc error code.
/// The raw OS error wins when present; otherwise the stable ErrorKind is used.
pub(crate) fn io_error_to_libc(e: &io::Error) -> libc::c_int {
    if let Some(code) = e.raw_os_error() {
        return code;
    }

    match e.kind() {
        io::ErrorKind::NotFound => libc::ENOENT,
        io::ErrorKind::PermissionDenied => libc::EACCES,
        io::ErrorKind::AlreadyExists => libc::EEXIST,
        io::ErrorKind::InvalidInput => libc::EINVAL,
        io::ErrorKind::InvalidData => libc::EINVAL,
        io::ErrorKind::TimedOut => libc::ETIMEDOUT,
        io::ErrorKind::Interrupted => libc::EINTR,
        io::ErrorKind::WriteZero => libc::ENOSPC,
        io::ErrorKind::OutOfMemory => libc::ENOMEM,
        io::ErrorKind::BrokenPipe => libc::EPIPE,
        io::ErrorKind::WouldBlock => libc::EAGAIN,
        io::ErrorKind::UnexpectedEof => libc::EIO,
        io::ErrorKind::Unsupported => libc::ENOTSUP,
        _ => libc::EIO,
    }
}
