pub mod cli;
pub mod config;
pub mod disguise;
pub mod error;
pub mod signature;

pub use config::get_config_path;
pub use config::load_config;
pub use config::Config;

pub use disguise::{GiffsFs, Mode};

pub use error::{FsError, GiffsError, Result};

pub use signature::{SIGNATURE, SIGNATURE_LEN};
