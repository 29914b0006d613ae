pub mod args;
pub mod validation;

pub use args::Args;
pub use validation::{parse_mount_options, validate_paths, MountOptions};
