pub mod paths;
pub mod persistence;
pub mod schema;

pub use paths::*;
pub use persistence::*;
pub use schema::*;

fn default_fuse_ttl_secs() -> u64 {
    1
}

fn default_fsname() -> String {
    "giffs".to_string()
}

fn default_auto_unmount() -> bool {
    true
}
