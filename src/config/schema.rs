use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FuseConfig {
    /// Attribute and entry cache timeout handed to the kernel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fsname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_unmount: Option<bool>,
}

impl FuseConfig {
    pub fn get_ttl_secs(&self) -> u64 {
        self.ttl_secs.unwrap_or_else(super::default_fuse_ttl_secs)
    }

    pub fn get_fsname(&self) -> String {
        self.fsname.clone().unwrap_or_else(super::default_fsname)
    }

    pub fn get_auto_unmount(&self) -> bool {
        self.auto_unmount.unwrap_or_else(super::default_auto_unmount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub fuse: FuseConfig,
}
