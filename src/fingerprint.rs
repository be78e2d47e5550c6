//! Device fingerprint
//!
//! The server tells audience members apart by an opaque string derived from
//! stable browser traits. It is a digest, not an identity: two identical
//! devices produce the same value.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceTraits {
    pub user_agent: String,
    pub language: String,
    pub platform: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub color_depth: u32,
    /// Minutes from UTC as reported by `Date.getTimezoneOffset()`
    pub timezone_offset: i32,
    pub hardware_concurrency: u32,
}

impl DeviceTraits {
    /// Hex-encoded SHA-256 of the traits
    pub fn fingerprint(&self) -> String {
        let joined = [
            self.user_agent.clone(),
            self.language.clone(),
            self.platform.clone(),
            format!("{}x{}", self.screen_width, self.screen_height),
            self.color_depth.to_string(),
            self.timezone_offset.to_string(),
            self.hardware_concurrency.to_string(),
        ]
        .join("###");

        format!("{:x}", Sha256::digest(joined.as_bytes()))
    }
}
