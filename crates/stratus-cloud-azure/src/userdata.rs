//! cloud-init user data
//!
//! Azure passes user data as base64 `customData`. Content that does not
//! already declare its format (`#!` script or `#cloud-config`) is treated as
//! cloud-config.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const SHELL_HEADER: &str = "#!";
const CLOUD_CONFIG_HEADER: &str = "#cloud-config";

/// Prefix a cloud-config header unless one is already present
pub fn with_header(user_data: &str) -> String {
    if user_data.starts_with(SHELL_HEADER) || user_data.starts_with(CLOUD_CONFIG_HEADER) {
        user_data.to_string()
    } else {
        format!("{}\n{}", CLOUD_CONFIG_HEADER, user_data)
    }
}

/// Encoded `customData` value for a VM, if there is any user data
pub fn custom_data(user_data: Option<&str>) -> Option<String> {
    user_data
        .filter(|ud| !ud.is_empty())
        .map(|ud| STANDARD.encode(with_header(ud)))
}
