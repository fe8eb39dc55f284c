//! Resource name validation

use crate::error::{CloudError, Result, ResourceKind};
use std::net::Ipv4Addr;

const MAX_NAME_LEN: usize = 63;
const MIN_BUCKET_NAME_LEN: usize = 3;

fn invalid(kind: ResourceKind, name: &str, reason: impl Into<String>) -> CloudError {
    CloudError::InvalidName {
        kind,
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Check a general resource name.
///
/// 1 to 63 characters of lowercase ASCII letters, digits and `-`; must start
/// with a letter or digit and must not end with `-`.
pub fn validate_resource_name(kind: ResourceKind, name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(invalid(
            kind,
            name,
            format!("must be between 1 and {} characters", MAX_NAME_LEN),
        ));
    }

    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(invalid(kind, name, format!("character '{}' is not allowed", c)));
    }

    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid(kind, name, "must not start or end with '-'"));
    }

    Ok(())
}

/// Check an object-store bucket name.
///
/// 3 to 63 characters of lowercase ASCII letters, digits, `-` and `.`,
/// starting and ending with a letter or digit, and not an IPv4 address.
pub fn validate_bucket_name(name: &str) -> Result<()> {
    let kind = ResourceKind::Bucket;

    if name.len() < MIN_BUCKET_NAME_LEN || name.len() > MAX_NAME_LEN {
        return Err(invalid(
            kind,
            name,
            format!(
                "must be between {} and {} characters",
                MIN_BUCKET_NAME_LEN, MAX_NAME_LEN
            ),
        ));
    }

    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '.'))
    {
        return Err(invalid(kind, name, format!("character '{}' is not allowed", c)));
    }

    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !edge_ok(name.chars().next()) || !edge_ok(name.chars().last()) {
        return Err(invalid(kind, name, "must start and end with a letter or digit"));
    }

    if name.parse::<Ipv4Addr>().is_ok() {
        return Err(invalid(kind, name, "must not be formatted as an IP address"));
    }

    Ok(())
}
