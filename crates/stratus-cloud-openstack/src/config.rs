//! OpenStack backend configuration

use crate::error::{OpenStackError, Result};
use serde::Deserialize;
use stratus_cloud::DEFAULT_RESULT_LIMIT;

pub const DEFAULT_NETWORK_NAME: &str = "stratus-default-net";
pub const DEFAULT_SUBNET_NAME: &str = "stratus-default-subnet";
pub const DEFAULT_ROUTER_NAME: &str = "stratus-default-router";
pub const DEFAULT_GATEWAY_NAME: &str = "stratus-default-gateway";
pub const DEFAULT_NETWORK_CIDR: &str = "10.0.0.0/16";
pub const DEFAULT_SUBNET_CIDR: &str = "10.0.0.0/24";

/// Keystone API version used when none is configured
pub const DEFAULT_IDENTITY_API_VERSION: u8 = 3;

/// Device name given to the boot volume of a server
pub const ROOT_DEVICE_NAME: &str = "/dev/sda";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OpenStackConfig {
    pub region_name: String,

    /// Keystone major version; v2 has no region API
    #[serde(default = "default_identity_api_version")]
    pub identity_api_version: u8,

    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
}

fn default_identity_api_version() -> u8 {
    DEFAULT_IDENTITY_API_VERSION
}

fn default_result_limit() -> usize {
    DEFAULT_RESULT_LIMIT
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| OpenStackError::InvalidEnvVar {
        name: name.to_string(),
        value: value.to_string(),
    })
}

impl OpenStackConfig {
    pub fn new(region_name: impl Into<String>) -> Self {
        Self {
            region_name: region_name.into(),
            identity_api_version: default_identity_api_version(),
            result_limit: default_result_limit(),
        }
    }

    /// Create OpenStackConfig from the usual `OS_*` environment variables
    pub fn from_env() -> Result<Self> {
        let region = std::env::var("OS_REGION_NAME")
            .map_err(|_| OpenStackError::MissingEnvVar("OS_REGION_NAME".to_string()))?;
        let mut config = Self::new(region);

        if let Ok(version) = std::env::var("OS_IDENTITY_API_VERSION") {
            // Accepts "3" as well as "3.0"
            let major = version.split('.').next().unwrap_or_default();
            config.identity_api_version = parse_var("OS_IDENTITY_API_VERSION", major)?;
        }

        if let Ok(limit) = std::env::var("STRATUS_RESULT_LIMIT") {
            let parsed: usize = parse_var("STRATUS_RESULT_LIMIT", &limit)?;
            if parsed == 0 {
                return Err(OpenStackError::InvalidEnvVar {
                    name: "STRATUS_RESULT_LIMIT".to_string(),
                    value: limit,
                });
            }
            config.result_limit = parsed;
        }

        Ok(config)
    }

    pub fn has_region_api(&self) -> bool {
        self.identity_api_version >= 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_defaults() {
        temp_env::with_vars(
            [
                ("OS_REGION_NAME", Some("RegionOne")),
                ("OS_IDENTITY_API_VERSION", None),
                ("STRATUS_RESULT_LIMIT", None),
            ],
            || {
                let config = OpenStackConfig::from_env().unwrap();
                assert_eq!(config, OpenStackConfig::new("RegionOne"));
                assert_eq!(config.identity_api_version, 3);
                assert!(config.has_region_api());
                assert_eq!(config.result_limit, 50);
            },
        );
    }

    #[test]
    fn test_identity_v2() {
        temp_env::with_vars(
            [
                ("OS_REGION_NAME", Some("RegionOne")),
                ("OS_IDENTITY_API_VERSION", Some("2.0")),
                ("STRATUS_RESULT_LIMIT", Some("20")),
            ],
            || {
                let config = OpenStackConfig::from_env().unwrap();
                assert_eq!(config.identity_api_version, 2);
                assert!(!config.has_region_api());
                assert_eq!(config.result_limit, 20);
            },
        );
    }

    #[test]
    fn test_missing_region() {
        temp_env::with_var_unset("OS_REGION_NAME", || {
            let err = OpenStackConfig::from_env().unwrap_err();
            assert!(matches!(err, OpenStackError::MissingEnvVar(ref v) if v == "OS_REGION_NAME"));
        });
    }

    #[test]
    fn test_zero_result_limit_rejected() {
        temp_env::with_vars(
            [
                ("OS_REGION_NAME", Some("RegionOne")),
                ("STRATUS_RESULT_LIMIT", Some("0")),
            ],
            || {
                assert!(matches!(
                    OpenStackConfig::from_env(),
                    Err(OpenStackError::InvalidEnvVar { .. })
                ));
            },
        );
    }
}
