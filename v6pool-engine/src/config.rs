//! Configuration types for the pool engine

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{Error, Result};
use v6pool_core::{Address, AddressPool, AddressRange, AddressSpan, Network};

/// Main configuration structure
///
/// The configuration file uses TOML format: a `[common]` section and one
/// `[[pool]]` table per named pool.
///
/// # Example Configuration
///
/// ```toml
/// [common]
/// log_level = "info"
///
/// [[pool]]
/// name = "customers"
/// network = "2001:db8::/48"
/// prefix_length = 56
/// reserved = ["2001:db8::/56"]
///
/// [[pool]]
/// name = "lab"
/// first = "fd00::"
/// last = "fd00::ffff"
/// prefix_length = 120
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Settings shared by every pool
    #[serde(default)]
    pub common: CommonConfig,

    /// Named pools, in configuration order
    #[serde(default, rename = "pool")]
    pub pools: Vec<PoolConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.pools.is_empty() {
            return Err(Error::Config("at least one [[pool]] is required".into()));
        }

        let mut names = HashSet::new();
        for pool in &self.pools {
            pool.validate()?;
            if !names.insert(pool.name.as_str()) {
                return Err(Error::Config(format!("duplicate pool name: {}", pool.name)));
            }
        }

        Ok(())
    }

    /// Get a pool configuration by name
    pub fn pool_config(&self, name: &str) -> Result<&PoolConfig> {
        self.pools
            .iter()
            .find(|pool| pool.name == name)
            .ok_or_else(|| Error::UnknownPool(name.to_string()))
    }

    /// Generate a sample configuration
    pub fn sample() -> String {
        r#"# v6pool configuration

# Shared settings
[common]
# Log level: "error", "warn", "info", "debug", "trace"
# RUST_LOG, then the --log-level flag, take precedence when set
log_level = "info"

# One [[pool]] table per named pool.
#
# The pool range is given either as a network:
#   network = "2001:db8::/48"
# or as an explicit first and last address:
#   first = "2001:db8::"
#   last = "2001:db8:0:ffff:ffff:ffff:ffff:ffff"
#
# The range must be aligned on prefix_length: the first address needs at
# least (128 - prefix_length) trailing zero bits, the last address as many
# trailing one bits.
[[pool]]
name = "customers"
network = "2001:db8::/48"

# Every subnet handed out by this pool has this prefix length
prefix_length = 56

# Subnets taken out of the pool at startup (optional)
reserved = ["2001:db8::/56"]

[[pool]]
name = "lab"
first = "fd00::"
last = "fd00::ffff"
prefix_length = 120
"#
        .to_string()
    }
}

/// Settings shared by every pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonConfig {
    /// Log level (default: "info"); `RUST_LOG` and `--log-level` override it
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// A single named pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Unique pool name
    pub name: String,

    /// Pool range as a network (exclusive with `first`/`last`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<Network>,

    /// First address of the pool range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<Address>,

    /// Last address of the pool range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<Address>,

    /// Prefix length of every subnet handed out
    pub prefix_length: u8,

    /// Subnets allocated when the pool is built
    #[serde(default)]
    pub reserved: Vec<Network>,
}

impl PoolConfig {
    /// Validate the pool configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("pool name must not be empty".into()));
        }

        let pool = self.empty_pool()?;

        let mut seen = HashSet::new();
        for reserved in &self.reserved {
            if !pool.contains_span(reserved) {
                return Err(Error::Config(format!(
                    "pool {}: reserved network {} is outside [{}]",
                    self.name,
                    reserved,
                    pool.bounds()
                )));
            }
            if reserved.prefix_length() != self.prefix_length {
                return Err(Error::Config(format!(
                    "pool {}: reserved network {} does not have prefix length /{}",
                    self.name, reserved, self.prefix_length
                )));
            }
            if !seen.insert(*reserved) {
                return Err(Error::Config(format!(
                    "pool {}: network {} is reserved twice",
                    self.name, reserved
                )));
            }
        }

        Ok(())
    }

    /// The configured pool range
    pub fn bounds(&self) -> Result<AddressRange> {
        match (self.network, self.first, self.last) {
            (Some(network), None, None) => Ok(network.range()),
            (None, Some(first), Some(last)) => AddressRange::from_first_and_last(first, last)
                .map_err(|e| Error::Config(format!("pool {}: {}", self.name, e))),
            (Some(_), _, _) => Err(Error::Config(format!(
                "pool {}: set either network or first/last, not both",
                self.name
            ))),
            _ => Err(Error::Config(format!(
                "pool {}: network or both first and last are required",
                self.name
            ))),
        }
    }

    /// Build the completely free pool described by this configuration
    ///
    /// Reserved networks are not applied here; see
    /// [`crate::PoolRegistry::from_config`].
    pub fn empty_pool(&self) -> Result<AddressPool> {
        AddressPool::new(self.bounds()?, self.prefix_length)
            .map_err(|e| Error::Config(format!("pool {}: {}", self.name, e)))
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> Network {
        s.parse().unwrap()
    }

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_network_pool() {
        let toml = r#"
[[pool]]
name = "customers"
network = "2001:db8::/48"
prefix_length = 56
reserved = ["2001:db8::/56"]
"#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.common.log_level, "info");
        assert_eq!(config.pools.len(), 1);

        let pool = config.pool_config("customers").unwrap();
        assert_eq!(pool.network, Some(net("2001:db8::/48")));
        assert_eq!(pool.reserved, vec![net("2001:db8::/56")]);
        assert_eq!(pool.empty_pool().unwrap().allocation_prefix_length(), 56);
    }

    #[test]
    fn test_parse_first_last_pool() {
        let toml = r#"
[common]
log_level = "debug"

[[pool]]
name = "lab"
first = "fd00::"
last = "fd00::ffff"
prefix_length = 120
"#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.common.log_level, "debug");
        let bounds = config.pools[0].bounds().unwrap();
        assert_eq!(bounds.first(), addr("fd00::"));
        assert_eq!(bounds.last(), addr("fd00::ffff"));
    }

    #[test]
    fn test_sample_is_valid() {
        let config = Config::from_toml(&Config::sample()).unwrap();
        assert_eq!(config.pools.len(), 2);
        assert!(config.pool_config("customers").is_ok());
        assert!(config.pool_config("lab").is_ok());
    }

    #[test]
    fn test_no_pools_fails() {
        let err = Config::from_toml("[common]\nlog_level = \"info\"\n").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_duplicate_names_fail() {
        let toml = r#"
[[pool]]
name = "a"
network = "fd00::/120"
prefix_length = 124

[[pool]]
name = "a"
network = "fd01::/120"
prefix_length = 124
"#;
        assert!(Config::from_toml(toml).unwrap_err().is_config_error());
    }

    #[test]
    fn test_network_and_first_last_are_exclusive() {
        let both = r#"
[[pool]]
name = "a"
network = "fd00::/120"
first = "fd00::"
last = "fd00::ff"
prefix_length = 124
"#;
        assert!(Config::from_toml(both).unwrap_err().is_config_error());

        let neither = r#"
[[pool]]
name = "a"
first = "fd00::"
prefix_length = 124
"#;
        assert!(Config::from_toml(neither).unwrap_err().is_config_error());
    }

    #[test]
    fn test_misaligned_bounds_fail() {
        let toml = r#"
[[pool]]
name = "a"
first = "fd00::1"
last = "fd00::ff"
prefix_length = 120
"#;
        assert!(Config::from_toml(toml).unwrap_err().is_config_error());
    }

    #[test]
    fn test_prefix_length_too_long_fails() {
        let toml = r#"
[[pool]]
name = "a"
network = "fd00::/120"
prefix_length = 130
"#;
        assert!(Config::from_toml(toml).unwrap_err().is_config_error());
    }

    #[test]
    fn test_bad_reserved_networks_fail() {
        let outside = r#"
[[pool]]
name = "a"
network = "fd00::/120"
prefix_length = 124
reserved = ["fd01::/124"]
"#;
        assert!(Config::from_toml(outside).unwrap_err().is_config_error());

        let wrong_size = r#"
[[pool]]
name = "a"
network = "fd00::/120"
prefix_length = 124
reserved = ["fd00::/126"]
"#;
        assert!(Config::from_toml(wrong_size).unwrap_err().is_config_error());

        let twice = r#"
[[pool]]
name = "a"
network = "fd00::/120"
prefix_length = 124
reserved = ["fd00::10/124", "fd00::10/124"]
"#;
        assert!(Config::from_toml(twice).unwrap_err().is_config_error());
    }

    #[test]
    fn test_malformed_network_is_parse_error() {
        let toml = r#"
[[pool]]
name = "a"
network = "fd00::"
prefix_length = 124
"#;
        assert!(matches!(Config::from_toml(toml), Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let config = Config::from_toml(&Config::sample()).unwrap();
        let encoded = toml::to_string(&config).unwrap();
        let decoded = Config::from_toml(&encoded).unwrap();
        assert_eq!(decoded.pools.len(), config.pools.len());
        assert_eq!(decoded.pools[1].first, config.pools[1].first);
        assert_eq!(decoded.pools[0].reserved, config.pools[0].reserved);
    }
}
