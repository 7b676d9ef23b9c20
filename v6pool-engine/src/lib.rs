//! v6pool engine
//!
//! Configuration and bookkeeping around [`v6pool_core::AddressPool`]: named
//! pools are declared in a TOML file, built (with their reserved subnets
//! already taken out) into a [`PoolRegistry`], and driven by name.
//!
//! ```rust
//! use v6pool_engine::{Config, PoolRegistry};
//!
//! let config = Config::from_toml(&Config::sample()).unwrap();
//! let mut registry = PoolRegistry::from_config(&config).unwrap();
//!
//! let network = registry.allocate("customers").unwrap();
//! assert_eq!(network.to_string(), "2001:db8:0:100::/56");
//! ```

pub mod config;
pub mod error;
pub mod registry;

pub use config::{CommonConfig, Config, PoolConfig};
pub use error::{Error, Result};
pub use registry::{PoolRegistry, PoolStatus};
