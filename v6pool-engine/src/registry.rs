//! Named pool registry
//!
//! Holds the current snapshot of every configured pool and swaps it for the
//! successor snapshot after each successful operation.

use std::fmt;

use crate::config::Config;
use crate::error::{Error, Result};
use v6pool_core::{AddressPool, AddressRange, Network};

/// Point-in-time summary of one pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStatus {
    /// Pool name
    pub name: String,
    /// Overall range of the pool
    pub bounds: AddressRange,
    /// Prefix length of handed out subnets
    pub prefix_length: u8,
    /// Number of disjoint free ranges
    pub free_ranges: usize,
    /// No subnet left
    pub exhausted: bool,
    /// Most recent allocation
    pub last_allocated: Option<Network>,
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: [{}] /{}, {} free range(s)",
            self.name, self.bounds, self.prefix_length, self.free_ranges
        )?;
        if self.exhausted {
            write!(f, ", exhausted")?;
        }
        if let Some(network) = self.last_allocated {
            write!(f, ", last allocated {}", network)?;
        }
        Ok(())
    }
}

/// Named pools in configuration order
#[derive(Debug, Clone, Default)]
pub struct PoolRegistry {
    pools: Vec<(String, AddressPool)>,
}

impl PoolRegistry {
    /// Build every configured pool and take out its reserved networks
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let mut registry = Self::default();
        for pool_config in &config.pools {
            let mut pool = pool_config.empty_pool()?;
            for reserved in &pool_config.reserved {
                pool = pool.allocate_network(reserved)?.ok_or_else(|| {
                    Error::Config(format!(
                        "pool {}: reserved network {} is not free",
                        pool_config.name, reserved
                    ))
                })?;
            }

            log::info!(
                "pool {} ready: [{}] /{} with {} reserved",
                pool_config.name,
                pool.bounds(),
                pool.allocation_prefix_length(),
                pool_config.reserved.len()
            );
            registry.insert(pool_config.name.clone(), pool)?;
        }

        Ok(registry)
    }

    /// Register an already built pool under a new name
    pub fn insert(&mut self, name: String, pool: AddressPool) -> Result<()> {
        if self.pool(&name).is_some() {
            return Err(Error::Config(format!("duplicate pool name: {}", name)));
        }
        self.pools.push((name, pool));
        Ok(())
    }

    /// Current snapshot of a pool
    pub fn pool(&self, name: &str) -> Option<&AddressPool> {
        self.pools
            .iter()
            .find(|(pool_name, _)| pool_name == name)
            .map(|(_, pool)| pool)
    }

    /// Names of all pools in configuration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pools.iter().map(|(name, _)| name.as_str())
    }

    /// Allocate the first free subnet of a pool
    pub fn allocate(&mut self, name: &str) -> Result<Network> {
        let slot = self.slot_mut(name)?;
        match slot.allocate_next() {
            Some((network, next)) => {
                *slot = next;
                log::debug!("pool {}: allocated {}", name, network);
                Ok(network)
            }
            None => {
                log::warn!("pool {} is exhausted", name);
                Err(Error::Exhausted(name.to_string()))
            }
        }
    }

    /// Allocate a specific subnet of a pool
    pub fn allocate_network(&mut self, name: &str, network: &Network) -> Result<Network> {
        let slot = self.slot_mut(name)?;
        match slot.allocate_network(network).inspect_err(|e| log::warn!("pool {}: {}", name, e))? {
            Some(next) => {
                *slot = next;
                log::debug!("pool {}: allocated {}", name, network);
                Ok(*network)
            }
            None => {
                log::warn!("pool {}: {} is not free", name, network);
                Err(Error::Unavailable(format!("{} in pool {}", network, name)))
            }
        }
    }

    /// Return a subnet to its pool
    pub fn deallocate(&mut self, name: &str, network: &Network) -> Result<()> {
        let slot = self.slot_mut(name)?;
        let next = slot
            .deallocate(network)
            .inspect_err(|e| log::warn!("pool {}: {}", name, e))?;
        *slot = next;
        log::debug!("pool {}: released {}", name, network);
        Ok(())
    }

    /// Check if a subnet of a pool is free
    pub fn is_free(&self, name: &str, network: &Network) -> Result<bool> {
        Ok(self.existing(name)?.is_free(network)?)
    }

    /// Summary of one pool
    pub fn status(&self, name: &str) -> Result<PoolStatus> {
        let pool = self.existing(name)?;
        Ok(PoolStatus {
            name: name.to_string(),
            bounds: pool.bounds(),
            prefix_length: pool.allocation_prefix_length(),
            free_ranges: pool.free_range_count(),
            exhausted: pool.is_exhausted(),
            last_allocated: pool.last_allocated(),
        })
    }

    fn existing(&self, name: &str) -> Result<&AddressPool> {
        self.pool(name)
            .ok_or_else(|| Error::UnknownPool(name.to_string()))
    }

    fn slot_mut(&mut self, name: &str) -> Result<&mut AddressPool> {
        self.pools
            .iter_mut()
            .find(|(pool_name, _)| pool_name == name)
            .map(|(_, pool)| pool)
            .ok_or_else(|| Error::UnknownPool(name.to_string()))
    }
}
