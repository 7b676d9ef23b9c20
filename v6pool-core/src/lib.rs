//! IPv6 address arithmetic and subnet pools
//!
//! Value types for working with IPv6 addresses as 128-bit numbers:
//! [`Address`], [`AddressRange`], [`NetworkMask`] and [`Network`], plus an
//! immutable [`AddressPool`] which hands out fixed-size subnets from a range.
//!
//! All types are immutable; every operation returns a new value.
//!
//! # Example
//!
//! ```rust
//! use v6pool_core::{Address, AddressPool, AddressSpan, Network};
//!
//! let address: Address = "::ffff:ffff:ffff:ffff".parse().unwrap();
//! assert_eq!(address.add(1).to_string(), "0:0:0:1::");
//!
//! let network: Network = "2001:db8::/48".parse().unwrap();
//! let pool = AddressPool::from_network(&network, 64).unwrap();
//!
//! let pool = pool.allocate().unwrap();
//! let allocated = pool.last_allocated().unwrap();
//! assert_eq!(allocated.to_string(), "2001:db8::/64");
//! assert!(network.contains_span(&allocated));
//!
//! let pool = pool.deallocate(&allocated).unwrap();
//! assert!(pool.is_free(&allocated).unwrap());
//! ```

mod address;
mod error;
mod mask;
mod network;
mod pool;
mod range;

pub use address::{Address, ADDRESS_BITS};
pub use error::{Error, Result};
pub use mask::NetworkMask;
pub use network::{Blocks, Network};
pub use pool::{AddressPool, FreeNetworks};
pub use range::{AddressIter, AddressRange, AddressSpan, Subnets};
