//! CIDR networks
//!
//! A [`Network`] is an [`AddressRange`] constrained by a [`NetworkMask`]: its
//! first address is the base address with all host bits cleared and its last
//! address is the base address with all host bits set.

use ipnet::Ipv6Net;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

use crate::address::ADDRESS_BITS;
use crate::{Address, AddressRange, AddressSpan, Error, NetworkMask, Result};

/// Immutable IPv6 network in CIDR form
///
/// Networks order like their ranges, with the mask as a tie breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Network {
    range: AddressRange,
    mask: NetworkMask,
}

impl Network {
    /// Create the network with the given mask that contains `address`
    pub fn from_address_and_mask(address: Address, mask: NetworkMask) -> Self {
        let mask_address = mask.as_address();
        let first = address & mask_address;
        let last = address | !mask_address;
        Self {
            range: AddressRange::new_unchecked(first, last),
            mask,
        }
    }

    /// Create the network with the given prefix length that contains `address`
    pub fn from_address_and_prefix_length(address: Address, prefix_length: u8) -> Result<Self> {
        let mask = NetworkMask::from_prefix_length(prefix_length)?;
        Ok(Self::from_address_and_mask(address, mask))
    }

    /// The smallest network containing both addresses
    pub fn from_two_addresses(one: Address, two: Address) -> Self {
        let mask = NetworkMask::new_unchecked(one.common_prefix_length(&two));
        Self::from_address_and_mask(one, mask)
    }

    /// Multicast addresses, `ff00::/8`
    pub fn multicast() -> Self {
        Self::well_known(0xff00_0000_0000_0000, 8)
    }

    /// Link-local unicast addresses, `fe80::/10`
    pub fn link_local() -> Self {
        Self::well_known(0xfe80_0000_0000_0000, 10)
    }

    /// Deprecated site-local addresses, `fec0::/10`
    pub fn site_local() -> Self {
        Self::well_known(0xfec0_0000_0000_0000, 10)
    }

    /// IPv4-mapped addresses, `::ffff:0:0/96`
    pub fn ipv4_mapped() -> Self {
        Self::from_address_and_mask(
            Address::from_words(0, 0x0000_ffff_0000_0000),
            NetworkMask::new_unchecked(96),
        )
    }

    fn well_known(high: u64, prefix_length: u8) -> Self {
        Self::from_address_and_mask(
            Address::from_words(high, 0),
            NetworkMask::new_unchecked(prefix_length),
        )
    }

    /// The network address (first address of the network)
    pub fn address(&self) -> Address {
        self.range.first()
    }

    /// The network mask
    pub fn mask(&self) -> NetworkMask {
        self.mask
    }

    /// The prefix length of the network mask
    pub fn prefix_length(&self) -> u8 {
        self.mask.prefix_length()
    }

    /// The range of addresses covered by this network
    pub fn range(&self) -> AddressRange {
        self.range
    }

    /// Partition this network into consecutive subnetworks of `target`
    ///
    /// The target mask may not be coarser than this network's own mask. A
    /// target equal to the own mask yields this network alone.
    pub fn split(&self, target: NetworkMask) -> Result<Blocks> {
        if target.prefix_length() < self.prefix_length() {
            return Err(Error::InvalidArgument(format!(
                "can not split {} into subnets with prefix length {}",
                self, target
            )));
        }
        Ok(Blocks::new(self.range, target))
    }
}

impl AddressSpan for Network {
    fn first(&self) -> Address {
        self.range.first()
    }

    fn last(&self) -> Address {
        self.range.last()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address(), self.prefix_length())
    }
}

impl FromStr for Network {
    type Err = Error;

    /// Parse `address/prefix_length` notation
    fn from_str(s: &str) -> Result<Self> {
        let (address, prefix_length) = s.split_once('/').ok_or_else(|| {
            Error::Parse(format!(
                "expected network-address/prefix-length, got {:?}",
                s
            ))
        })?;

        let address: Address = address.trim().parse()?;
        let prefix_length: u32 = prefix_length
            .trim()
            .parse()
            .map_err(|_| Error::Parse(format!("invalid prefix length: {}", prefix_length)))?;

        if prefix_length > u32::from(ADDRESS_BITS) {
            return Err(Error::InvalidArgument(format!(
                "prefix length {} is outside [0, {}]",
                prefix_length, ADDRESS_BITS
            )));
        }

        Self::from_address_and_prefix_length(address, prefix_length as u8)
    }
}

impl TryFrom<String> for Network {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Network> for String {
    fn from(network: Network) -> Self {
        network.to_string()
    }
}

impl From<Ipv6Net> for Network {
    fn from(net: Ipv6Net) -> Self {
        Self::from_address_and_mask(
            Address::from(net.addr()),
            NetworkMask::new_unchecked(net.prefix_len()),
        )
    }
}

impl From<Network> for Ipv6Net {
    fn from(network: Network) -> Self {
        Ipv6Net::new_assert(Ipv6Addr::from(network.address()), network.prefix_length())
    }
}

/// Iterator over consecutive, equally sized networks covering a range
///
/// Produced by [`Network::split`] and used for enumerating free subnets of a
/// pool. The range must start on a boundary of the block size.
#[derive(Debug, Clone)]
pub struct Blocks {
    next: Option<Address>,
    last: Address,
    mask: NetworkMask,
}

impl Blocks {
    pub(crate) fn new(range: AddressRange, mask: NetworkMask) -> Self {
        Self {
            next: Some(range.first()),
            last: range.last(),
            mask,
        }
    }
}

impl Iterator for Blocks {
    type Item = Network;

    fn next(&mut self) -> Option<Network> {
        let current = self.next?;
        let network = Network::from_address_and_mask(current, self.mask);
        self.next = if network.last() < self.last {
            Some(network.last().add(1))
        } else {
            None
        };
        Some(network)
    }
}
