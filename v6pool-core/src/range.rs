//! Closed ranges of IPv6 addresses

use num_bigint::BigUint;
use std::fmt;

use crate::{Address, Blocks, Error, Network, NetworkMask, Result};

/// Capabilities shared by everything that covers a contiguous block of addresses
///
/// Implemented by [`AddressRange`], [`Network`] and [`crate::AddressPool`], so
/// a network (or a pool's bounds) can be used wherever a range is expected.
pub trait AddressSpan {
    /// First address (inclusive)
    fn first(&self) -> Address;

    /// Last address (inclusive)
    fn last(&self) -> Address;

    /// Check if the address lies within this span
    fn contains(&self, address: &Address) -> bool {
        self.first() <= *address && *address <= self.last()
    }

    /// Check if both endpoints of `other` lie within this span
    fn contains_span<S: AddressSpan + ?Sized>(&self, other: &S) -> bool {
        self.contains(&other.first()) && self.contains(&other.last())
    }

    /// Check if this span and `other` share at least one address
    fn overlaps<S: AddressSpan + ?Sized>(&self, other: &S) -> bool {
        self.first() <= other.last() && other.first() <= self.last()
    }

    /// Number of addresses covered; a full address space holds 2^128
    fn size(&self) -> BigUint {
        BigUint::from(self.last().to_u128() - self.first().to_u128()) + 1u32
    }

    /// The span as a plain range
    fn to_range(&self) -> AddressRange {
        AddressRange::new_unchecked(self.first(), self.last())
    }
}

/// Immutable, continuous range of IPv6 addresses (bounds included)
///
/// Ranges are ordered by first address, then by last address. The derived
/// ordering depends on the field order below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddressRange {
    first: Address,
    last: Address,
}

impl AddressRange {
    /// Create a range from its first and last address
    pub fn from_first_and_last(first: Address, last: Address) -> Result<Self> {
        if first > last {
            return Err(Error::InvalidArgument(format!(
                "cannot create address range with last address {} < first address {}",
                last, first
            )));
        }
        Ok(Self { first, last })
    }

    pub(crate) const fn new_unchecked(first: Address, last: Address) -> Self {
        Self { first, last }
    }

    /// Remove a single address, leaving zero, one or two ranges
    ///
    /// Removing an address outside the range leaves the range untouched.
    pub fn remove_address(&self, address: &Address) -> Vec<AddressRange> {
        if !self.contains(address) {
            vec![*self]
        } else if *address == self.first && *address == self.last {
            Vec::new()
        } else if *address == self.first {
            vec![Self::new_unchecked(self.first.add(1), self.last)]
        } else if *address == self.last {
            vec![Self::new_unchecked(self.first, self.last.subtract(1))]
        } else {
            vec![
                Self::new_unchecked(self.first, address.subtract(1)),
                Self::new_unchecked(address.add(1), self.last),
            ]
        }
    }

    /// Remove a network, leaving zero, one or two ranges
    ///
    /// A network that is not entirely contained in the range has no effect.
    pub fn remove_network(&self, network: &Network) -> Vec<AddressRange> {
        if !self.contains_span(network) {
            vec![*self]
        } else if self.first == network.first() && self.last == network.last() {
            Vec::new()
        } else if self.first == network.first() {
            vec![Self::new_unchecked(network.last().add(1), self.last)]
        } else if self.last == network.last() {
            vec![Self::new_unchecked(self.first, network.first().subtract(1))]
        } else {
            vec![
                Self::new_unchecked(self.first, network.first().subtract(1)),
                Self::new_unchecked(network.last().add(1), self.last),
            ]
        }
    }

    /// Extend the range just enough at its head or tail to include the address
    pub fn extend(&self, address: Address) -> Self {
        if address < self.first {
            Self::new_unchecked(address, self.last)
        } else if address > self.last {
            Self::new_unchecked(self.first, address)
        } else {
            *self
        }
    }

    /// Iterate all addresses in this range, in order
    pub fn iter(&self) -> AddressIter {
        AddressIter {
            next: Some(self.first),
            last: self.last,
        }
    }

    /// Decompose the range into the minimal ordered list of CIDR networks
    /// whose union is exactly this range
    pub fn to_subnets(&self) -> Subnets {
        Subnets {
            next: Some(self.first),
            last: self.last,
        }
    }

    /// Partition the range into consecutive networks of `target`
    ///
    /// The range must be aligned on the block size: its first address has at
    /// least `128 - prefix_length` trailing zero bits and its last address at
    /// least as many trailing one bits.
    pub fn split(&self, target: NetworkMask) -> Result<Blocks> {
        let host_bits = u32::from(target.host_bits());
        if self.first.number_of_trailing_zeros() < host_bits
            || self.last.number_of_trailing_ones() < host_bits
        {
            return Err(Error::InvalidArgument(format!(
                "can not split [{}] into subnets with prefix length {}",
                self, target
            )));
        }
        Ok(Blocks::new(*self, target))
    }
}

impl AddressSpan for AddressRange {
    fn first(&self) -> Address {
        self.first
    }

    fn last(&self) -> Address {
        self.last
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.first, self.last)
    }
}

impl IntoIterator for &AddressRange {
    type Item = Address;
    type IntoIter = AddressIter;

    fn into_iter(self) -> AddressIter {
        self.iter()
    }
}

impl IntoIterator for AddressRange {
    type Item = Address;
    type IntoIter = AddressIter;

    fn into_iter(self) -> AddressIter {
        self.iter()
    }
}

/// Iterator over the addresses of an [`AddressRange`]
///
/// `next` becomes `None` once `last` has been produced; incrementing past the
/// maximum address would wrap to `::` otherwise.
#[derive(Debug, Clone)]
pub struct AddressIter {
    next: Option<Address>,
    last: Address,
}

impl Iterator for AddressIter {
    type Item = Address;

    fn next(&mut self) -> Option<Address> {
        let current = self.next?;
        self.next = if current == self.last {
            None
        } else {
            Some(current.add(1))
        };
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let Some(current) = self.next else {
            return (0, Some(0));
        };

        let remaining = (self.last.to_u128() - current.to_u128())
            .checked_add(1)
            .and_then(|n| usize::try_from(n).ok());
        match remaining {
            Some(n) => (n, Some(n)),
            None => (usize::MAX, None),
        }
    }
}

/// Iterator over the minimal CIDR decomposition of an [`AddressRange`]
#[derive(Debug, Clone)]
pub struct Subnets {
    next: Option<Address>,
    last: Address,
}

impl Iterator for Subnets {
    type Item = Network;

    fn next(&mut self) -> Option<Network> {
        let start = self.next?;

        // Largest block aligned on `start` that still ends within the range.
        // A single address (host_bits = 0) always fits.
        let mut host_bits = start.number_of_trailing_zeros() as u8;
        let network = loop {
            let mask = NetworkMask::new_unchecked(128 - host_bits);
            let candidate = Network::from_address_and_mask(start, mask);
            if candidate.last() <= self.last || host_bits == 0 {
                break candidate;
            }
            host_bits -= 1;
        };

        self.next = if network.last() < self.last {
            Some(network.last().add(1))
        } else {
            None
        };
        Some(network)
    }
}
