//! IPv6 subnet pool
//!
//! An [`AddressPool`] is like an address range in which some subnets are
//! "free" and some are "allocated" (think DHCP prefix delegation). Subnets are
//! handed out in blocks of one fixed prefix length for the whole pool.
//!
//! Pools are immutable snapshots. Allocating or deallocating returns a new
//! snapshot and leaves the receiver untouched, so snapshots can be shared and
//! read from many threads without locking. Two callers allocating from the
//! same snapshot will compute the same subnet; arbitrating between them (for
//! example with a compare-and-swap on a shared "current pool") is up to the
//! caller.
//!
//! For example, a pool over `2001:db8::/112` handing out `/120` subnets:
//! - first allocation: `2001:db8::/120`
//! - second allocation: `2001:db8::100/120`
//! - after releasing the first, the next allocation reuses `2001:db8::/120`

use std::collections::btree_set;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{Address, AddressRange, AddressSpan, Blocks, Error, Network, NetworkMask, Result};

/// Immutable snapshot of a subnet pool
///
/// Invariants:
/// - the bounds are an exact multiple of subnets of the allocation prefix length
/// - every free range lies within the bounds
/// - free ranges are pairwise disjoint and never adjacent (touching ranges are merged)
///
/// The bounds are validated by every constructor. The free-range invariants
/// hold by construction of `allocate`/`deallocate` and are only re-checked
/// on each successor snapshot in debug builds (`debug_assert`); release
/// builds skip that check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressPool {
    /// Overall range of the pool
    bounds: AddressRange,
    /// Mask of every subnet handed out by this pool
    mask: NetworkMask,
    /// Free ranges ordered by (first, last); shared between snapshots until changed
    free_ranges: Arc<BTreeSet<AddressRange>>,
    /// Subnet handed out by the most recent successful allocation
    last_allocated: Option<Network>,
}

impl AddressPool {
    /// Create a completely free pool over `bounds`, allocating subnets of
    /// `prefix_length`
    ///
    /// The bounds must be aligned on the allocation size: the first address
    /// needs at least `128 - prefix_length` trailing zero bits and the last
    /// address at least as many trailing one bits.
    ///
    /// # Example
    /// ```
    /// use v6pool_core::{AddressPool, AddressRange};
    ///
    /// let bounds = AddressRange::from_first_and_last(
    ///     "2001:db8::".parse().unwrap(),
    ///     "2001:db8::ffff".parse().unwrap(),
    /// )
    /// .unwrap();
    /// let pool = AddressPool::new(bounds, 120).unwrap();
    ///
    /// let pool = pool.allocate().unwrap();
    /// assert_eq!(pool.last_allocated().unwrap().to_string(), "2001:db8::/120");
    /// ```
    pub fn new(bounds: AddressRange, prefix_length: u8) -> Result<Self> {
        let mask = NetworkMask::from_prefix_length(prefix_length)?;
        validate_alignment(&bounds, mask)?;

        Ok(Self {
            bounds,
            mask,
            free_ranges: Arc::new(BTreeSet::from([bounds])),
            last_allocated: None,
        })
    }

    /// Create a completely free pool between `first` and `last` (inclusive)
    pub fn from_first_and_last(first: Address, last: Address, prefix_length: u8) -> Result<Self> {
        Self::new(AddressRange::from_first_and_last(first, last)?, prefix_length)
    }

    /// Create a completely free pool covering a whole network
    pub fn from_network(network: &Network, prefix_length: u8) -> Result<Self> {
        Self::new(network.range(), prefix_length)
    }

    /// Overall range of the pool
    pub fn bounds(&self) -> AddressRange {
        self.bounds
    }

    /// Prefix length of the subnets handed out by this pool
    pub fn allocation_prefix_length(&self) -> u8 {
        self.mask.prefix_length()
    }

    /// Mask of the subnets handed out by this pool
    pub fn allocation_mask(&self) -> NetworkMask {
        self.mask
    }

    /// Subnet handed out by the most recent allocation, if any
    pub fn last_allocated(&self) -> Option<Network> {
        self.last_allocated
    }

    /// Free ranges in ascending order
    pub fn free_ranges(&self) -> btree_set::Iter<'_, AddressRange> {
        self.free_ranges.iter()
    }

    /// Number of disjoint free ranges
    pub fn free_range_count(&self) -> usize {
        self.free_ranges.len()
    }

    /// Check if no subnet is free anymore
    pub fn is_exhausted(&self) -> bool {
        self.free_ranges.is_empty()
    }

    /// Allocate the first free subnet
    ///
    /// Returns `None` when the pool is exhausted.
    pub fn allocate(&self) -> Option<AddressPool> {
        self.allocate_next().map(|(_, pool)| pool)
    }

    /// Allocate the first free subnet, returning it with the successor snapshot
    ///
    /// Returns `None` when the pool is exhausted.
    pub fn allocate_next(&self) -> Option<(Network, AddressPool)> {
        let Some(first_free) = self.free_ranges.first() else {
            log::debug!("pool {} is exhausted", self.bounds);
            return None;
        };

        let network = Network::from_address_and_mask(first_free.first(), self.mask);
        Some((network, self.take(network, *first_free)))
    }

    /// Allocate a specific subnet
    ///
    /// Fails if the subnet lies outside the pool or has the wrong prefix
    /// length. Returns `Ok(None)` if the subnet is not free.
    pub fn allocate_network(&self, network: &Network) -> Result<Option<AddressPool>> {
        self.check_member(network, "allocate")?;

        match self.find_free_range_containing(network) {
            Some(free_range) => Ok(Some(self.take(*network, free_range))),
            None => {
                log::debug!("{} is not free in pool {}", network, self.bounds);
                Ok(None)
            }
        }
    }

    /// Give a subnet back to the pool
    ///
    /// The subnet is merged with the free ranges directly in front of and
    /// after it, so the free set never fragments. Deallocating a subnet that
    /// is already free returns an identical snapshot.
    pub fn deallocate(&self, network: &Network) -> Result<AddressPool> {
        self.check_member(network, "deallocate")?;

        if self.find_free_range_containing(network).is_some() {
            log::debug!("{} is already free in pool {}", network, self.bounds);
            return Ok(self.clone());
        }

        let key = network.range();
        let before = self
            .free_ranges
            .range(..key)
            .next_back()
            .filter(|range| is_adjacent(*range, network))
            .copied();
        let after = self
            .free_ranges
            .range(key..)
            .next()
            .filter(|range| is_adjacent(network, *range))
            .copied();

        let mut free_ranges = BTreeSet::clone(&self.free_ranges);
        let merged = match (before, after) {
            (None, None) => key,
            (Some(before), None) => {
                free_ranges.remove(&before);
                AddressRange::new_unchecked(before.first(), network.last())
            }
            (None, Some(after)) => {
                free_ranges.remove(&after);
                AddressRange::new_unchecked(network.first(), after.last())
            }
            (Some(before), Some(after)) => {
                free_ranges.remove(&before);
                free_ranges.remove(&after);
                AddressRange::new_unchecked(before.first(), after.last())
            }
        };
        free_ranges.insert(merged);

        log::debug!("deallocated {} into free range {}", network, merged);
        Ok(self.successor(free_ranges, self.last_allocated))
    }

    /// Check if a subnet is free
    ///
    /// Fails if the subnet has a different prefix length than this pool hands out.
    pub fn is_free(&self, network: &Network) -> Result<bool> {
        if network.prefix_length() != self.allocation_prefix_length() {
            return Err(Error::InvalidArgument(format!(
                "network of prefix length /{} can not be free in a pool which uses prefix length /{}",
                network.prefix_length(),
                self.allocation_prefix_length()
            )));
        }

        Ok(self.find_free_range_containing(network).is_some())
    }

    /// Iterate every free subnet, in ascending order
    pub fn free_networks(&self) -> FreeNetworks<'_> {
        FreeNetworks {
            ranges: self.free_ranges.iter(),
            current: None,
            mask: self.mask,
        }
    }

    /// Reject subnets outside the bounds or with a foreign prefix length
    fn check_member(&self, network: &Network, action: &str) -> Result<()> {
        if !self.bounds.contains_span(network) {
            return Err(Error::InvalidArgument(format!(
                "can not {} network {} which is not contained in pool [{}]",
                action, network, self.bounds
            )));
        }

        if network.prefix_length() != self.allocation_prefix_length() {
            return Err(Error::InvalidArgument(format!(
                "can not {} network with prefix length /{} in a pool configured for prefix length /{}",
                action,
                network.prefix_length(),
                self.allocation_prefix_length()
            )));
        }

        Ok(())
    }

    /// Locate the free range containing `network`
    ///
    /// Only the ranges directly around the split point of the ordered set can
    /// contain it.
    fn find_free_range_containing(&self, network: &Network) -> Option<AddressRange> {
        let key = network.range();
        let head = self.free_ranges.range(..key).next_back();
        let tail = self.free_ranges.range(key..).next();

        head.filter(|range| range.contains_span(network))
            .or_else(|| tail.filter(|range| range.contains_span(network)))
            .copied()
    }

    /// Carve `network` out of `free_range`
    fn take(&self, network: Network, free_range: AddressRange) -> AddressPool {
        let mut free_ranges = BTreeSet::clone(&self.free_ranges);
        free_ranges.remove(&free_range);
        free_ranges.extend(free_range.remove_network(&network));

        log::debug!("allocated {} from free range {}", network, free_range);
        self.successor(free_ranges, Some(network))
    }

    fn successor(
        &self,
        free_ranges: BTreeSet<AddressRange>,
        last_allocated: Option<Network>,
    ) -> AddressPool {
        debug_assert_eq!(validate_free_ranges(&self.bounds, &free_ranges), Ok(()));

        AddressPool {
            bounds: self.bounds,
            mask: self.mask,
            free_ranges: Arc::new(free_ranges),
            last_allocated,
        }
    }
}

impl AddressSpan for AddressPool {
    fn first(&self) -> Address {
        self.bounds.first()
    }

    fn last(&self) -> Address {
        self.bounds.last()
    }
}

/// Check that `lower` ends exactly one address before `upper` starts
fn is_adjacent<L, U>(lower: &L, upper: &U) -> bool
where
    L: AddressSpan + ?Sized,
    U: AddressSpan + ?Sized,
{
    lower.last() < upper.first() && lower.last().add(1) == upper.first()
}

fn validate_alignment(bounds: &AddressRange, mask: NetworkMask) -> Result<()> {
    let host_bits = u32::from(mask.host_bits());

    if bounds.first().number_of_trailing_zeros() < host_bits {
        return Err(Error::InvalidArgument(format!(
            "range [{}] is not aligned with prefix length {}, first address should end with {} zero bits",
            bounds, mask, host_bits
        )));
    }

    if bounds.last().number_of_trailing_ones() < host_bits {
        return Err(Error::InvalidArgument(format!(
            "range [{}] is not aligned with prefix length {}, last address should end with {} one bits",
            bounds, mask, host_bits
        )));
    }

    Ok(())
}

fn validate_free_ranges(bounds: &AddressRange, free_ranges: &BTreeSet<AddressRange>) -> Result<()> {
    if let Some(outside) = free_ranges.iter().find(|range| !bounds.contains_span(*range)) {
        return Err(Error::InvalidArgument(format!(
            "free range [{}] is not within bounds [{}]",
            outside, bounds
        )));
    }

    let mut ranges = free_ranges.iter();
    let mut previous = match ranges.next() {
        Some(range) => range,
        None => return Ok(()),
    };
    for range in ranges {
        if previous.last() >= range.first() || is_adjacent(previous, range) {
            return Err(Error::InvalidArgument(format!(
                "free ranges [{}] and [{}] overlap or touch",
                previous, range
            )));
        }
        previous = range;
    }

    Ok(())
}

/// Iterator over the free subnets of an [`AddressPool`]
#[derive(Debug, Clone)]
pub struct FreeNetworks<'a> {
    ranges: btree_set::Iter<'a, AddressRange>,
    current: Option<Blocks>,
    mask: NetworkMask,
}

impl Iterator for FreeNetworks<'_> {
    type Item = Network;

    fn next(&mut self) -> Option<Network> {
        loop {
            if let Some(network) = self.current.as_mut().and_then(Iterator::next) {
                return Some(network);
            }
            let range = self.ranges.next()?;
            self.current = Some(Blocks::new(*range, self.mask));
        }
    }
}
