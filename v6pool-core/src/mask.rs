//! CIDR network masks

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::{mask_words, ADDRESS_BITS};
use crate::{Address, Error, Result};

/// A network mask: a prefix length in `[0, 128]`
///
/// Equivalently, an address whose bits are a run of ones starting at the most
/// significant bit, followed only by zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct NetworkMask {
    prefix_length: u8,
}

impl NetworkMask {
    /// Create a mask from a prefix length
    pub fn from_prefix_length(prefix_length: u8) -> Result<Self> {
        if prefix_length > ADDRESS_BITS {
            return Err(Error::InvalidArgument(format!(
                "prefix length {} is outside [0, {}]",
                prefix_length, ADDRESS_BITS
            )));
        }
        Ok(Self { prefix_length })
    }

    /// Create a mask from its address form (e.g. `ffff:ffff::`)
    ///
    /// Fails with [`Error::Inconsistency`] if the ones are not contiguous from
    /// the most significant bit.
    pub fn from_address(address: Address) -> Result<Self> {
        let mask = Self::new_unchecked(address.number_of_leading_ones() as u8);
        if mask.as_address() != address {
            return Err(Error::Inconsistency(format!(
                "{} is not a valid network mask",
                address
            )));
        }
        Ok(mask)
    }

    pub(crate) const fn new_unchecked(prefix_length: u8) -> Self {
        Self { prefix_length }
    }

    /// The prefix length
    pub const fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// Number of variable (host) bits: `128 - prefix_length`
    pub const fn host_bits(&self) -> u8 {
        ADDRESS_BITS - self.prefix_length
    }

    /// The mask as an address with `prefix_length` leading ones
    pub const fn as_address(&self) -> Address {
        let (high, low) = mask_words(self.prefix_length);
        Address::from_words(high, low)
    }
}

impl TryFrom<u8> for NetworkMask {
    type Error = Error;

    fn try_from(prefix_length: u8) -> Result<Self> {
        Self::from_prefix_length(prefix_length)
    }
}

impl From<NetworkMask> for u8 {
    fn from(mask: NetworkMask) -> Self {
        mask.prefix_length
    }
}

impl fmt::Display for NetworkMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.prefix_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[test]
    fn test_from_prefix_length_bounds() {
        assert_eq!(NetworkMask::from_prefix_length(0).unwrap().prefix_length(), 0);
        assert_eq!(NetworkMask::from_prefix_length(128).unwrap().prefix_length(), 128);
        assert!(NetworkMask::from_prefix_length(129)
            .unwrap_err()
            .is_invalid_argument());
    }

    #[test]
    fn test_as_address() {
        let mask = |p| NetworkMask::from_prefix_length(p).unwrap().as_address();
        assert_eq!(mask(0), Address::ZERO);
        assert_eq!(mask(128), Address::MAX);
        assert_eq!(mask(64), addr("ffff:ffff:ffff:ffff::"));
        assert_eq!(mask(1), addr("8000::"));
        assert_eq!(mask(65), addr("ffff:ffff:ffff:ffff:8000::"));
        assert_eq!(mask(120), addr("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ff00"));
    }

    #[test]
    fn test_from_address() {
        for prefix_length in [0u8, 1, 8, 63, 64, 65, 127, 128] {
            let mask = NetworkMask::from_prefix_length(prefix_length).unwrap();
            assert_eq!(NetworkMask::from_address(mask.as_address()).unwrap(), mask);
        }
    }

    #[test]
    fn test_from_address_rejects_gaps() {
        for bad in ["ffff:0:ffff::", "7fff::", "::1", "ffff:ffff:ffff:ffff:0:0:0:1"] {
            let err = NetworkMask::from_address(addr(bad)).unwrap_err();
            assert!(err.is_inconsistency(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_host_bits_and_display() {
        let mask = NetworkMask::from_prefix_length(120).unwrap();
        assert_eq!(mask.host_bits(), 8);
        assert_eq!(mask.to_string(), "/120");
        assert_eq!(u8::from(mask), 120);
        assert!(NetworkMask::try_from(130u8).is_err());
    }
}
