//! IPv6 address values and 128-bit arithmetic
//!
//! An [`Address`] is an opaque unsigned 128-bit integer held as two 64-bit
//! words. Arithmetic wraps silently around the address space, and the total
//! order is unsigned comparison of the full value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;
use std::ops::{BitAnd, BitOr, BitXor, Not};
use std::str::FromStr;

use crate::{AddressSpan, Error, Network, Result};

/// Number of bits in an IPv6 address
pub const ADDRESS_BITS: u8 = 128;

/// Immutable IPv6 address
///
/// The derived ordering compares `high` before `low`, both unsigned, which is
/// exactly the unsigned order of the 128-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "Ipv6Addr", from = "Ipv6Addr")]
pub struct Address {
    high: u64,
    low: u64,
}

impl Address {
    /// The all-zero address `::`
    pub const ZERO: Address = Address::from_words(0, 0);

    /// The all-one address `ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff`
    pub const MAX: Address = Address::from_words(u64::MAX, u64::MAX);

    /// Create an address from its high and low 64-bit words
    pub const fn from_words(high: u64, low: u64) -> Self {
        Self { high, low }
    }

    /// The most significant 64 bits
    pub const fn high_bits(&self) -> u64 {
        self.high
    }

    /// The least significant 64 bits
    pub const fn low_bits(&self) -> u64 {
        self.low
    }

    /// Create from a 128-bit integer
    pub const fn from_u128(value: u128) -> Self {
        Self::from_words((value >> 64) as u64, value as u64)
    }

    /// Convert to a 128-bit integer
    pub const fn to_u128(&self) -> u128 {
        ((self.high as u128) << 64) | self.low as u128
    }

    /// Create from 16 bytes in network (big-endian) order
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self::from_u128(u128::from_be_bytes(bytes))
    }

    /// Convert to 16 bytes in network (big-endian) order
    pub const fn to_bytes(&self) -> [u8; 16] {
        self.to_u128().to_be_bytes()
    }

    /// Add a signed delta, wrapping around the address space
    #[allow(clippy::should_implement_trait)]
    pub fn add(&self, delta: i64) -> Self {
        let low = self.low.wrapping_add(delta as u64);
        // an unsigned result below the starting word means the low word overflowed
        let carry = u64::from(low < self.low);
        let high = self
            .high
            .wrapping_add(sign_extension(delta))
            .wrapping_add(carry);
        Self::from_words(high, low)
    }

    /// Subtract a signed delta, wrapping around the address space
    pub fn subtract(&self, delta: i64) -> Self {
        let low = self.low.wrapping_sub(delta as u64);
        let borrow = u64::from(low > self.low);
        let high = self
            .high
            .wrapping_sub(sign_extension(delta))
            .wrapping_sub(borrow);
        Self::from_words(high, low)
    }

    /// Clear the low `128 - prefix_length` bits
    ///
    /// This is the first address of the network with the given prefix length
    /// that contains this address.
    pub fn mask_with_prefix_length(&self, prefix_length: u8) -> Result<Self> {
        let (high, low) = prefix_words(prefix_length)?;
        Ok(Self::from_words(self.high & high, self.low & low))
    }

    /// Set the low `128 - prefix_length` bits
    ///
    /// This is the last address of the network with the given prefix length
    /// that contains this address.
    pub fn maximum_address_with_prefix_length(&self, prefix_length: u8) -> Result<Self> {
        let (high, low) = prefix_words(prefix_length)?;
        Ok(Self::from_words(self.high | !high, self.low | !low))
    }

    /// Number of zero bits before the most significant one bit (128 for `::`)
    pub const fn number_of_leading_zeros(&self) -> u32 {
        if self.high == 0 {
            64 + self.low.leading_zeros()
        } else {
            self.high.leading_zeros()
        }
    }

    /// Number of one bits before the most significant zero bit
    pub const fn number_of_leading_ones(&self) -> u32 {
        Self::from_words(!self.high, !self.low).number_of_leading_zeros()
    }

    /// Number of zero bits after the least significant one bit (128 for `::`)
    pub const fn number_of_trailing_zeros(&self) -> u32 {
        if self.low == 0 {
            64 + self.high.trailing_zeros()
        } else {
            self.low.trailing_zeros()
        }
    }

    /// Number of one bits after the least significant zero bit
    pub fn number_of_trailing_ones(&self) -> u32 {
        // x + 1 turns the trailing ones into trailing zeros; MAX wraps to 0 → 128
        self.add(1).number_of_trailing_zeros()
    }

    /// Number of leading bits that are identical in both addresses
    pub fn common_prefix_length(&self, other: &Address) -> u8 {
        (*self ^ *other).number_of_leading_zeros() as u8
    }

    /// Check if this is an IPv4-mapped address (`::ffff:a.b.c.d`)
    pub fn is_ipv4_mapped(&self) -> bool {
        Network::ipv4_mapped().contains(self)
    }

    /// Check if this is a multicast address (`ff00::/8`)
    pub fn is_multicast(&self) -> bool {
        Network::multicast().contains(self)
    }

    /// Check if this is a link-local unicast address (`fe80::/10`)
    pub fn is_link_local(&self) -> bool {
        Network::link_local().contains(self)
    }

    /// Check if this is a (deprecated) site-local address (`fec0::/10`)
    pub fn is_site_local(&self) -> bool {
        Network::site_local().contains(self)
    }
}

/// High word of the 128-bit sign extension of `delta`
const fn sign_extension(delta: i64) -> u64 {
    if delta < 0 {
        u64::MAX
    } else {
        0
    }
}

/// A word with its `n` most significant bits set (`n <= 64`)
const fn leading_ones_word(n: u32) -> u64 {
    if n == 0 {
        0
    } else {
        u64::MAX << (64 - n)
    }
}

/// The (high, low) words of the mask for a prefix length
pub(crate) fn prefix_words(prefix_length: u8) -> Result<(u64, u64)> {
    if prefix_length > ADDRESS_BITS {
        return Err(Error::InvalidArgument(format!(
            "prefix length {} is outside [0, {}]",
            prefix_length, ADDRESS_BITS
        )));
    }

    Ok(mask_words(prefix_length))
}

/// The (high, low) words of the mask for a prefix length already known to be valid
pub(crate) const fn mask_words(prefix_length: u8) -> (u64, u64) {
    let bits = prefix_length as u32;
    if bits >= 64 {
        (u64::MAX, leading_ones_word(bits - 64))
    } else {
        (leading_ones_word(bits), 0)
    }
}

impl BitAnd for Address {
    type Output = Address;

    fn bitand(self, rhs: Address) -> Address {
        Address::from_words(self.high & rhs.high, self.low & rhs.low)
    }
}

impl BitOr for Address {
    type Output = Address;

    fn bitor(self, rhs: Address) -> Address {
        Address::from_words(self.high | rhs.high, self.low | rhs.low)
    }
}

impl BitXor for Address {
    type Output = Address;

    fn bitxor(self, rhs: Address) -> Address {
        Address::from_words(self.high ^ rhs.high, self.low ^ rhs.low)
    }
}

impl Not for Address {
    type Output = Address;

    fn not(self) -> Address {
        Address::from_words(!self.high, !self.low)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Ipv6Addr::from(*self), f)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let ip: Ipv6Addr = s
            .parse()
            .map_err(|_| Error::Parse(format!("invalid IPv6 address: {}", s)))?;
        Ok(Address::from(ip))
    }
}

impl From<Ipv6Addr> for Address {
    fn from(addr: Ipv6Addr) -> Self {
        Address::from_u128(u128::from(addr))
    }
}

impl From<Address> for Ipv6Addr {
    fn from(addr: Address) -> Self {
        Ipv6Addr::from(addr.to_u128())
    }
}

impl From<u128> for Address {
    fn from(value: u128) -> Self {
        Address::from_u128(value)
    }
}

impl From<Address> for u128 {
    fn from(addr: Address) -> Self {
        addr.to_u128()
    }
}

impl From<[u8; 16]> for Address {
    fn from(bytes: [u8; 16]) -> Self {
        Address::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[test]
    fn test_add_carries_into_high_word() {
        assert_eq!(addr("::ffff:ffff:ffff:ffff").add(1), addr("0:0:0:1::"));
        assert_eq!(addr("::1").add(4), addr("::5"));
    }

    #[test]
    fn test_subtract_borrows_from_high_word() {
        assert_eq!(addr("0:0:0:1::").subtract(1), addr("::ffff:ffff:ffff:ffff"));
        assert_eq!(addr("::5").subtract(4), addr("::1"));
    }

    #[test]
    fn test_negative_delta() {
        assert_eq!(addr("0:0:0:1::").add(-1), addr("::ffff:ffff:ffff:ffff"));
        assert_eq!(addr("::ffff:ffff:ffff:ffff").subtract(-1), addr("0:0:0:1::"));
        assert_eq!(addr("::10").add(-16), Address::ZERO);
    }

    #[test]
    fn test_wraps_at_both_ends() {
        assert_eq!(Address::MAX.add(1), Address::ZERO);
        assert_eq!(Address::ZERO.subtract(1), Address::MAX);
        assert_eq!(Address::ZERO.add(-1), Address::MAX);
        assert_eq!(Address::MAX.subtract(-2), Address::from_u128(1));
    }

    #[test]
    fn test_add_subtract_extremes() {
        let samples = [
            Address::ZERO,
            Address::MAX,
            addr("::ffff:ffff:ffff:ffff"),
            addr("8000::"),
            addr("2001:db8::1"),
        ];
        let deltas = [
            i64::MIN,
            i64::MAX,
            i64::from(i32::MIN),
            i64::from(i32::MAX),
            0,
            -1,
            1,
        ];

        for a in samples {
            for d in deltas {
                assert_eq!(a.add(d).subtract(d), a, "{} +/- {}", a, d);
                let expected = a.to_u128().wrapping_add(d as i128 as u128);
                assert_eq!(a.add(d).to_u128(), expected, "{} + {}", a, d);
            }
        }
    }

    #[test]
    fn test_ordering_is_unsigned() {
        assert!(addr("8000::") > addr("7fff:ffff:ffff:ffff:ffff:ffff:ffff:ffff"));
        assert!(addr("::8000:0:0:0") > addr("::7fff:ffff:ffff:ffff"));
        assert!(addr("::1:0:0:0:0") > addr("::ffff:ffff:ffff:ffff"));
        assert!(Address::MAX > Address::ZERO);
    }

    #[test]
    fn test_mask_with_prefix_length() {
        let a = addr("2001:db8:1234:5678:9abc:def0:1234:5678");
        assert_eq!(a.mask_with_prefix_length(128).unwrap(), a);
        assert_eq!(a.mask_with_prefix_length(64).unwrap(), addr("2001:db8:1234:5678::"));
        assert_eq!(a.mask_with_prefix_length(32).unwrap(), addr("2001:db8::"));
        assert_eq!(
            a.mask_with_prefix_length(100).unwrap(),
            addr("2001:db8:1234:5678:9abc:def0:1000:0")
        );
        assert_eq!(a.mask_with_prefix_length(0).unwrap(), Address::ZERO);
    }

    #[test]
    fn test_maximum_address_with_prefix_length() {
        let a = addr("2001:db8:1234:5678:9abc:def0:1234:5678");
        assert_eq!(a.maximum_address_with_prefix_length(128).unwrap(), a);
        assert_eq!(
            a.maximum_address_with_prefix_length(64).unwrap(),
            addr("2001:db8:1234:5678:ffff:ffff:ffff:ffff")
        );
        assert_eq!(
            a.maximum_address_with_prefix_length(120).unwrap(),
            addr("2001:db8:1234:5678:9abc:def0:1234:56ff")
        );
        assert_eq!(a.maximum_address_with_prefix_length(0).unwrap(), Address::MAX);
    }

    #[test]
    fn test_invalid_prefix_length() {
        let a = addr("::1");
        assert!(a.mask_with_prefix_length(129).unwrap_err().is_invalid_argument());
        assert!(a
            .maximum_address_with_prefix_length(200)
            .unwrap_err()
            .is_invalid_argument());
    }

    #[test]
    fn test_bit_counts() {
        assert_eq!(Address::ZERO.number_of_trailing_zeros(), 128);
        assert_eq!(Address::ZERO.number_of_leading_zeros(), 128);
        assert_eq!(Address::ZERO.number_of_trailing_ones(), 0);
        assert_eq!(Address::MAX.number_of_trailing_ones(), 128);
        assert_eq!(Address::MAX.number_of_leading_ones(), 128);

        assert_eq!(addr("::1").number_of_leading_zeros(), 127);
        assert_eq!(addr("2001::").number_of_trailing_zeros(), 112);
        assert_eq!(addr("::1:0:0:0:0").number_of_trailing_zeros(), 64);
        assert_eq!(addr("::ff").number_of_trailing_ones(), 8);
        assert_eq!(addr("::ffff:ffff:ffff:ffff").number_of_trailing_ones(), 64);
        assert_eq!(addr("ffff:ff00::").number_of_leading_ones(), 24);
    }

    #[test]
    fn test_common_prefix_length() {
        assert_eq!(addr("::1").common_prefix_length(&addr("::1")), 128);
        assert_eq!(addr("::").common_prefix_length(&addr("8000::")), 0);
        assert_eq!(addr("2001:db8::").common_prefix_length(&addr("2001:db8::ff")), 120);
    }

    #[test]
    fn test_text_round_trip() {
        let a = addr("2001:db8::1");
        assert_eq!(a.to_string(), "2001:db8::1");
        assert_eq!(a.high_bits(), 0x2001_0db8_0000_0000);
        assert_eq!(a.low_bits(), 1);
        assert!("2001:db8::g".parse::<Address>().is_err());
        assert!(matches!("".parse::<Address>(), Err(Error::Parse(_))));
    }

    #[test]
    fn test_byte_order() {
        let a = addr("102:304:506:708:90a:b0c:d0e:f10");
        let bytes = a.to_bytes();
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[15], 0x10);
        assert_eq!(Address::from_bytes(bytes), a);
        assert_eq!(Ipv6Addr::from(a).octets(), bytes);
    }

    #[test]
    fn test_classification() {
        assert!(addr("::ffff:10.0.0.1").is_ipv4_mapped());
        assert!(!addr("::10.0.0.1").is_ipv4_mapped());
        assert!(addr("ff02::1").is_multicast());
        assert!(!addr("fe80::1").is_multicast());
        assert!(addr("fe80::1").is_link_local());
        assert!(addr("febf::1").is_link_local());
        assert!(addr("fec0::1").is_site_local());
        assert!(!addr("2001:db8::1").is_site_local());
    }

    #[test]
    fn test_serde_uses_text_form() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            address: Address,
        }

        let encoded = toml::to_string(&Wrapper { address: addr("2001:db8::1") }).unwrap();
        assert!(encoded.contains("\"2001:db8::1\""));

        let decoded: Wrapper = toml::from_str(&encoded).unwrap();
        assert_eq!(decoded.address, addr("2001:db8::1"));
    }
}
