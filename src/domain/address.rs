//! MAC address value type and codec.
//!
//! Parsing, normalization and random generation. No I/O.

use std::fmt;
use std::str::FromStr;

use macaddr::MacAddr6;
use rand::Rng;

use crate::error::MacError;

/// Number of hex digits in a textual MAC address once separators are removed.
const HEX_DIGITS: usize = 12;

/// A 6-octet hardware address.
///
/// Always rendered as six uppercase hex pairs separated by `:`. That is the
/// only form persisted, displayed or passed to platform tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(MacAddr6);

impl MacAddress {
    pub fn new(octets: [u8; 6]) -> Self {
        Self(MacAddr6::from(octets))
    }

    /// Generate a random unicast, locally administered address.
    pub fn generate_random() -> Self {
        Self::generate_with(&mut rand::rng())
    }

    /// Generate from the given RNG.
    ///
    /// The first octet has the multicast bit (0) cleared and the locally
    /// administered bit (1) set.
    pub fn generate_with<R: Rng>(rng: &mut R) -> Self {
        let mut octets = [0u8; 6];
        rng.fill(&mut octets[..]);
        octets[0] = (octets[0] & 0xFE) | 0x02;
        Self::new(octets)
    }

    /// Normalize arbitrary text into a MAC address.
    ///
    /// Every character that is not a hex digit is dropped. Exactly twelve hex
    /// digits must remain; separators and case on input do not matter.
    pub fn normalize(raw: &str) -> Result<Self, MacError> {
        let digits: Vec<u8> = raw
            .chars()
            .filter(|c| c.is_ascii_hexdigit())
            .filter_map(|c| c.to_digit(16))
            .map(|d| d as u8)
            .collect();

        if digits.len() != HEX_DIGITS {
            return Err(MacError::Format(raw.to_string()));
        }

        let mut octets = [0u8; 6];
        for (octet, pair) in octets.iter_mut().zip(digits.chunks(2)) {
            *octet = (pair[0] << 4) | pair[1];
        }
        Ok(Self::new(octets))
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0.into_array()
    }

    /// The twelve uppercase hex digits without separators.
    ///
    /// This is the form the Windows `NetworkAddress` registry value expects.
    pub fn to_hex_digits(&self) -> String {
        self.octets().iter().map(|b| format!("{:02X}", b)).collect()
    }

    pub fn is_unicast(&self) -> bool {
        self.octets()[0] & 0x01 == 0
    }

    pub fn is_locally_administered(&self) -> bool {
        self.octets()[0] & 0x02 != 0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.octets();
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = MacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

impl From<MacAddr6> for MacAddress {
    fn from(addr: MacAddr6) -> Self {
        Self(addr)
    }
}

impl From<MacAddress> for MacAddr6 {
    fn from(addr: MacAddress) -> Self {
        addr.0
    }
}
