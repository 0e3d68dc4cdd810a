//! IPv4 netmask with its two representations.
//!
//! The remote stores and reports a netmask as a prefix length (`24`), while
//! callers usually think in dotted quads (`255.255.255.0`). [`Netmask`] keeps
//! the prefix length and converts on demand; both conversions are exact
//! inverses of each other for prefix lengths 0 through 32.

use crate::core::domain::error::ValidationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Converts a prefix length into a dotted-quad subnet mask.
pub fn prefix_to_mask(prefix: u8) -> Result<Ipv4Addr, ValidationError> {
    if prefix > 32 {
        return Err(ValidationError::Field {
            field: "netmask".to_string(),
            message: format!("Prefix length must be between 0 and 32 (got {})", prefix),
        });
    }
    // shifting a u32 by 32 overflows, a /0 mask is all zeroes
    let bits = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
    Ok(Ipv4Addr::from(bits))
}

/// Converts a dotted-quad subnet mask back into its prefix length.
///
/// Fails for masks whose one-bits are not contiguous from the left.
pub fn mask_to_prefix(mask: Ipv4Addr) -> Result<u8, ValidationError> {
    let bits = u32::from(mask);
    let ones = bits.leading_ones();
    if ones + bits.trailing_zeros() < 32 {
        return Err(ValidationError::Format(format!(
            "Netmask {} is not a contiguous prefix mask",
            mask
        )));
    }
    Ok(ones as u8)
}

/// An IPv4 subnet mask, stored as its prefix length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Netmask(u8);

impl Netmask {
    /// Creates a netmask from a prefix length (0-32).
    pub fn from_prefix(prefix: u8) -> Result<Self, ValidationError> {
        prefix_to_mask(prefix)?;
        Ok(Self(prefix))
    }

    /// Creates a netmask from a dotted quad such as `255.255.255.0`.
    pub fn from_dotted(mask: &str) -> Result<Self, ValidationError> {
        let addr = mask.parse::<Ipv4Addr>().map_err(|_| {
            ValidationError::Format(format!("'{}' is not a dotted-quad netmask", mask))
        })?;
        mask_to_prefix(addr).map(Self)
    }

    /// Returns the prefix length.
    #[must_use]
    pub fn prefix_len(self) -> u8 {
        self.0
    }

    /// Returns the mask as an address.
    #[must_use]
    pub fn to_ipv4(self) -> Ipv4Addr {
        Ipv4Addr::from(u32::MAX.checked_shl(32 - u32::from(self.0)).unwrap_or(0))
    }

    /// Returns the mask rendered as four dotted octets.
    #[must_use]
    pub fn to_dotted(self) -> String {
        self.to_ipv4().to_string()
    }
}

impl fmt::Display for Netmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ipv4())
    }
}

impl FromStr for Netmask {
    type Err = ValidationError;

    /// Accepts either a prefix length (`24`) or a dotted quad.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains('.') {
            return Self::from_dotted(s);
        }
        let prefix = s.parse::<u8>().map_err(|_| {
            ValidationError::Format(format!("'{}' is not a prefix length or netmask", s))
        })?;
        Self::from_prefix(prefix)
    }
}

impl Serialize for Netmask {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Netmask {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Prefix(u8),
            Text(String),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Prefix(prefix) => Netmask::from_prefix(prefix),
            Wire::Text(text) => text.parse(),
        }
        .map_err(serde::de::Error::custom)
    }
}
