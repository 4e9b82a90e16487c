use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 32-bit radio endpoint address.
///
/// Talkers and gateways are both addressed this way; equality and hashing are
/// by integer value. Bus topics carry the decimal value, logs and CLIs the
/// hex form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub u32);

impl Address {
    /// Reserved "any gateway" address. Talkers use it as the receiver of
    /// their power-up Helo; every gateway accepts packets sent to it.
    pub const MULTICAST: Address = Address(0x4A4A_4A4A);

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn is_multicast(self) -> bool {
        self == Self::MULTICAST
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<u32> for Address {
    fn from(raw: u32) -> Self {
        Address(raw)
    }
}

impl FromStr for Address {
    type Err = ParseIntError;

    /// Accepts `0x`-prefixed hex or bare hex, matching the form gateway IDs
    /// appear in on enclosure labels and in legacy CSV exports.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        u32::from_str_radix(digits, 16).map(Address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_with_and_without_prefix() {
        assert_eq!("0x4a4a4a4a".parse::<Address>().unwrap(), Address::MULTICAST);
        assert_eq!("52010352".parse::<Address>().unwrap(), Address(0x5201_0352));
    }

    #[test]
    fn displays_as_hex() {
        assert_eq!(Address(0x5201_0352).to_string(), "0x52010352");
    }
}
