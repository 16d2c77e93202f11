use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::bail;
use crate::error::{CdcError, ErrorKind};

/// Maximum number of hexadecimal digits allowed in a single component.
const MAX_COMPONENT_DIGITS: usize = 8;

/// Position in the source database's write-ahead log.
///
/// Textually an [`Lsn`] is two hexadecimal components separated by `/` (`high/low`). The
/// numeric form, used as the version token of destination records, is `(high << 32) | low`,
/// which makes the textual ordering of positions match the numeric ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Lsn(u64);

impl Lsn {
    /// Creates an [`Lsn`] from its two components.
    pub fn from_parts(high: u32, low: u32) -> Self {
        Self(((high as u64) << 32) | low as u64)
    }

    /// Returns the upper 32 bits.
    pub fn high(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns the lower 32 bits.
    pub fn low(&self) -> u32 {
        self.0 as u32
    }

    /// Returns the numeric version token.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Lsn {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Lsn> for u64 {
    fn from(lsn: Lsn) -> u64 {
        lsn.0
    }
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}/{:X}", self.high(), self.low())
    }
}

impl Serialize for Lsn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl FromStr for Lsn {
    type Err = CdcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((high, low)) = s.split_once('/') else {
            bail!(
                ErrorKind::InvalidOrderingToken,
                "Invalid ordering token",
                format!("'{s}' is not of the form <hex>/<hex>")
            );
        };

        let high = parse_component(s, high)?;
        let low = parse_component(s, low)?;

        Ok(Lsn::from_parts(high, low))
    }
}

/// Parses one hexadecimal component of an ordering token.
///
/// Only ASCII hex digits are accepted, which rules out signs and whitespace that
/// [`u32::from_str_radix`] would otherwise tolerate, as well as a second `/`.
fn parse_component(token: &str, component: &str) -> Result<u32, CdcError> {
    if component.is_empty()
        || component.len() > MAX_COMPONENT_DIGITS
        || !component.bytes().all(|b| b.is_ascii_hexdigit())
    {
        bail!(
            ErrorKind::InvalidOrderingToken,
            "Invalid ordering token",
            format!("'{token}' has an invalid component '{component}', expected 1 to 8 hex digits")
        );
    }

    Ok(u32::from_str_radix(component, 16)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_low_only() {
        let lsn: Lsn = "0/1".parse().unwrap();
        assert_eq!(u64::from(lsn), 1);
    }

    #[test]
    fn parse_high_only() {
        let lsn: Lsn = "1/0".parse().unwrap();
        assert_eq!(u64::from(lsn), 4294967296);
    }

    #[test]
    fn parse_typical_position() {
        let lsn: Lsn = "0/1A2B3C4".parse().unwrap();
        assert_eq!(lsn.as_u64(), 27440068);
    }

    #[test]
    fn parse_mixed_case() {
        let upper: Lsn = "16/B374D848".parse().unwrap();
        let lower: Lsn = "16/b374d848".parse().unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.high(), 0x16);
        assert_eq!(upper.low(), 0xB374D848);
    }

    #[test]
    fn parse_max() {
        let lsn: Lsn = "FFFFFFFF/FFFFFFFF".parse().unwrap();
        assert_eq!(lsn.as_u64(), u64::MAX);
    }

    #[test]
    fn ordering_follows_numeric_form() {
        let a: Lsn = "0/FFFFFFFF".parse().unwrap();
        let b: Lsn = "1/0".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn display_is_uppercase_hex() {
        let lsn = Lsn::from_parts(0x16, 0xb374d848);
        assert_eq!(lsn.to_string(), "16/B374D848");
        assert_eq!(lsn.to_string().parse::<Lsn>().unwrap(), lsn);
    }

    #[test]
    fn reject_malformed_tokens() {
        for token in [
            "",
            "1A2B3C4",
            "/1",
            "0/",
            "0/1/2",
            "0/+1",
            "-0/1",
            " 0/1",
            "0/1 ",
            "0/XYZ",
            "100000000/0",
            "0/123456789",
        ] {
            let err = token.parse::<Lsn>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidOrderingToken, "token {token:?}");
        }
    }
}
