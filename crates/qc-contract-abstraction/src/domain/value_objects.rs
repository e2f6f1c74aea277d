//! # Value Objects
//!
//! Primitives shared by every layer: addresses, hashes, byte payloads.
//! Addresses and hashes serialize as `0x`-prefixed hex strings, matching the
//! JSON-RPC wire format.

use crate::errors::{AbiError, ContractError};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub use primitive_types::{H160 as Address, H256 as Hash, U256};

/// Length of a textual address, `0x` prefix included.
pub const ADDRESS_STRING_LEN: usize = 42;

// =============================================================================
// ADDRESS PARSING
// =============================================================================

/// Parses a `0x`-prefixed, 40-hex-digit address.
///
/// # Errors
///
/// Returns [`ContractError::InvalidAddress`] for any other shape.
pub fn parse_address(input: &str) -> Result<Address, ContractError> {
    let invalid = || ContractError::InvalidAddress(input.to_string());

    if input.len() != ADDRESS_STRING_LEN {
        return Err(invalid());
    }
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .ok_or_else(invalid)?;
    let raw = hex::decode(digits).map_err(|_| invalid())?;
    Ok(Address::from_slice(&raw))
}

/// Lowercase hex of an address without the `0x` prefix.
#[must_use]
pub fn address_hex_digits(address: &Address) -> String {
    hex::encode(address.as_bytes())
}

/// Decodes a hex string with or without `0x` prefix.
///
/// # Errors
///
/// Returns [`AbiError::InvalidHex`] on odd length or non-hex characters.
pub fn decode_hex(input: &str) -> Result<Vec<u8>, AbiError> {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    hex::decode(digits).map_err(|e| AbiError::InvalidHex(format!("{input:.16}: {e}")))
}

// =============================================================================
// BYTES
// =============================================================================

/// Arbitrary byte payload, hex-encoded on the wire.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    /// Creates a payload from a vector.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Parses a hex string, with or without `0x` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::InvalidHex`] when the input is not hex.
    pub fn from_hex(input: &str) -> Result<Self, AbiError> {
        decode_hex(input).map(Self)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `0x`-prefixed lowercase hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Bytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(de::Error::custom)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_address_accepts_well_formed() {
        let addr = parse_address("0xbb9bc244d798123fde783fcc1c72d3bb8c189413").unwrap();
        assert_eq!(
            address_hex_digits(&addr),
            "bb9bc244d798123fde783fcc1c72d3bb8c189413"
        );
    }

    #[test]
    fn test_parse_address_rejects_short_and_unprefixed() {
        assert!(matches!(
            parse_address("0xabc"),
            Err(ContractError::InvalidAddress(_))
        ));
        assert!(parse_address("bb9bc244d798123fde783fcc1c72d3bb8c18941300").is_err());
        assert!(parse_address("0xzz9bc244d798123fde783fcc1c72d3bb8c189413").is_err());
    }

    #[test]
    fn test_bytes_hex_roundtrip_through_json() {
        let bytes = Bytes::new(vec![0x60, 0x60, 0x40]);
        let json = serde_json::to_string(&bytes).unwrap();
        assert_eq!(json, "\"0x606040\"");
        let back: Bytes = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bytes);
    }

    #[test]
    fn test_decode_hex_without_prefix() {
        assert_eq!(decode_hex("0a0b").unwrap(), vec![0x0a, 0x0b]);
        assert!(decode_hex("0x0").is_err());
    }

    proptest! {
        #[test]
        fn prop_wrong_length_never_parses(input in "0x[0-9a-f]{0,60}") {
            prop_assume!(input.len() != ADDRESS_STRING_LEN);
            prop_assert!(matches!(parse_address(&input), Err(ContractError::InvalidAddress(_))));
        }

        #[test]
        fn prop_well_formed_parses_to_same_digits(digits in "[0-9a-f]{40}") {
            let parsed = parse_address(&format!("0x{digits}")).unwrap();
            prop_assert_eq!(address_hex_digits(&parsed), digits);
        }
    }
}
