//! # ABI Codec
//!
//! Solidity contract ABI: parameter types, values, and the head/tail encoding
//! used for call data, return data and event logs.
//!
//! Every value occupies one or more 32-byte words. Static values are written
//! inline in the head; dynamic values (`bytes`, `string`, `T[]`, and fixed
//! arrays of dynamic types) leave an offset in the head and put their content
//! in the tail.

use crate::domain::value_objects::{Address, Hash, U256};
use crate::errors::AbiError;
use serde::Serialize;
use sha3::{Digest, Keccak256};
use std::fmt;

const WORD: usize = 32;

/// Computes keccak256 hash of data.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    Hash::from_slice(&Keccak256::digest(data))
}

// =============================================================================
// PARAM TYPE
// =============================================================================

/// A Solidity parameter type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    Address,
    Bool,
    /// `uintN`, N in bits.
    Uint(usize),
    /// `intN`, N in bits.
    Int(usize),
    /// `bytesN`, N in bytes (1..=32).
    FixedBytes(usize),
    Bytes,
    String,
    Array(Box<ParamType>),
    FixedArray(Box<ParamType>, usize),
}

impl ParamType {
    /// Parses a Solidity type string such as `uint256`, `address[]` or `bytes32[4]`.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::UnsupportedType`] for tuples and malformed names.
    pub fn parse(input: &str) -> Result<Self, AbiError> {
        let unsupported = || AbiError::UnsupportedType(input.to_string());
        let s = input.trim();

        if let Some(stripped) = s.strip_suffix(']') {
            let open = stripped.rfind('[').ok_or_else(unsupported)?;
            let inner = Self::parse(&stripped[..open])?;
            let size = &stripped[open + 1..];
            if size.is_empty() {
                return Ok(Self::Array(Box::new(inner)));
            }
            let len = size.parse::<usize>().map_err(|_| unsupported())?;
            return Ok(Self::FixedArray(Box::new(inner), len));
        }

        match s {
            "address" => return Ok(Self::Address),
            "bool" => return Ok(Self::Bool),
            "string" => return Ok(Self::String),
            "bytes" => return Ok(Self::Bytes),
            "byte" => return Ok(Self::FixedBytes(1)),
            "uint" => return Ok(Self::Uint(256)),
            "int" => return Ok(Self::Int(256)),
            _ => {}
        }

        let sized = |prefix: &str| -> Option<usize> {
            s.strip_prefix(prefix).and_then(|n| n.parse::<usize>().ok())
        };

        if let Some(bits) = sized("uint") {
            if bits == 0 || bits > 256 || bits % 8 != 0 {
                return Err(unsupported());
            }
            return Ok(Self::Uint(bits));
        }
        if let Some(bits) = sized("int") {
            if bits == 0 || bits > 256 || bits % 8 != 0 {
                return Err(unsupported());
            }
            return Ok(Self::Int(bits));
        }
        if let Some(len) = sized("bytes") {
            if len == 0 || len > 32 {
                return Err(unsupported());
            }
            return Ok(Self::FixedBytes(len));
        }

        Err(unsupported())
    }

    /// True if values of this type are encoded in the tail.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::Bytes | Self::String | Self::Array(_) => true,
            Self::FixedArray(inner, _) => inner.is_dynamic(),
            _ => false,
        }
    }

    /// Head size in bytes.
    fn head_size(&self) -> usize {
        match self {
            Self::FixedArray(inner, len) if !inner.is_dynamic() => inner.head_size() * len,
            _ => WORD,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => write!(f, "address"),
            Self::Bool => write!(f, "bool"),
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Int(bits) => write!(f, "int{bits}"),
            Self::FixedBytes(len) => write!(f, "bytes{len}"),
            Self::Bytes => write!(f, "bytes"),
            Self::String => write!(f, "string"),
            Self::Array(inner) => write!(f, "{inner}[]"),
            Self::FixedArray(inner, len) => write!(f, "{inner}[{len}]"),
        }
    }
}

// =============================================================================
// TOKEN
// =============================================================================

/// An ABI value.
///
/// `Int` carries the two's-complement bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Token {
    Address(Address),
    Bool(bool),
    Uint(U256),
    Int(U256),
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<Token>),
    FixedArray(Vec<Token>),
}

impl Token {
    /// Short type label used in mismatch errors.
    fn kind(&self) -> &'static str {
        match self {
            Self::Address(_) => "address",
            Self::Bool(_) => "bool",
            Self::Uint(_) => "uint",
            Self::Int(_) => "int",
            Self::FixedBytes(_) => "fixed bytes",
            Self::Bytes(_) => "bytes",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::FixedArray(_) => "fixed array",
        }
    }

    /// Checks this value fits `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::TypeMismatch`] naming the declared type.
    pub fn type_check(&self, ty: &ParamType) -> Result<(), AbiError> {
        let ok = match (self, ty) {
            (Self::Address(_), ParamType::Address)
            | (Self::Bool(_), ParamType::Bool)
            | (Self::Bytes(_), ParamType::Bytes)
            | (Self::String(_), ParamType::String) => true,
            (Self::Uint(v), ParamType::Uint(bits)) => *bits == 256 || v.bits() <= *bits,
            (Self::Int(_), ParamType::Int(_)) => true,
            // Non-negative literals are accepted for signed slots.
            (Self::Uint(v), ParamType::Int(bits)) => v.bits() < *bits,
            (Self::FixedBytes(b), ParamType::FixedBytes(len)) => b.len() <= *len,
            (Self::Array(items), ParamType::Array(inner)) => {
                for item in items {
                    item.type_check(inner)?;
                }
                true
            }
            (Self::FixedArray(items) | Self::Array(items), ParamType::FixedArray(inner, len)) => {
                if items.len() != *len {
                    false
                } else {
                    for item in items {
                        item.type_check(inner)?;
                    }
                    true
                }
            }
            _ => false,
        };

        if ok {
            Ok(())
        } else {
            Err(AbiError::TypeMismatch {
                expected: ty.to_string(),
                actual: self.kind().to_string(),
            })
        }
    }

    #[must_use]
    pub fn into_address(self) -> Option<Address> {
        match self {
            Self::Address(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_uint(self) -> Option<U256> {
        match self {
            Self::Uint(v) | Self::Int(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_bool(self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_string(self) -> Option<String> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Address> for Token {
    fn from(v: Address) -> Self {
        Self::Address(v)
    }
}

impl From<bool> for Token {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<U256> for Token {
    fn from(v: U256) -> Self {
        Self::Uint(v)
    }
}

impl From<u64> for Token {
    fn from(v: u64) -> Self {
        Self::Uint(U256::from(v))
    }
}

impl From<&str> for Token {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Token {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

// =============================================================================
// SIGNATURES
// =============================================================================

/// Canonical signature, e.g. `transfer(address,uint256)`.
#[must_use]
pub fn signature(name: &str, types: &[ParamType]) -> String {
    let joined = types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("{name}({joined})")
}

/// First four bytes of the keccak hash of the canonical signature.
#[must_use]
pub fn selector(name: &str, types: &[ParamType]) -> [u8; 4] {
    let hash = keccak256(signature(name, types).as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash.as_bytes()[..4]);
    out
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes `tokens` against `types`, checking arity and shape.
///
/// # Errors
///
/// Returns [`AbiError::ArgumentCount`] or [`AbiError::TypeMismatch`].
pub fn encode_checked(types: &[ParamType], tokens: &[Token]) -> Result<Vec<u8>, AbiError> {
    if types.len() != tokens.len() {
        return Err(AbiError::ArgumentCount {
            expected: types.len(),
            actual: tokens.len(),
        });
    }
    for (token, ty) in tokens.iter().zip(types) {
        token.type_check(ty)?;
    }
    Ok(encode_sequence(types, tokens))
}

fn encode_sequence(types: &[ParamType], tokens: &[Token]) -> Vec<u8> {
    let head_len: usize = types.iter().map(ParamType::head_size).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (ty, token) in types.iter().zip(tokens) {
        if ty.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend(encode_dynamic(ty, token));
        } else {
            head.extend(encode_static(ty, token));
        }
    }

    head.extend(tail);
    head
}

fn encode_static(ty: &ParamType, token: &Token) -> Vec<u8> {
    match (ty, token) {
        (_, Token::Address(a)) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(a.as_bytes());
            word.to_vec()
        }
        (_, Token::Bool(b)) => usize_word(usize::from(*b)).to_vec(),
        (_, Token::Uint(v) | Token::Int(v)) => {
            let mut word = [0u8; WORD];
            v.to_big_endian(&mut word);
            word.to_vec()
        }
        (_, Token::FixedBytes(b)) => {
            let mut word = [0u8; WORD];
            word[..b.len()].copy_from_slice(b);
            word.to_vec()
        }
        (ParamType::FixedArray(inner, len), Token::FixedArray(items) | Token::Array(items)) => {
            let types = vec![(**inner).clone(); *len];
            encode_sequence(&types, items)
        }
        _ => Vec::new(),
    }
}

fn encode_dynamic(ty: &ParamType, token: &Token) -> Vec<u8> {
    match (ty, token) {
        (ParamType::Bytes, Token::Bytes(b)) => encode_packed_bytes(b),
        (ParamType::String, Token::String(s)) => encode_packed_bytes(s.as_bytes()),
        (ParamType::Array(inner), Token::Array(items)) => {
            let types = vec![(**inner).clone(); items.len()];
            let mut out = usize_word(items.len()).to_vec();
            out.extend(encode_sequence(&types, items));
            out
        }
        (ParamType::FixedArray(inner, len), Token::FixedArray(items) | Token::Array(items)) => {
            let types = vec![(**inner).clone(); *len];
            encode_sequence(&types, items)
        }
        _ => Vec::new(),
    }
}

fn encode_packed_bytes(data: &[u8]) -> Vec<u8> {
    let padded = data.len().div_ceil(WORD) * WORD;
    let mut out = usize_word(data.len()).to_vec();
    out.extend_from_slice(data);
    out.resize(WORD + padded, 0);
    out
}

fn usize_word(v: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    U256::from(v).to_big_endian(&mut word);
    word
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes `data` as a sequence of `types`.
///
/// # Errors
///
/// Returns [`AbiError::DataTooShort`] or [`AbiError::InvalidData`] on malformed input.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    decode_sequence(types, data, 0)
}

fn decode_sequence(types: &[ParamType], data: &[u8], base: usize) -> Result<Vec<Token>, AbiError> {
    let mut tokens = Vec::with_capacity(types.len());
    let mut cursor = base;

    for ty in types {
        if ty.is_dynamic() {
            let offset = read_usize(data, cursor)?;
            let start = base
                .checked_add(offset)
                .ok_or_else(|| AbiError::InvalidData("offset overflow".into()))?;
            tokens.push(decode_dynamic(ty, data, start)?);
            cursor += WORD;
        } else {
            tokens.push(decode_static(ty, data, cursor)?);
            cursor += ty.head_size();
        }
    }

    Ok(tokens)
}

fn decode_static(ty: &ParamType, data: &[u8], at: usize) -> Result<Token, AbiError> {
    match ty {
        ParamType::Address => {
            let word = read_word(data, at)?;
            Ok(Token::Address(Address::from_slice(&word[12..])))
        }
        ParamType::Bool => {
            let word = read_word(data, at)?;
            Ok(Token::Bool(word.iter().any(|b| *b != 0)))
        }
        ParamType::Uint(_) => Ok(Token::Uint(U256::from_big_endian(read_word(data, at)?))),
        ParamType::Int(_) => Ok(Token::Int(U256::from_big_endian(read_word(data, at)?))),
        ParamType::FixedBytes(len) => Ok(Token::FixedBytes(read_word(data, at)?[..*len].to_vec())),
        ParamType::FixedArray(inner, len) => {
            let types = vec![(**inner).clone(); *len];
            Ok(Token::FixedArray(decode_sequence(&types, data, at)?))
        }
        other => Err(AbiError::InvalidData(format!(
            "{other} is not a static type"
        ))),
    }
}

fn decode_dynamic(ty: &ParamType, data: &[u8], at: usize) -> Result<Token, AbiError> {
    match ty {
        ParamType::Bytes => Ok(Token::Bytes(read_packed_bytes(data, at)?)),
        ParamType::String => {
            let raw = read_packed_bytes(data, at)?;
            String::from_utf8(raw)
                .map(Token::String)
                .map_err(|e| AbiError::InvalidData(e.to_string()))
        }
        ParamType::Array(inner) => {
            let len = read_usize(data, at)?;
            // Each element needs at least one word; reject lengths the data cannot hold.
            if len > data.len() / WORD {
                return Err(AbiError::InvalidData(format!("array length {len} too large")));
            }
            let types = vec![(**inner).clone(); len];
            Ok(Token::Array(decode_sequence(&types, data, at + WORD)?))
        }
        ParamType::FixedArray(inner, len) => {
            let types = vec![(**inner).clone(); *len];
            Ok(Token::FixedArray(decode_sequence(&types, data, at)?))
        }
        other => decode_static(other, data, at),
    }
}

fn read_word(data: &[u8], at: usize) -> Result<&[u8], AbiError> {
    data.get(at..at + WORD).ok_or(AbiError::DataTooShort {
        offset: at,
        needed: WORD,
        available: data.len().saturating_sub(at),
    })
}

fn read_usize(data: &[u8], at: usize) -> Result<usize, AbiError> {
    let value = U256::from_big_endian(read_word(data, at)?);
    if value > U256::from(u32::MAX) {
        return Err(AbiError::InvalidData(format!("offset or length {value} out of range")));
    }
    Ok(value.as_usize())
}

fn read_packed_bytes(data: &[u8], at: usize) -> Result<Vec<u8>, AbiError> {
    let len = read_usize(data, at)?;
    let start = at + WORD;
    data.get(start..start + len)
        .map(<[u8]>::to_vec)
        .ok_or(AbiError::DataTooShort {
            offset: start,
            needed: len,
            available: data.len().saturating_sub(start),
        })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases_and_arrays() {
        assert_eq!(ParamType::parse("uint").unwrap(), ParamType::Uint(256));
        assert_eq!(ParamType::parse("int").unwrap(), ParamType::Int(256));
        assert_eq!(ParamType::parse("byte").unwrap(), ParamType::FixedBytes(1));
        assert_eq!(
            ParamType::parse("address[]").unwrap(),
            ParamType::Array(Box::new(ParamType::Address))
        );
        assert_eq!(
            ParamType::parse("bytes32[3]").unwrap().to_string(),
            "bytes32[3]"
        );
        assert!(ParamType::parse("tuple").is_err());
        assert!(ParamType::parse("uint7").is_err());
        assert!(ParamType::parse("bytes33").is_err());
    }

    #[test]
    fn test_selector_matches_known_vectors() {
        // transfer(address,uint256) => a9059cbb
        let sel = selector("transfer", &[ParamType::Address, ParamType::Uint(256)]);
        assert_eq!(hex::encode(sel), "a9059cbb");
        // balanceOf(address) => 70a08231
        let sel = selector("balanceOf", &[ParamType::Address]);
        assert_eq!(hex::encode(sel), "70a08231");
    }

    #[test]
    fn test_transfer_event_topic() {
        let topic = keccak256(b"Transfer(address,address,uint256)");
        assert_eq!(
            hex::encode(topic.as_bytes()),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_encode_static_words() {
        let addr = Address::repeat_byte(0x11);
        let out = encode_checked(
            &[ParamType::Address, ParamType::Uint(256)],
            &[Token::Address(addr), Token::from(5u64)],
        )
        .unwrap();
        assert_eq!(out.len(), 64);
        assert_eq!(&out[12..32], addr.as_bytes());
        assert_eq!(out[63], 5);
    }

    #[test]
    fn test_encode_dynamic_string_layout() {
        let out = encode_checked(
            &[ParamType::Uint(256), ParamType::String],
            &[Token::from(1u64), Token::from("dave")],
        )
        .unwrap();
        // head: value, offset(64); tail: len(4), "dave" padded
        assert_eq!(out.len(), 128);
        assert_eq!(out[63], 64);
        assert_eq!(out[95], 4);
        assert_eq!(&out[96..100], b"dave");
    }

    #[test]
    fn test_decode_reads_what_encode_writes_for_nested_dynamic() {
        let types = [
            ParamType::Array(Box::new(ParamType::String)),
            ParamType::Bool,
            ParamType::FixedArray(Box::new(ParamType::Uint(8)), 2),
        ];
        let tokens = vec![
            Token::Array(vec![Token::from("a"), Token::from("bcd")]),
            Token::Bool(true),
            Token::FixedArray(vec![Token::from(1u64), Token::from(2u64)]),
        ];
        let encoded = encode_checked(&types, &tokens).unwrap();
        assert_eq!(decode(&types, &encoded).unwrap(), tokens);
    }

    #[test]
    fn test_type_check_rejects_mismatch_and_arity() {
        let err = encode_checked(&[ParamType::Address], &[Token::Bool(true)]).unwrap_err();
        assert!(matches!(err, AbiError::TypeMismatch { .. }));

        let err = encode_checked(&[ParamType::Address], &[]).unwrap_err();
        assert_eq!(err, AbiError::ArgumentCount { expected: 1, actual: 0 });

        let err = encode_checked(&[ParamType::Uint(8)], &[Token::from(256u64)]).unwrap_err();
        assert!(matches!(err, AbiError::TypeMismatch { .. }));
    }

    #[test]
    fn test_decode_short_data_errors() {
        let err = decode(&[ParamType::Uint(256)], &[0u8; 10]).unwrap_err();
        assert!(matches!(err, AbiError::DataTooShort { .. }));
    }
}
