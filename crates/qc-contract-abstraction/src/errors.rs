//! # Error Types
//!
//! All error types for the contract abstraction runtime.

use crate::domain::value_objects::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// CONTRACT ERRORS
// =============================================================================

/// Errors surfaced by contract classes, instances and bound functions.
#[derive(Debug, Error, Clone)]
pub enum ContractError {
    /// No provider attached to the class.
    #[error("no provider attached: call set_provider() before deploying or invoking")]
    NoProvider,

    /// The active network record carries no bytecode.
    #[error("contract binary not set: can't deploy a new instance")]
    NoBinary,

    /// Library placeholders remain in the bytecode.
    #[error(
        "{contract} contains unresolved libraries. You must deploy and link the following \
         libraries before you can deploy a new version of {contract}: {}",
        .libraries.join(", ")
    )]
    UnresolvedLibraries {
        /// Name of the contract being deployed.
        contract: String,
        /// Distinct, sorted library names.
        libraries: Vec<String>,
    },

    /// Address is not a 42-character `0x`-prefixed hex string.
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    /// No deployed address on record for the active network.
    #[error("cannot find deployed address: contract not deployed or address not set")]
    NotDeployed,

    /// No deployment record for the resolved network id.
    #[error("can't find artifacts for network id '{0}'")]
    UnknownNetwork(String),

    /// Error passed through from the provider.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Receipt did not arrive before the synchronization timeout.
    #[error("Transaction {tx:?} wasn't processed in {} seconds!", as_seconds(.timeout_ms))]
    TransactionTimeout {
        /// Submitted transaction hash.
        tx: Hash,
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The poll loop hit its configured attempt limit.
    #[error("gave up on transaction {tx:?} after {attempts} receipt polls")]
    PollLimitReached {
        /// Submitted transaction hash.
        tx: Hash,
        /// Number of receipt queries made.
        attempts: u32,
    },

    /// No function with this name in the schema.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// No event with this name in the schema.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Call-site arguments are malformed.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// ABI encoding or decoding failed.
    #[error("abi error: {0}")]
    Abi(#[from] AbiError),

    /// Deployment artifact could not be parsed.
    #[error("artifact error: {0}")]
    Artifact(String),

    /// Runtime configuration is invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl ContractError {
    /// Returns true if the error came from the provider rather than from local validation.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<serde_json::Error> for ContractError {
    fn from(err: serde_json::Error) -> Self {
        Self::Artifact(err.to_string())
    }
}

/// Result type for contract operations.
pub type ContractResult<T> = Result<T, ContractError>;

/// Milliseconds as seconds for messages, fractions kept (`1500` shows `1.5`).
#[allow(clippy::trivially_copy_pass_by_ref)]
fn as_seconds(timeout_ms: &u64) -> f64 {
    std::time::Duration::from_millis(*timeout_ms).as_secs_f64()
}

// =============================================================================
// TRANSPORT ERRORS
// =============================================================================

/// Opaque error returned by a provider, shaped like a JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportError {
    /// JSON-RPC error code, when the remote end supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Human-readable message.
    pub message: String,
    /// Optional extra payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TransportError {
    /// Creates an error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            data: None,
        }
    }

    /// Creates an error with a JSON-RPC code.
    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
            data: None,
        }
    }

    /// The provider answered with something that is not the expected shape.
    pub fn malformed(method: &str, details: impl fmt::Display) -> Self {
        Self::new(format!("malformed {method} response: {details}"))
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "[{code}] {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for TransportError {}

// =============================================================================
// ABI ERRORS
// =============================================================================

/// Errors from the ABI codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbiError {
    /// Type string is not a supported Solidity type.
    #[error("unsupported abi type: {0}")]
    UnsupportedType(String),

    /// Token does not fit the declared parameter type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Wrong number of positional arguments.
    #[error("expected {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    /// Encoded data ended before a value could be read.
    #[error("data too short: need {needed} bytes at offset {offset}, have {available}")]
    DataTooShort {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Encoded data is structurally invalid.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

// =============================================================================
// CONFIG ERRORS
// =============================================================================

/// Errors from runtime configuration validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Poll interval of zero would spin.
    #[error("poll_interval_ms cannot be 0")]
    ZeroPollInterval,

    /// Attempt limit of zero never queries the network.
    #[error("max_attempts cannot be 0")]
    ZeroMaxAttempts,

    /// Main network alias list is empty.
    #[error("main_aliases cannot be empty")]
    NoMainAliases,

    /// Document failed to parse.
    #[error("invalid config document: {0}")]
    Parse(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_libraries_message_lists_each_name() {
        let err = ContractError::UnresolvedLibraries {
            contract: "DAO".into(),
            libraries: vec!["A".into(), "B".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("DAO contains unresolved libraries"));
        assert!(msg.ends_with("A, B"));
    }

    #[test]
    fn test_timeout_message_names_tx_and_seconds() {
        let tx = Hash::repeat_byte(0xab);
        let err = ContractError::TransactionTimeout { tx, timeout_ms: 240_000 };
        let msg = err.to_string();
        assert!(msg.contains("0xabab"));
        assert!(msg.contains("240 seconds"));
    }

    #[test]
    fn test_timeout_message_keeps_fractional_seconds() {
        let tx = Hash::repeat_byte(0xab);
        for (timeout_ms, shown) in [(1_500, "1.5 seconds"), (500, "0.5 seconds")] {
            let msg = ContractError::TransactionTimeout { tx, timeout_ms }.to_string();
            assert!(msg.contains(shown), "{msg}");
        }
    }

    #[test]
    fn test_transport_error_display() {
        assert_eq!(TransportError::new("boom").to_string(), "boom");
        assert_eq!(
            TransportError::with_code(-32000, "nonce too low").to_string(),
            "[-32000] nonce too low"
        );
        let err: ContractError = TransportError::new("x").into();
        assert!(err.is_transport());
    }
}
