//! # Receipts and Logs
//!
//! Receipt and log shapes as returned by `eth_getTransactionReceipt` and
//! `eth_getLogs`, and decoding of logs against known event signatures.

use crate::domain::abi::{decode, ParamType, Token};
use crate::domain::schema::EventEntry;
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::AbiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A raw log entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub address: Address,
    #[serde(default)]
    pub topics: Vec<Hash>,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<Hash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_index: Option<U256>,
}

/// Proof that a submitted transaction was included in a block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: Hash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<Hash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<U256>,
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl TransactionReceipt {
    /// Address of a created contract, ignoring an all-zero placeholder.
    #[must_use]
    pub fn created_address(&self) -> Option<Address> {
        self.contract_address.filter(|a| !a.is_zero())
    }
}

// =============================================================================
// DECODED LOGS
// =============================================================================

/// A log decoded against its event entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedLog {
    /// Event name.
    pub event: String,
    /// Arguments in declaration order.
    pub args: Vec<(String, Token)>,
    /// Address the log was decoded on behalf of.
    pub context: Address,
    /// The raw log.
    pub log: Log,
}

impl DecodedLog {
    /// Argument by name.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&Token> {
        self.args.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

/// Decodes one log against `event`.
///
/// Indexed dynamic values only survive as their hash and come back as
/// 32-byte `FixedBytes`.
///
/// # Errors
///
/// Returns [`AbiError`] if topics are missing or data is malformed.
pub fn decode_log(log: &Log, event: &EventEntry, context: Address) -> Result<DecodedLog, AbiError> {
    let mut topics = log.topics.iter();
    if !event.anonymous {
        topics.next();
    }

    let data_types: Vec<ParamType> = event
        .inputs
        .iter()
        .filter(|p| !p.indexed)
        .map(|p| p.kind.clone())
        .collect();
    let mut data_values = decode(&data_types, log.data.as_slice())?.into_iter();

    let mut args = Vec::with_capacity(event.inputs.len());
    for param in &event.inputs {
        let value = if param.indexed {
            let topic = topics.next().ok_or_else(|| {
                AbiError::InvalidData(format!("missing topic for indexed {}", param.name))
            })?;
            if param.kind.is_dynamic() {
                Token::FixedBytes(topic.as_bytes().to_vec())
            } else {
                decode(std::slice::from_ref(&param.kind), topic.as_bytes())?
                    .pop()
                    .ok_or_else(|| AbiError::InvalidData("empty topic decode".into()))?
            }
        } else {
            data_values
                .next()
                .ok_or_else(|| AbiError::InvalidData(format!("missing data for {}", param.name)))?
        };
        args.push((param.name.clone(), value));
    }

    Ok(DecodedLog {
        event: event.name.clone(),
        args,
        context,
        log: log.clone(),
    })
}

/// Decodes every log whose first topic is a known event signature.
///
/// Logs with unknown topics are dropped, not reported.
#[must_use]
pub fn decode_logs(
    logs: &[Log],
    index: &HashMap<Hash, EventEntry>,
    context: Address,
) -> Vec<DecodedLog> {
    logs.iter()
        .filter_map(|log| {
            let topic = log.topics.first()?;
            let Some(event) = index.get(topic) else {
                debug!(topic = ?topic, "Dropping log with unknown topic");
                return None;
            };
            match decode_log(log, event, context) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    warn!(event = %event.name, error = %e, "Failed to decode log");
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
