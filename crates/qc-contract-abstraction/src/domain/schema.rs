//! # Interface Schema
//!
//! Typed view of a contract ABI: the ordered function and event entries of a
//! remote program. Schemas are immutable once loaded and shared behind `Arc`.

use crate::domain::abi::{self, keccak256, ParamType};
use crate::domain::value_objects::Hash;
use crate::errors::AbiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// ENTRIES
// =============================================================================

/// A named, typed parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ParamType,
}

/// An event parameter; indexed ones travel in topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParam {
    pub name: String,
    pub kind: ParamType,
    pub indexed: bool,
}

/// Whether a function only observes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    /// Answered by a single `eth_call`.
    Read,
    /// Submitted as a transaction and confirmed by polling.
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    pub name: String,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
    pub mutability: Mutability,
    pub payable: bool,
}

impl FunctionEntry {
    #[must_use]
    pub fn input_types(&self) -> Vec<ParamType> {
        self.inputs.iter().map(|p| p.kind.clone()).collect()
    }

    #[must_use]
    pub fn output_types(&self) -> Vec<ParamType> {
        self.outputs.iter().map(|p| p.kind.clone()).collect()
    }

    /// Canonical signature, e.g. `balanceOf(address)`.
    #[must_use]
    pub fn signature(&self) -> String {
        abi::signature(&self.name, &self.input_types())
    }

    #[must_use]
    pub fn selector(&self) -> [u8; 4] {
        abi::selector(&self.name, &self.input_types())
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.mutability == Mutability::Read
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEntry {
    pub name: String,
    pub inputs: Vec<EventParam>,
    pub anonymous: bool,
}

impl EventEntry {
    #[must_use]
    pub fn signature(&self) -> String {
        let types: Vec<ParamType> = self.inputs.iter().map(|p| p.kind.clone()).collect();
        abi::signature(&self.name, &types)
    }

    /// Topic 0 of every non-anonymous log this event emits.
    #[must_use]
    pub fn topic(&self) -> Hash {
        keccak256(self.signature().as_bytes())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorEntry {
    pub inputs: Vec<Param>,
    pub payable: bool,
}

/// A custom revert error declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub name: String,
    pub inputs: Vec<Param>,
}

/// One schema entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiEntry {
    Function(FunctionEntry),
    Event(EventEntry),
    Constructor(ConstructorEntry),
    Fallback { payable: bool },
    Receive,
    Error(ErrorEntry),
}

// =============================================================================
// RAW JSON FORM
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    indexed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawEntry {
    Function {
        name: String,
        #[serde(default)]
        inputs: Vec<RawParam>,
        #[serde(default)]
        outputs: Vec<RawParam>,
        #[serde(default)]
        constant: bool,
        #[serde(default, rename = "stateMutability")]
        state_mutability: Option<String>,
        #[serde(default)]
        payable: bool,
    },
    Event {
        name: String,
        #[serde(default)]
        inputs: Vec<RawParam>,
        #[serde(default)]
        anonymous: bool,
    },
    Constructor {
        #[serde(default)]
        inputs: Vec<RawParam>,
        #[serde(default)]
        payable: bool,
    },
    Fallback {
        #[serde(default)]
        payable: bool,
    },
    Receive,
    Error {
        name: String,
        #[serde(default)]
        inputs: Vec<RawParam>,
    },
    /// Entry kinds this runtime has no use for; skipped on load.
    #[serde(other)]
    Unknown,
}

fn params(raw: &[RawParam]) -> Result<Vec<Param>, AbiError> {
    raw.iter()
        .map(|p| {
            Ok(Param {
                name: p.name.clone(),
                kind: ParamType::parse(&p.kind)?,
            })
        })
        .collect()
}

impl TryFrom<RawEntry> for AbiEntry {
    type Error = AbiError;

    fn try_from(raw: RawEntry) -> Result<Self, AbiError> {
        Ok(match raw {
            RawEntry::Function {
                name,
                inputs,
                outputs,
                constant,
                state_mutability,
                payable,
            } => {
                // Older compilers only emit `constant`; newer ones only `stateMutability`.
                let read = constant
                    || matches!(state_mutability.as_deref(), Some("view" | "pure"));
                let payable = payable || state_mutability.as_deref() == Some("payable");
                Self::Function(FunctionEntry {
                    name,
                    inputs: params(&inputs)?,
                    outputs: params(&outputs)?,
                    mutability: if read { Mutability::Read } else { Mutability::Write },
                    payable,
                })
            }
            RawEntry::Event {
                name,
                inputs,
                anonymous,
            } => Self::Event(EventEntry {
                name,
                inputs: inputs
                    .iter()
                    .map(|p| {
                        Ok(EventParam {
                            name: p.name.clone(),
                            kind: ParamType::parse(&p.kind)?,
                            indexed: p.indexed,
                        })
                    })
                    .collect::<Result<_, AbiError>>()?,
                anonymous,
            }),
            RawEntry::Constructor { inputs, payable } => Self::Constructor(ConstructorEntry {
                inputs: params(&inputs)?,
                payable,
            }),
            RawEntry::Fallback { payable } => Self::Fallback { payable },
            RawEntry::Receive => Self::Receive,
            RawEntry::Error { name, inputs } => Self::Error(ErrorEntry {
                name,
                inputs: params(&inputs)?,
            }),
            RawEntry::Unknown => {
                return Err(AbiError::InvalidData("unknown entry type".into()));
            }
        })
    }
}

/// Parses a single event entry, as stored in an artifact's `events` map.
///
/// # Errors
///
/// Returns [`AbiError::InvalidData`] if the value is not an event entry.
pub fn parse_event_entry(value: &serde_json::Value) -> Result<EventEntry, AbiError> {
    let raw: RawEntry =
        serde_json::from_value(value.clone()).map_err(|e| AbiError::InvalidData(e.to_string()))?;
    match AbiEntry::try_from(raw)? {
        AbiEntry::Event(event) => Ok(event),
        _ => Err(AbiError::InvalidData("entry is not an event".into())),
    }
}

// =============================================================================
// SCHEMA
// =============================================================================

/// Ordered interface description of a remote program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    entries: Vec<AbiEntry>,
}

impl Schema {
    #[must_use]
    pub fn new(entries: Vec<AbiEntry>) -> Self {
        Self { entries }
    }

    /// Parses a JSON ABI array.
    ///
    /// Entries without a `type` are functions. Unknown entry types are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON or unsupported parameter types.
    pub fn from_json_value(value: &serde_json::Value) -> Result<Self, AbiError> {
        let mut value = value.clone();
        if let Some(items) = value.as_array_mut() {
            for item in items.iter_mut().filter_map(serde_json::Value::as_object_mut) {
                item.entry("type").or_insert_with(|| "function".into());
            }
        }
        let raw: Vec<RawEntry> =
            serde_json::from_value(value).map_err(|e| AbiError::InvalidData(e.to_string()))?;
        let entries = raw
            .into_iter()
            .filter(|entry| !matches!(entry, RawEntry::Unknown))
            .map(AbiEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    #[must_use]
    pub fn entries(&self) -> &[AbiEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionEntry> {
        self.entries.iter().filter_map(|e| match e {
            AbiEntry::Function(f) => Some(f),
            _ => None,
        })
    }

    pub fn events(&self) -> impl Iterator<Item = &EventEntry> {
        self.entries.iter().filter_map(|e| match e {
            AbiEntry::Event(ev) => Some(ev),
            _ => None,
        })
    }

    /// First function with this name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions().find(|f| f.name == name)
    }

    #[must_use]
    pub fn event(&self, name: &str) -> Option<&EventEntry> {
        self.events().find(|e| e.name == name)
    }

    #[must_use]
    pub fn constructor(&self) -> Option<&ConstructorEntry> {
        self.entries.iter().find_map(|e| match e {
            AbiEntry::Constructor(c) => Some(c),
            _ => None,
        })
    }

    /// Topic hash to event entry, for every non-anonymous event.
    #[must_use]
    pub fn event_index(&self) -> HashMap<Hash, EventEntry> {
        self.events()
            .filter(|e| !e.anonymous)
            .map(|e| (e.topic(), e.clone()))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
