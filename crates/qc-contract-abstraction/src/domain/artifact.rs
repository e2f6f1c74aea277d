//! # Deployment Artifacts
//!
//! The per-contract build artifact and the typed Deployment Record derived
//! from each of its network entries.
//!
//! Two artifact versions are accepted:
//! - **Legacy**: no `events` map; transactions resolve with the hash and receipt only.
//! - **Enriched**: explicit topic -> event map; receipts also carry decoded logs.

use crate::domain::schema::{parse_event_entry, EventEntry, Schema};
use crate::domain::value_objects::{parse_address, Address, Hash};
use crate::errors::{ContractError, ContractResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

/// Network key for a record shared by every network.
pub const DEFAULT_NETWORK: &str = "default";

// =============================================================================
// RAW ARTIFACT
// =============================================================================

/// One `all_networks` entry as it appears on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlinked_binary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<u64>,
    #[serde(default)]
    pub links: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<BTreeMap<String, serde_json::Value>>,
}

/// A contract build artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractArtifact {
    pub contract_name: String,
    #[serde(default)]
    pub generated_with: String,
    #[serde(default)]
    pub all_networks: BTreeMap<String, NetworkArtifact>,
}

impl ContractArtifact {
    /// Parses an artifact from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Artifact`] on malformed JSON.
    pub fn from_json_str(json: &str) -> ContractResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses an artifact file.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Artifact`] on I/O or parse failure.
    pub fn from_path(path: impl AsRef<Path>) -> ContractResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ContractError::Artifact(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Converts every network entry into a Deployment Record.
    ///
    /// # Errors
    ///
    /// Fails if an ABI, address or event entry in any network is malformed.
    pub fn records(&self) -> ContractResult<BTreeMap<String, DeploymentRecord>> {
        self.all_networks
            .iter()
            .map(|(id, raw)| Ok((id.clone(), DeploymentRecord::from_artifact(raw)?)))
            .collect()
    }
}

// =============================================================================
// DEPLOYMENT RECORD
// =============================================================================

/// Artifact schema version of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactVersion {
    /// No explicit events map.
    #[default]
    Legacy,
    /// Explicit events map; receipts carry decoded logs.
    Enriched,
}

/// Everything known about one contract on one network.
#[derive(Debug, Clone, Default)]
pub struct DeploymentRecord {
    pub schema: Arc<Schema>,
    pub bytecode_template: Option<String>,
    pub deployed_address: Option<Address>,
    pub updated_at: Option<u64>,
    pub linked_modules: BTreeMap<String, Address>,
    pub event_signature_index: HashMap<Hash, EventEntry>,
    pub version: ArtifactVersion,
}

impl DeploymentRecord {
    /// Builds a record from a raw network entry.
    ///
    /// # Errors
    ///
    /// Fails on a malformed ABI, address, link address or event entry.
    pub fn from_artifact(raw: &NetworkArtifact) -> ContractResult<Self> {
        let schema = match &raw.abi {
            Some(abi) => Schema::from_json_value(abi)?,
            None => Schema::default(),
        };

        let deployed_address = raw.address.as_deref().map(parse_address).transpose()?;

        let linked_modules = raw
            .links
            .iter()
            .map(|(name, addr)| Ok((name.clone(), parse_address(addr)?)))
            .collect::<ContractResult<BTreeMap<_, _>>>()?;

        let mut event_signature_index = schema.event_index();
        let version = match &raw.events {
            Some(events) => {
                for (topic, entry) in events {
                    let bytes = crate::domain::value_objects::decode_hex(topic)?;
                    if bytes.len() != 32 {
                        return Err(ContractError::Artifact(format!(
                            "event topic {topic} is not 32 bytes"
                        )));
                    }
                    event_signature_index.insert(Hash::from_slice(&bytes), parse_event_entry(entry)?);
                }
                ArtifactVersion::Enriched
            }
            None => ArtifactVersion::Legacy,
        };

        Ok(Self {
            schema: Arc::new(schema),
            // A pre-linked `binary` stands in when no template was shipped.
            bytecode_template: non_empty_code(raw.unlinked_binary.as_deref())
                .or_else(|| non_empty_code(raw.binary.as_deref())),
            deployed_address,
            updated_at: raw.updated_at,
            linked_modules,
            event_signature_index,
            version,
        })
    }
}

/// `""` and `"0x"` carry no code and count as absent.
fn non_empty_code(code: Option<&str>) -> Option<String> {
    code.filter(|c| !c.trim_start_matches("0x").is_empty())
        .map(str::to_string)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::abi::keccak256;

    const LEGACY: &str = r#"{
        "contract_name": "DAO",
        "generated_with": "3.1.2",
        "all_networks": {
            "default": {
                "abi": [{"anonymous": false, "name": "Transfer", "type": "event", "inputs": [
                    {"indexed": true, "name": "_from", "type": "address"},
                    {"indexed": true, "name": "_to", "type": "address"},
                    {"indexed": false, "name": "_amount", "type": "uint256"}]}],
                "unlinked_binary": "0x6060",
                "updated_at": 1471380606703,
                "links": {}
            }
        }
    }"#;

    #[test]
    fn test_legacy_artifact_loads() {
        let artifact = ContractArtifact::from_json_str(LEGACY).unwrap();
        assert_eq!(artifact.contract_name, "DAO");
        let records = artifact.records().unwrap();
        let record = &records[DEFAULT_NETWORK];
        assert_eq!(record.version, ArtifactVersion::Legacy);
        assert_eq!(record.bytecode_template.as_deref(), Some("0x6060"));
        assert_eq!(record.updated_at, Some(1_471_380_606_703));
        assert!(record.deployed_address.is_none());
        assert_eq!(record.event_signature_index.len(), 1);
    }

    #[test]
    fn test_enriched_artifact_merges_events_map() {
        let topic = keccak256(b"Approval(address,address,uint256)");
        let json = serde_json::json!({
            "contract_name": "Token",
            "all_networks": {
                "live": {
                    "abi": [],
                    "address": "0xbb9bc244d798123fde783fcc1c72d3bb8c189413",
                    "links": {"Math": "0x1111111111111111111111111111111111111111"},
                    "events": {
                        format!("{topic:?}"): {"anonymous": false, "name": "Approval", "type": "event",
                            "inputs": [
                                {"indexed": true, "name": "owner", "type": "address"},
                                {"indexed": true, "name": "spender", "type": "address"},
                                {"indexed": false, "name": "value", "type": "uint256"}]}
                    }
                }
            }
        });
        let artifact: ContractArtifact = serde_json::from_value(json).unwrap();
        let record = &artifact.records().unwrap()["live"];
        assert_eq!(record.version, ArtifactVersion::Enriched);
        assert_eq!(record.event_signature_index[&topic].name, "Approval");
        assert!(record.deployed_address.is_some());
        assert_eq!(
            record.linked_modules["Math"],
            Address::repeat_byte(0x11)
        );
    }

    #[test]
    fn test_bad_address_rejected() {
        let raw = NetworkArtifact {
            address: Some("0xabc".into()),
            ..NetworkArtifact::default()
        };
        assert!(matches!(
            DeploymentRecord::from_artifact(&raw),
            Err(ContractError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_empty_bytecode_counts_as_missing() {
        for code in ["", "0x"] {
            let raw = NetworkArtifact {
                unlinked_binary: Some(code.into()),
                ..NetworkArtifact::default()
            };
            let record = DeploymentRecord::from_artifact(&raw).unwrap();
            assert!(record.bytecode_template.is_none(), "{code:?} kept as code");
        }

        let raw = NetworkArtifact {
            unlinked_binary: Some(String::new()),
            binary: Some("0x6060".into()),
            ..NetworkArtifact::default()
        };
        let record = DeploymentRecord::from_artifact(&raw).unwrap();
        assert_eq!(record.bytecode_template.as_deref(), Some("0x6060"));
    }
}
