//! # Network Registry
//!
//! Per-class table of Deployment Records keyed by network id, plus the
//! active record ("current network").
//!
//! The active record is a working copy: `set_network` copies the table entry
//! into it, and links or a deployment write through to the table entry it was
//! loaded from so that switching away and back keeps them. Unpinning keeps
//! that entry as the write-through target.

use crate::domain::artifact::DeploymentRecord;
use crate::domain::value_objects::{Address, Hash};
use crate::domain::schema::EventEntry;
use crate::errors::{ContractError, ContractResult};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    table: BTreeMap<String, DeploymentRecord>,
    active: DeploymentRecord,
    /// Table key the active record was copied from.
    loaded: Option<String>,
    current: Option<String>,
}

impl NetworkRegistry {
    #[must_use]
    pub fn new(table: BTreeMap<String, DeploymentRecord>) -> Self {
        Self {
            table,
            active: DeploymentRecord::default(),
            loaded: None,
            current: None,
        }
    }

    /// Makes `id` the current network, falling back to an empty record.
    pub fn set_network(&mut self, id: &str) {
        self.active = self.table.get(id).cloned().unwrap_or_default();
        self.loaded = Some(id.to_string());
        self.current = Some(id.to_string());
        debug!(network = id, known = self.table.contains_key(id), "Network set");
    }

    /// Forgets the pinned id while keeping the active record's data, so the
    /// next `check_network` re-detects.
    pub fn unpin(&mut self) {
        self.current = None;
    }

    /// Pinned network id, if any.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    #[must_use]
    pub fn active(&self) -> &DeploymentRecord {
        &self.active
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.table.contains_key(id)
    }

    /// Known network ids.
    #[must_use]
    pub fn networks(&self) -> Vec<String> {
        self.table.keys().cloned().collect()
    }

    /// Maps a reported network id onto a table key.
    ///
    /// When `reported` is the main network id, the first alias present in the
    /// table wins, so one canonical record can serve several spellings.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::UnknownNetwork`] if no record matches.
    pub fn resolve(&self, reported: &str, main_id: &str, aliases: &[String]) -> ContractResult<String> {
        let mut resolved = reported.to_string();
        if reported == main_id {
            if let Some(alias) = aliases.iter().find(|a| self.table.contains_key(a.as_str())) {
                resolved.clone_from(alias);
            }
        }

        if self.table.contains_key(&resolved) {
            Ok(resolved)
        } else {
            Err(ContractError::UnknownNetwork(resolved))
        }
    }

    /// Records a library address on the active record.
    pub fn link(&mut self, name: &str, address: Address) {
        self.active.linked_modules.insert(name.to_string(), address);
        if let Some(entry) = self.loaded_entry_mut() {
            entry.linked_modules.insert(name.to_string(), address);
        }
    }

    /// Adds event signatures from a linked contract to the active record.
    pub fn merge_events(&mut self, events: &HashMap<Hash, EventEntry>) {
        for (topic, entry) in events {
            self.active
                .event_signature_index
                .entry(*topic)
                .or_insert_with(|| entry.clone());
        }
        let merged = self.active.event_signature_index.clone();
        if let Some(entry) = self.loaded_entry_mut() {
            entry.event_signature_index = merged;
        }
    }

    /// Stores a freshly deployed address on the active record.
    pub fn record_deployment(&mut self, address: Address) {
        self.active.deployed_address = Some(address);
        if let Some(entry) = self.loaded_entry_mut() {
            entry.deployed_address = Some(address);
        }
    }

    fn loaded_entry_mut(&mut self) -> Option<&mut DeploymentRecord> {
        let id = self.loaded.as_deref()?;
        self.table.get_mut(id)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(addr: u8) -> DeploymentRecord {
        DeploymentRecord {
            deployed_address: Some(Address::repeat_byte(addr)),
            bytecode_template: Some("0x60".into()),
            ..DeploymentRecord::default()
        }
    }

    fn aliases() -> Vec<String> {
        ["1", "live", "default"].iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_set_network_unknown_falls_back_to_empty() {
        let mut reg = NetworkRegistry::new(BTreeMap::from([("default".into(), record(1))]));
        reg.set_network("42");
        assert_eq!(reg.current(), Some("42"));
        assert!(reg.active().deployed_address.is_none());
        assert!(reg.active().bytecode_template.is_none());
    }

    #[test]
    fn test_resolve_main_uses_first_present_alias() {
        let reg = NetworkRegistry::new(BTreeMap::from([
            ("live".into(), record(2)),
            ("default".into(), record(3)),
        ]));
        assert_eq!(reg.resolve("1", "1", &aliases()).unwrap(), "live");
    }

    #[test]
    fn test_resolve_unknown_network() {
        let reg = NetworkRegistry::new(BTreeMap::from([("default".into(), record(1))]));
        assert!(matches!(
            reg.resolve("3", "1", &aliases()),
            Err(ContractError::UnknownNetwork(id)) if id == "3"
        ));
    }

    #[test]
    fn test_links_survive_network_switch() {
        let mut reg = NetworkRegistry::new(BTreeMap::from([
            ("default".into(), record(1)),
            ("live".into(), record(2)),
        ]));
        reg.set_network("live");
        reg.link("Math", Address::repeat_byte(9));
        reg.set_network("default");
        assert!(reg.active().linked_modules.is_empty());
        reg.set_network("live");
        assert_eq!(reg.active().linked_modules["Math"], Address::repeat_byte(9));
    }

    #[test]
    fn test_merged_events_survive_network_switch() {
        let ping = EventEntry {
            name: "Ping".into(),
            inputs: vec![],
            anonymous: false,
        };
        let existing = EventEntry {
            name: "Kept".into(),
            ..ping.clone()
        };
        let mut live = record(2);
        live.event_signature_index
            .insert(Hash::repeat_byte(1), existing.clone());
        let mut reg = NetworkRegistry::new(BTreeMap::from([
            ("default".into(), record(1)),
            ("live".into(), live),
        ]));
        reg.set_network("live");
        reg.merge_events(&HashMap::from([
            (Hash::repeat_byte(1), ping.clone()),
            (Hash::repeat_byte(2), ping.clone()),
        ]));

        reg.set_network("default");
        assert!(reg.active().event_signature_index.is_empty());
        reg.set_network("live");
        let index = &reg.active().event_signature_index;
        assert_eq!(index.len(), 2);
        // Known topics keep their original entry.
        assert_eq!(index[&Hash::repeat_byte(1)], existing);
        assert_eq!(index[&Hash::repeat_byte(2)], ping);
    }

    #[test]
    fn test_unpinned_links_stay_on_bootstrap_record() {
        let mut reg = NetworkRegistry::new(BTreeMap::from([("default".into(), record(1))]));
        reg.set_network("default");
        reg.unpin();
        reg.link("Math", Address::repeat_byte(9));
        reg.set_network("default");
        assert_eq!(reg.active().linked_modules.len(), 1);
    }

    #[test]
    fn test_networks_lists_table_keys() {
        let reg = NetworkRegistry::new(BTreeMap::from([
            ("default".into(), record(1)),
            ("live".into(), record(2)),
        ]));
        assert_eq!(reg.networks(), vec!["default", "live"]);
    }
}
