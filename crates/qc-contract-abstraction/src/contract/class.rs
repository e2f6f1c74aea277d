//! # Contract Class
//!
//! A [`ContractClass`] owns its network table, active record, default
//! parameters and provider. Schemas are shared read-only; everything else is
//! owned, so two pinned classes built from one artifact never see each
//! other's network switches, links or deployments.
//!
//! ## Lifecycle
//!
//! ```text
//! from_artifact ──► bootstrap record loaded, nothing pinned
//!       │
//!       ├── set_network(id) ──► pinned to id
//!       └── check_network() ──► net_version ──► alias resolution ──► pinned
//! ```

use crate::adapters::eth::EthRpc;
use crate::adapters::provider::Provider;
use crate::config::{RuntimeConfig, SyncConfig};
use crate::contract::instance::{Binding, ContractInstance};
use crate::contract::synchronizer::TransactionSynchronizer;
use crate::domain::abi::{self, ParamType};
use crate::domain::artifact::ContractArtifact;
use crate::domain::linker::{link_bytecode, unresolved_libraries};
use crate::domain::params::{split_args, CallArg, TxParams};
use crate::domain::registry::NetworkRegistry;
use crate::domain::schema::Schema;
use crate::domain::value_objects::{decode_hex, parse_address, Address, Bytes};
use crate::errors::{ContractError, ContractResult};
use crate::ports::outbound::Transport;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// What to link into a class.
#[derive(Debug, Clone)]
pub enum LinkSource<'a> {
    /// One module name and its address.
    Single(String, Address),
    /// Several modules at once.
    Many(BTreeMap<String, Address>),
    /// A deployed instance: its name and address, plus its event signatures.
    Instance(&'a ContractInstance),
    /// Another class, at its deployed address on its active network.
    Class(&'a ContractClass),
}

impl<'a> From<&'a ContractInstance> for LinkSource<'a> {
    fn from(instance: &'a ContractInstance) -> Self {
        Self::Instance(instance)
    }
}

impl<'a> From<&'a ContractClass> for LinkSource<'a> {
    fn from(class: &'a ContractClass) -> Self {
        Self::Class(class)
    }
}

impl From<BTreeMap<String, Address>> for LinkSource<'_> {
    fn from(map: BTreeMap<String, Address>) -> Self {
        Self::Many(map)
    }
}

impl From<(&str, Address)> for LinkSource<'_> {
    fn from((name, address): (&str, Address)) -> Self {
        Self::Single(name.to_string(), address)
    }
}

#[derive(Debug, Clone)]
pub struct ContractClass {
    contract_name: String,
    generated_with: String,
    registry: NetworkRegistry,
    defaults: TxParams,
    provider: Option<Provider>,
    config: RuntimeConfig,
}

impl ContractClass {
    /// Builds a class from an artifact.
    ///
    /// The bootstrap record (`"default"` unless configured otherwise) is
    /// loaded but not pinned, so the first `check_network` still detects.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or a malformed network entry.
    pub fn from_artifact(artifact: &ContractArtifact, config: RuntimeConfig) -> ContractResult<Self> {
        config.validate()?;
        let mut registry = NetworkRegistry::new(artifact.records()?);
        registry.set_network(&config.networks.bootstrap_network);
        registry.unpin();

        info!(
            contract = %artifact.contract_name,
            networks = ?registry.networks(),
            "Contract class loaded"
        );

        Ok(Self {
            contract_name: artifact.contract_name.clone(),
            generated_with: artifact.generated_with.clone(),
            registry,
            defaults: config.defaults.clone(),
            provider: None,
            config,
        })
    }

    /// Parses an artifact and builds a class with default configuration.
    ///
    /// # Errors
    ///
    /// See [`ContractArtifact::from_json_str`] and [`Self::from_artifact`].
    pub fn from_json_str(json: &str) -> ContractResult<Self> {
        Self::from_artifact(&ContractArtifact::from_json_str(json)?, RuntimeConfig::default())
    }

    /// Independent copy pinned to `network_id`.
    #[must_use]
    pub fn pinned(&self, network_id: &str) -> Self {
        let mut class = self.clone();
        class.set_network(network_id);
        class
    }

    #[must_use]
    pub fn contract_name(&self) -> &str {
        &self.contract_name
    }

    #[must_use]
    pub fn generated_with(&self) -> &str {
        &self.generated_with
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.registry.active().schema
    }

    // -------------------------------------------------------------------------
    // Provider
    // -------------------------------------------------------------------------

    pub fn set_provider(&mut self, transport: Arc<dyn Transport>) {
        self.provider = Some(Provider::new(transport));
        debug!(contract = %self.contract_name, "Provider attached");
    }

    #[must_use]
    pub fn provider(&self) -> Option<&Provider> {
        self.provider.as_ref()
    }

    fn rpc(&self) -> ContractResult<EthRpc> {
        self.provider
            .clone()
            .map(EthRpc::new)
            .ok_or(ContractError::NoProvider)
    }

    pub fn set_sync_config(&mut self, sync: SyncConfig) -> ContractResult<()> {
        sync.validate()?;
        self.config.sync = sync;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Networks
    // -------------------------------------------------------------------------

    /// Makes `id` the active network. Unknown ids load an empty record.
    pub fn set_network(&mut self, id: &str) {
        self.registry.set_network(id);
    }

    /// Pinned network id, if any.
    #[must_use]
    pub fn network_id(&self) -> Option<&str> {
        self.registry.current()
    }

    /// Known network ids.
    #[must_use]
    pub fn networks(&self) -> Vec<String> {
        self.registry.networks()
    }

    /// Pins the network the provider reports, unless one is already pinned.
    ///
    /// # Errors
    ///
    /// [`ContractError::NoProvider`], transport errors, and
    /// [`ContractError::UnknownNetwork`] when no record matches.
    #[instrument(skip(self), fields(contract = %self.contract_name))]
    pub async fn check_network(&mut self) -> ContractResult<String> {
        if let Some(id) = self.registry.current() {
            return Ok(id.to_string());
        }

        let reported = self.rpc()?.net_version().await?;
        let resolved = self.registry.resolve(
            &reported,
            &self.config.networks.main_network_id,
            &self.config.networks.main_aliases,
        )?;
        self.registry.set_network(&resolved);
        info!(reported = %reported, network = %resolved, "Network detected");
        Ok(resolved)
    }

    // -------------------------------------------------------------------------
    // Linking
    // -------------------------------------------------------------------------

    /// Records library addresses on the active record.
    ///
    /// # Errors
    ///
    /// [`ContractError::NotDeployed`] when linking a class with no address.
    pub fn link<'a>(&mut self, source: impl Into<LinkSource<'a>>) -> ContractResult<()> {
        match source.into() {
            LinkSource::Single(name, address) => self.link_one(&name, address),
            LinkSource::Many(map) => {
                for (name, address) in map {
                    self.link_one(&name, address);
                }
            }
            LinkSource::Instance(instance) => {
                self.link_one(instance.contract_name(), instance.address());
                self.registry.merge_events(instance.event_index());
            }
            LinkSource::Class(class) => {
                let address = class.address().ok_or(ContractError::NotDeployed)?;
                self.link_one(class.contract_name(), address);
                self.registry
                    .merge_events(&class.registry.active().event_signature_index);
            }
        }
        Ok(())
    }

    fn link_one(&mut self, name: &str, address: Address) {
        debug!(contract = %self.contract_name, library = name, address = ?address, "Library linked");
        self.registry.link(name, address);
    }

    /// Recorded links on the active record.
    #[must_use]
    pub fn links(&self) -> &BTreeMap<String, Address> {
        &self.registry.active().linked_modules
    }

    /// Bytecode template as shipped, placeholders intact.
    #[must_use]
    pub fn unlinked_binary(&self) -> Option<&str> {
        self.registry.active().bytecode_template.as_deref()
    }

    /// Template with every recorded link substituted.
    #[must_use]
    pub fn binary(&self) -> Option<String> {
        let record = self.registry.active();
        record
            .bytecode_template
            .as_deref()
            .map(|template| link_bytecode(template, &record.linked_modules))
    }

    // -------------------------------------------------------------------------
    // Instances
    // -------------------------------------------------------------------------

    /// Deployed address on the active record.
    #[must_use]
    pub fn address(&self) -> Option<Address> {
        self.registry.active().deployed_address
    }

    #[must_use]
    pub fn updated_at(&self) -> Option<u64> {
        self.registry.active().updated_at
    }

    /// Deploys a new instance with constructor `args`.
    ///
    /// A trailing [`CallArg::Options`] is merged over the class defaults.
    /// The payload is the linked bytecode (or the caller's `data`) followed by
    /// the encoded constructor arguments. Receipts without a created address
    /// count as still pending.
    ///
    /// # Errors
    ///
    /// In order: [`ContractError::NoProvider`], [`ContractError::NoBinary`],
    /// [`ContractError::UnresolvedLibraries`]; then argument errors,
    /// transport errors and the synchronizer's timeout errors.
    #[instrument(skip(self, args), fields(contract = %self.contract_name))]
    pub async fn deploy(&mut self, args: Vec<CallArg>) -> ContractResult<ContractInstance> {
        let rpc = self.rpc()?;
        let bytecode = self.binary().ok_or(ContractError::NoBinary)?;

        let libraries = unresolved_libraries(&bytecode);
        if !libraries.is_empty() {
            return Err(ContractError::UnresolvedLibraries {
                contract: self.contract_name.clone(),
                libraries,
            });
        }

        let (tokens, mut params) = split_args(args, &self.defaults)?;
        let inputs: Vec<ParamType> = self
            .schema()
            .constructor()
            .map(|c| c.inputs.iter().map(|p| p.kind.clone()).collect())
            .unwrap_or_default();
        let encoded = abi::encode_checked(&inputs, &tokens)?;

        let mut payload = match params.data.take() {
            Some(data) => data.0,
            None => decode_hex(&bytecode)?,
        };
        payload.extend(encoded);
        params.data = Some(Bytes::new(payload));

        let sync = TransactionSynchronizer::new(rpc, self.config.sync.clone());
        let tx = sync.submit(&params).await?;
        info!(tx = ?tx, "Deployment submitted");

        let receipt = sync
            .wait_until(tx, |receipt| receipt.created_address().is_some())
            .await?;
        let address = receipt
            .created_address()
            .ok_or(ContractError::NotDeployed)?;

        self.registry.record_deployment(address);
        info!(tx = ?tx, address = ?address, "Contract deployed");
        Ok(ContractInstance::from_binding(self.binding(), address, Some(tx)))
    }

    /// Binds an existing deployment. Makes no network call.
    ///
    /// # Errors
    ///
    /// [`ContractError::InvalidAddress`] unless `address` is 42 characters of
    /// `0x`-prefixed hex.
    pub fn at(&self, address: &str) -> ContractResult<ContractInstance> {
        let address = parse_address(address)?;
        Ok(ContractInstance::bind(self, address))
    }

    /// Binds the address recorded for the active network.
    ///
    /// # Errors
    ///
    /// [`ContractError::NotDeployed`] when no address is on record.
    pub fn deployed(&self) -> ContractResult<ContractInstance> {
        let address = self.address().ok_or(ContractError::NotDeployed)?;
        Ok(ContractInstance::bind(self, address))
    }

    /// Merges `params` into the class defaults and returns the result.
    /// Later calls overwrite the same fields.
    pub fn defaults(&mut self, params: TxParams) -> TxParams {
        self.defaults.absorb(&params);
        self.defaults.clone()
    }

    pub(crate) fn binding(&self) -> Binding {
        let record = self.registry.active();
        Binding {
            contract_name: self.contract_name.clone(),
            schema: Arc::clone(&record.schema),
            provider: self.provider.clone(),
            defaults: self.defaults.clone(),
            sync: self.config.sync.clone(),
            events: Arc::new(record.event_signature_index.clone()),
            version: record.version,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
