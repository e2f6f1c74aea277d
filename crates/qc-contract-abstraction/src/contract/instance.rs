//! # Instance Binder
//!
//! A [`ContractInstance`] is one remote program at one address. Its callable
//! surface is fixed when it is bound: one [`BoundFunction`] per schema
//! function, carrying the class state captured at that moment. Every function
//! is reachable by its canonical signature (`transfer(address,uint256)`); a
//! bare name reaches the first overload declared. Changing the
//! class afterwards (defaults, provider, network) does not reach existing
//! instances.

use crate::adapters::eth::{EthRpc, LogFilter};
use crate::adapters::provider::Provider;
use crate::config::SyncConfig;
use crate::contract::class::ContractClass;
use crate::contract::invocation::{build_params, InvocationAdapter};
use crate::contract::synchronizer::{TransactionOutcome, TransactionSynchronizer};
use crate::domain::abi::Token;
use crate::domain::artifact::ArtifactVersion;
use crate::domain::params::{CallArg, TxParams};
use crate::domain::receipt::{decode_logs, DecodedLog, Log};
use crate::domain::schema::{EventEntry, FunctionEntry, Schema};
use crate::domain::value_objects::{Address, Hash, U256};
use crate::errors::{ContractError, ContractResult};
use crate::ports::outbound::RpcRequest;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Class state captured at bind time.
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub contract_name: String,
    pub schema: Arc<Schema>,
    pub provider: Option<Provider>,
    pub defaults: TxParams,
    pub sync: SyncConfig,
    pub events: Arc<HashMap<Hash, EventEntry>>,
    pub version: ArtifactVersion,
}

impl Binding {
    fn rpc(&self) -> ContractResult<EthRpc> {
        self.provider
            .clone()
            .map(EthRpc::new)
            .ok_or(ContractError::NoProvider)
    }

    /// Event index used for receipts, present only for enriched artifacts.
    fn receipt_events(&self) -> Option<&HashMap<Hash, EventEntry>> {
        (self.version == ArtifactVersion::Enriched).then_some(self.events.as_ref())
    }
}

/// Result of the default invocation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Decoded outputs of a read-only function.
    Call(Vec<Token>),
    /// Confirmed transaction of a state-changing function.
    Transaction(TransactionOutcome),
}

impl Invocation {
    #[must_use]
    pub fn into_outputs(self) -> Option<Vec<Token>> {
        match self {
            Self::Call(outputs) => Some(outputs),
            Self::Transaction(_) => None,
        }
    }

    #[must_use]
    pub fn into_outcome(self) -> Option<TransactionOutcome> {
        match self {
            Self::Transaction(outcome) => Some(outcome),
            Self::Call(_) => None,
        }
    }
}

// =============================================================================
// BOUND FUNCTION
// =============================================================================

/// A schema function bound to an instance address.
#[derive(Debug, Clone)]
pub struct BoundFunction {
    entry: FunctionEntry,
    address: Address,
    binding: Arc<Binding>,
}

impl BoundFunction {
    #[must_use]
    pub fn entry(&self) -> &FunctionEntry {
        &self.entry
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.entry.is_read_only()
    }

    /// Transaction object the function would send, defaults merged.
    ///
    /// # Errors
    ///
    /// Fails on malformed arguments.
    pub fn params(&self, args: Vec<CallArg>) -> ContractResult<TxParams> {
        build_params(&self.entry, self.address, args, &self.binding.defaults)
    }

    /// Default path: `call` for read-only functions, `transact` otherwise.
    ///
    /// # Errors
    ///
    /// See [`Self::call`] and [`Self::transact`].
    pub async fn invoke(&self, args: Vec<CallArg>) -> ContractResult<Invocation> {
        if self.is_read_only() {
            self.call(args).await.map(Invocation::Call)
        } else {
            self.transact(args).await.map(Invocation::Transaction)
        }
    }

    /// Forces the read path, whatever the function's mutability.
    ///
    /// # Errors
    ///
    /// [`ContractError::NoProvider`], argument errors, transport errors and
    /// undecodable return data.
    #[instrument(skip(self, args), fields(function = %self.entry.name))]
    pub async fn call(&self, args: Vec<CallArg>) -> ContractResult<Vec<Token>> {
        let rpc = self.binding.rpc()?;
        let params = self.params(args)?;
        InvocationAdapter::new(rpc).call(&self.entry, &params).await
    }

    /// Submits a transaction and waits for its receipt.
    ///
    /// # Errors
    ///
    /// [`ContractError::NoProvider`], argument errors, transport errors and
    /// the synchronizer's timeout errors.
    #[instrument(skip(self, args), fields(function = %self.entry.name))]
    pub async fn transact(&self, args: Vec<CallArg>) -> ContractResult<TransactionOutcome> {
        let rpc = self.binding.rpc()?;
        let params = self.params(args)?;
        TransactionSynchronizer::new(rpc, self.binding.sync.clone())
            .send_and_confirm(&params, self.binding.receipt_events(), self.address)
            .await
    }

    /// Forces a raw submission and returns the hash without polling.
    ///
    /// # Errors
    ///
    /// [`ContractError::NoProvider`], argument errors and transport errors.
    pub async fn send_transaction(&self, args: Vec<CallArg>) -> ContractResult<Hash> {
        let rpc = self.binding.rpc()?;
        let params = self.params(args)?;
        Ok(rpc.send_transaction(&params).await?)
    }

    /// # Errors
    ///
    /// [`ContractError::NoProvider`], argument errors and transport errors.
    pub async fn estimate_gas(&self, args: Vec<CallArg>) -> ContractResult<U256> {
        let rpc = self.binding.rpc()?;
        let params = self.params(args)?;
        Ok(rpc.estimate_gas(&params).await?)
    }

    /// Builds the raw request for the default path without sending it.
    ///
    /// # Errors
    ///
    /// [`ContractError::NoProvider`] and argument errors.
    pub fn request(&self, args: Vec<CallArg>) -> ContractResult<RpcRequest> {
        let provider = self.binding.provider.as_ref().ok_or(ContractError::NoProvider)?;
        let params = self.params(args)?;
        Ok(if self.is_read_only() {
            provider.request("eth_call", vec![json!(params), json!(crate::adapters::eth::LATEST)])
        } else {
            provider.request("eth_sendTransaction", vec![json!(params)])
        })
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// Log query for one event, or for every known event, at an instance address.
#[derive(Debug, Clone)]
pub struct EventHandle {
    event: Option<EventEntry>,
    address: Address,
    binding: Arc<Binding>,
}

impl EventHandle {
    /// Event name, `None` for the all-events handle.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.event.as_ref().map(|e| e.name.as_str())
    }

    #[must_use]
    pub fn filter(&self, from_block: Option<&str>) -> LogFilter {
        LogFilter {
            address: Some(self.address),
            topics: self
                .event
                .iter()
                .filter(|e| !e.anonymous)
                .map(|e| Some(e.topic()))
                .collect(),
            from_block: from_block.map(str::to_string),
            to_block: None,
        }
    }

    /// Fetches matching logs and decodes the known ones.
    ///
    /// # Errors
    ///
    /// [`ContractError::NoProvider`] and transport errors.
    pub async fn logs(&self, from_block: Option<&str>) -> ContractResult<Vec<DecodedLog>> {
        let raw = self.fetch(from_block).await?;
        Ok(self.decode(&raw))
    }

    /// Starts a polling subscription from `from_block`, paced by the bound
    /// synchronizer interval.
    #[must_use]
    pub fn watch(&self, from_block: Option<&str>) -> EventWatcher {
        EventWatcher {
            handle: self.clone(),
            cursor: from_block.map(str::to_string),
            started: false,
        }
    }

    async fn fetch(&self, from_block: Option<&str>) -> ContractResult<Vec<Log>> {
        let rpc = self.binding.rpc()?;
        let raw = rpc.logs(&self.filter(from_block)).await?;
        debug!(count = raw.len(), event = ?self.name(), "Fetched logs");
        Ok(raw)
    }

    fn decode(&self, raw: &[Log]) -> Vec<DecodedLog> {
        match &self.event {
            Some(event) => {
                let index = HashMap::from([(event.topic(), event.clone())]);
                decode_logs(raw, &index, self.address)
            }
            None => decode_logs(raw, &self.binding.events, self.address),
        }
    }
}

/// Polling log subscription created by [`EventHandle::watch`].
///
/// Each poll asks for logs from the block after the newest one already
/// delivered, so a log is handed out once.
#[derive(Debug, Clone)]
pub struct EventWatcher {
    handle: EventHandle,
    cursor: Option<String>,
    started: bool,
}

impl EventWatcher {
    /// Block the next poll starts from.
    #[must_use]
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Fetches once, without waiting.
    ///
    /// # Errors
    ///
    /// [`ContractError::NoProvider`] and transport errors.
    pub async fn poll(&mut self) -> ContractResult<Vec<DecodedLog>> {
        let raw = self.handle.fetch(self.cursor.as_deref()).await?;
        if let Some(newest) = raw.iter().filter_map(|log| log.block_number).max() {
            self.cursor = Some(format!("{:#x}", newest + U256::one()));
        }
        Ok(self.handle.decode(&raw))
    }

    /// Waits for the next non-empty batch, sleeping one poll interval
    /// between empty polls. The first call polls immediately.
    ///
    /// # Errors
    ///
    /// The first failing poll ends the wait.
    pub async fn next(&mut self) -> ContractResult<Vec<DecodedLog>> {
        loop {
            if self.started {
                tokio::time::sleep(self.handle.binding.sync.poll_interval()).await;
            }
            self.started = true;
            let batch = self.poll().await?;
            if !batch.is_empty() {
                return Ok(batch);
            }
        }
    }
}

// =============================================================================
// INSTANCE
// =============================================================================

#[derive(Debug, Clone)]
pub struct ContractInstance {
    address: Address,
    transaction_hash: Option<Hash>,
    binding: Arc<Binding>,
    /// First overload per bare name.
    functions: BTreeMap<String, BoundFunction>,
    /// Every function, by canonical signature.
    signatures: BTreeMap<String, BoundFunction>,
}

impl ContractInstance {
    /// Binds `class`'s current schema and state to `address`.
    #[must_use]
    pub fn bind(class: &ContractClass, address: Address) -> Self {
        Self::from_binding(class.binding(), address, None)
    }

    pub(crate) fn from_binding(
        binding: Binding,
        address: Address,
        transaction_hash: Option<Hash>,
    ) -> Self {
        let binding = Arc::new(binding);
        let mut functions = BTreeMap::new();
        let mut signatures = BTreeMap::new();
        for entry in binding.schema.functions() {
            let bound = BoundFunction {
                entry: entry.clone(),
                address,
                binding: Arc::clone(&binding),
            };
            functions
                .entry(entry.name.clone())
                .or_insert_with(|| bound.clone());
            signatures.entry(entry.signature()).or_insert(bound);
        }
        debug!(
            contract = %binding.contract_name,
            address = ?address,
            functions = signatures.len(),
            "Instance bound"
        );
        Self {
            address,
            transaction_hash,
            binding,
            functions,
            signatures,
        }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Creating transaction, set only for instances produced by `deploy`.
    #[must_use]
    pub fn transaction_hash(&self) -> Option<Hash> {
        self.transaction_hash
    }

    #[must_use]
    pub fn contract_name(&self) -> &str {
        &self.binding.contract_name
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.binding.schema
    }

    /// Event signatures known to this instance, including merged ones.
    #[must_use]
    pub fn event_index(&self) -> &HashMap<Hash, EventEntry> {
        &self.binding.events
    }

    /// Looks up a function by bare name or by canonical signature.
    ///
    /// # Errors
    ///
    /// [`ContractError::UnknownFunction`] if the schema had no such function
    /// at bind time.
    pub fn function(&self, key: &str) -> ContractResult<&BoundFunction> {
        self.functions
            .get(key)
            .or_else(|| self.signatures.get(key))
            .ok_or_else(|| ContractError::UnknownFunction(key.to_string()))
    }

    /// Bare names of the bound functions.
    pub fn functions(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Canonical signatures, one per schema function.
    pub fn signatures(&self) -> impl Iterator<Item = &str> {
        self.signatures.keys().map(String::as_str)
    }

    /// Every overload sharing `name`, in signature order.
    pub fn overloads<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a BoundFunction> {
        self.signatures.values().filter(move |f| f.name() == name)
    }

    /// Shorthand for `function(name)?.invoke(args)`.
    ///
    /// # Errors
    ///
    /// See [`BoundFunction::invoke`].
    pub async fn invoke(&self, name: &str, args: Vec<CallArg>) -> ContractResult<Invocation> {
        self.function(name)?.invoke(args).await
    }

    /// # Errors
    ///
    /// [`ContractError::UnknownEvent`] if the schema has no such event.
    pub fn event(&self, name: &str) -> ContractResult<EventHandle> {
        let entry = self
            .binding
            .schema
            .event(name)
            .ok_or_else(|| ContractError::UnknownEvent(name.to_string()))?;
        Ok(EventHandle {
            event: Some(entry.clone()),
            address: self.address,
            binding: Arc::clone(&self.binding),
        })
    }

    #[must_use]
    pub fn all_events(&self) -> EventHandle {
        EventHandle {
            event: None,
            address: self.address,
            binding: Arc::clone(&self.binding),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::in_memory::InMemoryTransport;
    use serde_json::Value;
    use std::time::Duration;

    fn schema() -> Schema {
        Schema::from_json_value(&json!([
            {"type": "function", "name": "balanceOf", "constant": true,
             "inputs": [{"name": "owner", "type": "address"}],
             "outputs": [{"name": "", "type": "uint256"}]},
            {"type": "function", "name": "transfer", "constant": false,
             "inputs": [{"name": "to", "type": "address"}, {"name": "amount", "type": "uint256"}],
             "outputs": [{"name": "", "type": "bool"}]},
            {"type": "function", "name": "transfer", "constant": false,
             "inputs": [{"name": "to", "type": "address"}],
             "outputs": []},
            {"type": "event", "name": "Transfer", "anonymous": false,
             "inputs": [{"name": "from", "type": "address", "indexed": true},
                        {"name": "to", "type": "address", "indexed": true},
                        {"name": "amount", "type": "uint256", "indexed": false}]}
        ]))
        .unwrap()
    }

    fn binding(transport: Option<Arc<InMemoryTransport>>) -> Binding {
        let schema = schema();
        let events = schema.event_index();
        Binding {
            contract_name: "Token".into(),
            schema: Arc::new(schema),
            provider: transport.map(|t| Provider::new(t)),
            defaults: TxParams::new().from(Address::repeat_byte(0x11)),
            sync: SyncConfig::default(),
            events: Arc::new(events),
            version: ArtifactVersion::Enriched,
        }
    }

    #[test]
    fn test_bind_attaches_first_overload() {
        let instance = ContractInstance::from_binding(binding(None), Address::repeat_byte(0xaa), None);
        assert_eq!(instance.functions().collect::<Vec<_>>(), vec!["balanceOf", "transfer"]);
        assert_eq!(instance.function("transfer").unwrap().entry().inputs.len(), 2);
        assert_eq!(instance.signatures().count(), instance.schema().functions().count());
        assert!(matches!(
            instance.function("mint"),
            Err(ContractError::UnknownFunction(name)) if name == "mint"
        ));
    }

    #[test]
    fn test_every_overload_reachable_by_signature() {
        let instance = ContractInstance::from_binding(binding(None), Address::repeat_byte(0xaa), None);
        assert_eq!(
            instance.signatures().collect::<Vec<_>>(),
            vec!["balanceOf(address)", "transfer(address)", "transfer(address,uint256)"]
        );

        let single = instance.function("transfer(address)").unwrap();
        let params = single.params(vec![Address::repeat_byte(1).into()]).unwrap();
        let data = params.data.unwrap();
        assert_eq!(data.0.len(), 4 + 32);
        assert_eq!(&data.0[..4], &single.entry().selector()[..]);

        assert_eq!(instance.overloads("transfer").count(), 2);
        assert!(matches!(
            instance.function("transfer(uint256)"),
            Err(ContractError::UnknownFunction(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_provider_fails_before_any_request() {
        let instance = ContractInstance::from_binding(binding(None), Address::repeat_byte(0xaa), None);
        let err = instance
            .invoke("balanceOf", vec![Address::repeat_byte(1).into()])
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::NoProvider));
    }

    #[tokio::test]
    async fn test_read_only_invoke_uses_eth_call() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.respond("eth_call", json!(format!("0x{:064x}", 9)));
        let instance =
            ContractInstance::from_binding(binding(Some(transport.clone())), Address::repeat_byte(0xaa), None);

        let out = instance
            .invoke("balanceOf", vec![Address::repeat_byte(1).into()])
            .await
            .unwrap();
        assert_eq!(out.into_outputs(), Some(vec![Token::Uint(U256::from(9))]));
        assert_eq!(transport.count("eth_sendTransaction"), 0);

        let sent = transport.last("eth_call").unwrap();
        assert_eq!(sent.params[0]["from"], json!(format!("0x{}", "11".repeat(20))));
    }

    #[test]
    fn test_request_picks_method_by_mutability() {
        let transport = Arc::new(InMemoryTransport::new());
        let instance = ContractInstance::from_binding(binding(Some(transport.clone())), Address::zero(), None);

        let read = instance
            .function("balanceOf")
            .unwrap()
            .request(vec![Address::zero().into()])
            .unwrap();
        assert_eq!(read.method, "eth_call");

        let write = instance
            .function("transfer")
            .unwrap()
            .request(vec![Address::zero().into(), 5u64.into()])
            .unwrap();
        assert_eq!(write.method, "eth_sendTransaction");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_send_transaction_does_not_poll() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.respond("eth_sendTransaction", json!(format!("0x{}", "ab".repeat(32))));
        let instance = ContractInstance::from_binding(binding(Some(transport.clone())), Address::zero(), None);

        let tx = instance
            .function("transfer")
            .unwrap()
            .send_transaction(vec![Address::zero().into(), 5u64.into()])
            .await
            .unwrap();
        assert_eq!(tx, Hash::repeat_byte(0xab));
        assert_eq!(transport.count("eth_getTransactionReceipt"), 0);
    }

    #[test]
    fn test_event_filter_carries_topic_and_address() {
        let instance = ContractInstance::from_binding(binding(None), Address::repeat_byte(0xaa), None);
        let handle = instance.event("Transfer").unwrap();
        let filter = handle.filter(Some("0x0"));
        assert_eq!(filter.address, Some(Address::repeat_byte(0xaa)));
        assert_eq!(filter.topics.len(), 1);
        assert!(instance.all_events().filter(None).topics.is_empty());
        assert!(matches!(instance.event("Approval"), Err(ContractError::UnknownEvent(_))));
    }

    fn transfer_log(block: u64, amount: u64) -> Value {
        let topic = schema().event("Transfer").unwrap().topic();
        json!({"address": format!("0x{}", "aa".repeat(20)),
               "topics": [format!("{topic:?}"),
                          format!("0x{:064x}", 1), format!("0x{:064x}", 2)],
               "data": format!("0x{amount:064x}"),
               "blockNumber": format!("{block:#x}")})
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_delivers_each_log_once() {
        let transport = Arc::new(InMemoryTransport::new());
        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = calls.clone();
        transport.on("eth_getLogs", move |_| {
            Ok(match counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) {
                0 => json!([transfer_log(5, 1), transfer_log(7, 2)]),
                1 | 2 => json!([]),
                _ => json!([transfer_log(9, 3)]),
            })
        });
        let instance =
            ContractInstance::from_binding(binding(Some(transport.clone())), Address::repeat_byte(0xaa), None);
        let mut watcher = instance.event("Transfer").unwrap().watch(Some("0x0"));

        let first = watcher.next().await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(watcher.cursor(), Some("0x8"));

        let start = tokio::time::Instant::now();
        let second = watcher.next().await.unwrap();
        assert_eq!(second[0].arg("amount"), Some(&Token::Uint(U256::from(3))));
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(3) && waited < Duration::from_secs(4));
        assert_eq!(watcher.cursor(), Some("0xa"));

        let sent = transport.requests();
        let from: Vec<&Value> = sent.iter().map(|r| &r.params[0]["fromBlock"]).collect();
        assert_eq!(from, vec![&json!("0x0"), &json!("0x8"), &json!("0x8"), &json!("0x8")]);
    }

    #[tokio::test]
    async fn test_all_events_decodes_known_logs() {
        let transport = Arc::new(InMemoryTransport::new());
        let topic = schema().event("Transfer").unwrap().topic();
        transport.respond(
            "eth_getLogs",
            json!([
                {"address": format!("0x{}", "aa".repeat(20)),
                 "topics": [format!("{topic:?}"),
                            format!("0x{:064x}", 1), format!("0x{:064x}", 2)],
                 "data": format!("0x{:064x}", 77)},
                {"address": format!("0x{}", "aa".repeat(20)),
                 "topics": [format!("0x{}", "ee".repeat(32))],
                 "data": "0x"}
            ]),
        );
        let instance =
            ContractInstance::from_binding(binding(Some(transport.clone())), Address::repeat_byte(0xaa), None);

        let logs = instance.all_events().logs(None).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].arg("amount"), Some(&Token::Uint(U256::from(77))));
        assert_eq!(transport.last("eth_getLogs").unwrap().params[0]["topics"], Value::Array(vec![]));
    }
}
