//! Ethereum JSON-RPC methods used by the runtime.
//!
//! Every method builds one request, sends it through the [`Provider`] and
//! parses the `result` member. Nothing is retried here.

use crate::adapters::provider::Provider;
use crate::domain::params::TxParams;
use crate::domain::receipt::{Log, TransactionReceipt};
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::TransportError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

/// Block tag used for reads.
pub const LATEST: &str = "latest";

/// `eth_getLogs` filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Positional topic filters; `None` matches anything.
    #[serde(default)]
    pub topics: Vec<Option<Hash>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_block: Option<String>,
}

/// Ethereum RPC methods handler
#[derive(Debug, Clone)]
pub struct EthRpc {
    provider: Provider,
}

impl EthRpc {
    pub fn new(provider: Provider) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, TransportError> {
        let request = self.provider.request(method, params);
        let result = self.provider.send_async(request).await?;
        serde_json::from_value(result).map_err(|e| TransportError::malformed(method, e))
    }

    /// net_version - Returns the network id as a string
    #[instrument(skip(self))]
    pub async fn net_version(&self) -> Result<String, TransportError> {
        let result: Value = self.request("net_version", vec![]).await?;
        // Some nodes answer with a bare number.
        match result {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(TransportError::malformed("net_version", other)),
        }
    }

    /// eth_accounts - Returns the accounts the node controls
    #[instrument(skip(self))]
    pub async fn accounts(&self) -> Result<Vec<Address>, TransportError> {
        self.request("eth_accounts", vec![]).await
    }

    /// eth_call - Executes a read-only call against the latest block
    #[instrument(skip(self, params))]
    pub async fn call(&self, params: &TxParams) -> Result<Bytes, TransportError> {
        self.request("eth_call", vec![json!(params), json!(LATEST)])
            .await
    }

    /// eth_sendTransaction - Submits a transaction, returning its hash
    #[instrument(skip(self, params))]
    pub async fn send_transaction(&self, params: &TxParams) -> Result<Hash, TransportError> {
        let hash: Hash = self
            .request("eth_sendTransaction", vec![json!(params)])
            .await?;
        debug!(tx = ?hash, "Transaction submitted");
        Ok(hash)
    }

    /// eth_getTransactionReceipt - `None` until the transaction is mined
    #[instrument(skip(self))]
    pub async fn transaction_receipt(
        &self,
        tx: Hash,
    ) -> Result<Option<TransactionReceipt>, TransportError> {
        self.request("eth_getTransactionReceipt", vec![json!(tx)])
            .await
    }

    /// eth_estimateGas - Estimates gas for a transaction
    #[instrument(skip(self, params))]
    pub async fn estimate_gas(&self, params: &TxParams) -> Result<U256, TransportError> {
        self.request("eth_estimateGas", vec![json!(params)]).await
    }

    /// eth_getLogs - Returns logs matching a filter
    #[instrument(skip(self))]
    pub async fn logs(&self, filter: &LogFilter) -> Result<Vec<Log>, TransportError> {
        self.request("eth_getLogs", vec![json!(filter)]).await
    }

    /// eth_getCode - Returns contract code at the latest block
    #[instrument(skip(self))]
    pub async fn code(&self, address: Address) -> Result<Bytes, TransportError> {
        self.request("eth_getCode", vec![json!(address), json!(LATEST)])
            .await
    }
}

// =============================================================================
// TESTS
// =============================================================================
