//! # Invocation Adapter
//!
//! Turns a schema function plus call-site arguments into a transaction
//! object, and answers read-only functions with a single `eth_call`.

use crate::adapters::eth::EthRpc;
use crate::domain::abi::{self, Token};
use crate::domain::params::{split_args, CallArg, TxParams};
use crate::domain::schema::FunctionEntry;
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::ContractResult;
use tracing::debug;

/// Builds the parameter object for calling `function` on `address`.
///
/// The trailing parameter bag (if any) is merged over `defaults`; `to` is
/// always the contract and `data` is the selector followed by the encoded
/// arguments.
///
/// # Errors
///
/// Fails on a misplaced parameter bag or arguments that don't fit the inputs.
pub fn build_params(
    function: &FunctionEntry,
    address: Address,
    args: Vec<CallArg>,
    defaults: &TxParams,
) -> ContractResult<TxParams> {
    let (tokens, mut params) = split_args(args, defaults)?;
    let encoded = abi::encode_checked(&function.input_types(), &tokens)?;

    let mut data = function.selector().to_vec();
    data.extend(encoded);

    params.to = Some(address);
    params.data = Some(Bytes::new(data));
    Ok(params)
}

/// Read-only invocations: one round trip, no retries.
#[derive(Debug, Clone)]
pub struct InvocationAdapter {
    rpc: EthRpc,
}

impl InvocationAdapter {
    pub fn new(rpc: EthRpc) -> Self {
        Self { rpc }
    }

    /// Calls `function` and decodes its outputs.
    ///
    /// # Errors
    ///
    /// Transport errors pass through; malformed return data is an ABI error.
    pub async fn call(&self, function: &FunctionEntry, params: &TxParams) -> ContractResult<Vec<Token>> {
        debug!(function = %function.name, "Calling read-only function");
        let raw = self.rpc.call(params).await?;
        Ok(abi::decode(&function.output_types(), raw.as_slice())?)
    }
}

// =============================================================================
// TESTS
// =============================================================================
