//! # QC Contract Abstraction - Typed Handles for Deployed Contracts
//!
//! Turns a contract build artifact (interface schema plus per-network
//! deployment metadata) into local objects: a [`ContractClass`] that can
//! deploy or bind, and a [`ContractInstance`] whose functions are either
//! answered by a single call or submitted as a transaction and confirmed by
//! polling for a receipt.
//!
//! ## Architecture
//!
//! | Layer | Location | Purpose |
//! |-------|----------|---------|
//! | Domain | `domain/` | Schema, ABI codec, artifacts, linker, network registry |
//! | Ports | `ports/outbound.rs` | `Transport`, the injected JSON-RPC exchange |
//! | Adapters | `adapters/` | Provider, typed eth methods, fallback and test transports |
//! | Contract | `contract/` | Class factory, instance binder, invocation, synchronizer |
//!
//! ## Invocation Paths
//!
//! | Function kind | Path | Round trips |
//! |---------------|------|-------------|
//! | read-only (`constant`, `view`, `pure`) | `eth_call` | 1, never retried |
//! | state-changing | `eth_sendTransaction` then `eth_getTransactionReceipt` | 1 + polls |
//!
//! ## Receipt Polling Defaults
//!
//! | Setting | Value |
//! |---------|-------|
//! | `timeout_ms` | 240 000 (0 disables) |
//! | `poll_interval_ms` | 1 000 |
//! | `max_attempts` | unbounded |
//!
//! ## Usage Example
//!
//! ```ignore
//! use qc_contract_abstraction::prelude::*;
//!
//! let mut class = ContractClass::from_json_str(&artifact_json)?;
//! class.set_provider(transport);
//! class.check_network().await?;
//!
//! let token = class.deployed()?;
//! let balance = token
//!     .function("balanceOf")?
//!     .call(vec![owner.into()])
//!     .await?;
//! ```

// Crate-level lints
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod contract;
pub mod domain;
pub mod errors;
pub mod ports;

pub use contract::{ContractClass, ContractInstance};

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain
    pub use crate::domain::abi::{ParamType, Token};
    pub use crate::domain::artifact::{ArtifactVersion, ContractArtifact, DeploymentRecord};
    pub use crate::domain::params::{CallArg, TxParams};
    pub use crate::domain::receipt::{DecodedLog, Log, TransactionReceipt};
    pub use crate::domain::schema::{EventEntry, FunctionEntry, Mutability, Schema};
    pub use crate::domain::value_objects::{parse_address, Address, Bytes, Hash, U256};

    // Ports
    pub use crate::ports::outbound::{RpcRequest, Transport};

    // Adapters
    pub use crate::adapters::{EthRpc, FallbackTransport, InMemoryTransport, Provider};

    // Contract
    pub use crate::contract::{
        BoundFunction, ContractClass, ContractInstance, EventHandle, EventWatcher, Invocation,
        LinkSource, TransactionOutcome,
    };

    // Config
    pub use crate::config::{NetworkConfig, RuntimeConfig, SyncConfig};

    // Errors
    pub use crate::errors::{AbiError, ConfigError, ContractError, ContractResult, TransportError};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_exports() {
        use prelude::*;
        let _ = RuntimeConfig::default();
        let _ = TxParams::default();
        assert!(Address::zero().is_zero());
    }

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
