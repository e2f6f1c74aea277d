//! # Contract Layer
//!
//! Classes, bound instances and the two invocation paths.
//!
//! - **Class**: network registry, links, defaults, deploy and bind-by-address
//! - **Instance**: one bound function per schema function, plus event handles
//! - **Invocation**: read-only functions, one `eth_call` each
//! - **Synchronizer**: state-changing functions, submit then poll for a receipt

pub mod class;
pub mod instance;
pub mod invocation;
pub mod synchronizer;

pub use class::{ContractClass, LinkSource};
pub use instance::{BoundFunction, ContractInstance, EventHandle, EventWatcher, Invocation};
pub use invocation::{build_params, InvocationAdapter};
pub use synchronizer::{PendingTransaction, TransactionOutcome, TransactionSynchronizer};
