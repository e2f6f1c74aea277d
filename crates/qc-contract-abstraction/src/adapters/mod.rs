//! # Adapters Layer (Outer Hexagon)
//!
//! - `Provider`: pass-through wrapper every request goes through
//! - `EthRpc`: typed JSON-RPC methods on top of the provider
//! - `FallbackTransport`: primary transport with a secondary fallback
//! - `InMemoryTransport`: scripted transport for tests

pub mod eth;
pub mod fallback;
pub mod in_memory;
pub mod provider;

pub use eth::{EthRpc, LogFilter};
pub use fallback::FallbackTransport;
pub use in_memory::InMemoryTransport;
pub use provider::Provider;
