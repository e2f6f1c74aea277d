//! # Domain Layer (Inner Hexagon)
//!
//! Pure data and logic: ABI codec, schema, artifacts, linking, network
//! registry, receipts and log decoding. No I/O.

pub mod abi;
pub mod artifact;
pub mod linker;
pub mod params;
pub mod receipt;
pub mod registry;
pub mod schema;
pub mod value_objects;

pub use abi::{keccak256, ParamType, Token};
pub use artifact::*;
pub use params::*;
pub use receipt::{decode_logs, DecodedLog, Log, TransactionReceipt};
pub use registry::*;
pub use schema::*;
pub use value_objects::*;
