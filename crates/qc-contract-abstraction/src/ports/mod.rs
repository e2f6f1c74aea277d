//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions between the runtime and the outside world.
//!
//! - **Driven Port (Outbound)**: `Transport`, the injected provider that
//!   performs the actual JSON-RPC exchange
//! - No concrete implementations in this module

pub mod outbound;

pub use outbound::*;
