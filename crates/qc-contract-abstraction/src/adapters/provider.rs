//! # Provider Adapter
//!
//! Thin pass-through around the injected [`Transport`]: every request the
//! runtime makes goes through one `Provider`, which only assigns request ids
//! and delegates.

use crate::errors::TransportError;
use crate::ports::outbound::{RpcRequest, Transport};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cloneable handle on the attached transport. Clones share the id counter.
#[derive(Clone)]
pub struct Provider {
    transport: Arc<dyn Transport>,
    next_id: Arc<AtomicU64>,
}

impl Provider {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Builds a request with a fresh id.
    pub fn request(&self, method: &str, params: Vec<serde_json::Value>) -> RpcRequest {
        RpcRequest::new(method, params, self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn send(&self, request: &RpcRequest) -> Result<serde_json::Value, TransportError> {
        self.transport.send(request)
    }

    pub async fn send_async(&self, request: RpcRequest) -> Result<serde_json::Value, TransportError> {
        self.transport.send_async(request).await
    }

    /// The wrapped transport.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::in_memory::InMemoryTransport;
    use serde_json::json;

    #[tokio::test]
    async fn test_delegates_and_numbers_requests() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.respond("net_version", json!("5"));
        let provider = Provider::new(transport.clone());

        let first = provider.request("net_version", vec![]);
        let second = provider.request("net_version", vec![]);
        assert_eq!(second.id, first.id + 1);

        assert_eq!(provider.send(&first).unwrap(), json!("5"));
        assert_eq!(provider.send_async(second).await.unwrap(), json!("5"));
        assert_eq!(transport.count("net_version"), 2);
    }

    #[test]
    fn test_clones_share_counter() {
        let provider = Provider::new(Arc::new(InMemoryTransport::new()));
        let clone = provider.clone();
        let a = provider.request("x", vec![]).id;
        let b = clone.request("x", vec![]).id;
        assert_ne!(a, b);
    }
}
