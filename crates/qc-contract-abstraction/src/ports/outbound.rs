//! # Driven Ports (SPI - Outbound)
//!
//! The runtime never opens a connection itself. Whatever talks to the remote
//! network (a local simulator, an HTTP endpoint, or a hybrid of both)
//! implements [`Transport`] and is handed to the runtime.

use crate::errors::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// JSON-RPC protocol version sent on every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC request object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<serde_json::Value>,
    pub id: u64,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Vec<serde_json::Value>, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// Request/response exchange with the remote network.
///
/// Implementations return the JSON-RPC `result` member on success and the
/// `error` member (or a local failure) as [`TransportError`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Blocking exchange.
    fn send(&self, request: &RpcRequest) -> Result<serde_json::Value, TransportError>;

    /// Non-blocking exchange.
    async fn send_async(&self, request: RpcRequest) -> Result<serde_json::Value, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &RpcRequest) -> Result<serde_json::Value, TransportError> {
        (**self).send(request)
    }

    async fn send_async(&self, request: RpcRequest) -> Result<serde_json::Value, TransportError> {
        (**self).send_async(request).await
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    struct Echo;

    #[async_trait]
    impl Transport for Echo {
        fn send(&self, request: &RpcRequest) -> Result<Value, TransportError> {
            Ok(json!(request.method))
        }

        async fn send_async(&self, request: RpcRequest) -> Result<Value, TransportError> {
            self.send(&request)
        }
    }

    #[test]
    fn test_request_wire_shape() {
        let req = RpcRequest::new("net_version", vec![], 7);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"jsonrpc": "2.0", "method": "net_version", "params": [], "id": 7})
        );
    }

    #[tokio::test]
    async fn test_arc_forwards_both_forms() {
        let transport: Arc<dyn Transport> = Arc::new(Echo);
        let req = RpcRequest::new("eth_call", vec![], 1);
        assert_eq!(transport.send(&req).unwrap(), json!("eth_call"));
        assert_eq!(transport.send_async(req).await.unwrap(), json!("eth_call"));
    }
}
