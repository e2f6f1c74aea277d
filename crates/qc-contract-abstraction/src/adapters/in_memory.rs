//! # In-Memory Transport
//!
//! Scripted transport for testing. Each method answers through a handler
//! registered by the test; every request is recorded.
//! Production transports live in the embedding application.

use crate::errors::TransportError;
use crate::ports::outbound::{RpcRequest, Transport};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

type Handler = Arc<dyn Fn(&RpcRequest) -> Result<Value, TransportError> + Send + Sync>;

/// In-memory transport for testing.
#[derive(Default)]
pub struct InMemoryTransport {
    handlers: RwLock<HashMap<String, Handler>>,
    requests: RwLock<Vec<RpcRequest>>,
}

impl InMemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a handler for `method`, replacing any previous one.
    pub fn on<F>(&self, method: &str, handler: F)
    where
        F: Fn(&RpcRequest) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .insert(method.to_string(), Arc::new(handler));
    }

    /// Answers `method` with a fixed result.
    pub fn respond(&self, method: &str, result: Value) {
        self.on(method, move |_| Ok(result.clone()));
    }

    /// Answers `method` with a fixed error.
    pub fn fail(&self, method: &str, error: TransportError) {
        self.on(method, move |_| Err(error.clone()));
    }

    /// All recorded requests, oldest first.
    pub fn requests(&self) -> Vec<RpcRequest> {
        self.requests.read().clone()
    }

    /// Number of recorded requests for `method`.
    pub fn count(&self, method: &str) -> usize {
        self.requests
            .read()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    /// Most recent request for `method`.
    pub fn last(&self, method: &str) -> Option<RpcRequest> {
        self.requests
            .read()
            .iter()
            .rev()
            .find(|r| r.method == method)
            .cloned()
    }

    fn dispatch(&self, request: &RpcRequest) -> Result<Value, TransportError> {
        self.requests.write().push(request.clone());
        // Clone the handler out so it can re-enter the transport.
        let handler = self.handlers.read().get(&request.method).cloned();
        match handler {
            Some(handler) => handler(request),
            None => Err(TransportError::with_code(
                -32601,
                format!("Method not found: {}", request.method),
            )),
        }
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    fn send(&self, request: &RpcRequest) -> Result<Value, TransportError> {
        self.dispatch(request)
    }

    async fn send_async(&self, request: RpcRequest) -> Result<Value, TransportError> {
        self.dispatch(&request)
    }
}

// =============================================================================
// TESTS
// =============================================================================
