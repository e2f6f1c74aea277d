//! # Fallback Transport
//!
//! Hybrid provider: a primary transport (typically a local simulator) backed
//! by a secondary one (typically a remote endpoint). Any request the primary
//! rejects is retried once on the secondary.

use crate::errors::TransportError;
use crate::ports::outbound::{RpcRequest, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub struct FallbackTransport {
    primary: Arc<dyn Transport>,
    secondary: Arc<dyn Transport>,
}

impl FallbackTransport {
    pub fn new(primary: Arc<dyn Transport>, secondary: Arc<dyn Transport>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl Transport for FallbackTransport {
    fn send(&self, request: &RpcRequest) -> Result<Value, TransportError> {
        self.primary.send(request).or_else(|err| {
            debug!(method = %request.method, error = %err, "Primary transport failed, falling back");
            self.secondary.send(request)
        })
    }

    async fn send_async(&self, request: RpcRequest) -> Result<Value, TransportError> {
        match self.primary.send_async(request.clone()).await {
            Ok(result) => Ok(result),
            Err(err) => {
                debug!(method = %request.method, error = %err, "Primary transport failed, falling back");
                self.secondary.send_async(request).await
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
